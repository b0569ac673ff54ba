// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parallel scheduler.
//!
//! A run fans out twice over a fixed pool of scoped threads.  The
//! search round hands category indices out one at a time from a shared
//! iterator, since some categories take far longer to find than
//! others; results are put back in index order afterwards.  The
//! render round cuts the plan into contiguous batches, one per worker,
//! and each worker writes only the indices in its batch.
//!
//! Nothing random is shared between threads.  Every category and every
//! image gets its own generator, seeded from the run seed and its own
//! index, so a run produces the same files whatever the worker count
//! and whatever order the workers finish in.

use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::thread;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::colorize::ColorizerFactory;
use crate::dataset::ImageSink;
use crate::error::IfsError;
use crate::ifs::IfsParams;
use crate::planner::GenerationPlan;
use crate::render::ImageRenderer;
use crate::search::CategorySearch;

const SEARCH_STREAM: u64 = 0x5345_4152_4348;
const RENDER_STREAM: u64 = 0x5245_4e44_4552;

/// Mixes the run seed, a stream tag and a task index into a task seed.
/// SplitMix64 finalizer.
pub fn derive_seed(seed: u64, stream: u64, index: u64) -> u64 {
    let mut z = seed
        .wrapping_add(stream.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .wrapping_add(index.wrapping_mul(0xd1b5_4a32_d192_ed03));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Never more workers than images, never fewer than one.
pub fn worker_count(requested: Option<usize>, count: usize) -> usize {
    requested
        .unwrap_or_else(num_cpus::get)
        .min(count)
        .max(1)
}

/// Splits `0..len` into `splits` contiguous ranges whose lengths differ
/// by at most one, longer ranges first.
pub fn split_batches(len: usize, splits: usize) -> Vec<Range<usize>> {
    let splits = splits.max(1);
    let (base, extra) = (len / splits, len % splits);
    let mut start = 0;
    (0..splits)
        .map(|i| {
            let size = base + if i < extra { 1 } else { 0 };
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Runs the two fan-out rounds of a generation.
#[derive(Copy, Clone, Debug)]
pub struct Scheduler {
    workers: usize,
    seed: u64,
}

impl Scheduler {
    /// A scheduler with `workers` threads (at least one) deriving all of
    /// its random streams from `seed`.
    pub fn new(workers: usize, seed: u64) -> Scheduler {
        Scheduler {
            workers: workers.max(1),
            seed,
        }
    }

    /// The size of the pool.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Finds `categories` parameter sets in parallel.  Category `i` of
    /// the result is always the one searched with category `i`'s seed.
    pub fn search_round(
        &self,
        search: &CategorySearch,
        categories: usize,
    ) -> Result<Vec<IfsParams>, IfsError> {
        let threads = self.workers.min(categories).max(1);
        let queue = Arc::new(Mutex::new(0..categories));
        let seed = self.seed;
        info!(
            "searching for {} categories on {} workers",
            categories, threads
        );

        let results: Vec<thread::Result<Result<Vec<(usize, IfsParams)>, IfsError>>> =
            crossbeam::scope(|spawner| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let queue = queue.clone();
                        spawner.spawn(move |_| -> Result<Vec<(usize, IfsParams)>, IfsError> {
                            let mut found = vec![];
                            loop {
                                let next = match queue.lock() {
                                    Ok(mut q) => q.next(),
                                    Err(poisoned) => poisoned.into_inner().next(),
                                };
                                match next {
                                    Some(category) => {
                                        let mut rng = StdRng::seed_from_u64(derive_seed(
                                            seed,
                                            SEARCH_STREAM,
                                            category as u64,
                                        ));
                                        let accepted = search.find(&mut rng)?;
                                        info!(
                                            "category {}: {} maps, density {:.3}, {} attempts",
                                            category,
                                            accepted.params.len(),
                                            accepted.density,
                                            accepted.attempts
                                        );
                                        found.push((category, accepted.params));
                                    }
                                    None => break,
                                }
                            }
                            Ok(found)
                        })
                    })
                    .collect();
                handles.into_iter().map(|handle| handle.join()).collect()
            })
            .map_err(|_| IfsError::WorkerPanicked(0))?;

        let mut found = Vec::with_capacity(categories);
        for (worker, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(batch)) => found.extend(batch),
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(IfsError::WorkerPanicked(worker)),
            }
        }
        found.sort_by_key(|&(category, _)| category);
        Ok(found.into_iter().map(|(_, params)| params).collect())
    }

    /// Renders every entry of `plan` and hands it to `sink`.  Each
    /// worker loads one colorizer for its whole batch.  Returns the
    /// number of images written; the first failing batch fails the
    /// round.
    pub fn render_round(
        &self,
        plan: &GenerationPlan,
        renderer: &ImageRenderer,
        factory: &dyn ColorizerFactory,
        sink: &dyn ImageSink,
    ) -> Result<usize, IfsError> {
        if plan.is_empty() {
            return Ok(0);
        }
        let batches = split_batches(plan.len(), self.workers.min(plan.len()));
        let seed = self.seed;
        info!(
            "rendering {} images in {} batches",
            plan.len(),
            batches.len()
        );

        let results: Vec<thread::Result<Result<usize, failure::Error>>> =
            crossbeam::scope(|spawner| {
                let handles: Vec<_> = batches
                    .iter()
                    .enumerate()
                    .map(|(batch, range)| {
                        let entries = &plan.entries[range.clone()];
                        spawner.spawn(move |_| -> Result<usize, failure::Error> {
                            debug!(
                                "batch {}: images {} to {}",
                                batch,
                                range.start,
                                range.end
                            );
                            let colorizer = factory.load()?;
                            for entry in entries {
                                let mut rng = StdRng::seed_from_u64(derive_seed(
                                    seed,
                                    RENDER_STREAM,
                                    entry.index as u64,
                                ));
                                let image = renderer.image(
                                    plan.params(entry),
                                    &entry.weights,
                                    &*colorizer,
                                    &mut rng,
                                )?;
                                sink.write(entry.index, &image)?;
                            }
                            Ok(entries.len())
                        })
                    })
                    .collect();
                handles.into_iter().map(|handle| handle.join()).collect()
            })
            .map_err(|_| IfsError::WorkerPanicked(0))?;

        let mut written = 0;
        for (batch, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(count)) => written += count,
                Ok(Err(e)) => return Err(IfsError::WorkerFailed(batch, e.to_string())),
                Err(_) => return Err(IfsError::WorkerPanicked(batch)),
            }
        }
        info!("rendered {} images", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorize::{Colorizer, PaletteModel};
    use crate::ifs::AffineMap;
    use crate::planner::{weight_catalogue, Planner};
    use image::RgbImage;
    use std::collections::BTreeMap;

    struct MemorySink(Mutex<BTreeMap<usize, Vec<u8>>>);

    impl MemorySink {
        fn new() -> MemorySink {
            MemorySink(Mutex::new(BTreeMap::new()))
        }
    }

    impl ImageSink for MemorySink {
        fn write(&self, index: usize, image: &RgbImage) -> Result<(), failure::Error> {
            let previous = self.0.lock().unwrap().insert(index, image.clone().into_raw());
            assert!(previous.is_none(), "index {} written twice", index);
            Ok(())
        }
    }

    struct BrokenModel;

    impl ColorizerFactory for BrokenModel {
        fn load(&self) -> Result<Box<dyn Colorizer>, IfsError> {
            Err(IfsError::ModelArtifact("nowhere".into(), "missing".into()))
        }
    }

    fn triangle(shift: f64) -> IfsParams {
        IfsParams::new(
            vec![
                AffineMap::new([0.5, 0.0, 0.0, 0.5, 0.0, 0.0]),
                AffineMap::new([0.5, 0.0, 0.0, 0.5, 0.5, shift]),
                AffineMap::new([0.5, 0.0, 0.0, 0.5, 0.25, 0.5]),
            ],
            1e-5,
        )
        .unwrap()
    }

    fn small_search() -> CategorySearch {
        CategorySearch {
            resolution: (64, 64),
            max_attempts: 5_000,
            ..CategorySearch::new(0.2, 4_000)
        }
    }

    #[test]
    fn batches_cover_range_without_gaps() {
        for &(len, splits) in &[(300, 1), (300, 8), (10, 3), (7, 7), (5, 2)] {
            let batches = split_batches(len, splits);
            assert_eq!(batches.len(), splits);
            let mut next = 0;
            for b in &batches {
                assert_eq!(b.start, next);
                next = b.end;
            }
            assert_eq!(next, len);
            let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
            assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
        }
        assert_eq!(split_batches(10, 3), vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn workers_never_outnumber_images() {
        assert_eq!(worker_count(Some(8), 3), 3);
        assert_eq!(worker_count(Some(2), 300), 2);
        assert_eq!(worker_count(Some(0), 300), 1);
        assert!(worker_count(None, 1) == 1);
    }

    #[test]
    fn derived_seeds_differ_per_task_and_stream() {
        let a = derive_seed(0, SEARCH_STREAM, 0);
        let b = derive_seed(0, SEARCH_STREAM, 1);
        let c = derive_seed(0, RENDER_STREAM, 0);
        let d = derive_seed(1, SEARCH_STREAM, 0);
        assert!(a != b && a != c && a != d && b != c);
        assert_eq!(a, derive_seed(0, SEARCH_STREAM, 0));
    }

    #[test]
    fn search_round_is_ordered_and_independent_of_pool_size() {
        let search = small_search();
        let one = Scheduler::new(1, 7).search_round(&search, 3).unwrap();
        let three = Scheduler::new(3, 7).search_round(&search, 3).unwrap();
        assert_eq!(one.len(), 3);
        assert_eq!(one, three);
        assert!(one[0] != one[1]);
    }

    #[test]
    fn search_round_reports_exhaustion() {
        let search = CategorySearch {
            resolution: (64, 64),
            max_attempts: 2,
            ..CategorySearch::new(1.0, 10)
        };
        match Scheduler::new(2, 0).search_round(&search, 2) {
            Err(IfsError::SearchExhausted(2)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    fn plan(count: usize) -> GenerationPlan {
        let planner = Planner::new(count, weight_catalogue()).unwrap();
        let categories = (0..planner.sizing().categories)
            .map(|i| triangle(i as f64 * 0.1))
            .collect();
        planner.expand(categories).unwrap()
    }

    #[test]
    fn render_round_output_is_independent_of_pool_size() {
        let plan = plan(300);
        let renderer = ImageRenderer::new(24, 24, 800);
        let model = PaletteModel::builtin();

        let serial = MemorySink::new();
        let written = Scheduler::new(1, 3)
            .render_round(&plan, &renderer, &model, &serial)
            .unwrap();
        assert_eq!(written, 300);

        let parallel = MemorySink::new();
        let written = Scheduler::new(8, 3)
            .render_round(&plan, &renderer, &model, &parallel)
            .unwrap();
        assert_eq!(written, 300);

        let serial = serial.0.into_inner().unwrap();
        let parallel = parallel.0.into_inner().unwrap();
        assert_eq!(serial.keys().cloned().collect::<Vec<_>>(), (0..300).collect::<Vec<_>>());
        assert_eq!(serial, parallel);
    }

    #[test]
    fn model_failure_fails_the_round() {
        let plan = plan(4);
        let renderer = ImageRenderer::new(24, 24, 100);
        let sink = MemorySink::new();
        match Scheduler::new(2, 0).render_round(&plan, &renderer, &BrokenModel, &sink) {
            Err(IfsError::WorkerFailed(0, cause)) => assert!(cause.contains("missing")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn degenerate_category_fails_the_round() {
        let collapsed = IfsParams::new(vec![AffineMap::new([0.0; 6]); 2], 1e-5).unwrap();
        let plan = Planner::new(6, weight_catalogue())
            .unwrap()
            .expand(vec![collapsed])
            .unwrap();
        let renderer = ImageRenderer::new(24, 24, 500);
        let model = PaletteModel::builtin();
        let sink = MemorySink::new();
        match Scheduler::new(3, 0).render_round(&plan, &renderer, &model, &sink) {
            Err(IfsError::WorkerFailed(0, cause)) => assert!(cause.contains("zero extent")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
