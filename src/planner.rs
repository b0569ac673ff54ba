// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The instance planner.
//!
//! A requested image count is met with a few fractal categories, each
//! of which is drawn many times with its coefficients nudged by a row
//! of the weight catalogue.  The planner decides how many categories
//! and how many passes over the catalogue are needed, then lays out
//! exactly one entry per requested image.

use crate::error::IfsError;
use crate::ifs::IfsParams;

/// Number of scale groups in the weight catalogue.
pub const SCALE_GROUPS: usize = 25;

/// Number of coefficients (axes) a catalogue row can scale.
pub const AXES: usize = 6;

/// Baseline image area the point budget is expressed against.
pub const BASELINE_AREA: usize = 362 * 362;

/// Sample points per baseline-sized image.
pub const BASE_POINTS: usize = 100_000;

/// The stock catalogue of per-instance coefficient weights.  Scale
/// group `g` uses the scale `0.2 + g·1.6/24`, running from 0.2 to 1.8;
/// within a group, row `k` applies that scale to coefficient `k` alone.
/// The middle group has scale 1.0, so it holds six unscaled rows; they
/// are kept so the catalogue stays at 25 groups of 6.
pub fn weight_catalogue() -> Vec<[f64; 6]> {
    let step = 1.6 / ((SCALE_GROUPS - 1) as f64);
    let mut rows = Vec::with_capacity(SCALE_GROUPS * AXES);
    for group in 0..SCALE_GROUPS {
        let scale = 0.2 + (group as f64) * step;
        for axis in 0..AXES {
            let mut row = [1.0; 6];
            row[axis] = scale;
            rows.push(row);
        }
    }
    rows
}

/// Number of sample points to draw for an image of the given size:
/// a whole multiple of `BASE_POINTS`, at least one.
pub fn point_budget(height: usize, width: usize) -> usize {
    let ratio = ((height * width) as f64 / BASELINE_AREA as f64).round() as usize;
    ratio.max(1) * BASE_POINTS
}

/// How many categories to search for, and how many times each
/// catalogue row is repeated per category.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sizing {
    /// Distinct categories.
    pub categories: usize,
    /// Repeats of each catalogue row within a category.
    pub instances: usize,
    /// Catalogue rows in use (after any truncation).
    pub rows: usize,
}

impl Sizing {
    /// Images the sizing can produce before truncation.
    pub fn capacity(&self) -> usize {
        self.categories * self.instances * self.rows
    }
}

/// One image of the plan.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlanEntry {
    /// Global image index; also the output file key.
    pub index: usize,
    /// Index of the category's parameter set in the plan.
    pub category: usize,
    /// Coefficient multipliers for this instance.
    pub weights: [f64; 6],
}

/// Every category and exactly one entry per requested image, indexed
/// 0..count-1.
#[derive(Clone, Debug)]
pub struct GenerationPlan {
    /// The accepted parameter sets, by category index.
    pub categories: Vec<IfsParams>,
    /// One entry per image, in index order.
    pub entries: Vec<PlanEntry>,
}

impl GenerationPlan {
    /// Number of images the plan produces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The parameter set an entry draws from.
    pub fn params(&self, entry: &PlanEntry) -> &IfsParams {
        &self.categories[entry.category]
    }
}

/// Sizes and expands a run of `count` images.
#[derive(Clone, Debug)]
pub struct Planner {
    count: usize,
    catalogue: Vec<[f64; 6]>,
    sizing: Sizing,
}

impl Planner {
    /// Computes the sizing for `count` images over `catalogue`.  Runs
    /// smaller than the catalogue get one category, one instance, and
    /// only the first `count` rows.
    pub fn new(count: usize, mut catalogue: Vec<[f64; 6]>) -> Result<Planner, IfsError> {
        if count == 0 || catalogue.is_empty() {
            return Err(IfsError::InvalidCount);
        }
        let sizing = if count < catalogue.len() {
            catalogue.truncate(count);
            Sizing {
                categories: 1,
                instances: 1,
                rows: count,
            }
        } else {
            let rows = catalogue.len();
            let instances = (0.25 * count as f64 / rows as f64).ceil() as usize;
            let instances = instances.max(1);
            let categories = (count + instances * rows - 1) / (instances * rows);
            Sizing {
                categories,
                instances,
                rows,
            }
        };
        debug_assert!(sizing.capacity() >= count);
        Ok(Planner {
            count,
            catalogue,
            sizing,
        })
    }

    /// The sizing computed for this run.
    pub fn sizing(&self) -> Sizing {
        self.sizing
    }

    /// Images requested.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Lays out the plan.  Each catalogue row is repeated `instances`
    /// times in a row; that stream is laid down once per category, and
    /// the whole thing is cut off at exactly `count` entries.
    pub fn expand(&self, categories: Vec<IfsParams>) -> Result<GenerationPlan, IfsError> {
        if categories.len() < self.sizing.categories {
            return Err(IfsError::ShortSearch(
                self.sizing.categories,
                categories.len(),
            ));
        }
        let per_category = self.sizing.instances * self.sizing.rows;
        let entries: Vec<PlanEntry> = (0..self.sizing.categories)
            .flat_map(move |category| {
                self.catalogue.iter().flat_map(move |row| {
                    std::iter::repeat(*row)
                        .take(self.sizing.instances)
                        .map(move |weights| (category, weights))
                })
            })
            .take(self.count)
            .enumerate()
            .map(|(index, (category, weights))| PlanEntry {
                index,
                category,
                weights,
            })
            .collect();
        debug!(
            "planned {} images over {} categories ({} per category)",
            entries.len(),
            self.sizing.categories,
            per_category
        );
        Ok(GenerationPlan {
            categories,
            entries,
        })
    }
}
