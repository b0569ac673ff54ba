// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Category search.
//!
//! Most random IFS parameter sets are dull: they diverge, or they
//! collapse onto a line or a handful of points.  We find usable ones
//! by rejection sampling: draw a random system, render it at a fixed
//! reference resolution, and keep it only if enough of the image got
//! inked.

use rand::Rng;

use crate::error::IfsError;
use crate::ifs::{iterate, render, AffineMap, IfsParams, Stroke, DEFAULT_PAD, UNIT_WEIGHTS};

/// A parameter set the search accepted, with the density that got it
/// accepted and the number of draws it took.
#[derive(Clone, Debug)]
pub struct Accepted {
    /// The accepted system.
    pub params: IfsParams,
    /// The non-zero pixel fraction of its reference render.
    pub density: f64,
    /// How many systems were drawn, this one included.
    pub attempts: usize,
}

/// The knobs of the rejection sampler.  Once set, these should not
/// change between categories of a run.
#[derive(Clone, Debug)]
pub struct CategorySearch {
    /// Minimum fraction of non-zero pixels for acceptance.
    pub threshold: f64,
    /// Number of chaos-game steps per reference render.
    pub points: usize,
    /// Reference render (height, width).
    pub resolution: (usize, usize),
    /// Number of draws before giving up.
    pub max_attempts: usize,
    /// Added to the weight total when normalizing the ladder.
    pub epsilon: f64,
}

impl CategorySearch {
    /// A search with the stock reference resolution, attempt cap and
    /// epsilon.
    pub fn new(threshold: f64, points: usize) -> CategorySearch {
        CategorySearch {
            threshold,
            points,
            resolution: (512, 512),
            max_attempts: 100_000,
            epsilon: 1e-5,
        }
    }

    /// Draws a random system of 2 to 7 maps with every coefficient
    /// uniform in [-1, 1].
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<IfsParams, IfsError> {
        let count: usize = rng.gen_range(2, 8);
        let maps = (0..count)
            .map(|_| {
                let mut coefficients = [0.0_f64; 6];
                for k in coefficients.iter_mut() {
                    *k = rng.gen_range(-1.0, 1.0);
                }
                AffineMap::new(coefficients)
            })
            .collect();
        IfsParams::new(maps, self.epsilon)
    }

    /// Renders `params` at the reference resolution and measures its
    /// density.  Degenerate renders come back as errors.
    pub fn measure<R: Rng + ?Sized>(&self, params: &IfsParams, rng: &mut R) -> Result<f64, IfsError> {
        let cloud = iterate(params, &UNIT_WEIGHTS, self.points, rng);
        let (height, width) = self.resolution;
        let mask = render(&cloud, height, width, Stroke::Point, DEFAULT_PAD, rng)?;
        Ok(mask.density())
    }

    /// Draws systems until one is dense enough.  Degenerate draws are
    /// simply rejected; only running out of attempts is an error.
    pub fn find<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Accepted, IfsError> {
        for attempt in 1..=self.max_attempts {
            let params = self.draw(rng)?;
            match self.measure(&params, rng) {
                Ok(density) if density >= self.threshold => {
                    debug!(
                        "accepted {} map system with density {:.3} after {} attempts",
                        params.len(),
                        density,
                        attempt
                    );
                    return Ok(Accepted {
                        params,
                        density,
                        attempts: attempt,
                    });
                }
                Ok(density) => trace!("rejected: density {:.4}", density),
                Err(e) => trace!("rejected: {}", e),
            }
        }
        Err(IfsError::SearchExhausted(self.max_attempts))
    }
}
