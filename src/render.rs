// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ImageRenderer turns one plan entry into one finished image:
//! run the chaos game with the entry's weights, rasterize the cloud as
//! textured patches, colorize the mask, and augment the result.

use image::RgbImage;
use rand::Rng;

use crate::augment::{augment, BACKGROUNDS};
use crate::colorize::Colorizer;
use crate::error::IfsError;
use crate::ifs::{iterate, render, IfsParams, Mask, Stroke, DEFAULT_PAD};

/// The parameters of a final render.  Once set, this object should not
/// be mutable; every worker shares it.
#[derive(Clone, Debug)]
pub struct ImageRenderer {
    /// Output height.
    pub height: usize,
    /// Output width.
    pub width: usize,
    /// Chaos-game steps per image.
    pub iterations: usize,
    /// How samples are inked.
    pub stroke: Stroke,
    /// (row, column) padding around the fractal.
    pub pad: (usize, usize),
    /// Background color catalogue for augmentation.
    pub backgrounds: Vec<[u8; 3]>,
}

impl ImageRenderer {
    /// A renderer with patch strokes, the stock padding and the stock
    /// background catalogue.
    pub fn new(height: usize, width: usize, iterations: usize) -> ImageRenderer {
        ImageRenderer {
            height,
            width,
            iterations,
            stroke: Stroke::Patch,
            pad: DEFAULT_PAD,
            backgrounds: BACKGROUNDS.to_vec(),
        }
    }

    /// Renders the mask of one instance.
    pub fn mask<R: Rng>(&self, params: &IfsParams, weights: &[f64; 6], rng: &mut R) -> Result<Mask, IfsError> {
        let cloud = iterate(params, weights, self.iterations, rng);
        render(&cloud, self.height, self.width, self.stroke, self.pad, rng)
    }

    /// Renders, colorizes and augments one instance.
    pub fn image<R: Rng>(
        &self,
        params: &IfsParams,
        weights: &[f64; 6],
        colorizer: &dyn Colorizer,
        rng: &mut R,
    ) -> Result<RgbImage, IfsError> {
        let mask = self.mask(params, weights, rng)?;
        let colored = colorizer.colorize(&mask.to_image(), rng)?;
        Ok(augment(colored, &self.backgrounds, rng))
    }
}
