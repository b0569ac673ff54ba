// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Run configuration.  The command line fills one of these in; tests
//! build them directly.

use std::path::PathBuf;
use std::str::FromStr;

use crate::dataset::Format;
use crate::error::IfsError;
use crate::ifs::DEFAULT_PAD;
use crate::planner::point_budget;
use crate::render::ImageRenderer;
use crate::search::CategorySearch;

/// Smallest side an output image may have: the padding on both
/// sides, plus room for a patch.
pub const MIN_SIDE: usize = 2 * DEFAULT_PAD.0 + 4;

/// Chaos-game steps for each final image.
pub const RENDER_ITERATIONS: usize = 200_000;

/// Kinds of data the generator can produce.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DataType {
    /// Three-channel images.
    Image,
}

impl FromStr for DataType {
    type Err = IfsError;

    fn from_str(s: &str) -> Result<DataType, IfsError> {
        match s {
            "image" => Ok(DataType::Image),
            other => Err(IfsError::UnsupportedDataType(other.to_string())),
        }
    }
}

/// Everything a run needs to know.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Where the images are written.
    pub output_dir: PathBuf,
    /// How many images to write.
    pub count: usize,
    /// Output image height.
    pub height: usize,
    /// Output image width.
    pub width: usize,
    /// What to generate.
    pub data_type: DataType,
    /// Whether an existing, non-empty output directory may be emptied.
    pub overwrite: bool,
    /// Directory holding the colorization table, if not the stock one.
    pub model_path: Option<PathBuf>,
    /// The seed every worker's random stream is derived from.
    pub seed: u64,
    /// Worker threads; `None` means one per available CPU.
    pub workers: Option<usize>,
    /// Output container format.
    pub format: Format,
    /// Minimum reference density for a category.
    pub threshold: f64,
    /// Category search attempt cap.
    pub max_attempts: usize,
    /// Reference resolution the search measures density at.
    pub reference: (usize, usize),
    /// Chaos-game steps per search render; derived from the output
    /// size when `None`.
    pub search_points: Option<usize>,
    /// Chaos-game steps per final image.
    pub render_iterations: usize,
}

impl GeneratorConfig {
    /// A configuration with the stock knobs.
    pub fn new(output_dir: PathBuf, count: usize, height: usize, width: usize) -> GeneratorConfig {
        GeneratorConfig {
            output_dir,
            count,
            height,
            width,
            data_type: DataType::Image,
            overwrite: false,
            model_path: None,
            seed: 0,
            workers: None,
            format: Format::Png,
            threshold: 0.2,
            max_attempts: 100_000,
            reference: (512, 512),
            search_points: None,
            render_iterations: RENDER_ITERATIONS,
        }
    }

    /// Rejects configurations that cannot produce anything, before any
    /// work starts.
    pub fn validate(&self) -> Result<(), IfsError> {
        if self.count == 0 {
            return Err(IfsError::InvalidCount);
        }
        if self.height < MIN_SIDE || self.width < MIN_SIDE {
            return Err(IfsError::InvalidShape(self.height, self.width, MIN_SIDE));
        }
        let (rh, rw) = self.reference;
        if rh < MIN_SIDE || rw < MIN_SIDE {
            return Err(IfsError::InvalidShape(rh, rw, MIN_SIDE));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(IfsError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }

    /// The category search this configuration calls for.
    pub fn search(&self) -> CategorySearch {
        let points = self
            .search_points
            .unwrap_or_else(|| point_budget(self.height, self.width));
        CategorySearch {
            resolution: self.reference,
            max_attempts: self.max_attempts,
            ..CategorySearch::new(self.threshold, points)
        }
    }

    /// The renderer for final images.
    pub fn renderer(&self) -> ImageRenderer {
        ImageRenderer::new(self.height, self.width, self.render_iterations)
    }
}
