// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The IFS engine.
//!
//! An Iterated Function System is a handful of affine maps on the
//! plane.  Starting from the origin, we repeatedly pick one of the
//! maps at random (weighted by how much area the map preserves) and
//! apply it to the previous point.  The trail of points left behind
//! settles onto the attractor of the system, which is the fractal we
//! want to draw.
//!
//! Drawing has to cope with systems that are not contractive: their
//! trails run off to infinity and then turn into NaN.  Those samples,
//! and a short window of samples leading up to them, are scrubbed
//! before the cloud is stretched over the image.

use image::{GrayImage, ImageBuffer, Luma, Pixel};
use itertools::{iproduct, Itertools, MinMaxResult};
use rand::Rng;

use crate::error::IfsError;

/// How many samples before the first divergent sample of an axis are
/// thrown away along with the divergent ones.
pub const SCRUB_WINDOW: usize = 100;

/// The default (row, column) padding kept clear around a mask.
pub const DEFAULT_PAD: (usize, usize) = (6, 6);

/// The intensity of an inked mask pixel.
pub const INK: u8 = 127;

/// Instance weights that leave a category's coefficients untouched.
pub const UNIT_WEIGHTS: [f64; 6] = [1.0; 6];

/// One affine map, `(x, y) -> (x·a + y·b + e, x·c + y·d + f)`, along
/// with its unnormalized selection weight.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineMap {
    /// The coefficients `a` through `f`, in that order.
    pub coefficients: [f64; 6],
    /// `|a·d − b·c|`, the area scaling of the linear part.
    pub weight: f64,
}

impl AffineMap {
    /// Builds a map and derives its selection weight from the
    /// determinant of its linear part.
    pub fn new(coefficients: [f64; 6]) -> AffineMap {
        let [a, b, c, d, _, _] = coefficients;
        AffineMap {
            coefficients,
            weight: (a * d - b * c).abs(),
        }
    }

    /// Applies the map to a point after multiplying each coefficient
    /// by the matching entry of `scale`.
    #[inline]
    pub fn apply(&self, x: f64, y: f64, scale: &[f64; 6]) -> (f64, f64) {
        let k = &self.coefficients;
        let (a, b, c, d) = (k[0] * scale[0], k[1] * scale[1], k[2] * scale[2], k[3] * scale[3]);
        let (e, f) = (k[4] * scale[4], k[5] * scale[5]);
        (x * a + y * b + e, x * c + y * d + f)
    }
}

/// An ordered set of affine maps and the cumulative probability ladder
/// used to choose among them.
#[derive(Clone, Debug, PartialEq)]
pub struct IfsParams {
    maps: Vec<AffineMap>,
    ladder: Vec<f64>,
}

impl IfsParams {
    /// Normalizes the maps' weights into a ladder.  `epsilon` is added
    /// to the weight total (and spread evenly across the maps) so that
    /// a set of maps with zero determinants still has a usable ladder.
    /// The top rung is always exactly 1.
    pub fn new(maps: Vec<AffineMap>, epsilon: f64) -> Result<IfsParams, IfsError> {
        if maps.is_empty() {
            return Err(IfsError::EmptyParameterSet);
        }
        let share = epsilon / (maps.len() as f64);
        let total: f64 = maps.iter().map(|m| m.weight).sum::<f64>() + epsilon;

        let mut running = 0.0;
        let mut ladder: Vec<f64> = if total > 0.0 && total.is_finite() {
            maps.iter()
                .map(|m| {
                    running += (m.weight + share) / total;
                    running.min(1.0)
                })
                .collect()
        } else {
            let rung = 1.0 / (maps.len() as f64);
            maps.iter()
                .map(|_| {
                    running += rung;
                    running.min(1.0)
                })
                .collect()
        };
        if let Some(top) = ladder.last_mut() {
            *top = 1.0;
        }
        Ok(IfsParams { maps, ladder })
    }

    /// The maps, in selection order.
    pub fn maps(&self) -> &[AffineMap] {
        &self.maps
    }

    /// The cumulative selection probabilities, one per map.
    pub fn ladder(&self) -> &[f64] {
        &self.ladder
    }

    /// Number of maps in the system.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Never true for a constructed parameter set; here for symmetry
    /// with `len`.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Picks the first map whose rung is at or above `draw`.  A draw
    /// that rounding leaves above the top rung gets the last map.
    pub fn select(&self, draw: f64) -> &AffineMap {
        match self.ladder.iter().position(|&rung| draw <= rung) {
            Some(index) => &self.maps[index],
            None => &self.maps[self.maps.len() - 1],
        }
    }
}

/// The trail of points an IFS leaves behind, starting point included.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    /// The (x, y) samples, in iteration order.  May contain non-finite
    /// values when the system diverges.
    pub points: Vec<(f64, f64)>,
}

impl PointCloud {
    /// Number of samples in the cloud.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drops divergent samples, then maps the survivors onto integral
    /// (row, column) pixel coordinates.  The X axis drives rows and
    /// spans `[pad.0, height - pad.0]`; the Y axis drives columns and
    /// spans `[pad.1, width - pad.1]`.
    pub fn rescale(
        &self,
        height: usize,
        width: usize,
        pad: (usize, usize),
    ) -> Result<Vec<(usize, usize)>, IfsError> {
        let mut points = self.points.clone();
        scrub(&mut points, |p| p.0);
        scrub(&mut points, |p| p.1);
        if points.is_empty() {
            return Err(IfsError::NonFinitePoints);
        }

        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        let rows = stretch(&xs, height, pad.0, "x")?;
        let columns = stretch(&ys, width, pad.1, "y")?;
        Ok(rows.into_iter().zip(columns).collect())
    }
}

/// Removes every sample whose `axis` coordinate is not finite, along
/// with the `SCRUB_WINDOW` samples in front of the first such sample.
fn scrub<F>(points: &mut Vec<(f64, f64)>, axis: F)
where
    F: Fn(&(f64, f64)) -> f64,
{
    let first = match points.iter().position(|p| !axis(p).is_finite()) {
        Some(first) => first,
        None => return,
    };
    let window = first.saturating_sub(SCRUB_WINDOW);
    let mut index = 0;
    points.retain(|p| {
        let keep = (index < window || index >= first) && axis(p).is_finite();
        index += 1;
        keep
    });
}

/// Translates `values` so the smallest lands on zero, then stretches
/// them linearly over `[pad, dim - pad]`.
fn stretch(
    values: &[f64],
    dim: usize,
    pad: usize,
    axis: &'static str,
) -> Result<Vec<usize>, IfsError> {
    let (low, high) = match values.iter().cloned().minmax() {
        MinMaxResult::NoElements => return Err(IfsError::NonFinitePoints),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(low, high) => (low, high),
    };
    let range = high - low;
    if !(range > 0.0) {
        return Err(IfsError::ZeroRange(axis));
    }
    let span = dim.saturating_sub(2 * pad) as f64;
    Ok(values
        .iter()
        .map(|v| ((v - low) / range * span + pad as f64) as usize)
        .collect())
}

/// Runs the chaos game for `iterations` steps from the origin.  All
/// the random draws are taken before the walk begins.  Each map's
/// coefficients are scaled by `weights` before being applied; pass
/// `UNIT_WEIGHTS` to draw the category itself.
pub fn iterate<R: Rng + ?Sized>(
    params: &IfsParams,
    weights: &[f64; 6],
    iterations: usize,
    rng: &mut R,
) -> PointCloud {
    let draws: Vec<f64> = (0..iterations).map(|_| rng.gen::<f64>()).collect();
    let mut points = Vec::with_capacity(iterations + 1);
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    points.push((x, y));
    for draw in draws {
        let next = params.select(draw).apply(x, y, weights);
        x = next.0;
        y = next.1;
        points.push(next);
    }
    PointCloud { points }
}

/// How each sample is inked onto a mask.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Stroke {
    /// A single pixel per sample.  Used when measuring density.
    Point,
    /// A 3×3 patch per sample, textured by a random 9-bit pattern.
    Patch,
}

/// A grayscale raster of a rendered point cloud, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    height: usize,
    width: usize,
    pixels: Vec<u8>,
}

impl Mask {
    /// A blank mask.
    pub fn new(height: usize, width: usize) -> Mask {
        Mask {
            height,
            width,
            pixels: vec![0; height * width],
        }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The raw row-major intensities.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(&self, row: usize, column: usize) -> Option<usize> {
        if row >= self.height || column >= self.width {
            return None;
        }
        Some(row * self.width + column)
    }

    /// The intensity at (row, column), if that is inside the mask.
    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        self.offset(row, column).map(|o| self.pixels[o])
    }

    /// Writes an intensity; coordinates outside the mask are ignored.
    pub fn set(&mut self, row: usize, column: usize, value: u8) {
        if let Some(o) = self.offset(row, column) {
            self.pixels[o] = value;
        }
    }

    /// The fraction of pixels that are not zero.
    pub fn density(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let inked = self.pixels.iter().filter(|&&p| p != 0).count();
        (inked as f64) / (self.pixels.len() as f64)
    }

    /// Converts the mask into an 8-bit grayscale image.
    pub fn to_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |column, row| {
            *Luma::from_slice(&[self.pixels[(row as usize) * self.width + (column as usize)]])
        })
    }
}

/// Rasterizes a point cloud onto a `height × width` mask.  Fails if
/// nothing finite survives scrubbing or if either axis collapses to a
/// single coordinate.
pub fn render<R: Rng + ?Sized>(
    cloud: &PointCloud,
    height: usize,
    width: usize,
    stroke: Stroke,
    pad: (usize, usize),
    rng: &mut R,
) -> Result<Mask, IfsError> {
    let coordinates = cloud.rescale(height, width, pad)?;
    let mut mask = Mask::new(height, width);
    for (row, column) in coordinates {
        match stroke {
            Stroke::Point => mask.set(row, column, INK),
            Stroke::Patch => {
                let pattern: u16 = rng.gen_range(1, 512);
                for (dr, dc) in iproduct!(0..3, 0..3) {
                    let bit = 8 - (dr * 3 + dc);
                    let value = if (pattern >> bit) & 1 == 1 { INK } else { 0 };
                    mask.set(row + 1 + dr, column + 1 + dc, value);
                }
            }
        }
    }
    Ok(mask)
}
