// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Colorization of rendered masks.
//!
//! The generator only needs "grayscale mask in, color image out", so
//! colorizers sit behind a small trait.  Each worker asks a factory
//! for its own colorizer once, before its batch, since loading the
//! model is the expensive part.
//!
//! The stock colorizer shades the ink of a mask with a gradient
//! between two colors of a centroid table.  The table is the model
//! artifact: given a model directory, it is written there once if it
//! is missing and read back by every worker.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Pixel, Rgb, RgbImage};
use num::clamp;
use rand::{Rng, RngCore};

use crate::error::IfsError;

/// Name of the centroid table inside a model directory.
pub const PALETTE_FILE: &str = "palette.txt";

/// The stock centroid table.
pub const DEFAULT_CENTROIDS: [[u8; 3]; 16] = [
    [230, 57, 70],
    [241, 143, 1],
    [252, 191, 73],
    [234, 226, 183],
    [42, 157, 143],
    [38, 70, 83],
    [69, 123, 157],
    [168, 218, 220],
    [106, 76, 147],
    [181, 101, 167],
    [255, 202, 212],
    [131, 197, 190],
    [94, 48, 35],
    [188, 108, 37],
    [96, 108, 56],
    [221, 161, 94],
];

pub(crate) fn rgb(color: [u8; 3]) -> Rgb<u8> {
    *Rgb::from_slice(&color)
}

/// Turns a grayscale mask into a color image.
pub trait Colorizer {
    /// Colors `mask`.  Black pixels of the mask stay black.
    fn colorize(&self, mask: &GrayImage, rng: &mut dyn RngCore) -> Result<RgbImage, IfsError>;
}

/// Produces one colorizer per worker.
pub trait ColorizerFactory: Sync {
    /// Loads a fresh colorizer.
    fn load(&self) -> Result<Box<dyn Colorizer>, IfsError>;
}

/// Shades ink with a linear gradient between two centroids.
#[derive(Clone, Debug)]
pub struct PaletteColorizer {
    centroids: Vec<[u8; 3]>,
}

impl PaletteColorizer {
    /// A colorizer over `centroids`, which must hold at least two
    /// colors.
    pub fn new(centroids: Vec<[u8; 3]>) -> Result<PaletteColorizer, String> {
        if centroids.len() < 2 {
            return Err(format!(
                "need at least 2 centroids, found {}",
                centroids.len()
            ));
        }
        Ok(PaletteColorizer { centroids })
    }

    /// The stock table.
    pub fn builtin() -> PaletteColorizer {
        PaletteColorizer {
            centroids: DEFAULT_CENTROIDS.to_vec(),
        }
    }

    /// The table in use.
    pub fn centroids(&self) -> &[[u8; 3]] {
        &self.centroids
    }
}

impl Colorizer for PaletteColorizer {
    fn colorize(&self, mask: &GrayImage, rng: &mut dyn RngCore) -> Result<RgbImage, IfsError> {
        let n = self.centroids.len();
        let first = rng.gen_range(0, n);
        let mut second = rng.gen_range(0, n - 1);
        if second >= first {
            second += 1;
        }
        let (from, to) = (self.centroids[first], self.centroids[second]);

        let angle: f64 = rng.gen_range(0.0, 2.0 * std::f64::consts::PI);
        let (dy, dx) = angle.sin_cos();
        let floor = dx.min(0.0) + dy.min(0.0);
        let span = dx.abs() + dy.abs();

        let (width, height) = mask.dimensions();
        let (w, h) = ((width.max(2) - 1) as f64, (height.max(2) - 1) as f64);
        Ok(RgbImage::from_fn(width, height, |x, y| {
            let ink = mask.get_pixel(x, y).channels()[0];
            if ink == 0 {
                return rgb([0, 0, 0]);
            }
            let t = ((x as f64 / w) * dx + (y as f64 / h) * dy - floor) / span;
            let shade = 0.5 + f64::from(ink) / 255.0;
            let mut color = [0u8; 3];
            for (c, (a, b)) in color.iter_mut().zip(from.iter().zip(to.iter())) {
                let mixed = (f64::from(*a) * (1.0 - t) + f64::from(*b) * t) * shade;
                *c = clamp(mixed, 1.0, 255.0) as u8;
            }
            rgb(color)
        }))
    }
}

/// Reads a centroid table: one `r g b` triple per line, blank lines
/// and `#` comments ignored.
pub fn parse_palette(text: &str) -> Result<Vec<[u8; 3]>, String> {
    let mut centroids = vec![];
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let channels: Vec<u8> = line
            .split_whitespace()
            .map(|v| v.parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("line {}: {}", number + 1, e))?;
        if channels.len() != 3 {
            return Err(format!(
                "line {}: expected 3 channels, found {}",
                number + 1,
                channels.len()
            ));
        }
        centroids.push([channels[0], channels[1], channels[2]]);
    }
    Ok(centroids)
}

fn format_palette(centroids: &[[u8; 3]]) -> String {
    let mut text = String::from("# r g b\n");
    for c in centroids {
        text.push_str(&format!("{} {} {}\n", c[0], c[1], c[2]));
    }
    text
}

/// Where the palette colorizer gets its centroid table from.
#[derive(Clone, Debug)]
pub struct PaletteModel {
    table: Option<PathBuf>,
}

impl PaletteModel {
    /// Use the stock table, touching nothing on disk.
    pub fn builtin() -> PaletteModel {
        PaletteModel { table: None }
    }

    /// Use the table in `directory`, writing the stock table there
    /// first if none is present.
    pub fn at(directory: &Path) -> Result<PaletteModel, IfsError> {
        let table = directory.join(PALETTE_FILE);
        let artifact_error = |e: std::io::Error| {
            IfsError::ModelArtifact(table.display().to_string(), e.to_string())
        };
        if !table.exists() {
            info!("writing colorization table to {}", table.display());
            fs::create_dir_all(directory).map_err(artifact_error)?;
            fs::write(&table, format_palette(&DEFAULT_CENTROIDS)).map_err(artifact_error)?;
        }
        Ok(PaletteModel { table: Some(table) })
    }

    /// The table file, if one is used.
    pub fn table(&self) -> Option<&Path> {
        self.table.as_ref().map(|p| p.as_path())
    }
}

impl ColorizerFactory for PaletteModel {
    fn load(&self) -> Result<Box<dyn Colorizer>, IfsError> {
        let table = match self.table {
            Some(ref table) => table,
            None => return Ok(Box::new(PaletteColorizer::builtin())),
        };
        let name = table.display().to_string();
        let text =
            fs::read_to_string(table).map_err(|e| IfsError::ModelArtifact(name.clone(), e.to_string()))?;
        let centroids = parse_palette(&text).map_err(|e| IfsError::ModelArtifact(name.clone(), e))?;
        let colorizer = PaletteColorizer::new(centroids).map_err(|e| IfsError::ModelArtifact(name, e))?;
        debug!("loaded {} centroids from {}", colorizer.centroids().len(), table.display());
        Ok(Box::new(colorizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mask() -> GrayImage {
        GrayImage::from_fn(16, 8, |x, y| {
            if (x + y) % 3 == 0 {
                *Luma::from_slice(&[127])
            } else {
                *Luma::from_slice(&[0])
            }
        })
    }

    #[test]
    fn colorize_keeps_background_black_and_ink_colored() {
        let mut rng = StdRng::seed_from_u64(2);
        let mask = mask();
        let color = PaletteColorizer::builtin().colorize(&mask, &mut rng).unwrap();
        assert_eq!(color.dimensions(), (16, 8));
        for (x, y, pixel) in color.enumerate_pixels() {
            let black = pixel.channels().iter().all(|&c| c == 0);
            assert_eq!(black, mask.get_pixel(x, y).channels()[0] == 0);
        }
    }

    #[test]
    fn palette_round_trips_through_text() {
        let text = format_palette(&DEFAULT_CENTROIDS);
        assert_eq!(parse_palette(&text).unwrap(), DEFAULT_CENTROIDS.to_vec());
    }

    #[test]
    fn palette_rejects_bad_lines() {
        assert!(parse_palette("1 2 3\n4 5\n").is_err());
        assert!(parse_palette("1 2 300\n").is_err());
        assert!(PaletteColorizer::new(vec![[1, 2, 3]]).is_err());
    }

    #[test]
    fn model_directory_is_populated_once() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");
        let model = PaletteModel::at(&model_dir).unwrap();
        let table = model.table().unwrap().to_path_buf();
        assert!(table.exists());

        fs::write(&table, "0 0 255\n255 0 0\n").unwrap();
        PaletteModel::at(&model_dir).unwrap();
        assert_eq!(fs::read_to_string(&table).unwrap(), "0 0 255\n255 0 0\n");
        assert!(model.load().is_ok());
    }

    #[test]
    fn corrupt_table_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PALETTE_FILE), "not a palette\n").unwrap();
        let model = PaletteModel::at(dir.path()).unwrap();
        match model.load() {
            Err(IfsError::ModelArtifact(_, _)) => {}
            Err(e) => panic!("unexpected {}", e),
            Ok(_) => panic!("corrupt table loaded"),
        }
    }
}
