// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cosmetic augmentation of colored fractals: random flips, a small
//! rotation, a flat background color, and a blur.  Nothing is carried
//! between calls.

use image::{imageops, Pixel, RgbImage};
use rand::Rng;

use crate::colorize::rgb;

/// Mean colors of natural photographs, used to paint the background.
pub const BACKGROUNDS: [[u8; 3]; 12] = [
    [124, 116, 104],
    [117, 110, 95],
    [136, 127, 112],
    [98, 107, 88],
    [129, 132, 128],
    [104, 97, 90],
    [141, 137, 126],
    [112, 120, 129],
    [92, 88, 82],
    [150, 141, 121],
    [85, 96, 104],
    [121, 108, 89],
];

/// Largest rotation, in degrees, either way.
pub const MAX_ROTATION: f64 = 30.0;

/// Largest blur kernel size; kernel sizes are odd, from 1 up.
pub const MAX_KERNEL: usize = 15;

/// Rotates `image` about its center by `degrees`, nearest neighbour.
/// Pixels that come from outside the source are black.
pub fn rotate(image: &RgbImage, degrees: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let (sin, cos) = degrees.to_radians().sin_cos();
    RgbImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (f64::from(x) - cx, f64::from(y) - cy);
        let sx = (cos * dx - sin * dy + cx).round();
        let sy = (sin * dx + cos * dy + cy).round();
        if sx < 0.0 || sy < 0.0 || sx >= f64::from(width) || sy >= f64::from(height) {
            rgb([0, 0, 0])
        } else {
            *image.get_pixel(sx as u32, sy as u32)
        }
    })
}

/// Paints every pure black pixel with `color`.
pub fn fill_background(image: &mut RgbImage, color: [u8; 3]) {
    for pixel in image.pixels_mut() {
        if pixel.channels().iter().all(|&c| c == 0) {
            *pixel = rgb(color);
        }
    }
}

/// The Gaussian sigma that goes with an odd kernel size.
pub fn kernel_sigma(kernel: usize) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Flips, rotates, paints the background from `backgrounds` and
/// blurs.  An empty `backgrounds` leaves the background black.
pub fn augment<R: Rng + ?Sized>(image: RgbImage, backgrounds: &[[u8; 3]], rng: &mut R) -> RgbImage {
    let mut image = image;
    if rng.gen_bool(0.5) {
        image = imageops::flip_horizontal(&image);
    }
    if rng.gen_bool(0.5) {
        image = imageops::flip_vertical(&image);
    }

    let degrees = rng.gen_range(-MAX_ROTATION, MAX_ROTATION);
    let mut image = rotate(&image, degrees);

    if !backgrounds.is_empty() {
        let color = backgrounds[rng.gen_range(0, backgrounds.len())];
        fill_background(&mut image, color);
    }

    let kernel = 2 * rng.gen_range(0, (MAX_KERNEL + 1) / 2) + 1;
    if kernel > 1 {
        image = imageops::blur(&image, kernel_sigma(kernel));
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn checker() -> RgbImage {
        RgbImage::from_fn(20, 10, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                rgb([200, 10, 10])
            } else {
                rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn zero_rotation_is_identity() {
        let image = checker();
        assert_eq!(rotate(&image, 0.0).into_raw(), image.into_raw());
    }

    #[test]
    fn rotation_blackens_corners() {
        let image = RgbImage::from_fn(20, 20, |_, _| rgb([9, 9, 9]));
        let rotated = rotate(&image, 30.0);
        assert_eq!(*rotated.get_pixel(0, 0), rgb([0, 0, 0]));
        assert_eq!(*rotated.get_pixel(10, 10), rgb([9, 9, 9]));
    }

    #[test]
    fn background_replaces_only_black() {
        let mut image = checker();
        fill_background(&mut image, [1, 2, 3]);
        for pixel in image.pixels() {
            assert!(*pixel == rgb([200, 10, 10]) || *pixel == rgb([1, 2, 3]));
        }
    }

    #[test]
    fn sigma_follows_kernel_size() {
        assert!((kernel_sigma(3) - 0.8).abs() < 1e-6);
        assert!((kernel_sigma(15) - 2.6).abs() < 1e-6);
    }

    #[test]
    fn augment_keeps_dimensions() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            let out = augment(checker(), &BACKGROUNDS, &mut rng);
            assert_eq!(out.dimensions(), (20, 10));
        }
    }

    #[test]
    fn augment_is_reproducible() {
        let a = augment(checker(), &BACKGROUNDS, &mut StdRng::seed_from_u64(8));
        let b = augment(checker(), &BACKGROUNDS, &mut StdRng::seed_from_u64(8));
        assert_eq!(a.into_raw(), b.into_raw());
    }
}
