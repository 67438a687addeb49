//! Sharpening by a fixed 3×3 kernel.
//!
//! Step 3 of the pipeline. Boosts the centre pixel against its
//! neighbours; the kernel weights are selected by [`SharpenKernel`].

use image::RgbImage;

use crate::convolve::convolve3x3;
use crate::types::SharpenKernel;

/// Sharpen every channel of an RGB image.
#[must_use = "returns the sharpened image"]
pub fn sharpen(image: &RgbImage, kernel: SharpenKernel) -> RgbImage {
    convolve3x3(image, &kernel.weights(), 1)
}
