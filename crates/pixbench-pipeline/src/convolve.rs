//! Zero-padded 3×3 convolution over 8-bit RGB images.
//!
//! `imageproc::filter::filter3x3` clamps at the border by repeating edge
//! pixels. The blur and sharpen steps treat out-of-bounds pixels as zero
//! instead, so the kernel is applied here directly.

use image::{Rgb, RgbImage};

/// Apply an integer 3×3 kernel to each channel independently.
///
/// Each output sample is `round(Σ wᵢ·pᵢ / divisor)` saturated to
/// `0..=255`. Neighbours outside the image contribute zero.
///
/// `divisor` must be non-zero; callers pass a compile-time constant.
#[must_use = "returns the filtered image"]
pub fn convolve3x3(image: &RgbImage, weights: &[[i32; 3]; 3], divisor: i32) -> RgbImage {
    let (width, height) = image.dimensions();
    let divisor = f64::from(divisor);

    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0_i32; 3];
        for (ky, row) in weights.iter().enumerate() {
            for (kx, &weight) in row.iter().enumerate() {
                if weight == 0 {
                    continue;
                }
                let Some(sample) = neighbour(image, x, y, kx, ky) else {
                    continue;
                };
                for (sum, &channel) in acc.iter_mut().zip(sample.0.iter()) {
                    *sum += weight * i32::from(channel);
                }
            }
        }
        Rgb(acc.map(|sum| saturate(f64::from(sum) / divisor)))
    })
}

/// Round and clamp a filtered sample into the `u8` range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn saturate(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Pixel at kernel offset `(kx, ky)` around `(x, y)`, or `None` when the
/// offset falls outside the image.
fn neighbour(image: &RgbImage, x: u32, y: u32, kx: usize, ky: usize) -> Option<&Rgb<u8>> {
    let nx = offset(x, kx)?;
    let ny = offset(y, ky)?;
    (nx < image.width() && ny < image.height()).then(|| image.get_pixel(nx, ny))
}

/// `coord + k - 1` for `k` in `0..3`, or `None` below zero.
const fn offset(coord: u32, k: usize) -> Option<u32> {
    match k {
        0 => coord.checked_sub(1),
        1 => Some(coord),
        _ => coord.checked_add(1),
    }
}
