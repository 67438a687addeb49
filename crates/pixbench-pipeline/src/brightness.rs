//! HSV brightness shift.
//!
//! Step 1 of the pipeline. Adds a constant to the HSV value channel while
//! holding hue and saturation fixed. Since `V = max(R, G, B)` and hue and
//! saturation depend only on channel ratios, the shift is a per-pixel
//! rescale of all three channels by `V' / V`, which avoids a round trip
//! through a quantized HSV representation.

use image::{Rgb, RgbImage};

use crate::convolve::saturate;

/// Raise the HSV value of every pixel by `amount`, saturating at 255.
///
/// Pure black pixels have no hue, so they become the gray
/// `(amount, amount, amount)`. Pixels already at full value are unchanged.
#[must_use = "returns the brightened image"]
pub fn adjust_brightness(image: &RgbImage, amount: u8) -> RgbImage {
    if amount == 0 {
        return image.clone();
    }

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = shift_value(*pixel, amount);
    }
    out
}

fn shift_value(pixel: Rgb<u8>, amount: u8) -> Rgb<u8> {
    let value = pixel.0.into_iter().max().unwrap_or(0);
    let shifted = value.saturating_add(amount);
    if value == 0 {
        return Rgb([shifted; 3]);
    }
    let scale = f64::from(shifted) / f64::from(value);
    Rgb(pixel.0.map(|c| saturate(f64::from(c) * scale)))
}
