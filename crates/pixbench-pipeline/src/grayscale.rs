//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an 8-bit
//! RGB image for the color stages. Step 4 of the pipeline collapses the
//! sharpened RGB image to a single luma channel.

use image::{GrayImage, Luma, RgbImage};

use crate::convolve::saturate;
use crate::types::PipelineError;

/// Decode raw image bytes into 8-bit RGB.
///
/// Grayscale sources are expanded to three equal channels and alpha is
/// dropped, so every later stage sees the same layout.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Convert RGB to grayscale with `0.299*R + 0.587*G + 0.114*B`, rounded.
///
/// `image::imageops::grayscale` uses Rec. 709 weights; the Rec. 601
/// weights here are the ones the edge step is calibrated against.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = 0.114_f64.mul_add(
            f64::from(b),
            0.299_f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
        );
        Luma([saturate(luma)])
    })
}
