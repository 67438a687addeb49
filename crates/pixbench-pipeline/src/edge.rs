//! Sobel edge magnitude.
//!
//! Step 5 of the pipeline. Computes horizontal and vertical Sobel
//! gradients with [`imageproc::filter::filter_clamped`], combines them
//! into a per-pixel magnitude, and min-max normalizes the magnitudes into
//! the full `0..=255` range.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

use crate::convolve::saturate;

/// Sobel gradient magnitude, normalized to `0..=255`.
///
/// The smallest magnitude in the image maps to 0 and the largest to 255.
/// An image whose magnitudes are all equal (including any flat image)
/// maps to all zeros.
#[must_use = "returns the edge magnitude image"]
pub fn sobel_magnitude(image: &GrayImage) -> GrayImage {
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);

    let magnitudes: Vec<f64> = gx
        .iter()
        .zip(gy.iter())
        .map(|(&h, &v)| f64::from(h).hypot(f64::from(v)))
        .collect();

    let (min, max) = magnitudes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| {
            (lo.min(m), hi.max(m))
        });
    let range = max - min;

    let mut out = GrayImage::new(image.width(), image.height());
    if range > 0.0 {
        for (pixel, &m) in out.pixels_mut().zip(magnitudes.iter()) {
            *pixel = Luma([saturate((m - min) / range * 255.0)]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 { Luma([0]) } else { Luma([255]) }
        })
    }

    #[test]
    fn flat_image_normalizes_to_zero() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        let edges = sobel_magnitude(&img);
        assert_eq!(edges.dimensions(), (20, 20));
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn boundary_is_brightest_and_background_darkest() {
        let edges = sobel_magnitude(&sharp_edge_image());
        assert_eq!(edges.get_pixel(9, 10).0[0], 255);
        assert_eq!(edges.get_pixel(10, 10).0[0], 255);
        assert_eq!(edges.get_pixel(2, 10).0[0], 0);
        assert_eq!(edges.get_pixel(17, 10).0[0], 0);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn output_spans_full_range_when_gradients_vary() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([((x * y) % 256) as u8]));
        let edges = sobel_magnitude(&img);
        let min = edges.pixels().map(|p| p.0[0]).min();
        let max = edges.pixels().map(|p| p.0[0]).max();
        assert_eq!(min, Some(0));
        assert_eq!(max, Some(255));
    }

    #[test]
    fn horizontal_boundary_is_detected() {
        let img = GrayImage::from_fn(20, 20, |_x, y| if y < 10 { Luma([0]) } else { Luma([200]) });
        let edges = sobel_magnitude(&img);
        assert_eq!(edges.get_pixel(10, 9).0[0], 255);
        assert_eq!(edges.get_pixel(10, 1).0[0], 0);
    }
}
