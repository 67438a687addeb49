//! Gaussian blur for noise reduction before sharpening.
//!
//! Step 2 of the pipeline. Uses the fixed binomial 3×3 kernel
//! `[1 2 1; 2 4 2; 1 2 1] / 16`, the discrete Gaussian a 3×3 window
//! yields when sigma is derived from the window size. The kernel is
//! applied per channel with zero padding via [`convolve3x3`].

use image::RgbImage;

use crate::convolve::convolve3x3;

const KERNEL: [[i32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];
const DIVISOR: i32 = 16;

/// Apply the 3×3 Gaussian blur to every channel of an RGB image.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_3x3(image: &RgbImage) -> RgbImage {
    convolve3x3(image, &KERNEL, DIVISOR)
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    /// 10x10 image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> RgbImage {
        RgbImage::from_fn(10, 10, |x, _y| {
            if x < 5 { Rgb([0; 3]) } else { Rgb([255; 3]) }
        })
    }

    #[test]
    fn kernel_weights_sum_to_divisor() {
        let sum: i32 = KERNEL.iter().flatten().sum();
        assert_eq!(sum, DIVISOR);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = RgbImage::new(17, 31);
        let blurred = gaussian_blur_3x3(&img);
        assert_eq!(blurred.dimensions(), (17, 31));
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = gaussian_blur_3x3(&sharp_edge_image());

        // Row 5 is interior, so only the horizontal neighbours matter:
        // left of edge = 255 * 4 / 16, right of edge = 255 * 12 / 16.
        assert_eq!(blurred.get_pixel(4, 5).0, [64; 3]);
        assert_eq!(blurred.get_pixel(5, 5).0, [191; 3]);
    }

    #[test]
    fn interior_of_uniform_image_unchanged() {
        let img = RgbImage::from_pixel(6, 6, Rgb([100, 150, 200]));
        let blurred = gaussian_blur_3x3(&img);
        assert_eq!(blurred.get_pixel(2, 3).0, [100, 150, 200]);
    }

    #[test]
    fn corners_darken_from_zero_padding() {
        let img = RgbImage::from_pixel(6, 6, Rgb([160; 3]));
        let blurred = gaussian_blur_3x3(&img);
        // Corner keeps weights 4 + 2 + 2 + 1 = 9 of 16.
        assert_eq!(blurred.get_pixel(0, 0).0, [90; 3]);
    }
}
