//! Shared types for the pixbench filter pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// single-channel stages without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// color stages without depending on `image` directly.
pub use image::RgbImage;

/// Brightness added to the HSV value channel by default.
pub const DEFAULT_BRIGHTNESS: u8 = 60;

/// Selects the 3×3 sharpen kernel.
///
/// Both kernels sum to 1, so flat regions pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharpenKernel {
    /// Four-neighbour kernel `[0 -1 0; -1 5 -1; 0 -1 0]`.
    Mild,
    /// Eight-neighbour kernel `[-1 -1 -1; -1 9 -1; -1 -1 -1]`.
    #[default]
    Strong,
}

impl SharpenKernel {
    /// Integer weights in row-major order.
    #[must_use]
    pub const fn weights(self) -> [[i32; 3]; 3] {
        match self {
            Self::Mild => [[0, -1, 0], [-1, 5, -1], [0, -1, 0]],
            Self::Strong => [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]],
        }
    }
}

/// Configuration for the filter pipeline.
///
/// Serializable so the same configuration can be handed to worker
/// processes on their command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Amount added to the HSV value channel (saturating at 255).
    pub brightness: u8,

    /// Which sharpen kernel step 3 applies.
    pub sharpen: SharpenKernel,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            sharpen: SharpenKernel::default(),
        }
    }
}

/// Every intermediate stage of one pipeline run.
///
/// Produced by [`crate::process_staged`] for visual inspection of each
/// filter. [`StagedResult::edges`] equals the output of
/// [`crate::process`] for the same input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedResult {
    /// Decoded input, converted to 8-bit RGB.
    pub original: RgbImage,
    /// After the HSV brightness shift.
    pub brightened: RgbImage,
    /// After the 3×3 Gaussian blur.
    pub blurred: RgbImage,
    /// After the sharpen kernel.
    pub sharpened: RgbImage,
    /// Luma conversion of the sharpened image.
    pub grayscale: GrayImage,
    /// Normalized Sobel magnitude.
    pub edges: GrayImage,
}

impl StagedResult {
    /// Stage names paired with their images, in pipeline order.
    ///
    /// Color stages are returned as [`image::DynamicImage`] so callers can
    /// save every stage through one code path.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, image::DynamicImage); 6] {
        [
            ("original", self.original.clone().into()),
            ("brightened", self.brightened.clone().into()),
            ("blurred", self.blurred.clone().into()),
            ("sharpened", self.sharpened.clone().into()),
            ("grayscale", self.grayscale.clone().into()),
            ("edges", self.edges.clone().into()),
        ]
    }
}

/// Errors that can occur while decoding or transforming an image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image has a zero width or height.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_canonical_filters() {
        let config = PipelineConfig::default();
        assert_eq!(config.brightness, 60);
        assert_eq!(config.sharpen, SharpenKernel::Strong);
    }

    #[test]
    fn sharpen_kernels_sum_to_one() {
        for kernel in [SharpenKernel::Mild, SharpenKernel::Strong] {
            let sum: i32 = kernel.weights().iter().flatten().sum();
            assert_eq!(sum, 1, "{kernel:?}");
        }
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PipelineConfig {
            brightness: 12,
            sharpen: SharpenKernel::Mild,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"brightness":12,"sharpen":"mild"}"#);
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn empty_image_error_reports_dimensions() {
        let err = PipelineError::EmptyImage {
            width: 0,
            height: 7,
        };
        assert_eq!(err.to_string(), "image has no pixels (0x7)");
    }
}
