//! The pluggable per-item workload.
//!
//! Pools only see an [`ImageTransform`]; the five-step
//! [`FilterPipeline`] is the implementation every benchmark runs, and
//! tests substitute their own transforms to inject failures or delays.

use image::DynamicImage;

use crate::types::{PipelineConfig, PipelineError};

/// A pure image-to-image function shared across worker threads.
pub trait ImageTransform: Send + Sync {
    /// Transform one decoded image.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the image cannot be processed.
    fn transform(&self, image: &DynamicImage) -> Result<DynamicImage, PipelineError>;
}

/// The five-step filter chain: brightness, blur, sharpen, grayscale, edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterPipeline {
    config: PipelineConfig,
}

impl FilterPipeline {
    /// Create a pipeline with the given configuration.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The configuration this pipeline applies.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl ImageTransform for FilterPipeline {
    fn transform(&self, image: &DynamicImage) -> Result<DynamicImage, PipelineError> {
        let edges = crate::process(&image.to_rgb8(), &self.config)?;
        Ok(DynamicImage::ImageLuma8(edges))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn output_is_single_channel_with_same_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(9, 7, |x, _| {
            if x < 4 { Rgb([0, 0, 0]) } else { Rgb([200, 100, 50]) }
        }));
        let out = FilterPipeline::default().transform(&img).unwrap();
        assert_eq!((out.width(), out.height()), (9, 7));
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn empty_image_is_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        let result = FilterPipeline::default().transform(&img);
        assert!(matches!(
            result,
            Err(PipelineError::EmptyImage {
                width: 0,
                height: 5
            })
        ));
    }

    #[test]
    fn transform_is_usable_as_trait_object() {
        let transform: &dyn ImageTransform = &FilterPipeline::default();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([9, 9, 9])));
        assert!(transform.transform(&img).is_ok());
    }
}
