//! pixbench-pipeline: the five-step image filter workload (sans-IO).
//!
//! Transforms one color image into one edge-magnitude image through:
//! brightness shift -> Gaussian blur -> sharpen -> grayscale -> Sobel.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and byte slices. Reading inputs, writing outputs and running
//! the pipeline across workers all live in `pixbench-pool`.

pub mod blur;
pub mod brightness;
pub mod convolve;
pub mod edge;
pub mod grayscale;
pub mod sharpen;
pub mod transform;
pub mod types;

pub use transform::{FilterPipeline, ImageTransform};
pub use types::{
    DEFAULT_BRIGHTNESS, GrayImage, PipelineConfig, PipelineError, RgbImage, SharpenKernel,
    StagedResult,
};

/// Run the full filter pipeline on a decoded RGB image.
///
/// # Pipeline steps
///
/// 1. HSV brightness shift by `config.brightness`
/// 2. 3×3 Gaussian blur
/// 3. 3×3 sharpen (`config.sharpen`)
/// 4. Luma grayscale
/// 5. Sobel magnitude, min-max normalized
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] if the image has no pixels.
pub fn process(image: &RgbImage, config: &PipelineConfig) -> Result<GrayImage, PipelineError> {
    ensure_not_empty(image)?;
    let brightened = brightness::adjust_brightness(image, config.brightness);
    let blurred = blur::gaussian_blur_3x3(&brightened);
    let sharpened = sharpen::sharpen(&blurred, config.sharpen);
    let gray = grayscale::to_grayscale(&sharpened);
    Ok(edge::sobel_magnitude(&gray))
}

/// Run the pipeline and keep every intermediate stage.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] if the image has no pixels.
pub fn process_staged(
    image: RgbImage,
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    ensure_not_empty(&image)?;
    let brightened = brightness::adjust_brightness(&image, config.brightness);
    let blurred = blur::gaussian_blur_3x3(&brightened);
    let sharpened = sharpen::sharpen(&blurred, config.sharpen);
    let grayscale = grayscale::to_grayscale(&sharpened);
    let edges = edge::sobel_magnitude(&grayscale);
    Ok(StagedResult {
        original: image,
        brightened,
        blurred,
        sharpened,
        grayscale,
        edges,
    })
}

/// Decode raw image bytes and run the full pipeline.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::EmptyImage`] if the decoded image has no pixels.
pub fn process_bytes(bytes: &[u8], config: &PipelineConfig) -> Result<GrayImage, PipelineError> {
    let rgb = grayscale::decode_rgb(bytes)?;
    process(&rgb, config)
}

fn ensure_not_empty(image: &RgbImage) -> Result<(), PipelineError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::EmptyImage { width, height });
    }
    Ok(())
}
