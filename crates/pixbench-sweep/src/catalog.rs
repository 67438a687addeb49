//! Cached view of the input directory.

use std::path::{Path, PathBuf};

use pixbench_pool::list_images;

use crate::error::SweepError;

/// The stably ordered image listing of one directory, read once.
///
/// Every sweep size is a prefix of the same listing, so a larger dataset
/// always contains the images of a smaller one.
#[derive(Debug, Clone)]
pub struct InputCatalog {
    images: Vec<PathBuf>,
}

impl InputCatalog {
    /// List `dir` once.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Input`] if the directory is missing or cannot
    /// be listed, and [`SweepError::NoImages`] if it holds no images.
    pub fn open(dir: &Path) -> Result<Self, SweepError> {
        let images = list_images(dir, None)?;
        if images.is_empty() {
            return Err(SweepError::NoImages {
                path: dir.to_path_buf(),
            });
        }
        tracing::debug!(dir = %dir.display(), images = images.len(), "input catalog opened");
        Ok(Self { images })
    }

    /// Number of images available; never zero.
    #[must_use]
    pub fn available(&self) -> usize {
        self.images.len()
    }

    /// The first `count` images, or all of them if fewer exist.
    #[must_use]
    pub fn prefix(&self, count: usize) -> &[PathBuf] {
        &self.images[..count.min(self.images.len())]
    }
}
