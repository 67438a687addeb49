//! Filesystem glue: discovering inputs, reading them, writing outputs.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::InputError;

/// File extensions treated as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Whether `path` has one of the [`IMAGE_EXTENSIONS`].
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// List image files in `dir`, sorted by file name, truncated at `limit`.
///
/// Only regular files (following symlinks) with an image extension are
/// returned. Paths that are not valid UTF-8 are skipped with a warning:
/// workers receive tasks as JSON, which cannot carry them. Sorting makes the listing stable across runs, so a larger
/// `limit` always yields a superset prefix of a smaller one.
///
/// # Errors
///
/// Returns [`InputError::MissingDirectory`] if `dir` is not a directory.
/// Returns [`InputError::ReadDir`] if listing fails.
pub fn list_images(dir: &Path, limit: Option<usize>) -> Result<Vec<PathBuf>, InputError> {
    if !dir.is_dir() {
        return Err(InputError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    let read_err = |source| InputError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() || !is_image_path(&path) {
            continue;
        }
        if path.to_str().is_none() {
            tracing::warn!(path = %path.display(), "skipping image with a non-UTF-8 path");
            continue;
        }
        paths.push(path);
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if let Some(limit) = limit {
        paths.truncate(limit);
    }
    Ok(paths)
}

/// Read and decode one image file.
///
/// # Errors
///
/// Returns an [`image::ImageError`] if the file cannot be read or decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage, image::ImageError> {
    let bytes = std::fs::read(path)?;
    image::load_from_memory(&bytes)
}

/// Encode `image` to `path`, creating the parent directory if needed.
///
/// The format follows the file extension.
///
/// # Errors
///
/// Returns an [`image::ImageError`] if the directory cannot be created or
/// the image cannot be encoded or written.
pub fn save_image(image: &DynamicImage, path: &Path) -> Result<(), image::ImageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    image.save(path)
}
