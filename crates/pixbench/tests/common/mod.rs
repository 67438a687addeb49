//! Fixtures shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

/// The binary under test; process pools launch it as their worker.
pub const PIXBENCH: &str = env!("CARGO_BIN_EXE_pixbench");

/// Write a `size`×`size` gradient PNG.
pub fn write_png(path: &Path, size: u32, seed: u8) {
    let img = RgbImage::from_fn(size, size, |x, y| {
        let r = u8::try_from((x * 255) / size.max(1)).unwrap_or(255);
        let g = u8::try_from((y * 255) / size.max(1)).unwrap_or(255);
        Rgb([r, g, seed])
    });
    img.save(path).unwrap();
}

/// A directory of `count` valid PNGs named `img_000.png` onwards.
pub fn image_dir(count: usize, size: u32) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..count {
        let seed = u8::try_from(i % 256).unwrap();
        write_png(&tmp.path().join(format!("img_{i:03}.png")), size, seed);
    }
    tmp
}

/// Overwrite `name` in `dir` with bytes no decoder accepts.
pub fn corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not a png").unwrap();
    path
}
