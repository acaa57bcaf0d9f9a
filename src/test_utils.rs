//! Helpers for tests that need frames and trap files on disk.

use std::path::{Path, PathBuf};

use image::GrayImage;

/// Write a `(height, width)` grayscale PNG filled with `value`.
pub fn write_frame(dir: &Path, name: &str, (height, width): (usize, usize), value: u8) -> PathBuf {
    let path = dir.join(name);
    GrayImage::from_pixel(width as u32, height as u32, image::Luma([value]))
        .save(&path)
        .unwrap();
    path
}

/// Write a grayscale PNG whose pixel `(row, col)` holds `f(row, col)`.
pub fn write_frame_with(
    dir: &Path,
    name: &str,
    (height, width): (usize, usize),
    f: impl Fn(usize, usize) -> u8,
) -> PathBuf {
    let path = dir.join(name);
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        image::Luma([f(y as usize, x as usize)])
    })
    .save(&path)
    .unwrap();
    path
}

/// Create an empty file.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

/// Write `trap_positions.json` with the given contents.
pub fn write_trap_file(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("trap_positions.json");
    std::fs::write(&path, json).unwrap();
    path
}
