use std::path::{Path, PathBuf};
use std::fs;
use image::{ImageFormat, RgbImage, RgbaImage};

use crate::errors::{LeafNecrosisError, Result};

/// Extensions accepted for leaf photographs (lowercase)
pub const LEAF_IMAGE_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Check whether a path carries one of the given extensions (case-insensitive)
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

/// Get all image files with an allowed extension directly inside a directory.
///
/// The listing is not recursive and is sorted by path so batch runs are
/// deterministic. Other files are skipped silently.
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(LeafNecrosisError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(LeafNecrosisError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// File stem used to name outputs
pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| LeafNecrosisError::InvalidPath(path.to_path_buf()))
}

/// Load an image as 3-channel RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();
    let filename = file_stem(path)?;
    let image = image::open(path)?.to_rgb8();

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGBA image to the specified path
pub fn save_image<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Name of the overlay for one leaf; `leaf_index` is 1-based
pub fn leaf_overlay_filename(stem: &str, leaf_index: usize) -> String {
    format!("{}_leaf_{:02}_masked.png", stem, leaf_index)
}

/// Name of the overlay holding every leaf of a frame
pub fn combined_overlay_filename(stem: &str) -> String {
    format!("{}_all_leaves_masked.png", stem)
}
