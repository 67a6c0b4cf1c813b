// src/temperature.rs - Warm/cool color temperature adjustment

use std::fs;
use std::path::Path;
use image::RgbImage;
use imageproc::map::map_colors;
use log::{error, info};

use crate::errors::{LeafNecrosisError, Result};
use crate::image_io::{get_image_files_in_dir, load_image};

/// Extensions picked up by the temperature batch (lowercase)
pub const TEMPERATURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif"];

/// Shift the white balance of an image.
///
/// Red is multiplied by `factor` and blue divided by it, both clamped to
/// `[0, 255]`; `factor > 1` warms, `factor < 1` cools.
pub fn adjust_temperature(image: &RgbImage, factor: f32) -> Result<RgbImage> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(LeafNecrosisError::Config(format!(
            "temperature factor must be a positive number (got {})", factor
        )));
    }

    Ok(map_colors(image, |mut pixel| {
        pixel[0] = (f32::from(pixel[0]) * factor).clamp(0.0, 255.0) as u8;
        pixel[2] = (f32::from(pixel[2]) / factor).clamp(0.0, 255.0) as u8;
        pixel
    }))
}

/// Adjust every image in `input_dir`, writing same-named files to `output_dir`.
///
/// Returns the number of images written. Files that fail are logged and skipped.
pub fn process_temperature_dir<P: AsRef<Path>, Q: AsRef<Path>>(
    input_dir: P,
    output_dir: Q,
    factor: f32,
) -> Result<usize> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let files = get_image_files_in_dir(input_dir.as_ref(), TEMPERATURE_EXTENSIONS)?;
    info!(
        "Adjusting {} images from {} with temperature factor {}",
        files.len(),
        input_dir.as_ref().display(),
        factor
    );

    let mut written = 0;
    for path in &files {
        let result = load_image(path).and_then(|input| {
            let adjusted = adjust_temperature(&input.image, factor)?;
            let file_name = path
                .file_name()
                .ok_or_else(|| LeafNecrosisError::InvalidPath(path.clone()))?;
            adjusted.save(output_dir.join(file_name))?;
            Ok(())
        });

        match result {
            Ok(()) => written += 1,
            Err(e) => error!("Failed to adjust {}: {}", path.display(), e),
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_cooling_lowers_red_and_raises_blue() {
        let image = RgbImage::from_pixel(2, 2, Rgb([200, 100, 90]));
        let cooled = adjust_temperature(&image, 0.5).unwrap();
        assert_eq!(cooled.get_pixel(0, 0).0, [100, 100, 180]);
    }

    #[test]
    fn test_warming_clamps() {
        let image = RgbImage::from_pixel(1, 1, Rgb([250, 10, 200]));
        let warmed = adjust_temperature(&image, 1.5).unwrap();
        assert_eq!(warmed.get_pixel(0, 0).0, [255, 10, 133]);
    }

    #[test]
    fn test_invalid_factor() {
        let image = RgbImage::new(1, 1);
        assert!(adjust_temperature(&image, 0.0).is_err());
        assert!(adjust_temperature(&image, -1.0).is_err());
        assert!(adjust_temperature(&image, f32::NAN).is_err());
    }

    #[test]
    fn test_directory_batch_skips_broken_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]))
            .save(input.path().join("good.png"))
            .unwrap();
        fs::write(input.path().join("broken.jpg"), b"garbage").unwrap();

        let written = process_temperature_dir(input.path(), output.path(), 1.2).unwrap();
        assert_eq!(written, 1);
        assert!(output.path().join("good.png").exists());
        assert!(!output.path().join("broken.jpg").exists());
    }
}
