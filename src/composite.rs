// src/composite.rs - Combine per-leaf overlays into one frame

use image::RgbaImage;

use crate::errors::{LeafNecrosisError, Result};
use crate::separation::BoundingBox;

/// Paint each leaf overlay back into a transparent frame.
///
/// Overlays are written in iteration order at their bounding box, but only
/// where the overlay's alpha is non-zero, so a leaf's transparent margin
/// never blanks a neighbour whose box overlaps it.
pub fn composite_leaves<'a, I>(width: u32, height: u32, overlays: I) -> Result<RgbaImage>
where
    I: IntoIterator<Item = (&'a BoundingBox, &'a RgbaImage)>,
{
    let mut combined = RgbaImage::new(width, height);

    for (bbox, overlay) in overlays {
        if !bbox.fits_within(width, height) || overlay.dimensions() != (bbox.width(), bbox.height()) {
            return Err(LeafNecrosisError::DimensionMismatch {
                image: (width, height),
                mask: overlay.dimensions(),
            });
        }

        for (x, y, pixel) in overlay.enumerate_pixels() {
            if pixel[3] > 0 {
                combined.put_pixel(bbox.min_col + x, bbox.min_row + y, *pixel);
            }
        }
    }

    Ok(combined)
}
