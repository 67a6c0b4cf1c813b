// src/separation.rs - Split a leaf mask into individual leaves

use image::{Luma, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use log::debug;

use crate::config::Config;
use crate::errors::{LeafNecrosisError, Result};
use crate::image_utils::{crop, Mask, MASK_OFF, MASK_ON};

/// Axis-aligned box in (row, column) order; the max edges are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

impl BoundingBox {
    #[inline]
    pub fn width(&self) -> u32 {
        self.max_col - self.min_col
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.max_row - self.min_row
    }

    /// Whether the box fits inside a `width` x `height` frame
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.min_col <= self.max_col
            && self.min_row <= self.max_row
            && self.max_col <= width
            && self.max_row <= height
    }
}

/// One leaf cut out of a frame
#[derive(Debug, Clone)]
pub struct LeafRegion {
    /// Label assigned by connected-component labelling
    pub label: u32,
    /// Pixel count of the component
    pub area: u64,
    pub bbox: BoundingBox,
    /// Frame pixels inside `bbox`
    pub image: RgbImage,
    /// This component only, cropped to `bbox`
    pub mask: Mask,
}

#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    area: u64,
    min_row: u32,
    min_col: u32,
    max_row: u32,
    max_col: u32,
}

impl ComponentStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            min_row: y,
            min_col: x,
            max_row: y,
            max_col: x,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_row = self.min_row.min(y);
        self.min_col = self.min_col.min(x);
        self.max_row = self.max_row.max(y);
        self.max_col = self.max_col.max(x);
    }

    fn bbox(&self) -> BoundingBox {
        BoundingBox {
            min_row: self.min_row,
            min_col: self.min_col,
            max_row: self.max_row + 1,
            max_col: self.max_col + 1,
        }
    }
}

/// Extract individual leaves from a frame using 8-connected components.
///
/// Components are returned in label order, i.e. by the raster position of
/// their first pixel. A component is dropped when its area is below
/// `min_leaf_size`, or its bounding box is narrower than `min_leaf_width`
/// or shorter than `min_leaf_height`. An empty result is not an error.
pub fn separate_leaves(image: &RgbImage, leaf_mask: &Mask, config: &Config) -> Result<Vec<LeafRegion>> {
    if image.dimensions() != leaf_mask.dimensions() {
        return Err(LeafNecrosisError::DimensionMismatch {
            image: image.dimensions(),
            mask: leaf_mask.dimensions(),
        });
    }

    let labels = connected_components(leaf_mask, Connectivity::Eight, Luma([MASK_OFF]));

    let mut components: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if components.len() <= label {
            components.resize(label + 1, None);
        }
        components[label]
            .get_or_insert_with(|| ComponentStats::new(x, y))
            .add(x, y);
    }

    let mut leaves = Vec::new();
    for (label, stats) in components.iter().enumerate() {
        let Some(stats) = stats else { continue };
        let bbox = stats.bbox();

        if stats.area < u64::from(config.min_leaf_size) {
            debug!("Dropping component {} with area {}", label, stats.area);
            continue;
        }
        if bbox.width() < config.min_leaf_width || bbox.height() < config.min_leaf_height {
            debug!(
                "Dropping component {} with bounding box {}x{}",
                label,
                bbox.width(),
                bbox.height()
            );
            continue;
        }

        let label = label as u32;
        let mut mask = Mask::new(bbox.width(), bbox.height());
        for (x, y, out) in mask.enumerate_pixels_mut() {
            if labels.get_pixel(bbox.min_col + x, bbox.min_row + y)[0] == label {
                *out = Luma([MASK_ON]);
            }
        }

        leaves.push(LeafRegion {
            label,
            area: stats.area,
            bbox,
            image: crop(image, bbox.min_col, bbox.min_row, bbox.width(), bbox.height()),
            mask,
        });
    }

    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::to_hsv;
    use crate::image_utils::{count_pixels, is_on};
    use crate::mask::create_leaf_mask;
    use crate::test_support::{frame_with_leaf, paint_rect, BLUE, GREEN};
    use image::Rgb;

    fn regions_for(image: &RgbImage, config: &Config) -> Vec<LeafRegion> {
        let mask = create_leaf_mask(&to_hsv(image), config).unwrap();
        separate_leaves(image, &mask, config).unwrap()
    }

    #[test]
    fn test_single_rectangle_bbox() {
        let image = frame_with_leaf((400, 400), 50, 80, 200, 300);
        let regions = regions_for(&image, &Config::default());

        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(
            region.bbox,
            BoundingBox { min_row: 80, min_col: 50, max_row: 380, max_col: 250 }
        );
        assert_eq!(region.image.dimensions(), (200, 300));
        assert_eq!(region.mask.dimensions(), (200, 300));
        assert_eq!(count_pixels(&region.mask), region.area);
    }

    #[test]
    fn test_two_leaves_in_label_order() {
        let mut image = RgbImage::from_pixel(400, 300, Rgb(BLUE));
        paint_rect(&mut image, 220, 20, 80, 150, GREEN);
        paint_rect(&mut image, 30, 60, 90, 200, GREEN);

        let regions = regions_for(&image, &Config::default());
        assert_eq!(regions.len(), 2);
        // The first raster-order pixel belongs to the upper leaf
        assert_eq!(regions[0].bbox.min_row, 20);
        assert_eq!(regions[1].bbox.min_col, 30);
    }

    #[test]
    fn test_thin_and_short_components_filtered() {
        let config = Config::default();
        let mut image = RgbImage::from_pixel(400, 300, Rgb(BLUE));
        // Wide but too short: 300 x 40
        paint_rect(&mut image, 20, 10, 300, 40, GREEN);
        // Tall but too narrow: 30 x 200
        paint_rect(&mut image, 350, 80, 30, 200, GREEN);

        let regions = regions_for(&image, &config);
        assert!(regions.is_empty());
    }

    #[test]
    fn test_every_region_respects_minimums() {
        let config = Config::default();
        let mut image = RgbImage::from_pixel(500, 400, Rgb(BLUE));
        paint_rect(&mut image, 10, 10, 60, 120, GREEN);
        paint_rect(&mut image, 100, 10, 49, 200, GREEN);
        paint_rect(&mut image, 200, 10, 100, 99, GREEN);
        paint_rect(&mut image, 320, 150, 150, 200, GREEN);

        let regions = regions_for(&image, &config);
        assert_eq!(regions.len(), 2);
        for region in &regions {
            assert!(region.bbox.width() >= config.min_leaf_width);
            assert!(region.bbox.height() >= config.min_leaf_height);
            assert!(region.area >= u64::from(config.min_leaf_size));
        }
    }

    #[test]
    fn test_region_mask_excludes_neighbouring_leaf() {
        let mut image = RgbImage::from_pixel(300, 300, Rgb(BLUE));
        // L-shaped leaf whose bounding box overlaps a second leaf
        paint_rect(&mut image, 10, 10, 60, 200, GREEN);
        paint_rect(&mut image, 10, 210, 200, 60, GREEN);
        paint_rect(&mut image, 120, 20, 60, 150, GREEN);

        let regions = regions_for(&image, &Config::default());
        assert_eq!(regions.len(), 2);
        let l_shape = regions.iter().find(|r| r.bbox.min_col == 10).unwrap();
        // Pixel of the other leaf inside the L's box is not in its mask
        let (x, y) = (150 - l_shape.bbox.min_col, 100 - l_shape.bbox.min_row);
        assert!(!is_on(l_shape.mask.get_pixel(x, y)));
    }

    #[test]
    fn test_empty_mask_yields_no_regions() {
        let image = RgbImage::from_pixel(100, 100, Rgb(BLUE));
        let mask = Mask::new(100, 100);
        assert!(separate_leaves(&image, &mask, &Config::default()).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let image = RgbImage::new(10, 10);
        let mask = Mask::new(12, 10);
        assert!(matches!(
            separate_leaves(&image, &mask, &Config::default()),
            Err(LeafNecrosisError::DimensionMismatch { .. })
        ));
    }
}
