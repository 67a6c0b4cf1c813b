// src/analysis.rs - Per-leaf tissue classification and area accounting

use image::{Luma, Rgb, RgbImage, Rgba, RgbaImage};
use log::debug;

use crate::color::{to_hsv, HsvImage, TissueCategory};
use crate::config::Config;
use crate::errors::{LeafNecrosisError, Result};
use crate::image_utils::{count_pixels, crop, is_on, resize_nearest, Mask, MASK_ON};
use crate::morphology::remove_small_objects;
use crate::separation::{BoundingBox, LeafRegion};

/// Pixel areas and percentages for one leaf
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafMetrics {
    pub leaf_area_px: u64,
    pub healthy_area_px: u64,
    pub necrosis_area_px: u64,
    pub chlorosis_area_px: u64,
    pub percent_healthy: f64,
    pub percent_necrosis: f64,
    pub percent_chlorosis: f64,
}

impl LeafMetrics {
    /// Derive healthy area and percentages from raw pixel counts.
    ///
    /// Percentages are rounded to two decimals and are 0 for an empty leaf.
    pub fn from_areas(leaf_area_px: u64, necrosis_area_px: u64, chlorosis_area_px: u64) -> Self {
        let healthy_area_px = leaf_area_px.saturating_sub(necrosis_area_px + chlorosis_area_px);

        Self {
            leaf_area_px,
            healthy_area_px,
            necrosis_area_px,
            chlorosis_area_px,
            percent_healthy: percent_of(healthy_area_px, leaf_area_px),
            percent_necrosis: percent_of(necrosis_area_px, leaf_area_px),
            percent_chlorosis: percent_of(chlorosis_area_px, leaf_area_px),
        }
    }
}

fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_half_even_2dp(part as f64 / whole as f64 * 100.0)
}

/// Round a non-negative value to two decimals, ties to even.
///
/// Ties are judged on the exact binary value, not on its decimal
/// rendering, so 3.125 becomes 3.12 while 0.125000001 becomes 0.13.
fn round_half_even_2dp(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return value;
    }

    // value == mantissa * 2^exponent exactly
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    if exponent >= 0 {
        return value;
    }

    let shift = (-exponent) as u32;
    if shift > 120 {
        return 0.0;
    }

    let scaled = u128::from(mantissa) * 100;
    let mut hundredths = scaled >> shift;
    let remainder = scaled - (hundredths << shift);
    let half = 1u128 << (shift - 1);
    if remainder > half || (remainder == half && hundredths % 2 == 1) {
        hundredths += 1;
    }

    hundredths as f64 / 100.0
}

/// Everything computed for one leaf
#[derive(Debug, Clone)]
pub struct LeafAnalysis {
    pub metrics: LeafMetrics,
    /// Leaf pixels in their own color, lesions painted, background transparent
    pub overlay: RgbaImage,
    pub necrosis_mask: Mask,
    pub chlorosis_mask: Mask,
}

/// HSV pixels matching a cropped leaf image.
///
/// Slices the frame-wide HSV image when one is supplied, resampling the
/// slice if its size disagrees with the crop; otherwise converts the crop.
fn leaf_hsv(leaf_image: &RgbImage, frame_hsv: Option<(&HsvImage, &BoundingBox)>) -> Result<HsvImage> {
    let Some((hsv, bbox)) = frame_hsv else {
        return Ok(to_hsv(leaf_image));
    };

    if !bbox.fits_within(hsv.width(), hsv.height()) {
        return Err(LeafNecrosisError::DimensionMismatch {
            image: (bbox.max_col, bbox.max_row),
            mask: hsv.dimensions(),
        });
    }

    let slice = crop(hsv, bbox.min_col, bbox.min_row, bbox.width(), bbox.height());
    if slice.dimensions() == leaf_image.dimensions() {
        return Ok(slice);
    }

    let (width, height) = leaf_image.dimensions();
    debug!(
        "Resampling HSV slice from {:?} to {}x{}",
        slice.dimensions(),
        width,
        height
    );
    Ok(resize_nearest(&slice, width, height))
}

/// Analyze a single leaf for necrosis and chlorosis.
///
/// `frame_hsv` carries the frame-wide HSV image and this leaf's bounding box
/// so HSV is not recomputed per leaf; pass `None` to convert the crop.
///
/// Each leaf pixel gets exactly one category (necrosis before chlorosis
/// before healthy). Lesion masks are then stripped of blobs smaller than
/// `min_necrosis_size`; pixels dropped that way count as healthy.
pub fn analyze_leaf(
    leaf_image: &RgbImage,
    leaf_mask: &Mask,
    frame_hsv: Option<(&HsvImage, &BoundingBox)>,
    config: &Config,
) -> Result<LeafAnalysis> {
    if leaf_image.dimensions() != leaf_mask.dimensions() {
        return Err(LeafNecrosisError::DimensionMismatch {
            image: leaf_image.dimensions(),
            mask: leaf_mask.dimensions(),
        });
    }

    let mut hsv = leaf_hsv(leaf_image, frame_hsv)?;

    // Zero everything outside the leaf silhouette
    for (hsv_pixel, mask_pixel) in hsv.pixels_mut().zip(leaf_mask.pixels()) {
        if !is_on(mask_pixel) {
            *hsv_pixel = Rgb([0, 0, 0]);
        }
    }

    let bands = config.tissue_bands();
    let (width, height) = leaf_image.dimensions();
    let mut necrosis_mask = Mask::new(width, height);
    let mut chlorosis_mask = Mask::new(width, height);

    for (((hsv_pixel, mask_pixel), necrosis), chlorosis) in hsv
        .pixels()
        .zip(leaf_mask.pixels())
        .zip(necrosis_mask.pixels_mut())
        .zip(chlorosis_mask.pixels_mut())
    {
        if !is_on(mask_pixel) {
            continue;
        }
        match bands.classify(hsv_pixel.0) {
            TissueCategory::Necrosis => *necrosis = Luma([MASK_ON]),
            TissueCategory::Chlorosis => *chlorosis = Luma([MASK_ON]),
            TissueCategory::Healthy | TissueCategory::Background => {}
        }
    }

    let necrosis_mask = remove_small_objects(&necrosis_mask, config.min_necrosis_size);
    let chlorosis_mask = remove_small_objects(&chlorosis_mask, config.min_necrosis_size);

    let metrics = LeafMetrics::from_areas(
        count_pixels(leaf_mask),
        count_pixels(&necrosis_mask),
        count_pixels(&chlorosis_mask),
    );

    let overlay = build_overlay(leaf_image, leaf_mask, &necrosis_mask, &chlorosis_mask, config);

    Ok(LeafAnalysis {
        metrics,
        overlay,
        necrosis_mask,
        chlorosis_mask,
    })
}

/// Analyze a region produced by the leaf separator
pub fn analyze_region(region: &LeafRegion, frame_hsv: &HsvImage, config: &Config) -> Result<LeafAnalysis> {
    analyze_leaf(&region.image, &region.mask, Some((frame_hsv, &region.bbox)), config)
}

/// Paint lesions over the leaf; outside the leaf is fully transparent.
///
/// Chlorosis is painted after necrosis, so it would win on a shared pixel.
fn build_overlay(
    leaf_image: &RgbImage,
    leaf_mask: &Mask,
    necrosis_mask: &Mask,
    chlorosis_mask: &Mask,
    config: &Config,
) -> RgbaImage {
    let (width, height) = leaf_image.dimensions();
    let mut overlay = RgbaImage::new(width, height);

    for (x, y, out) in overlay.enumerate_pixels_mut() {
        if !is_on(leaf_mask.get_pixel(x, y)) {
            *out = Rgba([0, 0, 0, 0]);
            continue;
        }

        let [r, g, b] = leaf_image.get_pixel(x, y).0;
        *out = Rgba([r, g, b, 255]);

        if is_on(necrosis_mask.get_pixel(x, y)) {
            *out = Rgba(config.necrosis_color_rgba);
        }
        if is_on(chlorosis_mask.get_pixel(x, y)) {
            *out = Rgba(config.chlorosis_color_rgba);
        }
    }

    overlay
}
