// src/color.rs - HSV conversion and tissue color classification

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::map::map_colors;

use crate::image_utils::{Mask, MASK_OFF, MASK_ON};

/// An image whose three channels hold hue, saturation and value.
///
/// Hue follows the 8-bit convention of `[0, 179]` (degrees halved),
/// saturation and value span `[0, 255]`.
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Inclusive lower/upper bounds on each HSV channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Check whether every channel of `hsv` lies within the bounds
    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

/// Per-pixel tissue class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TissueCategory {
    Healthy,
    Necrosis,
    Chlorosis,
    Background,
}

/// Hue bands used to build the whole-leaf mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafBands {
    pub green: HsvRange,
    pub yellow: HsvRange,
    pub brown: HsvRange,
    pub background: HsvRange,
}

/// Hue bands used to classify tissue inside a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TissueBands {
    pub necrosis: HsvRange,
    pub chlorosis: HsvRange,
    pub background: HsvRange,
}

impl TissueBands {
    /// Assign exactly one category to a pixel.
    ///
    /// Priority is necrosis, then chlorosis, then background, falling back
    /// to healthy. The necrosis and chlorosis bands share their boundary
    /// hue, so the order decides which one owns it.
    pub fn classify(&self, hsv: [u8; 3]) -> TissueCategory {
        if self.necrosis.contains(hsv) {
            TissueCategory::Necrosis
        } else if self.chlorosis.contains(hsv) {
            TissueCategory::Chlorosis
        } else if self.background.contains(hsv) {
            TissueCategory::Background
        } else {
            TissueCategory::Healthy
        }
    }
}

/// Convert one RGB pixel to 8-bit HSV.
///
/// Hue and saturation are rounded half-up in integer arithmetic, which
/// reproduces the usual 8-bit HSV tables exactly.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(i32::from);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = if v == 0 {
        0
    } else {
        (diff * 510 + v).div_euclid(2 * v)
    };

    let h = if diff == 0 {
        0
    } else {
        let raw = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let h = (raw * 60 + diff).div_euclid(2 * diff);
        if h < 0 { h + 180 } else { h }
    };

    [h.clamp(0, 179) as u8, s.clamp(0, 255) as u8, v as u8]
}

/// Convert a whole RGB image to HSV
pub fn to_hsv(image: &RgbImage) -> HsvImage {
    map_colors(image, |p| Rgb(rgb_to_hsv(p.0)))
}

/// Binary mask of pixels whose HSV value lies within `range` (inclusive)
pub fn in_range(hsv: &HsvImage, range: &HsvRange) -> Mask {
    map_colors(hsv, |p| {
        Luma([if range.contains(p.0) { MASK_ON } else { MASK_OFF }])
    })
}
