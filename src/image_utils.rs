use image::{imageops, GrayImage, ImageBuffer, Luma, Pixel};
use imageproc::map::{map_colors, map_colors2};

/// Binary mask: `MASK_ON` marks a member pixel, `MASK_OFF` everything else
pub type Mask = GrayImage;

/// Constants
pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// Check if a mask pixel is set
#[inline]
pub fn is_on(pixel: &Luma<u8>) -> bool {
    pixel[0] != MASK_OFF
}

#[inline]
fn to_mask_value(on: bool) -> Luma<u8> {
    Luma([if on { MASK_ON } else { MASK_OFF }])
}

/// Number of set pixels in a mask
pub fn count_pixels(mask: &Mask) -> u64 {
    mask.as_raw().iter().filter(|&&v| v != MASK_OFF).count() as u64
}

/// Pixel-wise OR of two same-sized masks
pub fn mask_union(a: &Mask, b: &Mask) -> Mask {
    map_colors2(a, b, |p, q| to_mask_value(is_on(&p) || is_on(&q)))
}

/// Pixel-wise NOT of a mask
pub fn mask_invert(mask: &Mask) -> Mask {
    map_colors(mask, |p| to_mask_value(!is_on(&p)))
}

/// Copy the `width` x `height` window starting at (`x`, `y`)
pub fn crop<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>, x: u32, y: u32, width: u32, height: u32) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    imageops::crop_imm(image, x, y, width, height).to_image()
}

/// Resize an image to the specified dimensions using nearest-neighbour sampling.
///
/// Nearest sampling keeps every output value one of the input values,
/// which matters for hue where averaging across the wrap point is meaningless.
pub fn resize_nearest<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>, width: u32, height: u32) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    imageops::resize(image, width, height, imageops::FilterType::Nearest)
}

/// Offsets (dx, dy) of an elliptical structuring element of the given diameter.
///
/// Row half-widths are `round(c * sqrt(1 - dy^2 / r^2))`, so a diameter of 5
/// yields a 5x5 square with the four corner pairs removed:
///
/// ```text
/// ..#..
/// #####
/// #####
/// #####
/// ..#..
/// ```
pub fn create_elliptical_kernel(diameter: u32) -> Vec<(i32, i32)> {
    if diameter == 0 {
        return Vec::new();
    }

    let r = (diameter / 2) as i32;
    let c = r as f64;
    let inv_r2 = if r > 0 { 1.0 / (c * c) } else { 0.0 };

    let mut offsets = Vec::new();
    for dy in -r..=r {
        let dx_max = if r > 0 {
            (c * ((c * c - (dy * dy) as f64) * inv_r2).max(0.0).sqrt()).round() as i32
        } else {
            0
        };
        for dx in -dx_max..=dx_max {
            offsets.push((dx, dy));
        }
    }
    offsets
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}
