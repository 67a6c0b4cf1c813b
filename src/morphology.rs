// src/morphology.rs - Binary morphology and size-based mask cleanup

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};
use rayon::prelude::*;

use crate::errors::{LeafNecrosisError, Result};
use crate::image_utils::{create_elliptical_kernel, in_bounds, mask_invert, Mask, MASK_OFF, MASK_ON};

#[derive(Clone, Copy)]
enum Operation {
    Erode,
    Dilate,
}

/// Shared erosion/dilation kernel walk.
///
/// Neighbours outside the image are ignored, so the image border neither
/// erodes nor dilates the mask.
fn apply_kernel(mask: &Mask, kernel: &[(i32, i32)], operation: Operation) -> Mask {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 || kernel.is_empty() {
        return mask.clone();
    }

    let src = mask.as_raw();
    let row_len = width as usize;
    let mut result = Mask::new(width, height);

    result
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut neighbours = kernel.iter().filter_map(|&(dx, dy)| {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    in_bounds(nx, ny, width, height)
                        .then(|| src[ny as usize * row_len + nx as usize] != MASK_OFF)
                });

                let on = match operation {
                    Operation::Erode => neighbours.all(|v| v),
                    Operation::Dilate => neighbours.any(|v| v),
                };
                *out = if on { MASK_ON } else { MASK_OFF };
            }
        });

    result
}

fn erode(mask: &Mask, kernel: &[(i32, i32)]) -> Mask {
    apply_kernel(mask, kernel, Operation::Erode)
}

fn dilate(mask: &Mask, kernel: &[(i32, i32)]) -> Mask {
    apply_kernel(mask, kernel, Operation::Dilate)
}

fn structuring_element(kernel_size: u32) -> Result<Vec<(i32, i32)>> {
    if kernel_size == 0 {
        return Err(LeafNecrosisError::Config(
            "Kernel size must be greater than 0".to_string(),
        ));
    }
    Ok(create_elliptical_kernel(kernel_size))
}

/// Apply morphological closing (dilation followed by erosion)
pub fn apply_closing(mask: &Mask, kernel_size: u32) -> Result<Mask> {
    let kernel = structuring_element(kernel_size)?;
    Ok(erode(&dilate(mask, &kernel), &kernel))
}

/// Apply morphological opening (erosion followed by dilation)
pub fn apply_opening(mask: &Mask, kernel_size: u32) -> Result<Mask> {
    let kernel = structuring_element(kernel_size)?;
    Ok(dilate(&erode(mask, &kernel), &kernel))
}

/// Remove connected components with fewer than `min_size` pixels.
///
/// Components are 4-connected.
pub fn remove_small_objects(mask: &Mask, min_size: u32) -> Mask {
    let labels = connected_components(mask, Connectivity::Four, Luma([MASK_OFF]));

    let mut sizes: Vec<u32> = Vec::new();
    for label in labels.pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if sizes.len() <= label {
            sizes.resize(label + 1, 0);
        }
        sizes[label] += 1;
    }

    let mut result = Mask::new(mask.width(), mask.height());
    for (out, label) in result.pixels_mut().zip(labels.pixels()) {
        let label = label[0] as usize;
        if label != 0 && sizes[label] >= min_size {
            *out = Luma([MASK_ON]);
        }
    }
    result
}

/// Fill enclosed background regions smaller than `area_threshold` pixels.
///
/// A "hole" is any 4-connected component of unset pixels, including ones
/// that touch the image border.
pub fn remove_small_holes(mask: &Mask, area_threshold: u32) -> Mask {
    let background = remove_small_objects(&mask_invert(mask), area_threshold);
    mask_invert(&background)
}
