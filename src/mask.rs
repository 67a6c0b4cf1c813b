// src/mask.rs - Whole-frame leaf mask

use log::debug;

use crate::color::{in_range, HsvImage};
use crate::config::Config;
use crate::errors::Result;
use crate::image_utils::{count_pixels, mask_invert, mask_union, Mask};
use crate::morphology::{apply_closing, apply_opening, remove_small_holes, remove_small_objects};

/// Build the leaf-presence mask for a whole frame.
///
/// A pixel counts as leaf when it falls in any tissue band or simply is not
/// backdrop-colored. The union is then closed, opened, stripped of objects
/// smaller than `min_leaf_size`, and holes below the same size are filled.
/// An empty mask is a valid result and means no leaf was found.
pub fn create_leaf_mask(hsv: &HsvImage, config: &Config) -> Result<Mask> {
    let bands = config.leaf_bands();

    let green = in_range(hsv, &bands.green);
    let yellow = in_range(hsv, &bands.yellow);
    let brown = in_range(hsv, &bands.brown);
    let not_background = mask_invert(&in_range(hsv, &bands.background));

    let tissue = mask_union(&mask_union(&green, &yellow), &brown);
    let leaf_mask = mask_union(&tissue, &not_background);

    let leaf_mask = apply_closing(&leaf_mask, config.morphology_kernel_size)?;
    let leaf_mask = apply_opening(&leaf_mask, config.morphology_kernel_size)?;
    let leaf_mask = remove_small_objects(&leaf_mask, config.min_leaf_size);
    let leaf_mask = remove_small_holes(&leaf_mask, config.min_leaf_size);

    debug!("Leaf mask covers {} pixels", count_pixels(&leaf_mask));

    Ok(leaf_mask)
}
