// src/pipeline.rs - Frame analysis and per-image processing

use std::fs;
use std::path::{Path, PathBuf};

use image::{RgbImage, RgbaImage};
use log::{error, info, warn};
use rayon::prelude::*;

use crate::analysis::{analyze_region, LeafAnalysis};
use crate::color::to_hsv;
use crate::composite::composite_leaves;
use crate::config::Config;
use crate::errors::Result;
use crate::image_io::{combined_overlay_filename, leaf_overlay_filename, load_image, save_image, InputImage};
use crate::mask::create_leaf_mask;
use crate::output::LeafRecord;
use crate::separation::{separate_leaves, LeafRegion};

/// One separated leaf together with its analysis
#[derive(Debug, Clone)]
pub struct AnalyzedLeaf {
    pub region: LeafRegion,
    pub analysis: LeafAnalysis,
}

/// Everything computed for one frame; no files involved
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Leaves in separation order
    pub leaves: Vec<AnalyzedLeaf>,
    /// All leaf overlays composited into the frame's coordinates
    pub combined_overlay: RgbaImage,
}

impl FrameAnalysis {
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }
}

/// Run mask building, leaf separation, per-leaf analysis and compositing.
///
/// Pure: identical inputs give identical outputs. Leaves are analyzed in
/// parallel when `use_parallel` is set; result order does not depend on it.
pub fn analyze_frame(image: &RgbImage, config: &Config) -> Result<FrameAnalysis> {
    let hsv = to_hsv(image);
    let leaf_mask = create_leaf_mask(&hsv, config)?;
    let regions = separate_leaves(image, &leaf_mask, config)?;

    let analyze = |region: LeafRegion| -> Result<AnalyzedLeaf> {
        let analysis = analyze_region(&region, &hsv, config)?;
        Ok(AnalyzedLeaf { region, analysis })
    };

    let leaves = if config.use_parallel {
        regions.into_par_iter().map(analyze).collect::<Result<Vec<_>>>()?
    } else {
        regions.into_iter().map(analyze).collect::<Result<Vec<_>>>()?
    };

    let (width, height) = image.dimensions();
    let combined_overlay = composite_leaves(
        width,
        height,
        leaves.iter().map(|leaf| (&leaf.region.bbox, &leaf.analysis.overlay)),
    )?;

    Ok(FrameAnalysis {
        leaves,
        combined_overlay,
    })
}

/// Build the tabular rows for a frame's leaves
pub fn frame_records(filename: &str, frame: &FrameAnalysis) -> Vec<LeafRecord> {
    let total = frame.leaf_count();
    frame
        .leaves
        .iter()
        .enumerate()
        .map(|(i, leaf)| LeafRecord::new(filename, i + 1, total, leaf.analysis.metrics))
        .collect()
}

/// Write per-leaf and combined overlays for a frame.
///
/// All or nothing: if any write fails, files already written for this
/// frame are removed before the error is returned.
pub fn save_frame_overlays(filename: &str, frame: &FrameAnalysis, output_dir: &Path) -> Result<()> {
    let mut written: Vec<PathBuf> = Vec::with_capacity(frame.leaf_count() + 1);

    let result = (|| -> Result<()> {
        for (i, leaf) in frame.leaves.iter().enumerate() {
            let path = output_dir.join(leaf_overlay_filename(filename, i + 1));
            save_image(&leaf.analysis.overlay, &path)?;
            written.push(path);
        }
        let path = output_dir.join(combined_overlay_filename(filename));
        save_image(&frame.combined_overlay, &path)?;
        written.push(path);
        Ok(())
    })();

    if result.is_err() {
        for path in &written {
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not remove partial output {}: {}", path.display(), e);
            }
        }
    }
    result
}

fn try_process_image(input_image: &InputImage, config: &Config, output_dir: &Path) -> Result<Vec<LeafRecord>> {
    let frame = analyze_frame(&input_image.image, config)?;

    if frame.leaves.is_empty() {
        warn!("No leaves detected in {}", input_image.path.display());
        return Ok(Vec::new());
    }

    info!("Found {} leaves in {}", frame.leaf_count(), input_image.filename);

    save_frame_overlays(&input_image.filename, &frame, output_dir)?;

    Ok(frame_records(&input_image.filename, &frame))
}

/// Process a single image with multiple leaves.
///
/// Failures are logged and yield no records so one bad image never stops
/// a batch.
pub fn process_image(input_image: InputImage, config: &Config, output_dir: &Path) -> Vec<LeafRecord> {
    match try_process_image(&input_image, config, output_dir) {
        Ok(records) => records,
        Err(e) => {
            error!("Error processing {}: {}", input_image.path.display(), e);
            Vec::new()
        }
    }
}

/// Load and process one image file; unreadable files yield no records
pub fn process_path(path: &Path, config: &Config, output_dir: &Path) -> Vec<LeafRecord> {
    info!("Processing: {}", path.display());
    match load_image(path) {
        Ok(input_image) => process_image(input_image, config, output_dir),
        Err(e) => {
            error!("Error loading {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Process every path, one image per task when `use_parallel` is set.
///
/// Records come back grouped by input order regardless of scheduling.
pub fn process_batch(paths: &[PathBuf], config: &Config, output_dir: &Path) -> Vec<LeafRecord> {
    if config.use_parallel {
        paths
            .par_iter()
            .map(|path| process_path(path, config, output_dir))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    } else {
        paths
            .iter()
            .flat_map(|path| process_path(path, config, output_dir))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{frame_with_leaf, paint_rect, BLUE, BROWN, GREEN};
    use assert_approx_eq::assert_approx_eq;
    use image::Rgb;

    #[test]
    fn test_single_leaf_frame() {
        let mut image = frame_with_leaf((400, 400), 50, 60, 200, 300);
        paint_rect(&mut image, 120, 150, 20, 20, BROWN);

        let frame = analyze_frame(&image, &Config::default()).unwrap();
        assert_eq!(frame.leaf_count(), 1);
        assert_eq!(frame.combined_overlay.dimensions(), (400, 400));

        let records = frame_records("plate", &frame);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].leaf_index, 1);
        assert_eq!(records[0].total_leaves_in_image, 1);
        assert_approx_eq!(records[0].metrics.percent_necrosis, 0.67, 1e-9);
    }

    #[test]
    fn test_combined_overlay_matches_leaf_overlays() {
        let mut image = RgbImage::from_pixel(400, 300, Rgb(BLUE));
        paint_rect(&mut image, 20, 20, 80, 150, GREEN);
        paint_rect(&mut image, 220, 60, 90, 200, GREEN);
        paint_rect(&mut image, 240, 100, 20, 20, BROWN);

        let frame = analyze_frame(&image, &Config::default()).unwrap();
        assert_eq!(frame.leaf_count(), 2);

        for leaf in &frame.leaves {
            let bbox = leaf.region.bbox;
            for (x, y, pixel) in leaf.analysis.overlay.enumerate_pixels() {
                if pixel[3] > 0 {
                    assert_eq!(frame.combined_overlay.get_pixel(bbox.min_col + x, bbox.min_row + y), pixel);
                }
            }
        }
        // Backdrop stays transparent
        assert_eq!(frame.combined_overlay.get_pixel(150, 10).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let mut image = RgbImage::from_pixel(400, 300, Rgb(BLUE));
        paint_rect(&mut image, 20, 20, 80, 150, GREEN);
        paint_rect(&mut image, 220, 60, 90, 200, GREEN);

        let parallel = analyze_frame(&image, &Config::default()).unwrap();
        let sequential = analyze_frame(
            &image,
            &Config {
                use_parallel: false,
                ..Config::default()
            },
        )
        .unwrap();

        assert_eq!(frame_records("f", &parallel), frame_records("f", &sequential));
        assert_eq!(parallel.combined_overlay, sequential.combined_overlay);
    }

    #[test]
    fn test_failed_overlay_write_leaves_no_partial_files() {
        let mut image = RgbImage::from_pixel(400, 300, Rgb(BLUE));
        paint_rect(&mut image, 20, 20, 80, 150, GREEN);
        paint_rect(&mut image, 220, 60, 90, 200, GREEN);
        let frame = analyze_frame(&image, &Config::default()).unwrap();
        assert_eq!(frame.leaf_count(), 2);

        let output = tempfile::tempdir().unwrap();
        // A directory squatting on the second leaf's file name blocks that write
        fs::create_dir(output.path().join(leaf_overlay_filename("plate", 2))).unwrap();

        assert!(save_frame_overlays("plate", &frame, output.path()).is_err());
        assert!(!output.path().join(leaf_overlay_filename("plate", 1)).exists());
        assert!(!output.path().join(combined_overlay_filename("plate")).exists());
    }

    #[test]
    fn test_overlays_written_for_every_leaf() {
        let mut image = RgbImage::from_pixel(400, 300, Rgb(BLUE));
        paint_rect(&mut image, 20, 20, 80, 150, GREEN);
        paint_rect(&mut image, 220, 60, 90, 200, GREEN);
        let frame = analyze_frame(&image, &Config::default()).unwrap();

        let output = tempfile::tempdir().unwrap();
        save_frame_overlays("plate", &frame, output.path()).unwrap();
        assert!(output.path().join(leaf_overlay_filename("plate", 1)).is_file());
        assert!(output.path().join(leaf_overlay_filename("plate", 2)).is_file());
        assert!(output.path().join(combined_overlay_filename("plate")).is_file());
    }

    #[test]
    fn test_background_only_frame_has_no_leaves() {
        let image = RgbImage::from_pixel(200, 200, Rgb(BLUE));
        let frame = analyze_frame(&image, &Config::default()).unwrap();
        assert!(frame.leaves.is_empty());
        assert!(frame.combined_overlay.pixels().all(|p| p[3] == 0));
    }
}
