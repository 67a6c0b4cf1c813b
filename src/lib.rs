// src/lib.rs - Library interface for LeafNecrosis

pub mod analysis;
pub mod color;
pub mod composite;
pub mod config;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod mask;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod separation;
pub mod temperature;

#[cfg(test)]
mod test_support;

// Re-export commonly used types and functions
pub use errors::{LeafNecrosisError, Result};
pub use config::Config;
pub use image_io::{InputImage, load_image, save_image};

pub use color::{
    HsvImage,
    HsvRange,
    TissueCategory,
    rgb_to_hsv,
    to_hsv,
};

pub use mask::create_leaf_mask;
pub use separation::{BoundingBox, LeafRegion, separate_leaves};
pub use analysis::{LeafAnalysis, LeafMetrics, analyze_leaf, analyze_region};
pub use composite::composite_leaves;

pub use pipeline::{
    AnalyzedLeaf,
    FrameAnalysis,
    analyze_frame,
    process_batch,
    process_image,
    process_path,
};

pub use output::{BatchSummary, LeafRecord, write_results_csv, write_summary};
pub use temperature::{adjust_temperature, process_temperature_dir};
