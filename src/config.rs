// src/config.rs - Hue thresholds, size filters and batch settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::{HsvRange, LeafBands, TissueBands};
use crate::errors::{LeafNecrosisError, Result};

/// Lower hue bound of the green leaf band
const GREEN_HUE_MIN: u8 = 25;
/// Extra hue allowed above `necrosis_hue` when detecting brown leaf tissue
const BROWN_HUE_MARGIN: u8 = 10;
/// Largest hue value in the 8-bit convention
const MAX_HUE: u8 = 179;

/// Configuration for LeafNecrosis
///
/// Immutable once loaded; the pipeline borrows it, so several
/// configurations can run side by side.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_input_path")]
    pub input_path: String,

    #[serde(default = "default_output_base_dir")]
    pub output_base_dir: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    // Hue thresholds (0-179)
    #[serde(default = "default_necrosis_hue")]
    pub necrosis_hue: u8,

    #[serde(default = "default_chlorosis_hue")]
    pub chlorosis_hue: u8,

    #[serde(default = "default_healthy_hue")]
    pub healthy_hue: u8,

    #[serde(default = "default_background_hue_range")]
    pub background_hue_range: [u8; 2],

    // Size filters in pixels
    #[serde(default = "default_min_leaf_size")]
    pub min_leaf_size: u32,

    #[serde(default = "default_min_necrosis_size")]
    pub min_necrosis_size: u32,

    #[serde(default = "default_min_leaf_width")]
    pub min_leaf_width: u32,

    #[serde(default = "default_min_leaf_height")]
    pub min_leaf_height: u32,

    #[serde(default = "default_morphology_kernel_size")]
    pub morphology_kernel_size: u32,

    // Overlay colors
    #[serde(default = "default_necrosis_color_rgba")]
    pub necrosis_color_rgba: [u8; 4],

    #[serde(default = "default_chlorosis_color_rgba")]
    pub chlorosis_color_rgba: [u8; 4],
}

fn default_input_path() -> String {
    "./intergrain".to_string()
}

fn default_output_base_dir() -> String {
    "./intergrain/output".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_necrosis_hue() -> u8 {
    21 // ~30 degrees
}

fn default_chlorosis_hue() -> u8 {
    31 // ~43 degrees
}

fn default_healthy_hue() -> u8 {
    95
}

fn default_background_hue_range() -> [u8; 2] {
    [100, 130] // Blue backdrop
}

fn default_min_leaf_size() -> u32 {
    500
}

fn default_min_necrosis_size() -> u32 {
    10
}

fn default_min_leaf_width() -> u32 {
    50
}

fn default_min_leaf_height() -> u32 {
    100
}

fn default_morphology_kernel_size() -> u32 {
    5
}

fn default_necrosis_color_rgba() -> [u8; 4] {
    [166, 56, 22, 200] // Brownish red
}

fn default_chlorosis_color_rgba() -> [u8; 4] {
    [255, 222, 83, 200] // Yellow
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_base_dir: default_output_base_dir(),
            use_parallel: default_parallel(),
            necrosis_hue: default_necrosis_hue(),
            chlorosis_hue: default_chlorosis_hue(),
            healthy_hue: default_healthy_hue(),
            background_hue_range: default_background_hue_range(),
            min_leaf_size: default_min_leaf_size(),
            min_necrosis_size: default_min_necrosis_size(),
            min_leaf_width: default_min_leaf_width(),
            min_leaf_height: default_min_leaf_height(),
            morphology_kernel_size: default_morphology_kernel_size(),
            necrosis_color_rgba: default_necrosis_color_rgba(),
            chlorosis_color_rgba: default_chlorosis_color_rgba(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LeafNecrosisError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| LeafNecrosisError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Bands used to separate leaf tissue from the backdrop
    pub fn leaf_bands(&self) -> LeafBands {
        LeafBands {
            green: HsvRange::new([GREEN_HUE_MIN, 20, 20], [self.healthy_hue, 255, 255]),
            yellow: HsvRange::new([self.necrosis_hue, 30, 30], [self.chlorosis_hue, 255, 255]),
            brown: HsvRange::new(
                [0, 30, 30],
                [self.necrosis_hue.saturating_add(BROWN_HUE_MARGIN), 255, 200],
            ),
            background: self.background_band(),
        }
    }

    /// Bands used to classify tissue inside a leaf
    pub fn tissue_bands(&self) -> TissueBands {
        TissueBands {
            necrosis: HsvRange::new([0, 0, 0], [self.necrosis_hue, 255, 255]),
            chlorosis: HsvRange::new([self.necrosis_hue, 0, 0], [self.chlorosis_hue, 255, 255]),
            background: self.background_band(),
        }
    }

    fn background_band(&self) -> HsvRange {
        let [low, high] = self.background_hue_range;
        HsvRange::new([low, 50, 50], [high, 255, 255])
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.necrosis_hue < self.chlorosis_hue && self.chlorosis_hue < self.healthy_hue) {
            return Err(LeafNecrosisError::Config(format!(
                "hue thresholds must satisfy necrosis_hue < chlorosis_hue < healthy_hue (got {}, {}, {})",
                self.necrosis_hue, self.chlorosis_hue, self.healthy_hue
            )));
        }

        if self.healthy_hue > MAX_HUE {
            return Err(LeafNecrosisError::Config(format!(
                "healthy_hue must be <= {}", MAX_HUE
            )));
        }

        let [bg_low, bg_high] = self.background_hue_range;
        if bg_low > bg_high || bg_high > MAX_HUE {
            return Err(LeafNecrosisError::Config(format!(
                "background_hue_range must be ordered and within 0..={}", MAX_HUE
            )));
        }

        if self.morphology_kernel_size == 0 || self.morphology_kernel_size % 2 == 0 {
            return Err(LeafNecrosisError::Config(
                "morphology_kernel_size must be odd and > 0".to_string(),
            ));
        }

        if self.min_leaf_size == 0 || self.min_necrosis_size == 0 {
            return Err(LeafNecrosisError::Config(
                "min_leaf_size and min_necrosis_size must be > 0".to_string(),
            ));
        }

        if self.min_leaf_width == 0 || self.min_leaf_height == 0 {
            return Err(LeafNecrosisError::Config(
                "min_leaf_width and min_leaf_height must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that the configured input path exists
    pub fn validate_input_path(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(LeafNecrosisError::InvalidPath(input_path));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            LeafNecrosisError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
