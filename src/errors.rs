use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Everything that can go wrong while loading, analyzing or writing leaf images
#[derive(Error, Debug)]
pub enum LeafNecrosisError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Dimension mismatch: image is {image:?}, mask is {mask:?}")]
    DimensionMismatch {
        image: (u32, u32),
        mask: (u32, u32),
    },

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Crate-wide result
pub type Result<T> = std::result::Result<T, LeafNecrosisError>;
