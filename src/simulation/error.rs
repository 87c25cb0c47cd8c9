//! Error types for lattice-flow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LbmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("VTK export error: {0}")]
    Vtk(#[from] vtkio::Error),

    #[error("invalid lattice dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("failed to allocate lattice arrays for {cells} cells")]
    Allocation { cells: usize },

    #[error("cell ({x}, {y}) lies outside the {width}x{height} lattice")]
    OutOfGrid { x: i64, y: i64, width: usize, height: usize },

    #[error("unknown scene preset: {0}")]
    UnknownPreset(String),

    #[error("not able to find attribute {0}")]
    UnknownAttribute(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LbmError>;
