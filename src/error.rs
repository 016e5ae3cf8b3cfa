use thiserror::Error;

use crate::geometry::Lobe;

/// Top-level error type for the woven-heart geometry core.
#[derive(Debug, Error)]
pub enum HeartError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("design serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to curve computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("segment index {index} is out of range for a finger with {count} segments")]
    SegmentOutOfRange { index: usize, count: usize },

    #[error("control point index {index} is out of range for a finger with {count} points")]
    PointOutOfRange { index: usize, count: usize },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors related to the boundary curve model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("finger not found: {0}")]
    FingerNotFound(String),

    #[error("no finger at order {order} in the {lobe} lobe")]
    NoFingerAtOrder { lobe: Lobe, order: usize },

    #[error("outer boundary fingers cannot be edited")]
    OuterBoundary,

    #[error("grid size {0} is outside the supported range [2, 32]")]
    InvalidGridSize(usize),

    #[error("edit rejected: {0}")]
    Rejected(String),
}

/// Errors related to configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience type alias for results using [`HeartError`].
pub type Result<T> = std::result::Result<T, HeartError>;
