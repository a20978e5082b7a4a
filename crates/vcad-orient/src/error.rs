//! Error types for orientation search.

use thiserror::Error;

/// Errors that can occur while searching for a print orientation.
#[derive(Error, Debug)]
pub enum OrientError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Every triangle of the mesh has zero area.
    #[error("mesh has degenerate geometry: {0}")]
    DegenerateMesh(String),

    /// Raw triangle data could not be interpreted.
    #[error("invalid mesh data: {0}")]
    InvalidInput(String),

    /// Invalid search settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The favored side string could not be parsed.
    #[error("invalid favored side: {0}")]
    InvalidFavoredSide(String),

    /// The progress observer stopped the search.
    #[error("orientation search cancelled")]
    Cancelled,
}

/// Result type for orientation operations.
pub type Result<T> = std::result::Result<T, OrientError>;
