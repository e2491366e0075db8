//! Error types for the block inference engine.

use thiserror::Error;

/// Errors raised by the inference engine and its components.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Invalid static configuration, rejected before any volume is touched.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Slicing or cropping outside a volume's extent.
    #[error("range start={start:?} size={size:?} exceeds volume extent {extent:?}")]
    Bounds {
        start: [usize; 3],
        size: [usize; 3],
        extent: [usize; 3],
    },

    /// Planned placements fail to cover the input, or a finalized voxel
    /// received zero weight. Indicates a planner defect.
    #[error("coverage violation: {0}")]
    Coverage(String),

    /// The transform returned an unexpected batch count or patch shape.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// The external transform failed. Propagated verbatim, never retried.
    #[error("transform failed: {0}")]
    Transform(String),
}

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
