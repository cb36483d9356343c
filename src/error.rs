//! Custom error types for lumachroma.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::Artifact;

/// Main error type for the lumachroma library.
#[derive(Error, Debug)]
pub enum Error {
    /// A model artifact is missing or cannot be read.
    #[error("{artifact} not found at {path}: {remediation}")]
    ResourceMissing {
        artifact: Artifact,
        path: PathBuf,
        remediation: String,
    },

    /// Failed to read the cluster-center table.
    #[error("failed to read cluster table from {path}: {source}")]
    ClusterTable {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    /// Failed to load the ONNX graph.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// A blob was assigned to a layer the network does not have.
    #[error("network has no layer named {layer}")]
    UnknownLayer { layer: String },

    /// A forward pass reached a layer whose weights were never assigned.
    #[error("layer {layer} has no weights assigned")]
    LayerNotConfigured { layer: &'static str },

    /// The image could not be decoded or does not have the expected layout.
    #[error("invalid image {origin}: {reason}")]
    InvalidImage { origin: String, reason: String },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Result type alias for lumachroma operations.
pub type Result<T> = std::result::Result<T, Error>;
