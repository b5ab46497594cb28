//! Error types for the stress estimation library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Input bytes are not a decodable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model input configuration error
    #[error("Model input error: {0}")]
    ModelInputError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Model data shape or format error
    #[error("Model data format error: {0}")]
    ModelDataFormatError(String),

    /// Model validation error (wrong number of points, etc.)
    #[error("Model validation error: {0}")]
    ModelValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Which side of the boundary a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The caller sent input that cannot be processed
    Client,
    /// Something failed while processing valid input
    Server,
}

impl Error {
    /// Classify the error for the transport layer
    #[must_use]
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Self::Decode(_) => FaultKind::Client,
            _ => FaultKind::Server,
        }
    }

    /// Message shown to the caller
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Decode(_) => "Invalid image file.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
