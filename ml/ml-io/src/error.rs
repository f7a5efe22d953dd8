//! Error types for ml-io crate.

use thiserror::Error;

/// Errors that can occur while describing layers or converting tensor data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IoError {
    /// Layer shape is empty, has a zero or disallowed negative dimension, or
    /// its volume overflows.
    #[error("invalid shape {shape:?}: {reason}")]
    InvalidShape {
        /// The rejected shape.
        shape: Vec<i64>,
        /// Why the shape was rejected.
        reason: String,
    },

    /// Label count does not match the layer volume.
    #[error("inconsistent labels: layer has {length} elements but {labels} labels")]
    InconsistentLabels {
        /// Layer volume.
        length: usize,
        /// Number of labels supplied.
        labels: usize,
    },

    /// A label appears more than once on one layer.
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// A quantized layer has no conversion function for its direction.
    #[error("missing quantization function: {0}")]
    MissingQuantizer(String),

    /// A conversion function was supplied for an unquantized layer.
    #[error("unexpected quantization function on unquantized layer: {0}")]
    UnexpectedQuantizer(String),

    /// Image dimensions do not match the layer.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// Two items in one collection share a name.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// No item with this name exists.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Index outside `[0, len)`.
    #[error("index {index} out of range for collection of {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Collection size.
        len: usize,
    },

    /// The value kind cannot be written to this layer.
    #[error("unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// Element count does not match the layer volume.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// A backing buffer was created for a different layer layout.
    #[error("incompatible buffer: {0}")]
    IncompatibleBuffer(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No factory is registered for the requested engine.
    #[error("no model factory registered for engine: {0}")]
    UnknownEngine(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl IoError {
    /// Creates an invalid shape error.
    #[must_use]
    pub fn invalid_shape(shape: &[i64], reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            shape: shape.to_vec(),
            reason: reason.into(),
        }
    }

    /// Creates an inconsistent labels error.
    #[must_use]
    pub const fn inconsistent_labels(length: usize, labels: usize) -> Self {
        Self::InconsistentLabels { length, labels }
    }

    /// Creates a missing quantizer error.
    #[must_use]
    pub fn missing_quantizer(reason: impl Into<String>) -> Self {
        Self::MissingQuantizer(reason.into())
    }

    /// Creates an unexpected quantizer error.
    #[must_use]
    pub fn unexpected_quantizer(reason: impl Into<String>) -> Self {
        Self::UnexpectedQuantizer(reason.into())
    }

    /// Creates an invalid dimensions error.
    #[must_use]
    pub const fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }

    /// Creates a duplicate label error.
    #[must_use]
    pub fn duplicate_label(label: impl Into<String>) -> Self {
        Self::DuplicateLabel(label.into())
    }

    /// Creates a duplicate name error.
    #[must_use]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    /// Creates a key not found error.
    #[must_use]
    pub fn key_not_found(name: impl Into<String>) -> Self {
        Self::KeyNotFound(name.into())
    }

    /// Creates an index out of range error.
    #[must_use]
    pub const fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Creates an unsupported value type error.
    #[must_use]
    pub fn unsupported_value(reason: impl Into<String>) -> Self {
        Self::UnsupportedValueType(reason.into())
    }

    /// Creates a length mismatch error.
    #[must_use]
    pub const fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { expected, actual }
    }

    /// Creates an incompatible buffer error.
    #[must_use]
    pub fn incompatible_buffer(reason: impl Into<String>) -> Self {
        Self::IncompatibleBuffer(reason.into())
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates an unknown engine error.
    #[must_use]
    pub fn unknown_engine(engine: impl Into<String>) -> Self {
        Self::UnknownEngine(engine.into())
    }

    /// Creates a deserialization error.
    #[must_use]
    pub fn deserialization(reason: impl Into<String>) -> Self {
        Self::Deserialization(reason.into())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}

/// Result type for ml-io operations.
pub type Result<T> = std::result::Result<T, IoError>;
