//! Codec error types.

use envlink_core::{DataType, ErrorKind, ProtocolError};

/// Errors from decoding, encoding, or validating a tensor.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Shape inconsistent with the payload or the spec.
    #[error("shape error: {reason}")]
    Shape {
        /// What went wrong.
        reason: String,
    },
    /// Payload element type differs from the spec.
    #[error("type error: expected {expected}, got {found}")]
    Type {
        /// Spec dtype.
        expected: DataType,
        /// Payload dtype.
        found: DataType,
    },
    /// Bounds requested for a non-numeric spec.
    #[error("bounds are not defined for {dtype} specs")]
    NonNumeric {
        /// Offending dtype.
        dtype: DataType,
    },
    /// A lower bound exceeds its upper bound.
    #[error("invalid bounds: {reason}")]
    InvalidBounds {
        /// What went wrong.
        reason: String,
    },
}

impl CodecError {
    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
        }
    }

    pub(crate) fn bounds(reason: impl Into<String>) -> Self {
        Self::InvalidBounds {
            reason: reason.into(),
        }
    }

    /// Wire category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Shape { .. } => ErrorKind::Shape,
            Self::Type { .. } | Self::NonNumeric { .. } => ErrorKind::Type,
            Self::InvalidBounds { .. } => ErrorKind::Validation,
        }
    }

    /// Convert to a wire error naming the offending field.
    pub fn into_protocol(self, field: &str) -> ProtocolError {
        ProtocolError::from(self).with_field(field)
    }
}

impl From<CodecError> for ProtocolError {
    fn from(e: CodecError) -> Self {
        ProtocolError::new(e.kind(), e.to_string())
    }
}
