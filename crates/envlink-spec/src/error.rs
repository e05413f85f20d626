//! Spec registry errors.

use envlink_codec::CodecError;
use envlink_core::{ErrorKind, ProtocolError, Uid};

use crate::registry::Domain;

/// Errors from building or querying a [`SpecRegistry`](crate::SpecRegistry).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    /// Two specs in one domain share a name.
    #[error("duplicate {domain} name `{name}`")]
    DuplicateName {
        /// Domain of the collision.
        domain: Domain,
        /// Colliding name.
        name: String,
    },
    /// A spec declares more than one variable dimension.
    #[error("{domain} `{name}` has {count} variable dimensions, at most one is allowed")]
    TooManyVariableDims {
        /// Domain of the spec.
        domain: Domain,
        /// Spec name.
        name: String,
        /// Number of negative dimensions.
        count: usize,
    },
    /// No spec with this uid.
    #[error("unknown {domain} uid {uid}")]
    UnknownUid {
        /// Domain searched.
        domain: Domain,
        /// Missing uid.
        uid: Uid,
    },
    /// No spec with this name.
    #[error("unknown {domain} name `{name}`")]
    UnknownName {
        /// Domain searched.
        domain: Domain,
        /// Missing name.
        name: String,
    },
    /// Decoding or encoding one entry failed.
    #[error("{domain} `{name}`: {source}")]
    Codec {
        /// Domain of the entry.
        domain: Domain,
        /// Spec name of the entry.
        name: String,
        /// Underlying failure.
        source: CodecError,
    },
}

impl From<SpecError> for ProtocolError {
    fn from(e: SpecError) -> Self {
        let message = e.to_string();
        match e {
            SpecError::DuplicateName { name, .. } => {
                ProtocolError::new(ErrorKind::DuplicateName, message).with_field(name)
            }
            SpecError::TooManyVariableDims { name, .. } => {
                ProtocolError::new(ErrorKind::Shape, message).with_field(name)
            }
            SpecError::UnknownUid { uid, .. } => {
                ProtocolError::new(ErrorKind::NotFound, message).with_field(uid.to_string())
            }
            SpecError::UnknownName { name, .. } => {
                ProtocolError::new(ErrorKind::NotFound, message).with_field(name)
            }
            SpecError::Codec { name, source, .. } => {
                ProtocolError::new(source.kind(), message).with_field(name)
            }
        }
    }
}
