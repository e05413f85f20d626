//! Wire-level error taxonomy.
//!
//! Every failure that reaches a client is a [`ProtocolError`]: a stable
//! [`ErrorKind`], a human-readable message, and optionally the name of
//! the offending field. Subsystem crates keep their own error enums and
//! convert into this type at the session boundary.

use std::fmt;

/// Stable error category carried in every error response.
///
/// Discriminants are part of the wire contract and must not change.
/// Only [`ErrorKind::FatalTransport`] terminates the stream; every other
/// kind is delivered in-band and the stream keeps serving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorKind {
    /// Operation not valid in the session's current state.
    State = -1,
    /// Shape mismatch, ambiguous shape, or scalar rule violation.
    Shape = -2,
    /// Payload type does not match the spec.
    Type = -3,
    /// Unknown uid, key, or world name.
    NotFound = -4,
    /// Name collision or resource still in use.
    Conflict = -5,
    /// Two specs share a name within one registry.
    DuplicateName = -6,
    /// Range, bounds, or environment-defined invalid input.
    Validation = -7,
    /// Extension tag not registered.
    UnknownExtension = -8,
    /// Server-side invariant broken.
    Internal = -9,
    /// Stream-ending transport failure.
    FatalTransport = -128,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [ErrorKind; 10] = [
        Self::State,
        Self::Shape,
        Self::Type,
        Self::NotFound,
        Self::Conflict,
        Self::DuplicateName,
        Self::Validation,
        Self::UnknownExtension,
        Self::Internal,
        Self::FatalTransport,
    ];

    /// Stable numeric code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Whether the stream continues after this error.
    pub fn is_recoverable(self) -> bool {
        self != Self::FatalTransport
    }

    /// Wire name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::State => "StateError",
            Self::Shape => "ShapeError",
            Self::Type => "TypeError",
            Self::NotFound => "NotFound",
            Self::Conflict => "ConflictError",
            Self::DuplicateName => "DuplicateNameError",
            Self::Validation => "ValidationError",
            Self::UnknownExtension => "UnknownExtension",
            Self::Internal => "InternalError",
            Self::FatalTransport => "FatalTransport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error delivered to the client.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}{}", field_suffix(.field))]
pub struct ProtocolError {
    /// Category.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Offending field (spec name, setting key, property key, uid).
    pub field: Option<String>,
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(f) => format!(" (field `{f}`)"),
        None => String::new(),
    }
}

impl ProtocolError {
    /// Construct an error of any kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
        }
    }

    /// Attach the offending field name.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach the field only if none is set yet.
    pub fn or_field(self, field: impl Into<String>) -> Self {
        if self.field.is_some() {
            self
        } else {
            self.with_field(field)
        }
    }

    /// [`ErrorKind::State`].
    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State, message)
    }

    /// [`ErrorKind::Shape`].
    pub fn shape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shape, message)
    }

    /// [`ErrorKind::Type`].
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    /// [`ErrorKind::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// [`ErrorKind::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// [`ErrorKind::DuplicateName`].
    pub fn duplicate_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateName, message)
    }

    /// [`ErrorKind::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// [`ErrorKind::UnknownExtension`].
    pub fn unknown_extension(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownExtension, message)
    }

    /// [`ErrorKind::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// [`ErrorKind::FatalTransport`].
    pub fn fatal_transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FatalTransport, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::State.code(), -1);
        assert_eq!(ErrorKind::Shape.code(), -2);
        assert_eq!(ErrorKind::Type.code(), -3);
        assert_eq!(ErrorKind::NotFound.code(), -4);
        assert_eq!(ErrorKind::Conflict.code(), -5);
        assert_eq!(ErrorKind::DuplicateName.code(), -6);
        assert_eq!(ErrorKind::Validation.code(), -7);
        assert_eq!(ErrorKind::UnknownExtension.code(), -8);
        assert_eq!(ErrorKind::Internal.code(), -9);
        assert_eq!(ErrorKind::FatalTransport.code(), -128);
    }

    #[test]
    fn from_code_inverts_code() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code(0), None);
    }

    #[test]
    fn only_fatal_transport_ends_the_stream() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.is_recoverable(), kind != ErrorKind::FatalTransport);
        }
    }

    #[test]
    fn display_includes_field() {
        let e = ProtocolError::shape("expected [2, 3]").with_field("board");
        assert_eq!(e.to_string(), "ShapeError: expected [2, 3] (field `board`)");
        let e = ProtocolError::state("not joined");
        assert_eq!(e.to_string(), "StateError: not joined");
    }

    #[test]
    fn or_field_keeps_existing() {
        let e = ProtocolError::validation("bad").with_field("inner").or_field("outer");
        assert_eq!(e.field.as_deref(), Some("inner"));
    }
}
