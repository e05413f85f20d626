//! Hook and transport error types.

use envlink_core::{ErrorKind, ProtocolError};

/// Failure reported by a [`WorldHooks`](crate::WorldHooks) or
/// [`WorldFactory`](crate::WorldFactory) implementation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// A setting is missing, malformed, or out of range.
    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting {
        /// Setting key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The request is invalid for the environment, e.g. a required
    /// action is missing.
    #[error("{0}")]
    Validation(String),
    /// Unknown key or name.
    #[error("{0}")]
    NotFound(String),
    /// Name collision or resource in use.
    #[error("{0}")]
    Conflict(String),
    /// The world does not handle this extension tag.
    #[error("{0}")]
    UnknownExtension(String),
    /// A fully-formed wire error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl HookError {
    /// Shorthand for [`HookError::InvalidSetting`].
    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<HookError> for ProtocolError {
    fn from(e: HookError) -> Self {
        match e {
            HookError::InvalidSetting { ref key, .. } => {
                let field = key.clone();
                ProtocolError::validation(e.to_string()).with_field(field)
            }
            HookError::Validation(m) => ProtocolError::validation(m),
            HookError::NotFound(m) => ProtocolError::not_found(m),
            HookError::Conflict(m) => ProtocolError::conflict(m),
            HookError::UnknownExtension(m) => ProtocolError::unknown_extension(m),
            HookError::Protocol(p) => p,
        }
    }
}

/// Stream-level failures. These end the connection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer stopped accepting responses.
    #[error("response sink disconnected")]
    ResponseSinkClosed,
    /// The serving side hung up.
    #[error("request stream closed")]
    RequestStreamClosed,
    /// No response arrived in time.
    #[error("timed out waiting for a response")]
    Timeout,
    /// The connection thread could not be started.
    #[error("failed to spawn connection thread: {reason}")]
    Spawn {
        /// OS error text.
        reason: String,
    },
    /// The connection thread panicked.
    #[error("connection thread panicked")]
    Panicked,
}

impl From<TransportError> for ProtocolError {
    fn from(e: TransportError) -> Self {
        ProtocolError::new(ErrorKind::FatalTransport, e.to_string())
    }
}
