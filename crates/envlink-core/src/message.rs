//! Request and response unions exchanged on a session stream.
//!
//! Requests are processed strictly in arrival order and each produces
//! exactly one response: either the matching success variant or
//! [`Response::Error`].

use std::fmt;

use indexmap::IndexMap;

use crate::error::ProtocolError;
use crate::id::Uid;
use crate::property::PropertyNode;
use crate::settings::Settings;
use crate::state::EnvironmentState;
use crate::tensor::{Tensor, TensorSpec};

/// Server-assigned uid maps handed out on JoinWorld and Reset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionObservationSpecs {
    /// Action specs by uid, in registration order.
    pub actions: IndexMap<Uid, TensorSpec>,
    /// Observation specs by uid, in registration order.
    pub observations: IndexMap<Uid, TensorSpec>,
}

impl ActionObservationSpecs {
    /// Uid of the action named `name`.
    pub fn action_uid(&self, name: &str) -> Option<Uid> {
        find_uid(&self.actions, name)
    }

    /// Uid of the observation named `name`.
    pub fn observation_uid(&self, name: &str) -> Option<Uid> {
        find_uid(&self.observations, name)
    }
}

fn find_uid(specs: &IndexMap<Uid, TensorSpec>, name: &str) -> Option<Uid> {
    specs
        .iter()
        .find_map(|(uid, spec)| (spec.name == name).then_some(*uid))
}

/// A client request.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Instantiate a new world.
    CreateWorld {
        /// Factory settings.
        settings: Settings,
    },
    /// Bind this session to a world.
    JoinWorld {
        /// Target world.
        world_name: String,
        /// Join settings.
        settings: Settings,
    },
    /// Advance the joined world.
    Step {
        /// Encoded actions by uid.
        actions: IndexMap<Uid, Tensor>,
        /// Observations to return, by uid.
        requested_observations: Vec<Uid>,
    },
    /// Restart this session's sequence.
    Reset {
        /// Reset settings.
        settings: Settings,
    },
    /// Reset a whole world and interrupt everyone in it.
    ResetWorld {
        /// Target world; need not be joined.
        world_name: String,
        /// Reset settings.
        settings: Settings,
    },
    /// Unbind from the current world.
    LeaveWorld,
    /// Tear down a world.
    DestroyWorld {
        /// Target world.
        world_name: String,
    },
    /// Read property values.
    ReadProperty {
        /// Dotted keys.
        keys: Vec<String>,
    },
    /// Write property values.
    WriteProperty {
        /// Values by dotted key.
        values: IndexMap<String, Tensor>,
    },
    /// List children of property nodes.
    ListProperty {
        /// Dotted keys; the empty key is the root.
        keys: Vec<String>,
    },
    /// Opaque extension call.
    Extension {
        /// Registered extension tag.
        tag: String,
        /// Opaque body.
        payload: Vec<u8>,
    },
}

/// Discriminant of a [`Request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// [`Request::CreateWorld`].
    CreateWorld,
    /// [`Request::JoinWorld`].
    JoinWorld,
    /// [`Request::Step`].
    Step,
    /// [`Request::Reset`].
    Reset,
    /// [`Request::ResetWorld`].
    ResetWorld,
    /// [`Request::LeaveWorld`].
    LeaveWorld,
    /// [`Request::DestroyWorld`].
    DestroyWorld,
    /// [`Request::ReadProperty`].
    ReadProperty,
    /// [`Request::WriteProperty`].
    WriteProperty,
    /// [`Request::ListProperty`].
    ListProperty,
    /// [`Request::Extension`].
    Extension,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateWorld => "create_world",
            Self::JoinWorld => "join_world",
            Self::Step => "step",
            Self::Reset => "reset",
            Self::ResetWorld => "reset_world",
            Self::LeaveWorld => "leave_world",
            Self::DestroyWorld => "destroy_world",
            Self::ReadProperty => "read_property",
            Self::WriteProperty => "write_property",
            Self::ListProperty => "list_property",
            Self::Extension => "extension",
        })
    }
}

impl Request {
    /// The request's discriminant.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::CreateWorld { .. } => RequestKind::CreateWorld,
            Self::JoinWorld { .. } => RequestKind::JoinWorld,
            Self::Step { .. } => RequestKind::Step,
            Self::Reset { .. } => RequestKind::Reset,
            Self::ResetWorld { .. } => RequestKind::ResetWorld,
            Self::LeaveWorld => RequestKind::LeaveWorld,
            Self::DestroyWorld { .. } => RequestKind::DestroyWorld,
            Self::ReadProperty { .. } => RequestKind::ReadProperty,
            Self::WriteProperty { .. } => RequestKind::WriteProperty,
            Self::ListProperty { .. } => RequestKind::ListProperty,
            Self::Extension { .. } => RequestKind::Extension,
        }
    }
}

/// A server response.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// World created.
    CreateWorld {
        /// Name the world was registered under.
        world_name: String,
    },
    /// Joined; spec maps for this session.
    JoinWorld {
        /// Fresh uid maps.
        specs: ActionObservationSpecs,
    },
    /// Step completed.
    Step {
        /// Environment state after the step.
        state: EnvironmentState,
        /// Requested observations by uid.
        observations: IndexMap<Uid, Tensor>,
    },
    /// Reset completed; rebuilt spec maps.
    Reset {
        /// Fresh uid maps.
        specs: ActionObservationSpecs,
    },
    /// Every other session has acknowledged the world reset.
    ResetWorld,
    /// Left the world.
    LeaveWorld,
    /// World destroyed.
    DestroyWorld,
    /// Property values by key, in request order.
    ReadProperty {
        /// Values by key.
        values: IndexMap<String, Tensor>,
    },
    /// All property writes applied.
    WriteProperty,
    /// Child nodes by listed key, in request order.
    ListProperty {
        /// Children by parent key.
        nodes: IndexMap<String, Vec<PropertyNode>>,
    },
    /// Extension reply.
    Extension {
        /// Tag that handled the call.
        tag: String,
        /// Opaque body.
        payload: Vec<u8>,
    },
    /// Request failed.
    Error(ProtocolError),
}

impl Response {
    /// The request kind this response answers, or `None` for errors.
    pub fn kind(&self) -> Option<RequestKind> {
        Some(match self {
            Self::CreateWorld { .. } => RequestKind::CreateWorld,
            Self::JoinWorld { .. } => RequestKind::JoinWorld,
            Self::Step { .. } => RequestKind::Step,
            Self::Reset { .. } => RequestKind::Reset,
            Self::ResetWorld => RequestKind::ResetWorld,
            Self::LeaveWorld => RequestKind::LeaveWorld,
            Self::DestroyWorld => RequestKind::DestroyWorld,
            Self::ReadProperty { .. } => RequestKind::ReadProperty,
            Self::WriteProperty => RequestKind::WriteProperty,
            Self::ListProperty { .. } => RequestKind::ListProperty,
            Self::Extension { .. } => RequestKind::Extension,
            Self::Error(_) => return None,
        })
    }

    /// The error, if this is an error response.
    pub fn error(&self) -> Option<&ProtocolError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Split into `Ok(success)` or `Err(error)`.
    pub fn into_result(self) -> Result<Response, ProtocolError> {
        match self {
            Self::Error(e) => Err(e),
            other => Ok(other),
        }
    }
}

impl From<Result<Response, ProtocolError>> for Response {
    fn from(result: Result<Response, ProtocolError>) -> Self {
        result.unwrap_or_else(Response::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DataType;

    #[test]
    fn response_kind_matches_request_kind() {
        assert_eq!(Request::LeaveWorld.kind(), RequestKind::LeaveWorld);
        assert_eq!(Response::LeaveWorld.kind(), Some(RequestKind::LeaveWorld));
        assert_eq!(Response::Error(ProtocolError::state("x")).kind(), None);
    }

    #[test]
    fn uid_lookup_by_name() {
        let mut specs = ActionObservationSpecs::default();
        specs
            .actions
            .insert(Uid(1), TensorSpec::scalar("paddle", DataType::Int8));
        specs
            .observations
            .insert(Uid(2), TensorSpec::scalar("reward", DataType::Float));
        assert_eq!(specs.action_uid("paddle"), Some(Uid(1)));
        assert_eq!(specs.observation_uid("reward"), Some(Uid(2)));
        assert_eq!(specs.observation_uid("paddle"), None);
    }

    #[test]
    fn result_conversion() {
        let r: Response = Err(ProtocolError::conflict("taken")).into();
        assert!(r.error().is_some());
        assert!(Response::from(Ok(Response::ResetWorld)).into_result().is_ok());
    }
}
