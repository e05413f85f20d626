//! Envlink: a session core for hosting reinforcement-learning environments
//! behind a request/response protocol.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! envlink sub-crates. Environment authors implement
//! [`WorldFactory`](server::WorldFactory) and
//! [`WorldHooks`](server::WorldHooks); transports feed
//! [`Request`](protocol::Request)s into a [`Connection`](server::Connection)
//! and ship back the [`Response`](protocol::Response)s.
//!
//! # Quick start
//!
//! ```rust
//! use envlink::prelude::*;
//! use envlink_test_utils::CounterFactory;
//!
//! let (factory, _events) = CounterFactory::new();
//! let server = Server::new(factory).unwrap();
//! let mut conn = server.connect();
//!
//! let Response::CreateWorld { world_name } = conn.handle(Request::CreateWorld {
//!     settings: Settings::new(),
//! }) else {
//!     panic!("create failed");
//! };
//! let Response::JoinWorld { specs } = conn.handle(Request::JoinWorld {
//!     world_name,
//!     settings: Settings::new(),
//! }) else {
//!     panic!("join failed");
//! };
//! let delta = specs.action_uid("delta").unwrap();
//! let count = specs.observation_uid("count").unwrap();
//!
//! // The first step of a sequence ignores its actions.
//! let mut actions = indexmap::IndexMap::new();
//! actions.insert(delta, Tensor::scalar(2i32));
//! for expected in [0i64, 2] {
//!     let Response::Step { state, observations } = conn.handle(Request::Step {
//!         actions: actions.clone(),
//!         requested_observations: vec![count],
//!     }) else {
//!         panic!("step failed");
//!     };
//!     assert_eq!(state, EnvironmentState::Running);
//!     assert_eq!(observations[&count], Tensor::scalar(expected));
//! }
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`protocol`] | `envlink-core` | Tensors, identifiers, messages, error taxonomy |
//! | [`codec`] | `envlink-codec` | Decode, encode, broadcast, and bounds validation |
//! | [`spec`] | `envlink-spec` | Per-session uid registries and nested names |
//! | [`server`] | `envlink-server` | World registry, sessions, reset barriers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Data model and wire messages (`envlink-core`).
///
/// Contains [`protocol::Tensor`], [`protocol::TensorSpec`], the
/// [`protocol::Request`] and [`protocol::Response`] unions, and the
/// [`protocol::ErrorKind`] taxonomy.
pub use envlink_core as protocol;

/// Tensor codec (`envlink-codec`).
///
/// [`codec::decode`] turns a wire tensor into a dense array against its
/// spec; [`codec::encode`] goes the other way. [`codec::validate`] reports
/// bounds violations without failing a step.
pub use envlink_codec as codec;

/// Spec registries (`envlink-spec`).
///
/// [`spec::SessionSpecs`] holds the uid maps for one session; the
/// [`spec::flatten`] and [`spec::unflatten`] helpers convert between
/// nested and dotted names.
pub use envlink_spec as spec;

/// World hosting (`envlink-server`).
///
/// [`server::Server`] builds connections; [`server::WorldHooks`] is the
/// main extension point for environment logic.
pub use envlink_server as server;

/// Common imports for typical envlink usage.
///
/// ```rust
/// use envlink::prelude::*;
///
/// let spec = TensorSpec::scalar("reward", DataType::Float);
/// let array = envlink::codec::decode(&Tensor::scalar(1.0f32), &spec).unwrap();
/// assert_eq!(array.len(), 1);
/// ```
pub mod prelude {
    // Data model
    pub use envlink_core::{
        ActionObservationSpecs, Array, DataType, EnvironmentState, ErrorKind, PropertyNode,
        ProtocolError, Request, Response, SessionId, SessionState, Settings, Tensor, TensorSpec,
        Uid,
    };

    // Codec
    pub use envlink_codec::CodecError;

    // Specs
    pub use envlink_spec::SessionSpecs;

    // Server
    pub use envlink_server::{
        ClientStream, Connection, CreatedWorld, DestroyPolicy, ExtensionRegistry, HookError,
        NamedArrays, Server, ServerConfig, StepInput, StepKind, StepOutcome, WorldFactory,
        WorldHooks, WorldSpecs,
    };
}
