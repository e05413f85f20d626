//! Core types for the envlink agent–environment protocol.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! data model shared by every other crate in the workspace: identifiers,
//! tensors and tensor specs, decoded arrays, settings maps, session and
//! environment states, property nodes, the request/response union, and
//! the wire-level error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod error;
pub mod id;
pub mod message;
pub mod property;
pub mod settings;
pub mod state;
pub mod tensor;

pub use array::{row_major_strides, Array, Shape};
pub use error::{ErrorKind, ProtocolError};
pub use id::{SessionId, Uid};
pub use message::{ActionObservationSpecs, Request, RequestKind, Response};
pub use property::PropertyNode;
pub use settings::Settings;
pub use state::{EnvironmentState, SessionState};
pub use tensor::{DataType, Element, Payload, Tensor, TensorSpec};
