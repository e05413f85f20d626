//! World hosting for the envlink protocol.
//!
//! A [`Server`] owns a [`WorldRegistry`] of live worlds, each run by its
//! own actor thread around a boxed [`WorldHooks`] built by the server's
//! [`WorldFactory`]. Every client stream is a [`Connection`] owning one
//! [`Session`], which walks the per-connection state machine and
//! translates between uid-keyed wire tensors and the name-keyed arrays
//! hooks see.
//!
//! World-wide resets are coordinated by a barrier that lives inside the
//! world actor, so a pending ResetWorld never stalls other sessions'
//! steps.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod barrier;
pub mod config;
pub mod connection;
pub mod error;
pub mod extension;
pub mod hooks;
mod property;
pub mod registry;
pub mod server;
pub mod session;
mod world;

pub use config::{ConfigError, DestroyPolicy, ServerConfig};
pub use connection::{ClientStream, Connection};
pub use error::{HookError, TransportError};
pub use extension::{ExtensionHandler, ExtensionRegistry};
pub use hooks::{
    CreatedWorld, NamedArrays, StepInput, StepKind, StepOutcome, WorldFactory, WorldHooks,
    WorldSpecs,
};
pub use registry::WorldRegistry;
pub use server::{Server, ServerBuilder};
pub use session::{Observations, Session};
