//! Spec registries for envlink sessions.
//!
//! A [`SpecRegistry`] assigns uids to one domain (actions or
//! observations) of named [`TensorSpec`](envlink_core::TensorSpec)s and
//! translates between uid-keyed wire tensors and name-keyed arrays. A
//! [`SessionSpecs`] pairs the two domains and is rebuilt, never mutated,
//! on every Join and Reset.
//!
//! [`nested`] holds the optional edge transform between dotted flat names
//! and nested trees.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod nested;
pub mod registry;

pub use error::SpecError;
pub use nested::{flatten, unflatten, Nested, NestingError, DEFAULT_SEPARATOR};
pub use registry::{Domain, SessionSpecs, SpecRegistry};
