//! Tensor codec for envlink.
//!
//! Converts between wire [`Tensor`](envlink_core::Tensor)s and decoded
//! [`Array`](envlink_core::Array)s under a
//! [`TensorSpec`](envlink_core::TensorSpec), including single-element
//! broadcast, variable-dimension inference, and bounds validation.
//!
//! Every function here is pure and safe to call concurrently.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod shape;
pub mod validate;

pub use decode::{decode, decode_unchecked, unpack_scalar};
pub use encode::{encode, encode_compressed, encode_unchecked};
pub use error::CodecError;
pub use shape::{element_count, resolve_shape, ResolvedShape, MAX_BROADCAST_ELEMENTS};
pub use validate::{bounds, validate, Bounds, RangeViolation, ViolationKind};
