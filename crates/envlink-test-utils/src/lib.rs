//! Reference worlds and fixtures for envlink development.
//!
//! Provides two [`WorldFactory`](envlink_server::WorldFactory)
//! implementations for tests and demos: [`CounterFactory`], a fully
//! deterministic world that reports every hook call on a channel so tests
//! can synchronise on world-side events, and [`CatchFactory`], the
//! single-world Catch game. [`MemoryProperties`] is a small in-memory
//! property tree either can expose.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod catch;
pub mod client;
pub mod counter;
pub mod properties;

pub use catch::{CatchFactory, CatchGame, CatchWorld};
pub use counter::{CounterFactory, CounterWorld, HookEvent, ECHO_EXTENSION};
pub use properties::MemoryProperties;

use envlink_core::{Settings, Tensor, Uid};
use indexmap::IndexMap;

/// Settings from `(key, value)` pairs.
pub fn settings<const N: usize>(pairs: [(&str, Tensor); N]) -> Settings {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
}

/// Uid-keyed tensors from `(uid, value)` pairs.
pub fn tensors<const N: usize>(pairs: [(u64, Tensor); N]) -> IndexMap<Uid, Tensor> {
    pairs.into_iter().map(|(uid, t)| (Uid(uid), t)).collect()
}

/// Uids from raw values.
pub fn uids(raw: &[u64]) -> Vec<Uid> {
    raw.iter().copied().map(Uid).collect()
}
