//! Benchmark fixtures and utilities for envlink.
//!
//! Provides pre-built specs and wire tensors for benchmarking and demos:
//!
//! - [`board_spec`]: a bounded float grid observation
//! - [`random_board`]: a dense tensor filling [`board_spec`], seeded
//! - [`uniform_board`]: the single-element broadcast form of a board
//! - [`agent_specs`] and [`agent_actions`]: many small action specs and a
//!   matching uid-keyed action map

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use envlink_core::{DataType, Payload, Tensor, TensorSpec, Uid};
use envlink_spec::SessionSpecs;
use indexmap::IndexMap;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A `rows` x `cols` float observation bounded to `[0, 1]`.
pub fn board_spec(rows: usize, cols: usize) -> TensorSpec {
    TensorSpec::new("board", DataType::Float, vec![rows as i64, cols as i64])
        .with_bounds(0.0f32, 1.0f32)
}

/// A dense board of values in `[0, 1)` drawn from `seed`.
pub fn random_board(rows: usize, cols: usize, seed: u64) -> Tensor {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let values: Vec<f32> = (0..rows * cols)
        .map(|_| (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32)
        .collect();
    Tensor::new(vec![rows as i64, cols as i64], Payload::from(values))
}

/// A board whose single payload element broadcasts over every cell.
pub fn uniform_board(rows: usize, cols: usize, value: f32) -> Tensor {
    Tensor::new(vec![rows as i64, cols as i64], Payload::from(vec![value]))
}

/// `n` scalar int32 actions named `agent_0` .. `agent_{n-1}`, bounded to
/// `[-1, 1]`.
pub fn agent_specs(n: usize) -> Vec<TensorSpec> {
    (0..n)
        .map(|i| TensorSpec::scalar(format!("agent_{i}"), DataType::Int32).with_bounds(-1i32, 1i32))
        .collect()
}

/// One wire action per entry of `specs.actions`, cycling through -1, 0, 1.
pub fn agent_actions(specs: &SessionSpecs) -> IndexMap<Uid, Tensor> {
    specs
        .actions
        .uids()
        .enumerate()
        .map(|(i, uid)| (uid, Tensor::scalar(i as i32 % 3 - 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use envlink_codec::{decode, validate};

    #[test]
    fn random_board_decodes_within_bounds() {
        let spec = board_spec(16, 8);
        let array = decode(&random_board(16, 8, 42), &spec).unwrap();
        assert_eq!(array.shape(), &[16, 8]);
        assert!(validate(&array, &spec).unwrap().is_empty());
    }

    #[test]
    fn random_board_deterministic() {
        assert_eq!(random_board(4, 4, 7), random_board(4, 4, 7));
        assert_ne!(random_board(4, 4, 7), random_board(4, 4, 8));
    }

    #[test]
    fn uniform_board_broadcasts() {
        let array = decode(&uniform_board(3, 3, 0.5), &board_spec(3, 3)).unwrap();
        assert_eq!(array.len(), 9);
    }

    #[test]
    fn agent_actions_cover_every_spec() {
        let specs = SessionSpecs::build(agent_specs(32), Vec::new()).unwrap();
        let actions = agent_actions(&specs);
        assert_eq!(actions.len(), 32);
        let unpacked = specs.actions.unpack(&actions).unwrap();
        assert_eq!(unpacked.len(), 32);
        assert!(unpacked.contains_key("agent_31"));
    }
}
