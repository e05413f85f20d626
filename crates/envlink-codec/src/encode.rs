//! Decoded array to wire tensor.

use envlink_core::{Array, Tensor, TensorSpec};

use crate::error::CodecError;
use crate::shape::check_against_spec;

/// Encode `array` under `spec`. Never compresses.
pub fn encode(array: &Array, spec: &TensorSpec) -> Result<Tensor, CodecError> {
    check_against_spec(array.shape(), &spec.shape)?;
    if array.dtype() != spec.dtype {
        return Err(CodecError::Type {
            expected: spec.dtype,
            found: array.dtype(),
        });
    }
    Ok(encode_unchecked(array))
}

/// Encode, collapsing a uniformly-filled array to a single-element
/// broadcast payload.
///
/// Scalars and single-element arrays are left as they are, since a
/// one-element payload over a one-element shape is not a broadcast.
pub fn encode_compressed(array: &Array, spec: &TensorSpec) -> Result<Tensor, CodecError> {
    let mut tensor = encode(array, spec)?;
    if tensor.payload.len() > 1 && tensor.payload.is_uniform() {
        if let Some(first) = tensor.payload.repeat_element(0, 1) {
            tensor.payload = first;
        }
    }
    Ok(tensor)
}

/// Encode with the array's own shape and no spec check.
pub fn encode_unchecked(array: &Array) -> Tensor {
    Tensor::new(
        array.shape().iter().map(|&d| d as i64).collect(),
        array.data().clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use envlink_core::{DataType, Payload};

    #[test]
    fn encode_keeps_full_payload() {
        let spec = TensorSpec::new("b", DataType::Float, vec![2, 2]);
        let a = Array::from_vec(&[2, 2], vec![0.5f32; 4]).unwrap();
        let t = encode(&a, &spec).unwrap();
        assert_eq!(t.shape, vec![2, 2]);
        assert_eq!(t.payload.len(), 4);
    }

    #[test]
    fn compressed_uniform_array_roundtrips() {
        let spec = TensorSpec::new("b", DataType::Float, vec![2, 2]);
        let a = Array::from_vec(&[2, 2], vec![0.5f32; 4]).unwrap();
        let t = encode_compressed(&a, &spec).unwrap();
        assert_eq!(t.payload, Payload::Floats(vec![0.5]));
        assert_eq!(decode(&t, &spec).unwrap(), a);
    }

    #[test]
    fn compressed_leaves_mixed_values() {
        let spec = TensorSpec::new("b", DataType::Int8, vec![3]);
        let a = Array::from_vec(&[3], vec![1i8, 2, 1]).unwrap();
        assert_eq!(encode_compressed(&a, &spec).unwrap().payload.len(), 3);
    }

    #[test]
    fn encode_checks_spec() {
        let spec = TensorSpec::new("b", DataType::Int8, vec![3]);
        let wrong_shape = Array::from_vec(&[2], vec![1i8, 2]).unwrap();
        assert!(matches!(encode(&wrong_shape, &spec), Err(CodecError::Shape { .. })));
        let wrong_type = Array::from_vec(&[3], vec![1u8, 2, 3]).unwrap();
        assert!(matches!(encode(&wrong_type, &spec), Err(CodecError::Type { .. })));
    }
}
