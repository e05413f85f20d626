//! Property tests for the tensor codec.

use envlink_codec::{decode, encode, CodecError};
use envlink_core::{Array, DataType, Payload, Tensor, TensorSpec};
use proptest::prelude::*;

fn small_shape() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 0..4)
}

proptest! {
    #[test]
    fn fixed_shape_roundtrip(shape in small_shape(), seed in any::<i32>()) {
        let len: usize = shape.iter().product();
        let values: Vec<i32> = (0..len as i32).map(|i| i.wrapping_mul(31).wrapping_add(seed)).collect();
        let spec = TensorSpec::new("x", DataType::Int32, shape.iter().map(|&d| d as i64).collect());
        let array = Array::from_vec(&shape, values).unwrap();
        let tensor = encode(&array, &spec).unwrap();
        prop_assert_eq!(decode(&tensor, &spec).unwrap(), array);
    }

    #[test]
    fn single_value_broadcasts_to_any_shape(shape in prop::collection::vec(1usize..5, 1..4), v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let len: usize = shape.iter().product();
        prop_assume!(len != 1);
        let dims: Vec<i64> = shape.iter().map(|&d| d as i64).collect();
        let spec = TensorSpec::new("x", DataType::Double, dims.clone());
        let tensor = Tensor::new(dims, Payload::Doubles(vec![v]));
        let array = decode(&tensor, &spec).unwrap();
        prop_assert_eq!(array.shape(), &shape[..]);
        prop_assert!(array.as_slice::<f64>().unwrap().iter().all(|&x| x == v));
    }

    #[test]
    fn variable_dimension_inference(rows in 1usize..6, cols in 1usize..6) {
        let values: Vec<u8> = (0..(rows * cols) as u8).collect();
        let spec = TensorSpec::new("x", DataType::Uint8, vec![rows as i64, -1]);
        let tensor = Tensor::new(vec![rows as i64, -1], Payload::Uint8s(values));
        let array = decode(&tensor, &spec).unwrap();
        prop_assert_eq!(array.shape(), &[rows, cols][..]);
    }

    #[test]
    fn two_negative_dims_always_rejected(len in 0usize..32) {
        let spec = TensorSpec::new("x", DataType::Uint32, vec![-1, -1]);
        let tensor = Tensor::new(vec![-1, -1], Payload::Uint32s(vec![0; len]));
        let is_shape_error = matches!(decode(&tensor, &spec), Err(CodecError::Shape { .. }));
        prop_assert!(is_shape_error);
    }
}
