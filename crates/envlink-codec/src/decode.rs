//! Wire tensor to decoded array.

use envlink_core::{Array, Element, Payload, Tensor, TensorSpec};

use crate::error::CodecError;
use crate::shape::{check_against_spec, resolve_shape, ResolvedShape};

/// Decode `tensor` under `spec`.
///
/// Shape is resolved first (broadcast, then variable inference, then the
/// fixed-length check), then checked against the spec's rank and fixed
/// dimensions, and only then is the payload type compared. Bounds are not
/// consulted; see [`validate`](crate::validate()).
pub fn decode(tensor: &Tensor, spec: &TensorSpec) -> Result<Array, CodecError> {
    if spec.shape.is_empty() && tensor.payload.len() != 1 {
        return Err(CodecError::shape(format!(
            "scalar spec `{}` requires exactly one element, got {}",
            spec.name,
            tensor.payload.len()
        )));
    }
    let resolved = resolve_shape(&tensor.shape, tensor.payload.len())?;
    check_against_spec(&resolved.dims, &spec.shape)?;
    if tensor.dtype() != spec.dtype {
        return Err(CodecError::Type {
            expected: spec.dtype,
            found: tensor.dtype(),
        });
    }
    materialize(&resolved, &tensor.payload)
}

/// Decode `tensor` against its own declared shape, with no spec.
///
/// Used for settings and spec-less property values.
pub fn decode_unchecked(tensor: &Tensor) -> Result<Array, CodecError> {
    let resolved = resolve_shape(&tensor.shape, tensor.payload.len())?;
    materialize(&resolved, &tensor.payload)
}

/// Extract the single value of a one-element tensor.
pub fn unpack_scalar<T: Element>(tensor: &Tensor) -> Result<T, CodecError> {
    let found = tensor.dtype();
    let values = tensor.payload.as_slice::<T>().ok_or(CodecError::Type {
        expected: T::DTYPE,
        found,
    })?;
    match values {
        [value] => Ok(value.clone()),
        _ => Err(CodecError::shape(format!(
            "expected a scalar, got {} elements",
            values.len()
        ))),
    }
}

fn materialize(resolved: &ResolvedShape, payload: &Payload) -> Result<Array, CodecError> {
    let data = if resolved.broadcast {
        payload
            .repeat_element(0, resolved.len())
            .ok_or_else(|| CodecError::shape("broadcast payload is empty"))?
    } else {
        payload.clone()
    };
    Array::new(&resolved.dims, data)
        .ok_or_else(|| CodecError::shape("resolved shape does not match payload length"))
}
