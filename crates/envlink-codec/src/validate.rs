//! Advisory range checks against spec bounds.
//!
//! Decoding never rejects on range. Callers that care run [`validate`]
//! separately on an already-decoded array and decide what to do with the
//! reported violations.

use envlink_core::{Array, DataType, Element, Payload, TensorSpec};

use crate::error::CodecError;

/// Inclusive bounds of a numeric spec, checked for consistency.
///
/// Each side is either absent, a single element applying to every cell,
/// or one element per cell of the spec's fixed shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    /// Spec dtype; every present side has this dtype.
    pub dtype: DataType,
    /// Lower bound.
    pub min: Option<Payload>,
    /// Upper bound.
    pub max: Option<Payload>,
}

impl Bounds {
    /// Whether neither side is set.
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Which side of the bounds an element fell outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// Below `min`.
    BelowMin,
    /// Above `max`.
    AboveMax,
}

/// One out-of-range element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeViolation {
    /// Flat row-major offset of the element.
    pub index: usize,
    /// Which bound was crossed.
    pub kind: ViolationKind,
    /// Human-readable detail.
    pub reason: String,
}

/// Resolve and sanity-check the bounds carried by `spec`.
pub fn bounds(spec: &TensorSpec) -> Result<Bounds, CodecError> {
    let resolved = Bounds {
        dtype: spec.dtype,
        min: spec.min.clone(),
        max: spec.max.clone(),
    };
    if resolved.is_unbounded() {
        return Ok(resolved);
    }
    if !spec.dtype.is_numeric() {
        return Err(CodecError::NonNumeric { dtype: spec.dtype });
    }
    for side in [&resolved.min, &resolved.max].into_iter().flatten() {
        if side.dtype() != spec.dtype {
            return Err(CodecError::Type {
                expected: spec.dtype,
                found: side.dtype(),
            });
        }
        if side.len() != 1 && Some(side.len()) != spec.fixed_len() {
            return Err(CodecError::shape(format!(
                "bounds of `{}` hold {} elements, expected 1 or one per cell of {:?}",
                spec.name,
                side.len(),
                spec.shape
            )));
        }
    }
    if let (Some(min), Some(max)) = (&resolved.min, &resolved.max) {
        check_ordered(min, max)?;
    }
    Ok(resolved)
}

/// Report every element of `array` outside `spec`'s bounds.
pub fn validate(array: &Array, spec: &TensorSpec) -> Result<Vec<RangeViolation>, CodecError> {
    if array.dtype() != spec.dtype {
        return Err(CodecError::Type {
            expected: spec.dtype,
            found: array.dtype(),
        });
    }
    let b = bounds(spec)?;
    if b.is_unbounded() {
        return Ok(Vec::new());
    }
    for side in [&b.min, &b.max].into_iter().flatten() {
        if side.len() != 1 && side.len() != array.len() {
            return Err(CodecError::shape(format!(
                "per-element bounds hold {} elements, array holds {}",
                side.len(),
                array.len()
            )));
        }
    }
    Ok(match array.data() {
        Payload::Floats(v) => typed_violations(v, &b),
        Payload::Doubles(v) => typed_violations(v, &b),
        Payload::Int8s(v) => typed_violations(v, &b),
        Payload::Int32s(v) => typed_violations(v, &b),
        Payload::Int64s(v) => typed_violations(v, &b),
        Payload::Uint8s(v) => typed_violations(v, &b),
        Payload::Uint32s(v) => typed_violations(v, &b),
        Payload::Uint64s(v) => typed_violations(v, &b),
        Payload::Bools(_) | Payload::Strings(_) => Vec::new(),
    })
}

fn bound_at<T>(bound: &[T], index: usize) -> &T {
    if bound.len() == 1 {
        &bound[0]
    } else {
        &bound[index]
    }
}

fn typed_violations<T: Element + PartialOrd>(data: &[T], b: &Bounds) -> Vec<RangeViolation> {
    let min = b.min.as_ref().and_then(|p| p.as_slice::<T>());
    let max = b.max.as_ref().and_then(|p| p.as_slice::<T>());
    let mut out = Vec::new();
    for (index, value) in data.iter().enumerate() {
        if let Some(min) = min {
            let limit = bound_at(min, index);
            if value < limit {
                out.push(RangeViolation {
                    index,
                    kind: ViolationKind::BelowMin,
                    reason: format!("element {index} is {value:?}, below minimum {limit:?}"),
                });
                continue;
            }
        }
        if let Some(max) = max {
            let limit = bound_at(max, index);
            if value > limit {
                out.push(RangeViolation {
                    index,
                    kind: ViolationKind::AboveMax,
                    reason: format!("element {index} is {value:?}, above maximum {limit:?}"),
                });
            }
        }
    }
    out
}

fn check_ordered(min: &Payload, max: &Payload) -> Result<(), CodecError> {
    match min {
        Payload::Floats(v) => ordered(v, max),
        Payload::Doubles(v) => ordered(v, max),
        Payload::Int8s(v) => ordered(v, max),
        Payload::Int32s(v) => ordered(v, max),
        Payload::Int64s(v) => ordered(v, max),
        Payload::Uint8s(v) => ordered(v, max),
        Payload::Uint32s(v) => ordered(v, max),
        Payload::Uint64s(v) => ordered(v, max),
        Payload::Bools(_) | Payload::Strings(_) => Ok(()),
    }
}

fn ordered<T: Element + PartialOrd>(min: &[T], max: &Payload) -> Result<(), CodecError> {
    let Some(max) = max.as_slice::<T>() else {
        return Err(CodecError::Type {
            expected: T::DTYPE,
            found: max.dtype(),
        });
    };
    for index in 0..min.len().max(max.len()) {
        let (lo, hi) = (bound_at(min, index), bound_at(max, index));
        if lo > hi {
            return Err(CodecError::bounds(format!(
                "minimum {lo:?} exceeds maximum {hi:?} at element {index}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paddle() -> TensorSpec {
        TensorSpec::scalar("paddle", DataType::Int8).with_bounds(-1i8, 1i8)
    }

    #[test]
    fn in_range_reports_nothing() {
        let a = Array::scalar(0i8);
        assert!(validate(&a, &paddle()).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_reported_with_index() {
        let spec = TensorSpec::new("v", DataType::Int32, vec![3]).with_bounds(0i32, 10i32);
        let a = Array::from_vec(&[3], vec![5i32, -2, 11]).unwrap();
        let v = validate(&a, &spec).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!((v[0].index, v[0].kind), (1, ViolationKind::BelowMin));
        assert_eq!((v[1].index, v[1].kind), (2, ViolationKind::AboveMax));
    }

    #[test]
    fn per_element_bounds() {
        let spec = TensorSpec::new("v", DataType::Float, vec![2])
            .with_min(Payload::Floats(vec![0.0, 10.0]))
            .with_max(Payload::Floats(vec![1.0, 20.0]));
        let a = Array::from_vec(&[2], vec![0.5f32, 5.0]).unwrap();
        let v = validate(&a, &spec).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].index, 1);
    }

    #[test]
    fn non_numeric_bounds_are_type_errors() {
        let spec = TensorSpec::scalar("s", DataType::String)
            .with_min(Payload::Strings(vec!["a".into()]));
        assert!(matches!(bounds(&spec), Err(CodecError::NonNumeric { .. })));
        assert!(bounds(&TensorSpec::scalar("s", DataType::String)).is_ok());
    }

    #[test]
    fn mismatched_bound_dtype() {
        let spec = TensorSpec::scalar("x", DataType::Int32).with_min(Payload::Int64s(vec![0]));
        assert!(matches!(bounds(&spec), Err(CodecError::Type { .. })));
    }

    #[test]
    fn per_element_length_mismatch() {
        let spec = TensorSpec::new("x", DataType::Int32, vec![3])
            .with_min(Payload::Int32s(vec![0, 0]));
        assert!(matches!(bounds(&spec), Err(CodecError::Shape { .. })));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let spec = TensorSpec::scalar("x", DataType::Double).with_bounds(2.0f64, 1.0f64);
        assert!(matches!(bounds(&spec), Err(CodecError::InvalidBounds { .. })));
    }
}
