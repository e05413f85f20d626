//! Shape resolution: broadcast detection and variable-dimension inference.

use envlink_core::Shape;

use crate::error::CodecError;

/// A declared wire shape resolved against a payload length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedShape {
    /// Concrete dimensions.
    pub dims: Shape,
    /// Whether the single payload element must be repeated to fill
    /// `dims`.
    pub broadcast: bool,
}

impl ResolvedShape {
    /// Number of elements the resolved shape holds.
    pub fn len(&self) -> usize {
        element_count(&self.dims).unwrap_or(usize::MAX)
    }

    /// Whether the resolved shape holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Largest element count a single-element broadcast may expand to.
pub const MAX_BROADCAST_ELEMENTS: usize = 1 << 28;

/// Product of `dims`, or `None` if it overflows `usize`.
pub fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Resolve `declared` against a payload of `payload_len` elements.
///
/// Rules, in order:
///
/// 1. More than one negative dimension is ambiguous and always fails.
/// 2. A single-element payload whose declared shape (negatives read as 1)
///    holds other than one element is a broadcast; negatives become 1.
///    The expansion may hold at most [`MAX_BROADCAST_ELEMENTS`].
/// 3. One negative dimension is inferred from the payload length, which
///    must divide evenly by the product of the fixed dimensions.
/// 4. Otherwise the product of the declared shape must equal the payload
///    length.
///
/// A declared shape whose element count overflows `usize` is a shape
/// error.
pub fn resolve_shape(declared: &[i64], payload_len: usize) -> Result<ResolvedShape, CodecError> {
    let variable = declared.iter().filter(|&&d| d < 0).count();
    if variable > 1 {
        return Err(CodecError::shape(format!(
            "shape {declared:?} has {variable} variable dimensions, at most one is allowed"
        )));
    }

    let as_ones = declared
        .iter()
        .map(|&d| dim_or_one(d))
        .collect::<Option<Shape>>()
        .ok_or_else(|| too_large(declared))?;
    let product = element_count(&as_ones).ok_or_else(|| too_large(declared))?;

    if payload_len == 1 && product != 1 {
        if product > MAX_BROADCAST_ELEMENTS {
            return Err(CodecError::shape(format!(
                "broadcast to shape {declared:?} would hold {product} elements, the limit is {MAX_BROADCAST_ELEMENTS}"
            )));
        }
        return Ok(ResolvedShape {
            dims: as_ones,
            broadcast: true,
        });
    }

    if variable == 1 {
        // Negatives read as one, so the product over `as_ones` is the
        // product of the fixed dimensions.
        let fixed = product;
        if fixed == 0 {
            return Err(CodecError::shape(format!(
                "cannot infer the variable dimension of {declared:?}: fixed dimensions hold zero elements"
            )));
        }
        if payload_len % fixed != 0 {
            return Err(CodecError::shape(format!(
                "payload of {payload_len} elements does not divide into shape {declared:?}"
            )));
        }
        let inferred = payload_len / fixed;
        let dims = declared
            .iter()
            .zip(&as_ones)
            .map(|(&d, &one)| if d < 0 { inferred } else { one })
            .collect();
        return Ok(ResolvedShape {
            dims,
            broadcast: false,
        });
    }

    if product != payload_len {
        return Err(CodecError::shape(format!(
            "payload of {payload_len} elements does not fill shape {declared:?} ({product} elements)"
        )));
    }
    Ok(ResolvedShape {
        dims: as_ones,
        broadcast: false,
    })
}

/// Check resolved dimensions against a spec shape. Negative spec
/// dimensions accept any extent.
pub fn check_against_spec(dims: &[usize], spec_shape: &[i64]) -> Result<(), CodecError> {
    if dims.len() != spec_shape.len() {
        return Err(CodecError::shape(format!(
            "rank {} does not match spec shape {spec_shape:?}",
            dims.len()
        )));
    }
    for (axis, (&got, &want)) in dims.iter().zip(spec_shape).enumerate() {
        if want >= 0 && got as i64 != want {
            return Err(CodecError::shape(format!(
                "dimension {axis} is {got}, spec shape {spec_shape:?} requires {want}"
            )));
        }
    }
    Ok(())
}

fn dim_or_one(d: i64) -> Option<usize> {
    if d < 0 {
        Some(1)
    } else {
        usize::try_from(d).ok()
    }
}

fn too_large(declared: &[i64]) -> CodecError {
    CodecError::shape(format!("shape {declared:?} holds more elements than fit in memory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(r: &ResolvedShape) -> Vec<usize> {
        r.dims.to_vec()
    }

    #[test]
    fn exact_shape() {
        let r = resolve_shape(&[2, 3], 6).unwrap();
        assert_eq!(dims(&r), vec![2, 3]);
        assert!(!r.broadcast);
    }

    #[test]
    fn single_element_broadcasts() {
        let r = resolve_shape(&[2, 3], 1).unwrap();
        assert_eq!(dims(&r), vec![2, 3]);
        assert!(r.broadcast);
    }

    #[test]
    fn broadcast_reads_negative_as_one() {
        let r = resolve_shape(&[3, -1], 1).unwrap();
        assert_eq!(dims(&r), vec![3, 1]);
        assert!(r.broadcast);
    }

    #[test]
    fn scalar_shape_needs_one_element() {
        assert_eq!(dims(&resolve_shape(&[], 1).unwrap()), Vec::<usize>::new());
        assert!(resolve_shape(&[], 0).is_err());
        assert!(resolve_shape(&[], 2).is_err());
    }

    #[test]
    fn variable_dimension_inferred() {
        let r = resolve_shape(&[-1, 2], 6).unwrap();
        assert_eq!(dims(&r), vec![3, 2]);
        let r = resolve_shape(&[-1], 0).unwrap();
        assert_eq!(dims(&r), vec![0]);
    }

    #[test]
    fn variable_dimension_must_divide() {
        assert!(matches!(
            resolve_shape(&[-1, 4], 6),
            Err(CodecError::Shape { .. })
        ));
    }

    #[test]
    fn variable_dimension_with_zero_fixed_fails() {
        assert!(matches!(
            resolve_shape(&[0, -1], 4),
            Err(CodecError::Shape { .. })
        ));
    }

    #[test]
    fn two_negative_dimensions_always_fail() {
        assert!(resolve_shape(&[-1, -1], 4).is_err());
        assert!(resolve_shape(&[-1, -1], 1).is_err());
    }

    #[test]
    fn wrong_length_fails() {
        assert!(resolve_shape(&[2, 3], 5).is_err());
    }

    #[test]
    fn overflowing_shape_is_shape_error() {
        assert!(matches!(
            resolve_shape(&[i64::MAX, 4], 2),
            Err(CodecError::Shape { .. })
        ));
        assert!(matches!(
            resolve_shape(&[1 << 62, 4], 1),
            Err(CodecError::Shape { .. })
        ));
        assert!(matches!(
            resolve_shape(&[i64::MAX, 4, -1], 8),
            Err(CodecError::Shape { .. })
        ));
    }

    #[test]
    fn huge_broadcast_is_refused() {
        assert!(matches!(
            resolve_shape(&[1 << 40, 4], 1),
            Err(CodecError::Shape { .. })
        ));
        let at_limit = resolve_shape(&[MAX_BROADCAST_ELEMENTS as i64], 1).unwrap();
        assert!(at_limit.broadcast);
        assert_eq!(at_limit.len(), MAX_BROADCAST_ELEMENTS);
    }

    #[test]
    fn zero_sized_shape_never_overflows() {
        let r = resolve_shape(&[0, 1 << 40, 1 << 40], 0).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn spec_check_accepts_variable_axis() {
        assert!(check_against_spec(&[4, 2], &[-1, 2]).is_ok());
        assert!(check_against_spec(&[4, 3], &[-1, 2]).is_err());
        assert!(check_against_spec(&[4], &[-1, 2]).is_err());
    }
}
