//! Decoded, fully-resolved multidimensional arrays.

use smallvec::SmallVec;

use crate::tensor::{DataType, Element, Payload};

/// Resolved dimensions. Most tensors are rank four or lower.
pub type Shape = SmallVec<[usize; 4]>;

/// A dense row-major array with a concrete shape.
///
/// Unlike a wire [`Tensor`](crate::Tensor), every dimension is known and
/// the payload length always equals the product of the shape. A rank-0
/// array holds exactly one element.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    shape: Shape,
    data: Payload,
}

impl Array {
    /// Build an array, or `None` if the payload length does not match
    /// the product of `shape` or that product overflows.
    pub fn new(shape: &[usize], data: Payload) -> Option<Self> {
        let expected = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
        if expected != data.len() {
            return None;
        }
        Some(Self {
            shape: Shape::from_slice(shape),
            data,
        })
    }

    /// A rank-0 array.
    pub fn scalar<T: Element>(value: T) -> Self {
        Self {
            shape: Shape::new(),
            data: T::wrap(vec![value]),
        }
    }

    /// Typed constructor; `None` on a length mismatch.
    pub fn from_vec<T: Element>(shape: &[usize], values: Vec<T>) -> Option<Self> {
        Self::new(shape, T::wrap(values))
    }

    /// Dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Flat element storage.
    pub fn data(&self) -> &Payload {
        &self.data
    }

    /// Consume into the flat element storage.
    pub fn into_data(self) -> Payload {
        self.data
    }

    /// Element type.
    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether any dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the elements as a typed slice.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        self.data.as_slice::<T>()
    }

    /// Row-major strides of this array, in elements.
    pub fn strides(&self) -> Shape {
        row_major_strides(&self.shape)
    }

    /// Row-major flat offset of a multi-index, or `None` if the index has
    /// the wrong rank or is out of range.
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let strides = self.strides();
        index
            .iter()
            .zip(self.shape.iter().zip(strides.iter()))
            .try_fold(0usize, |acc, (&i, (&dim, &stride))| {
                if i >= dim {
                    return None;
                }
                i.checked_mul(stride).and_then(|step| acc.checked_add(step))
            })
    }

    /// Typed element access by multi-index.
    pub fn get<T: Element>(&self, index: &[usize]) -> Option<&T> {
        let offset = self.offset(index)?;
        self.as_slice::<T>()?.get(offset)
    }

    /// Multi-index of a flat row-major offset.
    pub fn unravel(&self, mut offset: usize) -> Option<Shape> {
        if offset >= self.len() {
            return None;
        }
        let strides = self.strides();
        let mut index = Shape::with_capacity(self.shape.len());
        for stride in strides {
            index.push(offset / stride);
            offset %= stride;
        }
        Some(index)
    }
}

/// Row-major strides for `shape`, in elements.
///
/// Zero-sized dimensions yield a stride of at least one so that offset
/// arithmetic never divides by zero. Strides of an empty array with huge
/// trailing dimensions saturate at `usize::MAX`.
pub fn row_major_strides(shape: &[usize]) -> Shape {
    let mut strides: Shape = smallvec::smallvec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1].saturating_mul(shape[i + 1].max(1));
    }
    strides
}
