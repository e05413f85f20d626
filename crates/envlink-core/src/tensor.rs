//! Wire tensors, typed payloads, and tensor specs.
//!
//! A [`Tensor`] is what travels on the wire: a declared shape (which may
//! carry negative "infer me" dimensions) plus exactly one typed payload.
//! A [`TensorSpec`] is the server-advertised contract for one named
//! action or observation.

use std::fmt;

// ── DataType ────────────────────────────────────────────────────

/// Element type of a payload or spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
}

impl DataType {
    /// All data types, in wire-table order.
    pub const ALL: [DataType; 10] = [
        Self::Float,
        Self::Double,
        Self::Int8,
        Self::Int32,
        Self::Int64,
        Self::Uint8,
        Self::Uint32,
        Self::Uint64,
        Self::Bool,
        Self::String,
    ];

    /// Whether values of this type are ordered and may carry bounds.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Bool | Self::String)
    }

    /// Lowercase name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Double => "double",
            Self::Int8 => "int8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Bool => "bool",
            Self::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Payload ─────────────────────────────────────────────────────

/// Flat, row-major element storage of exactly one [`DataType`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// 32-bit floats.
    Floats(Vec<f32>),
    /// 64-bit floats.
    Doubles(Vec<f64>),
    /// Signed 8-bit integers.
    Int8s(Vec<i8>),
    /// Signed 32-bit integers.
    Int32s(Vec<i32>),
    /// Signed 64-bit integers.
    Int64s(Vec<i64>),
    /// Unsigned 8-bit integers.
    Uint8s(Vec<u8>),
    /// Unsigned 32-bit integers.
    Uint32s(Vec<u32>),
    /// Unsigned 64-bit integers.
    Uint64s(Vec<u64>),
    /// Booleans.
    Bools(Vec<bool>),
    /// Strings.
    Strings(Vec<String>),
}

/// Evaluate `$body` with `$v` bound to the inner `Vec` of any payload
/// variant. Every arm must produce the same type.
#[macro_export]
macro_rules! with_payload {
    ($payload:expr, $v:ident => $body:expr) => {
        match $payload {
            $crate::Payload::Floats($v) => $body,
            $crate::Payload::Doubles($v) => $body,
            $crate::Payload::Int8s($v) => $body,
            $crate::Payload::Int32s($v) => $body,
            $crate::Payload::Int64s($v) => $body,
            $crate::Payload::Uint8s($v) => $body,
            $crate::Payload::Uint32s($v) => $body,
            $crate::Payload::Uint64s($v) => $body,
            $crate::Payload::Bools($v) => $body,
            $crate::Payload::Strings($v) => $body,
        }
    };
}

/// Like [`with_payload!`], but wraps `$body` back into the same payload
/// variant it came from.
#[macro_export]
macro_rules! map_payload {
    ($payload:expr, $v:ident => $body:expr) => {
        match $payload {
            $crate::Payload::Floats($v) => $crate::Payload::Floats($body),
            $crate::Payload::Doubles($v) => $crate::Payload::Doubles($body),
            $crate::Payload::Int8s($v) => $crate::Payload::Int8s($body),
            $crate::Payload::Int32s($v) => $crate::Payload::Int32s($body),
            $crate::Payload::Int64s($v) => $crate::Payload::Int64s($body),
            $crate::Payload::Uint8s($v) => $crate::Payload::Uint8s($body),
            $crate::Payload::Uint32s($v) => $crate::Payload::Uint32s($body),
            $crate::Payload::Uint64s($v) => $crate::Payload::Uint64s($body),
            $crate::Payload::Bools($v) => $crate::Payload::Bools($body),
            $crate::Payload::Strings($v) => $crate::Payload::Strings($body),
        }
    };
}

impl Payload {
    /// An empty payload of the given type.
    pub fn empty(dtype: DataType) -> Self {
        match dtype {
            DataType::Float => Self::Floats(Vec::new()),
            DataType::Double => Self::Doubles(Vec::new()),
            DataType::Int8 => Self::Int8s(Vec::new()),
            DataType::Int32 => Self::Int32s(Vec::new()),
            DataType::Int64 => Self::Int64s(Vec::new()),
            DataType::Uint8 => Self::Uint8s(Vec::new()),
            DataType::Uint32 => Self::Uint32s(Vec::new()),
            DataType::Uint64 => Self::Uint64s(Vec::new()),
            DataType::Bool => Self::Bools(Vec::new()),
            DataType::String => Self::Strings(Vec::new()),
        }
    }

    /// Element type of this payload.
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Floats(_) => DataType::Float,
            Self::Doubles(_) => DataType::Double,
            Self::Int8s(_) => DataType::Int8,
            Self::Int32s(_) => DataType::Int32,
            Self::Int64s(_) => DataType::Int64,
            Self::Uint8s(_) => DataType::Uint8,
            Self::Uint32s(_) => DataType::Uint32,
            Self::Uint64s(_) => DataType::Uint64,
            Self::Bools(_) => DataType::Bool,
            Self::Strings(_) => DataType::String,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        with_payload!(self, v => v.len())
    }

    /// Whether the payload holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A payload of `count` copies of element `index`, or `None` if
    /// `index` is out of range.
    pub fn repeat_element(&self, index: usize, count: usize) -> Option<Payload> {
        if index >= self.len() {
            return None;
        }
        Some(map_payload!(self, v => vec![v[index].clone(); count]))
    }

    /// Whether every element equals the first one. Empty payloads are
    /// not uniform.
    pub fn is_uniform(&self) -> bool {
        with_payload!(self, v => match v.split_first() {
            Some((first, rest)) => rest.iter().all(|x| x == first),
            None => false,
        })
    }

    /// Render element `index` for diagnostics.
    pub fn element_to_string(&self, index: usize) -> Option<String> {
        with_payload!(self, v => v.get(index).map(|x| format!("{x:?}")))
    }

    /// Borrow the elements as a typed slice, if the type matches.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(self)
    }
}

// ── Element ─────────────────────────────────────────────────────

/// A Rust scalar type that maps onto exactly one [`DataType`].
pub trait Element: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The wire data type for this element.
    const DTYPE: DataType;

    /// Wrap owned values into the matching payload variant.
    fn wrap(values: Vec<Self>) -> Payload;

    /// Borrow the payload's elements if it holds this type.
    fn view(payload: &Payload) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:ident, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DataType = DataType::$dtype;

            fn wrap(values: Vec<Self>) -> Payload {
                Payload::$variant(values)
            }

            fn view(payload: &Payload) -> Option<&[Self]> {
                match payload {
                    Payload::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<Vec<$ty>> for Payload {
            fn from(values: Vec<$ty>) -> Self {
                Payload::$variant(values)
            }
        }

        impl From<$ty> for Tensor {
            fn from(value: $ty) -> Self {
                Tensor::scalar(value)
            }
        }
    };
}

impl_element!(f32, Float, Floats);
impl_element!(f64, Double, Doubles);
impl_element!(i8, Int8, Int8s);
impl_element!(i32, Int32, Int32s);
impl_element!(i64, Int64, Int64s);
impl_element!(u8, Uint8, Uint8s);
impl_element!(u32, Uint32, Uint32s);
impl_element!(u64, Uint64, Uint64s);
impl_element!(bool, Bool, Bools);
impl_element!(String, String, Strings);

impl From<&str> for Tensor {
    fn from(value: &str) -> Self {
        Tensor::scalar(value.to_owned())
    }
}

// ── Tensor ──────────────────────────────────────────────────────

/// A wire tensor: declared shape plus a flat row-major payload.
///
/// The shape may contain at most one negative entry, meaning "infer this
/// dimension from the payload length". A payload of a single element
/// whose count does not match the shape is a broadcast request.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    /// Declared dimensions. Empty for a scalar.
    pub shape: Vec<i64>,
    /// Element storage.
    pub payload: Payload,
}

impl Tensor {
    /// Build a tensor from a shape and payload.
    pub fn new(shape: Vec<i64>, payload: Payload) -> Self {
        Self { shape, payload }
    }

    /// A rank-0 tensor holding one value.
    pub fn scalar<T: Element>(value: T) -> Self {
        Self {
            shape: Vec::new(),
            payload: T::wrap(vec![value]),
        }
    }

    /// A rank-1 tensor whose length is the number of values.
    pub fn vector<T: Element>(values: Vec<T>) -> Self {
        Self {
            shape: vec![values.len() as i64],
            payload: T::wrap(values),
        }
    }

    /// Element type of the payload.
    pub fn dtype(&self) -> DataType {
        self.payload.dtype()
    }

    /// Read a rank-0, single-element tensor of type `T`.
    pub fn as_scalar<T: Element>(&self) -> Option<&T> {
        match self.payload.as_slice::<T>() {
            Some([value]) if self.shape.iter().all(|&d| d == 1) => Some(value),
            _ => None,
        }
    }
}

// ── TensorSpec ──────────────────────────────────────────────────

/// Server-advertised contract for one action or observation.
///
/// `shape` entries may be negative ("variable" dimensions). At most one
/// variable dimension is permitted; registries reject anything else.
/// `min`/`max` are either single-element (scalar bound) or hold one
/// element per cell of the fixed shape.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorSpec {
    /// Unique name within its registry.
    pub name: String,
    /// Element type.
    pub dtype: DataType,
    /// Dimensions. Negative entries are variable.
    pub shape: Vec<i64>,
    /// Optional lower bound, numeric types only.
    pub min: Option<Payload>,
    /// Optional upper bound, numeric types only.
    pub max: Option<Payload>,
}

impl TensorSpec {
    /// An unbounded spec with the given shape.
    pub fn new(name: impl Into<String>, dtype: DataType, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
            min: None,
            max: None,
        }
    }

    /// An unbounded rank-0 spec.
    pub fn scalar(name: impl Into<String>, dtype: DataType) -> Self {
        Self::new(name, dtype, Vec::new())
    }

    /// Attach a lower bound.
    pub fn with_min(mut self, min: Payload) -> Self {
        self.min = Some(min);
        self
    }

    /// Attach an upper bound.
    pub fn with_max(mut self, max: Payload) -> Self {
        self.max = Some(max);
        self
    }

    /// Attach scalar bounds on both sides.
    pub fn with_bounds<T: Element>(self, min: T, max: T) -> Self {
        self.with_min(T::wrap(vec![min])).with_max(T::wrap(vec![max]))
    }

    /// Number of negative (variable) dimensions.
    pub fn variable_dims(&self) -> usize {
        self.shape.iter().filter(|&&d| d < 0).count()
    }

    /// Element count of the fixed shape, or `None` if any dimension is
    /// variable or the count overflows.
    pub fn fixed_len(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(usize::try_from(d).ok()?))
    }
}
