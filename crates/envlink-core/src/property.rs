//! Property tree nodes.

use crate::tensor::TensorSpec;

/// One node in a world's hierarchical property namespace.
///
/// Keys are dotted paths. The root is the empty key and is always
/// listable.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyNode {
    /// Full dotted key.
    pub key: String,
    /// Whether ReadProperty is permitted.
    pub readable: bool,
    /// Whether WriteProperty is permitted.
    pub writable: bool,
    /// Whether ListProperty is permitted.
    pub listable: bool,
    /// Value contract, for leaf nodes.
    pub spec: Option<TensorSpec>,
    /// Free-form help text.
    pub description: String,
}

impl PropertyNode {
    /// A read-only leaf with a value spec.
    pub fn value(key: impl Into<String>, spec: TensorSpec) -> Self {
        Self {
            key: key.into(),
            readable: true,
            writable: false,
            listable: false,
            spec: Some(spec),
            description: String::new(),
        }
    }

    /// A listable interior node with no value.
    pub fn directory(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            readable: false,
            writable: false,
            listable: true,
            spec: None,
            description: String::new(),
        }
    }

    /// Permit writes.
    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Forbid reads (write-only leaf).
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self.writable = true;
        self
    }

    /// Attach help text.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether `self.key` is the root.
    pub fn is_root(&self) -> bool {
        self.key.is_empty()
    }
}
