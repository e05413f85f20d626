//! In-memory property tree.

use std::collections::HashMap;

use envlink_core::{PropertyNode, Tensor};
use envlink_server::HookError;
use indexmap::IndexMap;

/// A flat map of dotted keys to nodes and their current values.
///
/// Parents are derived from keys: `"a.b.c"` is a child of `"a.b"`, and
/// top-level keys are children of the root `""`.
#[derive(Clone, Debug, Default)]
pub struct MemoryProperties {
    nodes: IndexMap<String, PropertyNode>,
    values: HashMap<String, Tensor>,
}

fn parent_of(key: &str) -> &str {
    key.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}

impl MemoryProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listable interior node.
    pub fn directory(&mut self, key: &str) -> &mut Self {
        self.nodes
            .insert(key.to_owned(), PropertyNode::directory(key));
        self
    }

    /// Add a leaf with its initial value.
    pub fn insert(&mut self, node: PropertyNode, value: impl Into<Tensor>) -> &mut Self {
        self.values.insert(node.key.clone(), value.into());
        self.nodes.insert(node.key.clone(), node);
        self
    }

    pub fn node(&self, key: &str) -> Option<PropertyNode> {
        self.nodes.get(key).cloned()
    }

    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.values.get(key)
    }

    pub fn read(&self, key: &str) -> Result<Tensor, HookError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| HookError::NotFound(format!("property `{key}` has no value")))
    }

    pub fn write(&mut self, key: &str, value: &Tensor) -> Result<(), HookError> {
        match self.values.get_mut(key) {
            Some(slot) => {
                *slot = value.clone();
                Ok(())
            }
            None => Err(HookError::NotFound(format!("property `{key}` has no value"))),
        }
    }

    /// Replace several values at once. Fails without changing anything
    /// if any key has no value.
    pub fn write_all(&mut self, values: &IndexMap<String, Tensor>) -> Result<(), HookError> {
        if let Some(key) = values.keys().find(|k| !self.values.contains_key(k.as_str())) {
            return Err(HookError::NotFound(format!("property `{key}` has no value")));
        }
        for (key, value) in values {
            self.values.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// Direct children of `key`, in insertion order.
    pub fn children(&self, key: &str) -> Vec<PropertyNode> {
        self.nodes
            .iter()
            .filter(|(k, _)| parent_of(k) == key)
            .map(|(_, node)| node.clone())
            .collect()
    }
}
