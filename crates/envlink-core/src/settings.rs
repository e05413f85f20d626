//! Settings maps attached to CreateWorld, JoinWorld, Reset, and ResetWorld.

use std::collections::HashMap;

use crate::error::ProtocolError;
use crate::tensor::Tensor;

/// String-keyed tensor map. Keys are interpreted by the environment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings(HashMap<String, Tensor>);

impl Settings {
    /// An empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Tensor>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a setting, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Tensor>) -> Option<Tensor> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a setting.
    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.0.get(key)
    }

    /// Remove a setting.
    pub fn remove(&mut self, key: &str) -> Option<Tensor> {
        self.0.remove(key)
    }

    /// Look up a setting that must be present.
    pub fn require(&self, key: &str) -> Result<&Tensor, ProtocolError> {
        self.0.get(key).ok_or_else(|| {
            ProtocolError::validation(format!("missing required setting `{key}`")).with_field(key)
        })
    }

    /// Fail with a validation error naming the first key outside `known`.
    ///
    /// Keys are checked in sorted order so the reported key is stable.
    pub fn reject_unknown(&self, known: &[&str]) -> Result<(), ProtocolError> {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        match keys.into_iter().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(ProtocolError::validation(format!("unrecognised setting `{key}`"))
                .with_field(key.as_str())),
            None => Ok(()),
        }
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of settings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no settings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Tensor)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Settings {
    type Item = (String, Tensor);
    type IntoIter = std::collections::hash_map::IntoIter<String, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
