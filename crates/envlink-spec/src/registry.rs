//! Uid-keyed spec registries.

use std::collections::HashMap;
use std::fmt;

use envlink_codec::{decode, encode};
use envlink_core::{ActionObservationSpecs, Array, Tensor, TensorSpec, Uid};
use indexmap::IndexMap;

use crate::error::SpecError;

/// Which half of a session's specs a registry covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Agent-to-world values.
    Actions,
    /// World-to-agent values.
    Observations,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Actions => "action",
            Self::Observations => "observation",
        })
    }
}

/// Immutable uid ↔ name ↔ spec table for one domain.
///
/// Uids are assigned sequentially from 1 in the order specs are supplied
/// and are only stable until the next rebuild.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecRegistry {
    domain: Domain,
    by_uid: IndexMap<Uid, TensorSpec>,
    by_name: HashMap<String, Uid>,
}

impl SpecRegistry {
    /// An empty registry.
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            by_uid: IndexMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Assign uids to `specs`.
    ///
    /// # Errors
    ///
    /// [`SpecError::DuplicateName`] if two specs share a name, or
    /// [`SpecError::TooManyVariableDims`] if a spec has more than one
    /// negative dimension.
    pub fn build(
        domain: Domain,
        specs: impl IntoIterator<Item = TensorSpec>,
    ) -> Result<Self, SpecError> {
        Self::from_pairs(
            domain,
            specs
                .into_iter()
                .enumerate()
                .map(|(i, spec)| (Uid(i as u64 + 1), spec)),
        )
    }

    /// Rebuild a registry from server-assigned uids, as a client would on
    /// receiving a Join or Reset response.
    pub fn from_wire(domain: Domain, specs: &IndexMap<Uid, TensorSpec>) -> Result<Self, SpecError> {
        Self::from_pairs(
            domain,
            specs.iter().map(|(uid, spec)| (*uid, spec.clone())),
        )
    }

    fn from_pairs(
        domain: Domain,
        pairs: impl Iterator<Item = (Uid, TensorSpec)>,
    ) -> Result<Self, SpecError> {
        let mut registry = Self::empty(domain);
        for (uid, spec) in pairs {
            let count = spec.variable_dims();
            if count > 1 {
                return Err(SpecError::TooManyVariableDims {
                    domain,
                    name: spec.name,
                    count,
                });
            }
            if registry.by_name.contains_key(&spec.name) {
                return Err(SpecError::DuplicateName {
                    domain,
                    name: spec.name,
                });
            }
            registry.by_name.insert(spec.name.clone(), uid);
            registry.by_uid.insert(uid, spec);
        }
        Ok(registry)
    }

    /// The domain this registry covers.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Name of `uid`.
    pub fn name_of(&self, uid: Uid) -> Result<&str, SpecError> {
        self.by_uid
            .get(&uid)
            .map(|s| s.name.as_str())
            .ok_or(SpecError::UnknownUid {
                domain: self.domain,
                uid,
            })
    }

    /// Uid of `name`.
    pub fn uid_of(&self, name: &str) -> Result<Uid, SpecError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SpecError::UnknownName {
                domain: self.domain,
                name: name.to_owned(),
            })
    }

    /// Spec for `uid`.
    pub fn spec(&self, uid: Uid) -> Option<&TensorSpec> {
        self.by_uid.get(&uid)
    }

    /// Spec for `name`.
    pub fn spec_by_name(&self, name: &str) -> Option<&TensorSpec> {
        self.by_name.get(name).and_then(|uid| self.by_uid.get(uid))
    }

    /// Uids in assignment order.
    pub fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.by_uid.keys().copied()
    }

    /// Names in uid order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_uid.values().map(|s| s.name.as_str())
    }

    /// `(uid, spec)` pairs in uid order.
    pub fn iter(&self) -> impl Iterator<Item = (Uid, &TensorSpec)> {
        self.by_uid.iter().map(|(uid, spec)| (*uid, spec))
    }

    /// Number of specs.
    pub fn len(&self) -> usize {
        self.by_uid.len()
    }

    /// Whether the registry holds no specs.
    pub fn is_empty(&self) -> bool {
        self.by_uid.is_empty()
    }

    /// Decode uid-keyed tensors into name-keyed arrays.
    pub fn unpack(&self, tensors: &IndexMap<Uid, Tensor>) -> Result<IndexMap<String, Array>, SpecError> {
        let mut out = IndexMap::with_capacity(tensors.len());
        for (&uid, tensor) in tensors {
            let spec = self.spec(uid).ok_or(SpecError::UnknownUid {
                domain: self.domain,
                uid,
            })?;
            let array = decode(tensor, spec).map_err(|source| SpecError::Codec {
                domain: self.domain,
                name: spec.name.clone(),
                source,
            })?;
            out.insert(spec.name.clone(), array);
        }
        Ok(out)
    }

    /// Encode name-keyed arrays into uid-keyed tensors.
    pub fn pack(&self, arrays: &IndexMap<String, Array>) -> Result<IndexMap<Uid, Tensor>, SpecError> {
        let mut out = IndexMap::with_capacity(arrays.len());
        for (name, array) in arrays {
            let uid = self.uid_of(name)?;
            out.insert(uid, self.encode_one(uid, array)?);
        }
        Ok(out)
    }

    /// Encode one array under the spec for `uid`.
    pub fn encode_one(&self, uid: Uid, array: &Array) -> Result<Tensor, SpecError> {
        let spec = self.spec(uid).ok_or(SpecError::UnknownUid {
            domain: self.domain,
            uid,
        })?;
        encode(array, spec).map_err(|source| SpecError::Codec {
            domain: self.domain,
            name: spec.name.clone(),
            source,
        })
    }

    /// Wire form of the table.
    pub fn to_wire(&self) -> IndexMap<Uid, TensorSpec> {
        self.by_uid.clone()
    }
}

/// The action and observation registries of one session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSpecs {
    /// Action registry.
    pub actions: SpecRegistry,
    /// Observation registry.
    pub observations: SpecRegistry,
}

impl SessionSpecs {
    /// Build both registries.
    pub fn build(
        actions: impl IntoIterator<Item = TensorSpec>,
        observations: impl IntoIterator<Item = TensorSpec>,
    ) -> Result<Self, SpecError> {
        Ok(Self {
            actions: SpecRegistry::build(Domain::Actions, actions)?,
            observations: SpecRegistry::build(Domain::Observations, observations)?,
        })
    }

    /// Rebuild both registries from a Join or Reset response.
    pub fn from_wire(specs: &ActionObservationSpecs) -> Result<Self, SpecError> {
        Ok(Self {
            actions: SpecRegistry::from_wire(Domain::Actions, &specs.actions)?,
            observations: SpecRegistry::from_wire(Domain::Observations, &specs.observations)?,
        })
    }

    /// Wire form of both registries.
    pub fn to_wire(&self) -> ActionObservationSpecs {
        ActionObservationSpecs {
            actions: self.actions.to_wire(),
            observations: self.observations.to_wire(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envlink_core::{DataType, Payload};

    fn catch_observations() -> Vec<TensorSpec> {
        vec![
            TensorSpec::new("board", DataType::Float, vec![10, 5]),
            TensorSpec::scalar("reward", DataType::Float),
        ]
    }

    #[test]
    fn uids_assigned_from_one() {
        let r = SpecRegistry::build(Domain::Observations, catch_observations()).unwrap();
        assert_eq!(r.uid_of("board").unwrap(), Uid(1));
        assert_eq!(r.uid_of("reward").unwrap(), Uid(2));
        assert_eq!(r.name_of(Uid(2)).unwrap(), "reward");
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["board", "reward"]);
    }

    #[test]
    fn duplicate_names_rejected() {
        let specs = vec![
            TensorSpec::scalar("a", DataType::Int8),
            TensorSpec::scalar("a", DataType::Int32),
        ];
        assert!(matches!(
            SpecRegistry::build(Domain::Actions, specs),
            Err(SpecError::DuplicateName { .. })
        ));
    }

    #[test]
    fn same_name_allowed_across_domains() {
        let s = SessionSpecs::build(
            vec![TensorSpec::scalar("x", DataType::Int8)],
            vec![TensorSpec::scalar("x", DataType::Int8)],
        );
        assert!(s.is_ok());
    }

    #[test]
    fn multiple_variable_dims_rejected() {
        let specs = vec![TensorSpec::new("grid", DataType::Uint8, vec![-1, -1])];
        assert!(matches!(
            SpecRegistry::build(Domain::Observations, specs),
            Err(SpecError::TooManyVariableDims { count: 2, .. })
        ));
    }

    #[test]
    fn lookups_miss_with_not_found() {
        let r = SpecRegistry::build(Domain::Actions, vec![]).unwrap();
        assert!(matches!(r.name_of(Uid(1)), Err(SpecError::UnknownUid { .. })));
        assert!(matches!(r.uid_of("x"), Err(SpecError::UnknownName { .. })));
    }

    #[test]
    fn pack_unpack_translate_keys() {
        let r = SpecRegistry::build(Domain::Observations, catch_observations()).unwrap();
        let mut arrays = IndexMap::new();
        arrays.insert("reward".to_owned(), Array::scalar(1.0f32));
        let packed = r.pack(&arrays).unwrap();
        assert_eq!(packed.keys().copied().collect::<Vec<_>>(), vec![Uid(2)]);
        assert_eq!(r.unpack(&packed).unwrap(), arrays);
    }

    #[test]
    fn unpack_reports_codec_failure_with_name() {
        let r = SpecRegistry::build(Domain::Observations, catch_observations()).unwrap();
        let mut tensors = IndexMap::new();
        tensors.insert(Uid(1), Tensor::new(vec![3], Payload::Floats(vec![0.0; 3])));
        match r.unpack(&tensors) {
            Err(SpecError::Codec { name, .. }) => assert_eq!(name, "board"),
            other => panic!("expected codec error, got {other:?}"),
        }
    }

    #[test]
    fn wire_roundtrip_preserves_uids() {
        let s = SessionSpecs::build(vec![], catch_observations()).unwrap();
        let back = SessionSpecs::from_wire(&s.to_wire()).unwrap();
        assert_eq!(back, s);
    }
}
