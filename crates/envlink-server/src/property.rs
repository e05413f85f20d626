//! Property request dispatch.
//!
//! Runs on the world actor. Each key is resolved through
//! [`WorldHooks::property_node`] and checked against the node's
//! permissions before the read, write, or list hook is called. Writes are
//! checked against the node's spec for every key, then handed to the
//! hooks as one batch that applies entirely or not at all.

use envlink_codec::decode;
use envlink_core::{PropertyNode, ProtocolError, SessionId, Tensor};
use indexmap::IndexMap;

use crate::hooks::WorldHooks;

fn node(hooks: &dyn WorldHooks, session: SessionId, key: &str) -> Result<PropertyNode, ProtocolError> {
    hooks.property_node(session, key).ok_or_else(|| {
        ProtocolError::not_found(format!("unknown property `{key}`")).with_field(key)
    })
}

pub(crate) fn read(
    hooks: &mut dyn WorldHooks,
    session: SessionId,
    keys: &[String],
) -> Result<IndexMap<String, Tensor>, ProtocolError> {
    let mut values = IndexMap::with_capacity(keys.len());
    for key in keys {
        if !node(hooks, session, key)?.readable {
            return Err(ProtocolError::state(format!("property `{key}` is not readable"))
                .with_field(key.as_str()));
        }
        let value = hooks
            .read_property(session, key)
            .map_err(|e| ProtocolError::from(e).or_field(key.as_str()))?;
        values.insert(key.clone(), value);
    }
    Ok(values)
}

pub(crate) fn write(
    hooks: &mut dyn WorldHooks,
    session: SessionId,
    values: &IndexMap<String, Tensor>,
) -> Result<(), ProtocolError> {
    for (key, value) in values {
        let meta = node(hooks, session, key)?;
        if !meta.writable {
            return Err(ProtocolError::state(format!("property `{key}` is not writable"))
                .with_field(key.as_str()));
        }
        if let Some(spec) = &meta.spec {
            decode(value, spec).map_err(|e| e.into_protocol(key))?;
        }
    }
    if values.is_empty() {
        return Ok(());
    }
    hooks
        .write_properties(session, values)
        .map_err(ProtocolError::from)
}

pub(crate) fn list(
    hooks: &dyn WorldHooks,
    session: SessionId,
    keys: &[String],
) -> Result<IndexMap<String, Vec<PropertyNode>>, ProtocolError> {
    let mut listing = IndexMap::with_capacity(keys.len());
    for key in keys {
        if !key.is_empty() && !node(hooks, session, key)?.listable {
            return Err(ProtocolError::state(format!("property `{key}` is not listable"))
                .with_field(key.as_str()));
        }
        let children = hooks
            .list_property(session, key)
            .map_err(|e| ProtocolError::from(e).or_field(key.as_str()))?;
        listing.insert(key.clone(), children);
    }
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use crate::hooks::{StepInput, StepOutcome, WorldSpecs};
    use envlink_core::{DataType, ErrorKind, Settings, TensorSpec};

    /// Two readable+writable int32 leaves and a read-only seed under a
    /// listable directory. Values above 99 are rejected by the hook.
    #[derive(Default)]
    struct Props {
        level: i32,
        speed: i32,
    }

    impl WorldHooks for Props {
        fn join_world(&mut self, _: SessionId, _: &Settings) -> Result<WorldSpecs, HookError> {
            Ok(WorldSpecs::default())
        }
        fn step(&mut self, _: SessionId, _: StepInput<'_>) -> Result<StepOutcome, HookError> {
            Ok(StepOutcome::running(IndexMap::new()))
        }
        fn reset(&mut self, _: SessionId, _: &Settings) -> Result<WorldSpecs, HookError> {
            Ok(WorldSpecs::default())
        }
        fn reset_world(&mut self, _: &Settings) -> Result<(), HookError> {
            Ok(())
        }
        fn leave(&mut self, _: SessionId) {}

        fn property_node(&self, _: SessionId, key: &str) -> Option<PropertyNode> {
            match key {
                "game" => Some(PropertyNode::directory("game")),
                "game.level" => Some(
                    PropertyNode::value("game.level", TensorSpec::scalar("game.level", DataType::Int32))
                        .writable(),
                ),
                "game.speed" => Some(
                    PropertyNode::value("game.speed", TensorSpec::scalar("game.speed", DataType::Int32))
                        .writable(),
                ),
                "game.seed" => Some(PropertyNode::value(
                    "game.seed",
                    TensorSpec::scalar("game.seed", DataType::Int64),
                )),
                _ => None,
            }
        }
        fn read_property(&mut self, _: SessionId, key: &str) -> Result<Tensor, HookError> {
            match key {
                "game.level" => Ok(Tensor::scalar(self.level)),
                "game.speed" => Ok(Tensor::scalar(self.speed)),
                "game.seed" => Ok(Tensor::scalar(7i64)),
                _ => Err(HookError::NotFound(key.to_owned())),
            }
        }
        fn write_properties(
            &mut self,
            _: SessionId,
            values: &IndexMap<String, Tensor>,
        ) -> Result<(), HookError> {
            let (mut level, mut speed) = (self.level, self.speed);
            for (key, value) in values {
                let v = *value
                    .as_scalar::<i32>()
                    .ok_or_else(|| HookError::Validation("expected int32".into()))?;
                if v > 99 {
                    return Err(ProtocolError::validation(format!("{key} {v} is above 99"))
                        .with_field(key.as_str())
                        .into());
                }
                match key.as_str() {
                    "game.level" => level = v,
                    _ => speed = v,
                }
            }
            self.level = level;
            self.speed = speed;
            Ok(())
        }
        fn list_property(&self, _: SessionId, key: &str) -> Result<Vec<PropertyNode>, HookError> {
            Ok(match key {
                "" => vec![PropertyNode::directory("game")],
                "game" => ["game.level", "game.speed", "game.seed"]
                    .iter()
                    .filter_map(|k| self.property_node(SessionId::next(), k))
                    .collect(),
                _ => Vec::new(),
            })
        }
    }

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| (*k).to_owned()).collect()
    }

    #[test]
    fn read_returns_values_in_request_order() {
        let mut p = Props::default();
        let s = SessionId::next();
        let v = read(&mut p, s, &keys(&["game.seed", "game.level"])).unwrap();
        assert_eq!(v.keys().collect::<Vec<_>>(), vec!["game.seed", "game.level"]);
    }

    #[test]
    fn unknown_key_is_not_found() {
        let mut p = Props::default();
        let err = read(&mut p, SessionId::next(), &keys(&["nope"])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.field.as_deref(), Some("nope"));
    }

    #[test]
    fn permission_failures_are_state_errors() {
        let mut p = Props::default();
        let s = SessionId::next();
        assert_eq!(read(&mut p, s, &keys(&["game"])).unwrap_err().kind, ErrorKind::State);
        let mut w = IndexMap::new();
        w.insert("game.seed".to_owned(), Tensor::scalar(1i64));
        assert_eq!(write(&mut p, s, &w).unwrap_err().kind, ErrorKind::State);
        assert_eq!(list(&p, s, &keys(&["game.level"])).unwrap_err().kind, ErrorKind::State);
    }

    #[test]
    fn write_checks_spec_before_applying() {
        let mut p = Props::default();
        let s = SessionId::next();
        let mut w = IndexMap::new();
        w.insert("game.level".to_owned(), Tensor::scalar(1.5f32));
        assert_eq!(write(&mut p, s, &w).unwrap_err().kind, ErrorKind::Type);
        assert_eq!(p.level, 0);

        w.insert("game.level".to_owned(), Tensor::scalar(4i32));
        write(&mut p, s, &w).unwrap();
        assert_eq!(p.level, 4);
    }

    #[test]
    fn rejected_batch_changes_nothing() {
        let mut p = Props::default();
        let s = SessionId::next();
        let mut w = IndexMap::new();
        w.insert("game.level".to_owned(), Tensor::scalar(5i32));
        w.insert("game.speed".to_owned(), Tensor::scalar(100i32));
        let err = write(&mut p, s, &w).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("game.speed"));
        assert_eq!((p.level, p.speed), (0, 0));

        w.insert("game.speed".to_owned(), Tensor::scalar(9i32));
        write(&mut p, s, &w).unwrap();
        assert_eq!((p.level, p.speed), (5, 9));
    }

    #[test]
    fn empty_write_is_a_no_op() {
        let mut p = Props::default();
        write(&mut p, SessionId::next(), &IndexMap::new()).unwrap();
        assert_eq!(p.level, 0);
    }

    #[test]
    fn root_is_always_listable() {
        let p = Props::default();
        let l = list(&p, SessionId::next(), &keys(&["", "game"])).unwrap();
        assert_eq!(l[""].len(), 1);
        assert_eq!(l["game"].len(), 3);
    }
}
