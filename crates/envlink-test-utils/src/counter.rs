//! A deterministic counting world that records its hook calls.
//!
//! Every session keeps its own counter. A `Continue` step adds the
//! `delta` action to it; a step that starts a sequence zeroes it. The
//! sequence terminates once the counter reaches the world's `limit`.
//!
//! Each hook call is reported as a [`HookEvent`] on the channel returned
//! by [`CounterFactory::new`], which lets multi-session tests wait for a
//! world-side event without sleeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};
use envlink_core::{
    Array, DataType, EnvironmentState, PropertyNode, SessionId, Settings, Tensor, TensorSpec,
};
use envlink_server::{
    CreatedWorld, HookError, NamedArrays, StepInput, StepKind, StepOutcome, WorldFactory,
    WorldHooks, WorldSpecs,
};
use indexmap::IndexMap;

use crate::properties::MemoryProperties;

/// Extension tag the counter world answers by echoing the payload.
pub const ECHO_EXTENSION: &str = "counter.echo";

/// One observed hook call.
#[derive(Clone, Debug, PartialEq)]
pub enum HookEvent {
    Created { world: String },
    Joined { world: String, session: SessionId },
    Stepped {
        world: String,
        session: SessionId,
        kind: StepKind,
        delta: Option<i32>,
    },
    Reset { world: String, session: SessionId },
    WorldReset { world: String },
    Left { world: String, session: SessionId },
    Destroyed { world: String },
}

fn string_setting(settings: &Settings, key: &str) -> Result<Option<String>, HookError> {
    settings
        .get(key)
        .map(|t| {
            t.as_scalar::<String>()
                .cloned()
                .ok_or_else(|| HookError::invalid_setting(key, "expected a string scalar"))
        })
        .transpose()
}

fn int_setting(settings: &Settings, key: &str) -> Result<Option<i64>, HookError> {
    settings
        .get(key)
        .map(|t| {
            t.as_scalar::<i64>()
                .copied()
                .ok_or_else(|| HookError::invalid_setting(key, "expected an int64 scalar"))
        })
        .transpose()
}

fn bool_setting(settings: &Settings, key: &str) -> Result<Option<bool>, HookError> {
    settings
        .get(key)
        .map(|t| {
            t.as_scalar::<bool>()
                .copied()
                .ok_or_else(|| HookError::invalid_setting(key, "expected a bool scalar"))
        })
        .transpose()
}

// ── CounterFactory ─────────────────────────────────────────────────

/// Creates [`CounterWorld`]s.
///
/// Settings: `name` (string, default `counter-N`) and `limit` (int64,
/// default unbounded).
pub struct CounterFactory {
    events: Sender<HookEvent>,
    created: AtomicU64,
}

impl CounterFactory {
    pub fn new() -> (Self, Receiver<HookEvent>) {
        let (events, rx) = crossbeam_channel::unbounded();
        (
            Self {
                events,
                created: AtomicU64::new(0),
            },
            rx,
        )
    }
}

impl WorldFactory for CounterFactory {
    fn create_world(&self, settings: &Settings) -> Result<CreatedWorld, HookError> {
        settings.reject_unknown(&["name", "limit"])?;
        let limit = int_setting(settings, "limit")?.unwrap_or(i64::MAX);
        let n = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        let name = string_setting(settings, "name")?.unwrap_or_else(|| format!("counter-{n}"));
        let _ = self.events.send(HookEvent::Created {
            world: name.clone(),
        });
        Ok(CreatedWorld {
            hooks: Box::new(CounterWorld::new(name.clone(), limit, self.events.clone())),
            name,
        })
    }
}

// ── CounterWorld ───────────────────────────────────────────────────

#[derive(Default)]
struct Counter {
    count: i64,
    history: Vec<i64>,
    bonus: bool,
}

impl Counter {
    fn restart(&mut self) {
        self.count = 0;
        self.history.clear();
        self.history.push(0);
    }
}

/// The counting world.
///
/// Actions: `delta` (int32 scalar, advisory bounds -10..=10) and, for
/// sessions joined with `bonus = true`, a leading `bonus` int32 scalar
/// that is added on top. Observations: `count` (int64), `parity` (bool,
/// true when odd), `history` (int64, variable length).
///
/// Properties under the `counter` directory: `counter.limit` (read/write
/// int64, at least 1), `counter.name` (read-only string) and
/// `counter.label` (read/write string).
pub struct CounterWorld {
    name: String,
    limit: i64,
    events: Sender<HookEvent>,
    sessions: HashMap<SessionId, Counter>,
    properties: MemoryProperties,
}

impl CounterWorld {
    pub fn new(name: String, limit: i64, events: Sender<HookEvent>) -> Self {
        let mut properties = MemoryProperties::new();
        properties
            .directory("counter")
            .insert(
                PropertyNode::value(
                    "counter.limit",
                    TensorSpec::scalar("counter.limit", DataType::Int64),
                )
                .writable()
                .describe("count at which a sequence terminates"),
                limit,
            )
            .insert(
                PropertyNode::value(
                    "counter.name",
                    TensorSpec::scalar("counter.name", DataType::String),
                ),
                name.clone(),
            )
            .insert(
                PropertyNode::value(
                    "counter.label",
                    TensorSpec::scalar("counter.label", DataType::String),
                )
                .writable(),
                String::new(),
            );
        Self {
            name,
            limit,
            events,
            sessions: HashMap::new(),
            properties,
        }
    }

    /// Specs for a session, with or without the `bonus` action.
    pub fn specs(bonus: bool) -> WorldSpecs {
        let mut actions = Vec::new();
        if bonus {
            actions.push(TensorSpec::scalar("bonus", DataType::Int32));
        }
        actions.push(TensorSpec::scalar("delta", DataType::Int32).with_bounds(-10i32, 10i32));
        WorldSpecs {
            actions,
            observations: vec![
                TensorSpec::scalar("count", DataType::Int64),
                TensorSpec::scalar("parity", DataType::Bool),
                TensorSpec::new("history", DataType::Int64, vec![-1]),
            ],
        }
    }

    fn emit(&self, event: HookEvent) {
        let _ = self.events.send(event);
    }

    fn counter(&mut self, session: SessionId) -> Result<&mut Counter, HookError> {
        self.sessions
            .get_mut(&session)
            .ok_or_else(|| HookError::NotFound(format!("session {session} is not joined")))
    }
}

fn scalar_action(actions: &NamedArrays, name: &str) -> Result<Option<i32>, HookError> {
    actions
        .get(name)
        .map(|a| {
            a.as_slice::<i32>()
                .and_then(|s| s.first().copied())
                .ok_or_else(|| HookError::Validation(format!("action `{name}` must be one int32")))
        })
        .transpose()
}

impl WorldHooks for CounterWorld {
    fn join_world(&mut self, session: SessionId, settings: &Settings) -> Result<WorldSpecs, HookError> {
        settings.reject_unknown(&["bonus"])?;
        let bonus = bool_setting(settings, "bonus")?.unwrap_or(false);
        let mut counter = Counter {
            bonus,
            ..Counter::default()
        };
        counter.restart();
        self.sessions.insert(session, counter);
        self.emit(HookEvent::Joined {
            world: self.name.clone(),
            session,
        });
        Ok(Self::specs(bonus))
    }

    fn step(&mut self, session: SessionId, input: StepInput<'_>) -> Result<StepOutcome, HookError> {
        let limit = self.limit;
        let counter = self.counter(session)?;
        let mut delta = None;
        match input.kind {
            StepKind::StartSequence => counter.restart(),
            StepKind::Interrupted => {}
            StepKind::Continue => {
                let d = scalar_action(input.actions, "delta")?
                    .ok_or_else(|| HookError::Validation("missing required action `delta`".into()))?;
                let bonus = if counter.bonus {
                    scalar_action(input.actions, "bonus")?.unwrap_or(0)
                } else {
                    0
                };
                counter.count += i64::from(d) + i64::from(bonus);
                counter.history.push(counter.count);
                delta = Some(d);
            }
        }

        let state = if counter.count >= limit {
            EnvironmentState::Terminated
        } else {
            EnvironmentState::Running
        };
        let history = Array::from_vec(&[counter.history.len()], counter.history.clone())
            .ok_or_else(|| HookError::Validation("history length mismatch".into()))?;
        let mut observations = NamedArrays::new();
        observations.insert("count".into(), Array::scalar(counter.count));
        observations.insert("parity".into(), Array::scalar(counter.count % 2 != 0));
        observations.insert("history".into(), history);

        self.emit(HookEvent::Stepped {
            world: self.name.clone(),
            session,
            kind: input.kind,
            delta,
        });
        Ok(StepOutcome {
            state,
            observations,
        })
    }

    fn reset(&mut self, session: SessionId, settings: &Settings) -> Result<WorldSpecs, HookError> {
        settings.reject_unknown(&["bonus"])?;
        let bonus = bool_setting(settings, "bonus")?;
        let counter = self.counter(session)?;
        if let Some(bonus) = bonus {
            counter.bonus = bonus;
        }
        counter.restart();
        let bonus = counter.bonus;
        self.emit(HookEvent::Reset {
            world: self.name.clone(),
            session,
        });
        Ok(Self::specs(bonus))
    }

    fn reset_world(&mut self, settings: &Settings) -> Result<(), HookError> {
        settings.reject_unknown(&["limit"])?;
        if let Some(limit) = int_setting(settings, "limit")? {
            self.limit = limit;
            self.properties.write("counter.limit", &Tensor::scalar(limit))?;
        }
        for counter in self.sessions.values_mut() {
            counter.restart();
        }
        self.emit(HookEvent::WorldReset {
            world: self.name.clone(),
        });
        Ok(())
    }

    fn leave(&mut self, session: SessionId) {
        if self.sessions.remove(&session).is_some() {
            self.emit(HookEvent::Left {
                world: self.name.clone(),
                session,
            });
        }
    }

    fn destroy_world(&mut self) -> Result<(), HookError> {
        self.emit(HookEvent::Destroyed {
            world: self.name.clone(),
        });
        Ok(())
    }

    fn property_node(&self, _session: SessionId, key: &str) -> Option<PropertyNode> {
        self.properties.node(key)
    }

    fn read_property(&mut self, _session: SessionId, key: &str) -> Result<Tensor, HookError> {
        self.properties.read(key)
    }

    fn write_properties(
        &mut self,
        _session: SessionId,
        values: &IndexMap<String, Tensor>,
    ) -> Result<(), HookError> {
        let limit = match values.get("counter.limit") {
            Some(value) => {
                let limit = value
                    .as_scalar::<i64>()
                    .copied()
                    .ok_or_else(|| HookError::invalid_setting("counter.limit", "expected an int64 scalar"))?;
                if limit < 1 {
                    return Err(HookError::invalid_setting("counter.limit", "must be at least 1"));
                }
                limit
            }
            None => self.limit,
        };
        self.properties.write_all(values)?;
        self.limit = limit;
        Ok(())
    }

    fn list_property(&self, _session: SessionId, key: &str) -> Result<Vec<PropertyNode>, HookError> {
        Ok(self.properties.children(key))
    }

    fn extension(&mut self, _session: SessionId, tag: &str, payload: &[u8]) -> Result<Vec<u8>, HookError> {
        match tag {
            ECHO_EXTENSION => Ok(payload.to_vec()),
            _ => Err(HookError::UnknownExtension(format!(
                "counter world does not handle `{tag}`"
            ))),
        }
    }
}
