//! Per-connection session state machine.
//!
//! A [`Session`] owns its world binding, its [`SessionSpecs`], and its
//! [`SessionState`]. Requests arrive one at a time from the owning
//! connection. Every world-touching operation is a round trip to the
//! world's actor; the session only updates its own state after the actor
//! has answered successfully, so a failed request leaves it unchanged.

use envlink_core::{
    ActionObservationSpecs, EnvironmentState, PropertyNode, ProtocolError, SessionId, SessionState,
    Settings, Tensor, Uid,
};
use envlink_spec::SessionSpecs;
use indexmap::{IndexMap, IndexSet};
use tracing::{trace, warn};

use crate::extension::{ExtensionRegistry, ExtensionRoute};
use crate::hooks::{NamedArrays, StepKind};
use crate::registry::WorldRegistry;
use crate::world::{CallError, StepRequest, WorldBinding, WorldCommand};

/// Observations returned by a step.
pub type Observations = IndexMap<Uid, Tensor>;

/// One agent's view of the server.
pub struct Session {
    id: SessionId,
    state: SessionState,
    binding: Option<WorldBinding>,
    specs: Option<SessionSpecs>,
    /// Set by the session's own ResetWorld: the state already reads
    /// `Running` but the next step must still start a new sequence.
    restart_pending: bool,
    sequence: u64,
}

impl Session {
    /// A fresh, unjoined session.
    pub fn new() -> Self {
        Self {
            id: SessionId::next(),
            state: SessionState::NotJoined,
            binding: None,
            specs: None,
            restart_pending: false,
            sequence: 0,
        }
    }

    /// This session's id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Name of the joined world, if any.
    pub fn world_name(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.name.as_str())
    }

    /// Current spec registries, if joined.
    pub fn specs(&self) -> Option<&SessionSpecs> {
        self.specs.as_ref()
    }

    /// Number of sequences started since the session was created.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn bound(&self) -> Result<&WorldBinding, ProtocolError> {
        self.binding
            .as_ref()
            .ok_or_else(|| ProtocolError::state("session is not joined to a world"))
    }

    fn unbind(&mut self) {
        self.binding = None;
        self.specs = None;
        self.restart_pending = false;
        self.state = SessionState::NotJoined;
    }

    /// Map a call failure, unbinding if the world has gone away.
    fn settle<T>(&mut self, result: Result<T, CallError>) -> Result<T, ProtocolError> {
        match result {
            Ok(value) => Ok(value),
            Err(CallError::Failed(e)) => Err(e),
            Err(CallError::Gone) => {
                let name = self.world_name().unwrap_or_default().to_owned();
                self.unbind();
                Err(ProtocolError::state(format!("world `{name}` was destroyed")).with_field(name))
            }
        }
    }

    // ── World lifecycle ─────────────────────────────────────────

    /// Join `world_name`. The session must not be joined anywhere.
    pub fn join(
        &mut self,
        registry: &WorldRegistry,
        world_name: &str,
        settings: Settings,
    ) -> Result<ActionObservationSpecs, ProtocolError> {
        if let Some(current) = self.world_name() {
            return Err(ProtocolError::conflict(format!(
                "session is already joined to world `{current}`"
            )));
        }
        let (binding, specs) = registry.join_world(world_name, self.id, settings)?;
        let wire = specs.to_wire();
        self.binding = Some(binding);
        self.specs = Some(specs);
        self.restart_pending = false;
        self.state = SessionState::Interrupted;
        Ok(wire)
    }

    /// Leave the joined world. A no-op when not joined.
    pub fn leave(&mut self) {
        if let Some(binding) = self.binding.take() {
            let session = self.id;
            let _ = binding.call(|reply| WorldCommand::Leave {
                session,
                reply: Some(reply),
            });
        }
        self.unbind();
    }

    /// Destroy a world on behalf of this session.
    pub fn destroy_world(&mut self, registry: &WorldRegistry, world_name: &str) -> Result<(), ProtocolError> {
        registry.destroy_world(world_name, Some(self.id))
    }

    // ── Step ────────────────────────────────────────────────────

    /// Advance the joined world.
    ///
    /// Outside `Running` the actions are ignored without being decoded and
    /// the world starts a new sequence.
    pub fn step(
        &mut self,
        actions: &IndexMap<Uid, Tensor>,
        requested: &[Uid],
    ) -> Result<(EnvironmentState, Observations), ProtocolError> {
        let binding = self.bound()?.clone();
        let specs = self
            .specs
            .as_ref()
            .ok_or_else(|| ProtocolError::internal("joined session has no specs"))?;

        let mut wanted: IndexSet<(Uid, String)> = IndexSet::with_capacity(requested.len());
        for &uid in requested {
            let name = specs.observations.name_of(uid)?;
            wanted.insert((uid, name.to_owned()));
        }

        let starts_sequence = self.state != SessionState::Running || self.restart_pending;
        let actions = if starts_sequence {
            NamedArrays::new()
        } else {
            specs.actions.unpack(actions)?
        };

        let request = StepRequest {
            session: self.id,
            starts_sequence,
            actions,
            requested: wanted.iter().map(|(_, name)| name.clone()).collect(),
        };
        let result = binding.call(|reply| WorldCommand::Step { request, reply });
        let reply = self.settle(result)?;

        let specs = self
            .specs
            .as_ref()
            .ok_or_else(|| ProtocolError::internal("joined session has no specs"))?;
        let encoded = wanted
            .iter()
            .map(|(uid, name)| {
                let array = reply.observations.get(name).ok_or_else(|| {
                    ProtocolError::internal(format!("world did not report observation `{name}`"))
                        .with_field(name.as_str())
                })?;
                let tensor = specs.observations.encode_one(*uid, array).map_err(|e| {
                    ProtocolError::internal(format!("world reported a malformed observation: {e}"))
                        .with_field(name.as_str())
                })?;
                Ok((*uid, tensor))
            })
            .collect::<Result<Observations, ProtocolError>>();
        let observations = match encoded {
            Ok(observations) => observations,
            Err(e) => {
                warn!(
                    session = %self.id,
                    world = %binding.name,
                    kind = ?reply.kind,
                    error = %e,
                    "world advanced but its observations could not be returned"
                );
                return Err(e);
            }
        };

        self.state = SessionState::from(reply.state);
        self.restart_pending = false;
        if reply.kind == StepKind::StartSequence {
            self.sequence += 1;
        }
        trace!(
            session = %self.id,
            world = %binding.name,
            kind = ?reply.kind,
            state = %self.state,
            "session step"
        );
        Ok((reply.state, observations))
    }

    // ── Reset ───────────────────────────────────────────────────

    /// Restart this session's sequence and rebuild its specs.
    pub fn reset(&mut self, settings: Settings) -> Result<ActionObservationSpecs, ProtocolError> {
        let binding = self.bound()?.clone();
        let session = self.id;
        let result = binding.call(|reply| WorldCommand::Reset {
            session,
            settings,
            reply,
        });
        let specs = self.settle(result)?;
        let wire = specs.to_wire();
        self.specs = Some(specs);
        self.restart_pending = false;
        self.state = SessionState::Interrupted;
        Ok(wire)
    }

    /// Reset `world_name` and wait until every other joined session has
    /// observed the interruption.
    ///
    /// If this session is joined to that world it moves straight to
    /// `Running`; its next step starts the new sequence.
    pub fn reset_world(
        &mut self,
        registry: &WorldRegistry,
        world_name: &str,
        settings: Settings,
    ) -> Result<(), ProtocolError> {
        let generation = registry.reset_world(world_name, self.id, settings)?;
        let same_world = self
            .binding
            .as_ref()
            .is_some_and(|b| b.name == world_name && b.generation == generation);
        if same_world {
            self.state = SessionState::Running;
            self.restart_pending = true;
        }
        Ok(())
    }

    // ── Properties ──────────────────────────────────────────────

    /// Read property values.
    pub fn read_property(&mut self, keys: Vec<String>) -> Result<IndexMap<String, Tensor>, ProtocolError> {
        let binding = self.bound()?.clone();
        let session = self.id;
        let result = binding.call(|reply| WorldCommand::ReadProperty {
            session,
            keys,
            reply,
        });
        self.settle(result)
    }

    /// Write property values. Either every value is applied or none is.
    pub fn write_property(&mut self, values: IndexMap<String, Tensor>) -> Result<(), ProtocolError> {
        let binding = self.bound()?.clone();
        let session = self.id;
        let result = binding.call(|reply| WorldCommand::WriteProperty {
            session,
            values,
            reply,
        });
        self.settle(result)
    }

    /// List the children of property nodes.
    pub fn list_property(
        &mut self,
        keys: Vec<String>,
    ) -> Result<IndexMap<String, Vec<PropertyNode>>, ProtocolError> {
        let binding = self.bound()?.clone();
        let session = self.id;
        let result = binding.call(|reply| WorldCommand::ListProperty {
            session,
            keys,
            reply,
        });
        self.settle(result)
    }

    // ── Extensions ──────────────────────────────────────────────

    /// Route an extension call through `table`.
    pub fn extension(
        &mut self,
        table: &ExtensionRegistry,
        tag: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ProtocolError> {
        match table.route(tag)? {
            ExtensionRoute::Server(handler) => handler
                .handle(self.id, &payload)
                .map_err(|e| ProtocolError::from(e).or_field(tag)),
            ExtensionRoute::World => {
                let binding = self.bound()?.clone();
                let session = self.id;
                let tag = tag.to_owned();
                let result = binding.call(|reply| WorldCommand::Extension {
                    session,
                    tag,
                    payload,
                    reply,
                });
                self.settle(result)
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("world", &self.world_name())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(binding) = self.binding.take() {
            let _ = binding.tx.send(WorldCommand::Leave {
                session: self.id,
                reply: None,
            });
        }
    }
}
