//! Per-world actor thread.
//!
//! Each live world runs on its own named OS thread that exclusively owns
//! the world's [`WorldHooks`], its joined-session set, and its
//! [`ResetCoordinator`]. Sessions talk to it through a bounded crossbeam
//! channel; every command carries a `bounded(1)` reply sender.
//!
//! ```text
//!   session threads                    world actor thread
//!   ───────────────                    ──────────────────
//!     |  [cmd_tx: bounded(N)]          |  rx.recv()
//!     |------------------------------->|  handle(cmd)
//!     |                                |    hooks.step / reset / ...
//!     |<--result via reply_tx----------|    coordinator.acknowledge()
//!     |                                |
//!   ResetWorld caller                  |
//!     |------------------------------->|  hooks.reset_world()
//!     |  blocks on reply_rx            |  coordinator.register(reply_tx)
//!     |                                |  ...keeps serving other steps...
//!     |<--reply when wait set empties--|
//! ```
//!
//! Commands from different sessions are applied one at a time in arrival
//! order. ResetWorld never blocks the actor; the caller's reply sender is
//! parked in the coordinator and completed later.

use std::collections::HashSet;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use envlink_core::{EnvironmentState, PropertyNode, ProtocolError, SessionId, Settings, Tensor};
use envlink_spec::SessionSpecs;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace, warn};

use crate::barrier::{BarrierReply, ResetCoordinator};
use crate::config::DestroyPolicy;
use crate::hooks::{NamedArrays, StepInput, StepKind, WorldHooks, WorldSpecs};
use crate::property;

/// One-shot reply channel.
pub(crate) type Reply<T> = Sender<Result<T, ProtocolError>>;

/// A decoded step request.
pub(crate) struct StepRequest {
    pub session: SessionId,
    pub starts_sequence: bool,
    pub actions: NamedArrays,
    pub requested: Vec<String>,
}

/// What the actor did with a step.
pub(crate) struct StepReply {
    pub state: EnvironmentState,
    pub observations: NamedArrays,
    pub kind: StepKind,
}

/// Commands accepted by a world actor.
pub(crate) enum WorldCommand {
    Join {
        session: SessionId,
        settings: Settings,
        reply: Reply<SessionSpecs>,
    },
    Step {
        request: StepRequest,
        reply: Reply<StepReply>,
    },
    Reset {
        session: SessionId,
        settings: Settings,
        reply: Reply<SessionSpecs>,
    },
    ResetWorld {
        caller: SessionId,
        settings: Settings,
        reply: BarrierReply,
    },
    /// `reply` is `None` for the implicit leave of a dropped session.
    Leave {
        session: SessionId,
        reply: Option<Reply<()>>,
    },
    Destroy {
        requester: Option<SessionId>,
        reply: Reply<()>,
    },
    ReadProperty {
        session: SessionId,
        keys: Vec<String>,
        reply: Reply<IndexMap<String, Tensor>>,
    },
    WriteProperty {
        session: SessionId,
        values: IndexMap<String, Tensor>,
        reply: Reply<()>,
    },
    ListProperty {
        session: SessionId,
        keys: Vec<String>,
        reply: Reply<IndexMap<String, Vec<PropertyNode>>>,
    },
    Extension {
        session: SessionId,
        tag: String,
        payload: Vec<u8>,
        reply: Reply<Vec<u8>>,
    },
}

/// Failure to complete a round trip with a world actor.
pub(crate) enum CallError {
    /// The actor has exited; the world no longer exists.
    Gone,
    /// The actor answered with an error.
    Failed(ProtocolError),
}

/// A session's handle on the world it is joined to.
#[derive(Clone)]
pub(crate) struct WorldBinding {
    pub name: String,
    pub generation: u64,
    pub tx: Sender<WorldCommand>,
}

impl WorldBinding {
    /// Send a command and wait for its reply.
    pub fn call<T>(&self, make: impl FnOnce(Reply<T>) -> WorldCommand) -> Result<T, CallError> {
        call(&self.tx, make)
    }
}

/// Send a command built around a fresh reply channel and wait for it.
pub(crate) fn call<T>(
    tx: &Sender<WorldCommand>,
    make: impl FnOnce(Reply<T>) -> WorldCommand,
) -> Result<T, CallError> {
    let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
    tx.send(make(reply_tx)).map_err(|_| CallError::Gone)?;
    match reply_rx.recv() {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallError::Failed(e)),
        Err(_) => Err(CallError::Gone),
    }
}

/// Whether the actor keeps running after a command.
#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// State owned by a world's actor thread.
pub(crate) struct WorldActor {
    name: String,
    hooks: Box<dyn WorldHooks>,
    joined: IndexSet<SessionId>,
    coordinator: ResetCoordinator,
    policy: DestroyPolicy,
    /// Set under [`DestroyPolicy::Block`] while waiting for the joined
    /// set to empty.
    pending_destroy: Option<Reply<()>>,
}

impl WorldActor {
    pub fn new(name: String, hooks: Box<dyn WorldHooks>, policy: DestroyPolicy) -> Self {
        Self {
            coordinator: ResetCoordinator::new(name.clone()),
            name,
            hooks,
            joined: IndexSet::new(),
            policy,
            pending_destroy: None,
        }
    }

    /// Spawn the actor on a thread named after the world.
    pub fn spawn(self, rx: Receiver<WorldCommand>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("envlink-world-{}", self.name))
            .spawn(move || self.run(rx))
    }

    /// Main loop. Runs until destroyed or until every sender is dropped.
    fn run(mut self, rx: Receiver<WorldCommand>) {
        debug!(world = %self.name, "world actor started");
        while let Ok(cmd) = rx.recv() {
            if self.handle(cmd) == Flow::Stop {
                debug!(world = %self.name, "world actor stopped");
                return;
            }
        }
        // All senders gone: the server is shutting down.
        for session in std::mem::take(&mut self.joined) {
            self.hooks.leave(session);
        }
        self.coordinator
            .abort_all(&ProtocolError::state(format!("world `{}` shut down", self.name)));
        if let Err(e) = self.hooks.destroy_world() {
            warn!(world = %self.name, error = %e, "destroy hook failed during shutdown");
        }
        debug!(world = %self.name, "world actor disconnected");
    }

    fn handle(&mut self, cmd: WorldCommand) -> Flow {
        match cmd {
            WorldCommand::Join {
                session,
                settings,
                reply,
            } => {
                let _ = reply.send(self.join(session, &settings));
            }
            WorldCommand::Step { request, reply } => {
                let _ = reply.send(self.step(request));
            }
            WorldCommand::Reset {
                session,
                settings,
                reply,
            } => {
                let _ = reply.send(self.reset(session, &settings));
            }
            WorldCommand::ResetWorld {
                caller,
                settings,
                reply,
            } => self.reset_world(caller, &settings, reply),
            WorldCommand::Leave { session, reply } => {
                self.leave(session);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
                if self.pending_destroy.is_some() && self.joined.is_empty() {
                    if let Some(reply) = self.pending_destroy.take() {
                        return self.finish_destroy(reply);
                    }
                }
            }
            WorldCommand::Destroy { requester, reply } => return self.destroy(requester, reply),
            WorldCommand::ReadProperty {
                session,
                keys,
                reply,
            } => {
                let result = self
                    .require_joined(session)
                    .and_then(|()| property::read(self.hooks.as_mut(), session, &keys));
                let _ = reply.send(result);
            }
            WorldCommand::WriteProperty {
                session,
                values,
                reply,
            } => {
                let result = self
                    .require_joined(session)
                    .and_then(|()| property::write(self.hooks.as_mut(), session, &values));
                let _ = reply.send(result);
            }
            WorldCommand::ListProperty {
                session,
                keys,
                reply,
            } => {
                let result = self
                    .require_joined(session)
                    .and_then(|()| property::list(self.hooks.as_ref(), session, &keys));
                let _ = reply.send(result);
            }
            WorldCommand::Extension {
                session,
                tag,
                payload,
                reply,
            } => {
                let result = self.require_joined(session).and_then(|()| {
                    self.hooks
                        .extension(session, &tag, &payload)
                        .map_err(ProtocolError::from)
                });
                let _ = reply.send(result);
            }
        }
        Flow::Continue
    }

    fn require_joined(&self, session: SessionId) -> Result<(), ProtocolError> {
        if self.joined.contains(&session) {
            Ok(())
        } else {
            Err(ProtocolError::state(format!(
                "session is not joined to world `{}`",
                self.name
            )))
        }
    }

    fn build_specs(specs: WorldSpecs) -> Result<SessionSpecs, ProtocolError> {
        SessionSpecs::build(specs.actions, specs.observations).map_err(ProtocolError::from)
    }

    // ── Join / Leave ────────────────────────────────────────────

    fn join(&mut self, session: SessionId, settings: &Settings) -> Result<SessionSpecs, ProtocolError> {
        if self.pending_destroy.is_some() {
            return Err(ProtocolError::conflict(format!(
                "world `{}` is being destroyed",
                self.name
            )));
        }
        if self.joined.contains(&session) {
            return Err(ProtocolError::conflict(format!(
                "session is already joined to world `{}`",
                self.name
            )));
        }
        let specs = self.hooks.join_world(session, settings)?;
        match Self::build_specs(specs) {
            Ok(specs) => {
                self.joined.insert(session);
                debug!(world = %self.name, session = %session, joined = self.joined.len(), "session joined");
                Ok(specs)
            }
            Err(e) => {
                self.hooks.leave(session);
                Err(e)
            }
        }
    }

    fn leave(&mut self, session: SessionId) {
        if self.joined.shift_remove(&session) {
            self.hooks.leave(session);
            self.coordinator.forget(session);
            debug!(world = %self.name, session = %session, joined = self.joined.len(), "session left");
        }
    }

    // ── Step / Reset ────────────────────────────────────────────

    fn step(&mut self, request: StepRequest) -> Result<StepReply, ProtocolError> {
        self.require_joined(request.session)?;
        let kind = if self.coordinator.must_interrupt(request.session) {
            StepKind::Interrupted
        } else if request.starts_sequence {
            StepKind::StartSequence
        } else {
            StepKind::Continue
        };
        let no_actions = NamedArrays::new();
        let input = StepInput {
            kind,
            actions: if kind == StepKind::Continue {
                &request.actions
            } else {
                &no_actions
            },
            requested: &request.requested,
        };
        let outcome = self.hooks.step(request.session, input)?;
        let state = if kind == StepKind::Interrupted {
            self.coordinator.acknowledge(request.session);
            EnvironmentState::Interrupted
        } else {
            outcome.state
        };
        trace!(
            world = %self.name,
            session = %request.session,
            ?kind,
            %state,
            barriers = self.coordinator.pending(),
            "step"
        );
        Ok(StepReply {
            state,
            observations: outcome.observations,
            kind,
        })
    }

    fn reset(&mut self, session: SessionId, settings: &Settings) -> Result<SessionSpecs, ProtocolError> {
        self.require_joined(session)?;
        let specs = Self::build_specs(self.hooks.reset(session, settings)?)?;
        debug!(world = %self.name, session = %session, "session reset");
        Ok(specs)
    }

    fn reset_world(&mut self, caller: SessionId, settings: &Settings, reply: BarrierReply) {
        if let Err(e) = self.hooks.reset_world(settings) {
            let _ = reply.send(Err(e.into()));
            return;
        }
        // The caller restarts directly, so it stops counting for older barriers.
        self.coordinator.forget(caller);
        let waiting: HashSet<SessionId> = self.joined.iter().copied().collect();
        self.coordinator.register(caller, waiting, reply);
    }

    // ── Destroy ─────────────────────────────────────────────────

    fn destroy(&mut self, requester: Option<SessionId>, reply: Reply<()>) -> Flow {
        if requester.is_some_and(|s| self.joined.contains(&s)) {
            let _ = reply.send(Err(ProtocolError::conflict(format!(
                "cannot destroy world `{}` while joined to it",
                self.name
            ))));
            return Flow::Continue;
        }
        if self.pending_destroy.is_some() {
            let _ = reply.send(Err(ProtocolError::conflict(format!(
                "world `{}` is already being destroyed",
                self.name
            ))));
            return Flow::Continue;
        }
        if self.joined.is_empty() {
            return self.finish_destroy(reply);
        }
        match self.policy {
            DestroyPolicy::Refuse => {
                let _ = reply.send(Err(ProtocolError::conflict(format!(
                    "world `{}` still has {} joined session(s)",
                    self.name,
                    self.joined.len()
                ))));
                Flow::Continue
            }
            DestroyPolicy::Force => {
                warn!(world = %self.name, joined = self.joined.len(), "force-destroying world with joined sessions");
                for session in std::mem::take(&mut self.joined) {
                    self.hooks.leave(session);
                }
                self.finish_destroy(reply)
            }
            DestroyPolicy::Block => {
                debug!(world = %self.name, joined = self.joined.len(), "destroy deferred until world is empty");
                self.pending_destroy = Some(reply);
                Flow::Continue
            }
        }
    }

    fn finish_destroy(&mut self, reply: Reply<()>) -> Flow {
        if let Err(e) = self.hooks.destroy_world() {
            let _ = reply.send(Err(e.into()));
            return Flow::Continue;
        }
        self.coordinator
            .abort_all(&ProtocolError::state(format!("world `{}` was destroyed", self.name)));
        let _ = reply.send(Ok(()));
        Flow::Stop
    }
}
