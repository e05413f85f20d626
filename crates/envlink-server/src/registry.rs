//! The set of live worlds.
//!
//! The registry map is the only state shared between worlds. Its mutex
//! guards membership checks and inserts/removals; factory calls, actor
//! spawns, and every round trip to a world actor happen outside it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use envlink_core::{ProtocolError, SessionId, Settings};
use envlink_spec::SessionSpecs;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::hooks::{CreatedWorld, WorldFactory};
use crate::world::{call, CallError, WorldActor, WorldBinding, WorldCommand};

struct WorldEntry {
    tx: Sender<WorldCommand>,
    generation: u64,
    thread: Option<JoinHandle<()>>,
}

/// Owns every live world and the factory that creates them.
pub struct WorldRegistry {
    worlds: Mutex<HashMap<String, WorldEntry>>,
    factory: Box<dyn WorldFactory>,
    config: ServerConfig,
    next_generation: AtomicU64,
}

fn gone(name: &str) -> ProtocolError {
    ProtocolError::not_found(format!("world `{name}` does not exist")).with_field(name)
}

impl WorldRegistry {
    pub(crate) fn new(factory: Box<dyn WorldFactory>, config: ServerConfig) -> Self {
        Self {
            worlds: Mutex::new(HashMap::new()),
            factory,
            config,
            next_generation: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, WorldEntry>>, ProtocolError> {
        self.worlds
            .lock()
            .map_err(|_| ProtocolError::internal("world registry lock poisoned"))
    }

    fn at_capacity(&self, live: usize) -> bool {
        self.config.max_live_worlds.is_some_and(|max| live >= max)
    }

    fn capacity_error(&self) -> ProtocolError {
        ProtocolError::conflict(format!(
            "server already hosts the maximum of {} live world(s)",
            self.config.max_live_worlds.unwrap_or(0)
        ))
    }

    /// Create a world through the factory and start its actor.
    pub fn create_world(&self, settings: &Settings) -> Result<String, ProtocolError> {
        if self.at_capacity(self.lock()?.len()) {
            return Err(self.capacity_error());
        }

        let CreatedWorld { name, hooks } = self.factory.create_world(settings)?;
        if name.is_empty() {
            return Err(ProtocolError::internal("factory returned an empty world name"));
        }

        let (tx, rx) = crossbeam_channel::bounded(self.config.world_queue_capacity);
        let actor = WorldActor::new(name.clone(), hooks, self.config.destroy_policy);
        let thread = actor.spawn(rx).map_err(|e| {
            ProtocolError::internal(format!("failed to spawn actor for world `{name}`: {e}"))
        })?;

        let mut worlds = self.lock()?;
        if worlds.contains_key(&name) || self.at_capacity(worlds.len()) {
            let err = if worlds.contains_key(&name) {
                ProtocolError::conflict(format!("world `{name}` already exists")).with_field(name)
            } else {
                self.capacity_error()
            };
            drop(worlds);
            // Dropping the only sender shuts the new actor down and runs
            // its destroy hook.
            drop(tx);
            let _ = thread.join();
            return Err(err);
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        worlds.insert(
            name.clone(),
            WorldEntry {
                tx,
                generation,
                thread: Some(thread),
            },
        );
        info!(world = %name, live = worlds.len(), "world created");
        Ok(name)
    }

    /// Destroy a world under the configured policy. `requester` is the
    /// session issuing the request, if any.
    pub fn destroy_world(&self, name: &str, requester: Option<SessionId>) -> Result<(), ProtocolError> {
        let (tx, generation) = self.lookup(name)?;
        match call(&tx, |reply| WorldCommand::Destroy { requester, reply }) {
            Ok(()) => {}
            Err(CallError::Gone) => return Err(gone(name)),
            Err(CallError::Failed(e)) => return Err(e),
        }
        let removed = {
            let mut worlds = self.lock()?;
            match worlds.get(name) {
                Some(entry) if entry.generation == generation => worlds.remove(name),
                _ => None,
            }
        };
        if let Some(mut entry) = removed {
            if let Some(thread) = entry.thread.take() {
                if thread.join().is_err() {
                    warn!(world = %name, "world actor panicked during destroy");
                }
            }
        }
        info!(world = %name, "world destroyed");
        Ok(())
    }

    /// Bind `session` to a world and build its specs.
    pub(crate) fn join_world(
        &self,
        name: &str,
        session: SessionId,
        settings: Settings,
    ) -> Result<(WorldBinding, SessionSpecs), ProtocolError> {
        let (tx, generation) = self.lookup(name)?;
        let specs = match call(&tx, |reply| WorldCommand::Join {
            session,
            settings,
            reply,
        }) {
            Ok(specs) => specs,
            Err(CallError::Gone) => return Err(gone(name)),
            Err(CallError::Failed(e)) => return Err(e),
        };
        let binding = WorldBinding {
            name: name.to_owned(),
            generation,
            tx,
        };
        Ok((binding, specs))
    }

    /// Reset a world and wait for its barrier. Returns the generation of
    /// the world instance that was reset.
    pub(crate) fn reset_world(
        &self,
        name: &str,
        caller: SessionId,
        settings: Settings,
    ) -> Result<u64, ProtocolError> {
        let (tx, generation) = self.lookup(name)?;
        match call(&tx, |reply| WorldCommand::ResetWorld {
            caller,
            settings,
            reply,
        }) {
            Ok(()) => Ok(generation),
            Err(CallError::Gone) => Err(gone(name)),
            Err(CallError::Failed(e)) => Err(e),
        }
    }

    fn lookup(&self, name: &str) -> Result<(Sender<WorldCommand>, u64), ProtocolError> {
        self.lock()?
            .get(name)
            .map(|e| (e.tx.clone(), e.generation))
            .ok_or_else(|| gone(name))
    }

    /// Whether a world named `name` is live.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().map(|w| w.contains_key(name)).unwrap_or(false)
    }

    /// Names of live worlds, sorted.
    pub fn world_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .map(|w| w.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of live worlds.
    pub fn len(&self) -> usize {
        self.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Whether no world is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for WorldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldRegistry")
            .field("worlds", &self.world_names())
            .finish_non_exhaustive()
    }
}
