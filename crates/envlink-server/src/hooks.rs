//! Environment-side traits consumed by the server.
//!
//! A [`WorldFactory`] creates worlds; each world is a boxed
//! [`WorldHooks`] owned exclusively by its actor thread. Hooks see
//! name-keyed decoded [`Array`]s only. Uid translation and tensor
//! encoding happen in the session layer.

use envlink_core::{Array, EnvironmentState, PropertyNode, SessionId, Settings, Tensor, TensorSpec};
use indexmap::IndexMap;

use crate::error::HookError;

/// Name-keyed decoded values.
pub type NamedArrays = IndexMap<String, Array>;

/// Spec lists reported by a world on Join and Reset.
///
/// Order is significant: uids are assigned in list order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldSpecs {
    /// Action specs.
    pub actions: Vec<TensorSpec>,
    /// Observation specs.
    pub observations: Vec<TensorSpec>,
}

/// Why a step is being taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Mid-sequence; apply the actions.
    Continue,
    /// The session was not running. Actions were discarded; begin a new
    /// sequence and report its first observations.
    StartSequence,
    /// Another session reset the world. Actions were discarded; report
    /// current observations. The session sees `Interrupted` regardless
    /// of the state returned.
    Interrupted,
}

/// Input to [`WorldHooks::step`].
#[derive(Debug)]
pub struct StepInput<'a> {
    /// Why the step is being taken.
    pub kind: StepKind,
    /// Decoded actions. Empty unless `kind` is [`StepKind::Continue`].
    pub actions: &'a NamedArrays,
    /// Names of the observations the client asked for, deduplicated.
    pub requested: &'a [String],
}

/// Result of [`WorldHooks::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    /// State after the step.
    pub state: EnvironmentState,
    /// Observations by name. Must cover every requested name.
    pub observations: NamedArrays,
}

impl StepOutcome {
    /// A running outcome with the given observations.
    pub fn running(observations: NamedArrays) -> Self {
        Self {
            state: EnvironmentState::Running,
            observations,
        }
    }
}

/// A newly created world and the name it should be registered under.
pub struct CreatedWorld {
    /// Globally unique world name.
    pub name: String,
    /// The world's hooks, moved onto the world's actor thread.
    pub hooks: Box<dyn WorldHooks>,
}

impl std::fmt::Debug for CreatedWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedWorld")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Creates worlds on CreateWorld requests.
///
/// Called from connection threads, so implementations must be `Sync`.
pub trait WorldFactory: Send + Sync {
    /// Validate `settings` and build a world.
    ///
    /// Return [`HookError::Conflict`] to refuse, e.g. for a single-world
    /// environment that already has one.
    fn create_world(&self, settings: &Settings) -> Result<CreatedWorld, HookError>;
}

/// One world's behaviour.
///
/// Every method runs on the world's actor thread, one call at a time,
/// so implementations need no internal locking.
pub trait WorldHooks: Send {
    /// A session joined. Returns the specs for that session.
    fn join_world(&mut self, session: SessionId, settings: &Settings)
        -> Result<WorldSpecs, HookError>;

    /// Advance `session`.
    fn step(&mut self, session: SessionId, input: StepInput<'_>) -> Result<StepOutcome, HookError>;

    /// Restart `session`'s sequence. Returns the (possibly changed) specs.
    fn reset(&mut self, session: SessionId, settings: &Settings) -> Result<WorldSpecs, HookError>;

    /// Apply world-wide reset settings.
    fn reset_world(&mut self, settings: &Settings) -> Result<(), HookError>;

    /// A session left or disconnected. Must not fail.
    fn leave(&mut self, session: SessionId);

    /// The world is being torn down.
    fn destroy_world(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Metadata for one property key, or `None` if it does not exist.
    fn property_node(&self, _session: SessionId, _key: &str) -> Option<PropertyNode> {
        None
    }

    /// Read a property already known to be readable.
    fn read_property(&mut self, _session: SessionId, key: &str) -> Result<Tensor, HookError> {
        Err(HookError::NotFound(format!("no property `{key}`")))
    }

    /// Write a batch of properties, each already known to be writable and
    /// spec-conformant.
    ///
    /// Implementations apply every value or none: on error the world's
    /// properties must be left as they were.
    fn write_properties(
        &mut self,
        _session: SessionId,
        values: &IndexMap<String, Tensor>,
    ) -> Result<(), HookError> {
        let key = values.keys().next().map(String::as_str).unwrap_or_default();
        Err(HookError::NotFound(format!("no property `{key}`")))
    }

    /// Children of a listable key. The empty key is the root.
    fn list_property(&self, _session: SessionId, _key: &str) -> Result<Vec<PropertyNode>, HookError> {
        Ok(Vec::new())
    }

    /// Handle an extension call routed to this world.
    fn extension(
        &mut self,
        _session: SessionId,
        tag: &str,
        _payload: &[u8],
    ) -> Result<Vec<u8>, HookError> {
        Err(HookError::UnknownExtension(format!(
            "world does not handle extension `{tag}`"
        )))
    }
}
