//! World-reset barriers.
//!
//! A [`ResetCoordinator`] lives inside one world actor. ResetWorld
//! registers a barrier holding the caller's reply sender and the set of
//! sessions that must each complete one interrupted Step. The actor keeps
//! serving every other request while the barrier is pending; the barrier
//! completes when its wait set empties, either through interrupted steps
//! or through sessions leaving.

use std::collections::HashSet;

use crossbeam_channel::Sender;
use envlink_core::{ProtocolError, SessionId};
use tracing::debug;

/// Reply channel a barrier completes.
pub(crate) type BarrierReply = Sender<Result<(), ProtocolError>>;

struct PendingBarrier {
    id: u64,
    caller: SessionId,
    waiting: HashSet<SessionId>,
    reply: BarrierReply,
}

/// Pending ResetWorld barriers of one world.
pub(crate) struct ResetCoordinator {
    world: String,
    pending: Vec<PendingBarrier>,
    next_id: u64,
}

impl ResetCoordinator {
    pub fn new(world: impl Into<String>) -> Self {
        Self {
            world: world.into(),
            pending: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a barrier. Replies at once if `waiting` is empty.
    ///
    /// Sessions that join later are never added to an existing barrier.
    pub fn register(
        &mut self,
        caller: SessionId,
        waiting: impl IntoIterator<Item = SessionId>,
        reply: BarrierReply,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let waiting: HashSet<SessionId> = waiting.into_iter().filter(|s| *s != caller).collect();
        debug!(
            world = %self.world,
            barrier = id,
            caller = %caller,
            waiting = waiting.len(),
            "reset barrier registered"
        );
        self.pending.push(PendingBarrier {
            id,
            caller,
            waiting,
            reply,
        });
        self.release_satisfied();
        id
    }

    /// Whether `session`'s next step must report an interruption.
    pub fn must_interrupt(&self, session: SessionId) -> bool {
        self.pending.iter().any(|b| b.waiting.contains(&session))
    }

    /// `session` completed an interrupted step. Returns the number of
    /// barriers released.
    pub fn acknowledge(&mut self, session: SessionId) -> usize {
        self.remove_waiter(session)
    }

    /// `session` left or disconnected; stop waiting on it.
    pub fn forget(&mut self, session: SessionId) -> usize {
        self.remove_waiter(session)
    }

    /// Fail every pending barrier.
    pub fn abort_all(&mut self, error: &ProtocolError) -> usize {
        let aborted = self.pending.len();
        for barrier in self.pending.drain(..) {
            debug!(world = %self.world, barrier = barrier.id, "reset barrier aborted");
            let _ = barrier.reply.send(Err(error.clone()));
        }
        aborted
    }

    /// Number of unreleased barriers.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn remove_waiter(&mut self, session: SessionId) -> usize {
        let mut touched = false;
        for barrier in &mut self.pending {
            touched |= barrier.waiting.remove(&session);
        }
        if touched {
            self.release_satisfied()
        } else {
            0
        }
    }

    fn release_satisfied(&mut self) -> usize {
        let (done, still_waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|b| b.waiting.is_empty());
        self.pending = still_waiting;
        for barrier in &done {
            debug!(
                world = %self.world,
                barrier = barrier.id,
                caller = %barrier.caller,
                "reset barrier released"
            );
            // The caller may have disconnected; nobody is owed a reply then.
            let _ = barrier.reply.send(Ok(()));
        }
        done.len()
    }
}
