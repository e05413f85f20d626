//! Server configuration, validation, and error types.

/// What DestroyWorld does while other sessions are still joined.
///
/// A session destroying the world it is itself joined to is refused
/// under every policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DestroyPolicy {
    /// Fail with a conflict error. Default.
    #[default]
    Refuse,
    /// Unbind every joined session and fail any pending barrier.
    Force,
    /// Wait until the joined set empties. New joins are refused meanwhile.
    Block,
}

// ── ServerConfig ──────────────────────────────────────────────────

/// Configuration for a [`Server`](crate::Server).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Upper bound on concurrently live worlds. `None` = unlimited.
    /// `Some(1)` gives the single-world behaviour of simple environments.
    pub max_live_worlds: Option<usize>,
    /// DestroyWorld behaviour when sessions remain joined.
    pub destroy_policy: DestroyPolicy,
    /// Capacity of each world actor's inbound queue. Default: 64.
    pub world_queue_capacity: usize,
    /// Capacity of a spawned connection's request queue. Default: 32.
    pub stream_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_live_worlds: None,
            destroy_policy: DestroyPolicy::Refuse,
            world_queue_capacity: 64,
            stream_queue_capacity: 32,
        }
    }
}

impl ServerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_live_worlds == Some(0) {
            return Err(ConfigError::ZeroWorldLimit);
        }
        if self.world_queue_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero {
                queue: "world_queue_capacity",
            });
        }
        if self.stream_queue_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero {
                queue: "stream_queue_capacity",
            });
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building a server.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `max_live_worlds` is `Some(0)`.
    #[error("max_live_worlds must be at least 1")]
    ZeroWorldLimit,
    /// A queue capacity is zero.
    #[error("{queue} must be at least 1")]
    QueueCapacityZero {
        /// Which setting.
        queue: &'static str,
    },
    /// An extension tag was registered twice.
    #[error("extension `{tag}` is already registered")]
    DuplicateExtension {
        /// Repeated tag.
        tag: String,
    },
    /// An extension tag is empty.
    #[error("extension tags must not be empty")]
    EmptyExtensionTag,
}
