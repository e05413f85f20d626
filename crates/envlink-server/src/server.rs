//! The server handle and its builder.

use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::config::{ConfigError, ServerConfig};
use crate::connection::{ClientStream, Connection};
use crate::error::TransportError;
use crate::extension::ExtensionRegistry;
use crate::hooks::WorldFactory;
use crate::registry::WorldRegistry;

/// State shared by every connection of one server.
pub(crate) struct ServerShared {
    pub config: ServerConfig,
    pub registry: WorldRegistry,
    pub extensions: ExtensionRegistry,
}

/// A world-hosting server. Cheap to clone; clones share all state.
///
/// Each client stream is one [`Connection`]. Use [`Server::connect`] to
/// drive a connection from the calling thread or
/// [`Server::spawn_connection`] to serve it on its own thread.
#[derive(Clone)]
pub struct Server {
    shared: Arc<ServerShared>,
}

impl Server {
    /// Start building a server around `factory`.
    pub fn builder(factory: impl WorldFactory + 'static) -> ServerBuilder {
        ServerBuilder {
            factory: Box::new(factory),
            config: ServerConfig::default(),
            extensions: ExtensionRegistry::new(),
        }
    }

    /// A server with default configuration and no extensions.
    pub fn new(factory: impl WorldFactory + 'static) -> Result<Self, ConfigError> {
        Self::builder(factory).build()
    }

    /// Open a connection served by the caller.
    pub fn connect(&self) -> Connection {
        Connection::new(Arc::clone(&self.shared))
    }

    /// Open a connection served on a dedicated thread.
    ///
    /// The request queue is bounded by
    /// [`ServerConfig::stream_queue_capacity`].
    pub fn spawn_connection(&self) -> Result<ClientStream, TransportError> {
        let mut connection = self.connect();
        let session = connection.session_id();
        let (req_tx, req_rx) = crossbeam_channel::bounded(self.shared.config.stream_queue_capacity);
        let (resp_tx, resp_rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name(format!("envlink-conn-{session}"))
            .spawn(move || connection.serve(&req_rx, &resp_tx))
            .map_err(|e| TransportError::Spawn {
                reason: e.to_string(),
            })?;
        debug!(session = %session, "connection spawned");
        Ok(ClientStream::new(req_tx, resp_rx, session, thread))
    }

    /// The world registry.
    pub fn registry(&self) -> &WorldRegistry {
        &self.shared.registry
    }

    /// Names of live worlds, sorted.
    pub fn world_names(&self) -> Vec<String> {
        self.shared.registry.world_names()
    }

    /// Number of live worlds.
    pub fn live_worlds(&self) -> usize {
        self.shared.registry.len()
    }

    /// The server's configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// The extension table.
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.shared.extensions
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.shared.config)
            .field("registry", &self.shared.registry)
            .field("extensions", &self.shared.extensions)
            .finish()
    }
}

// ── ServerBuilder ──────────────────────────────────────────────────

/// Builder for [`Server`].
pub struct ServerBuilder {
    factory: Box<dyn WorldFactory>,
    config: ServerConfig,
    extensions: ExtensionRegistry,
}

impl ServerBuilder {
    /// Replace the configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the extension table.
    pub fn extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    /// Validate the configuration and build the server.
    pub fn build(self) -> Result<Server, ConfigError> {
        self.config.validate()?;
        let registry = WorldRegistry::new(self.factory, self.config.clone());
        Ok(Server {
            shared: Arc::new(ServerShared {
                config: self.config,
                registry,
                extensions: self.extensions,
            }),
        })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}
