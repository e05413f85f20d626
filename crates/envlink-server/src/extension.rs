//! Extension dispatch table.
//!
//! Tags are registered once, before the server starts, and the table is
//! immutable afterwards. A tag routes either to the joined world's
//! [`WorldHooks::extension`](crate::WorldHooks::extension) or to a
//! server-wide [`ExtensionHandler`]. Calls with unregistered tags fail
//! with `UnknownExtension` and never reach a world.

use std::fmt;
use std::sync::Arc;

use envlink_core::{ProtocolError, SessionId};
use indexmap::IndexMap;

use crate::config::ConfigError;
use crate::error::HookError;

/// A server-scoped extension handler. Runs on the calling connection's
/// thread and needs no joined world.
pub trait ExtensionHandler: Send + Sync {
    /// Handle one call.
    fn handle(&self, session: SessionId, payload: &[u8]) -> Result<Vec<u8>, HookError>;
}

impl<F> ExtensionHandler for F
where
    F: Fn(SessionId, &[u8]) -> Result<Vec<u8>, HookError> + Send + Sync,
{
    fn handle(&self, session: SessionId, payload: &[u8]) -> Result<Vec<u8>, HookError> {
        self(session, payload)
    }
}

#[derive(Clone)]
pub(crate) enum ExtensionRoute {
    World,
    Server(Arc<dyn ExtensionHandler>),
}

/// The closed set of extension tags a server accepts.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    routes: IndexMap<String, ExtensionRoute>,
}

impl ExtensionRegistry {
    /// An empty table. Every extension call fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `tag` to the joined world's hooks.
    pub fn register_world(&mut self, tag: impl Into<String>) -> Result<(), ConfigError> {
        self.insert(tag.into(), ExtensionRoute::World)
    }

    /// Route `tag` to a server-wide handler.
    pub fn register_handler(
        &mut self,
        tag: impl Into<String>,
        handler: impl ExtensionHandler + 'static,
    ) -> Result<(), ConfigError> {
        self.insert(tag.into(), ExtensionRoute::Server(Arc::new(handler)))
    }

    fn insert(&mut self, tag: String, route: ExtensionRoute) -> Result<(), ConfigError> {
        if tag.is_empty() {
            return Err(ConfigError::EmptyExtensionTag);
        }
        if self.routes.contains_key(&tag) {
            return Err(ConfigError::DuplicateExtension { tag });
        }
        self.routes.insert(tag, route);
        Ok(())
    }

    /// Whether `tag` is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.routes.contains_key(tag)
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no tags are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn route(&self, tag: &str) -> Result<&ExtensionRoute, ProtocolError> {
        self.routes.get(tag).ok_or_else(|| {
            ProtocolError::unknown_extension(format!("extension `{tag}` is not registered"))
                .with_field(tag)
        })
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("tags", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}
