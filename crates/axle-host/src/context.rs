//! Plugin context — the explicit surface a plugin gets from its host.
//!
//! Everything a plugin may touch arrives through this context: its own
//! identity, its resolved configuration snapshot, the host arguments, a
//! publisher bound to its identity, the external collaborators, and the
//! shutdown signal. There is no ambient host state.

use std::sync::Arc;

use tokio::sync::watch;

use axle_core::config::resolver::ConfigSection;
use axle_core::event::{EventKind, EventPayload};
use axle_core::id::PluginId;
use axle_core::result::HostResult;
use axle_core::traits::{DirectoryLookup, MailSender, SqlRunner};

use crate::bus::EventBus;
use crate::plugin::PluginIdentity;

/// Context passed to every plugin invocation.
#[derive(Clone)]
pub struct PluginContext {
    /// Identity of the plugin this context belongs to.
    pub identity: PluginIdentity,
    /// Immutable merged configuration snapshot for this plugin.
    pub config: Arc<ConfigSection>,
    /// Command-line arguments the host process was started with.
    pub args: Arc<Vec<String>>,
    /// Event publisher bound to this plugin's identity.
    pub events: EventPublisher,
    /// Mail collaborator.
    pub mail: Arc<dyn MailSender>,
    /// SQL collaborator.
    pub sql: Arc<dyn SqlRunner>,
    /// Directory collaborator.
    pub directory: Arc<dyn DirectoryLookup>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl PluginContext {
    /// The plugin's stable id.
    pub fn plugin_id(&self) -> PluginId {
        self.identity.id
    }

    /// Whether host shutdown has been signalled. Long-running work should
    /// check this at safe checkpoints and return early.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once host shutdown is signalled. Useful inside
    /// `tokio::select!` for plugins that wait on external work.
    pub async fn shutting_down(&self) {
        let mut rx = self.shutdown.clone();
        // Lost sender means the host is gone; treat it as shutdown.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Publishes events on behalf of one plugin.
///
/// The sender identity is bound at construction, so a plugin cannot
/// impersonate another publisher.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    bus: Arc<EventBus>,
    sender: PluginId,
}

impl EventPublisher {
    pub(crate) fn new(bus: Arc<EventBus>, sender: PluginId) -> Self {
        Self { bus, sender }
    }

    /// Publish an event to all subscribed plugins.
    ///
    /// Returns the number of mailboxes the event was delivered to. Kinds
    /// below [`EventKind::FIRST_PLUGIN`] are host-reserved; publishing one
    /// triggers the host's reserved-range policy.
    pub async fn publish(&self, kind: EventKind, payload: EventPayload) -> HostResult<usize> {
        self.bus.publish(self.sender, kind, payload).await
    }
}
