//! The plugin contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use axle_core::event::Event;
use axle_core::id::PluginId;

use crate::context::PluginContext;

/// Identity of a plugin: a stable 128-bit id plus a display name.
///
/// The id is the key for configuration sections, event routing, and
/// command-line selection; it must never change between runs. The name is
/// for humans and logs only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdentity {
    /// Stable plugin id.
    pub id: PluginId,
    /// Human-readable display name.
    pub name: String,
}

impl PluginIdentity {
    /// Create a plugin identity.
    pub fn new(id: PluginId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for PluginIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// The contract every plugin implements.
///
/// Plugins are opaque units of work. The host invokes them on the
/// scheduled cycle through [`run`](Plugin::run) and for each delivered
/// event through [`run_event`](Plugin::run_event); invocations of one
/// plugin never overlap. Errors and panics are captured per invocation
/// and recorded on the plugin's handle without affecting other plugins.
#[async_trait]
pub trait Plugin: Send + Sync + std::fmt::Debug {
    /// The plugin's stable identity.
    fn identity(&self) -> PluginIdentity;

    /// One scheduled cycle of work.
    ///
    /// Long-running plugins should check
    /// [`ctx.is_shutting_down()`](PluginContext::is_shutting_down) at safe
    /// checkpoints; after the shutdown grace period the invocation is
    /// terminated at its next await point.
    async fn run(&self, ctx: &PluginContext) -> anyhow::Result<()>;

    /// Handle one delivered event. The default implementation ignores it.
    async fn run_event(&self, ctx: &PluginContext, event: &Event) -> anyhow::Result<()> {
        let _ = (ctx, event);
        Ok(())
    }
}
