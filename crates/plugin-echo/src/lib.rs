//! Echo plugin.
//!
//! Logs every event delivered to it and keeps a running count; its
//! scheduled entry logs a heartbeat with that count. Registering it next
//! to any publishing plugin shows cross-plugin event delivery end to end.

use std::sync::atomic::{AtomicU64, Ordering};

use axle_plugin_sdk::prelude::*;
use tracing::info;
use uuid::uuid;

/// The stable echo plugin id.
pub const ECHO_PLUGIN_ID: PluginId = PluginId(uuid!("3c8a77a5-2f3e-4df0-9b36-54dd0f0f5de2"));

/// The built-in echo plugin.
#[derive(Debug, Default)]
pub struct EchoPlugin {
    received: AtomicU64,
}

impl EchoPlugin {
    /// Create the echo plugin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events received so far.
    pub fn received_count(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new(ECHO_PLUGIN_ID, "Axle Echo Plugin")
    }

    async fn run(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
        info!(
            received = self.received_count(),
            "Echo plugin heartbeat"
        );
        Ok(())
    }

    async fn run_event(&self, _ctx: &PluginContext, event: &Event) -> anyhow::Result<()> {
        let received = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            kind = %event.kind,
            sender = %event.sender,
            event_id = %event.id,
            received,
            "Echo plugin received an event"
        );
        for (key, value) in event.payload.iter() {
            info!("   {key} = {value}");
        }
        Ok(())
    }
}
