//! Registry of plugin handles.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use axle_core::error::HostError;
use axle_core::id::PluginId;
use axle_core::result::HostResult;

use crate::handle::{HandleSnapshot, PluginHandle};

/// Thread-safe registry mapping plugin ids to their handles.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    handles: RwLock<HashMap<PluginId, Arc<PluginHandle>>>,
}

impl HandleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle. Fails when the plugin id is already registered.
    pub async fn register(&self, handle: Arc<PluginHandle>) -> HostResult<()> {
        let mut handles = self.handles.write().await;
        if handles.contains_key(&handle.id()) {
            return Err(HostError::registry(format!(
                "Plugin {} is already registered",
                handle.identity()
            )));
        }

        debug!(
            plugin = %handle.name(),
            plugin_id = %handle.id(),
            "Registered plugin handle"
        );
        handles.insert(handle.id(), handle);
        Ok(())
    }

    /// Get a handle by plugin id.
    pub async fn get(&self, id: PluginId) -> Option<Arc<PluginHandle>> {
        self.handles.read().await.get(&id).cloned()
    }

    /// All handles whose display name matches, case-insensitively.
    pub async fn by_name(&self, name: &str) -> Vec<Arc<PluginHandle>> {
        self.handles
            .read()
            .await
            .values()
            .filter(|h| h.name().eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }

    /// All handles, sorted by display name.
    pub async fn list(&self) -> Vec<Arc<PluginHandle>> {
        let mut handles: Vec<_> = self.handles.read().await.values().cloned().collect();
        handles.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().0.cmp(&b.id().0)));
        handles
    }

    /// Snapshots of all handles, sorted by display name.
    pub async fn snapshots(&self) -> Vec<HandleSnapshot> {
        let mut snapshots = Vec::new();
        for handle in self.list().await {
            snapshots.push(handle.snapshot().await);
        }
        snapshots
    }

    /// Whether a plugin id is registered.
    pub async fn contains(&self, id: PluginId) -> bool {
        self.handles.read().await.contains_key(&id)
    }

    /// Number of registered handles.
    pub async fn count(&self) -> usize {
        self.handles.read().await.len()
    }
}
