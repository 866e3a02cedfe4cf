//! Typed events exchanged between plugins through the host bus.
//!
//! An event is a numeric kind plus a key-value payload. Kinds below 1000
//! belong to the host (lifecycle broadcasts); plugin-defined kinds start at
//! [`EventKind::FIRST_PLUGIN`]. Events are transient: they exist only for
//! the duration of delivery and are never persisted or replayed.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::PluginId;

/// Numeric event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKind(pub u32);

impl EventKind {
    /// The reserved "no event" kind.
    pub const NONE: EventKind = EventKind(0);
    /// Host broadcast: all handles are registered and the scheduler is
    /// about to start ticking.
    pub const HOST_STARTED: EventKind = EventKind(1);
    /// Host broadcast: shutdown has been signalled.
    pub const HOST_STOPPING: EventKind = EventKind(2);
    /// First kind available to plugin-defined events.
    pub const FIRST_PLUGIN: EventKind = EventKind(1000);

    /// Whether this kind falls in the host-reserved range (below 1000).
    pub fn is_host_reserved(&self) -> bool {
        self.0 < Self::FIRST_PLUGIN.0
    }

    /// Whether this kind falls in the plugin-defined range (1000 and up).
    pub fn is_plugin_defined(&self) -> bool {
        !self.is_host_reserved()
    }

    /// Return the inner numeric value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EventKind {
    fn from(kind: u32) -> Self {
        Self(kind)
    }
}

/// Event payload — a flexible key-value map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload {
    data: HashMap<String, serde_json::Value>,
}

impl EventPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a typed data value.
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Inserts a UUID value.
    pub fn with_uuid(self, key: &str, value: Uuid) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Inserts an integer value.
    pub fn with_int(self, key: &str, value: i64) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Inserts a boolean value.
    pub fn with_bool(self, key: &str, value: bool) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Gets a data value by key.
    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets a UUID data value.
    pub fn get_uuid(&self, key: &str) -> Option<Uuid> {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Gets an i64 data value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a bool data value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Number of entries in the payload.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload has no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over payload entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<HashMap<String, serde_json::Value>> for EventPayload {
    fn from(data: HashMap<String, serde_json::Value>) -> Self {
        Self { data }
    }
}

/// A published event as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique id of this publication, for log correlation.
    pub id: Uuid,
    /// The event kind.
    pub kind: EventKind,
    /// Identity of the publishing plugin, or [`PluginId::GLOBAL`] for
    /// host lifecycle broadcasts.
    pub sender: PluginId,
    /// The key-value payload.
    pub payload: EventPayload,
    /// When the event was accepted by the bus.
    pub published_at: DateTime<Utc>,
}

impl Event {
    /// Stamp a new event envelope.
    pub fn new(sender: PluginId, kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            sender,
            payload,
            published_at: Utc::now(),
        }
    }

    /// Whether this event was published by the host rather than a plugin.
    pub fn is_host_event(&self) -> bool {
        self.sender.is_global()
    }
}
