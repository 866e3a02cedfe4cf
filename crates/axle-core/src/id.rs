//! Newtype wrapper around [`uuid::Uuid`] for plugin identifiers.
//!
//! Plugins are identified by a stable 128-bit id that survives restarts and
//! renames. The all-zero id is reserved for the global configuration
//! section and never names a plugin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(pub Uuid);

impl PluginId {
    /// The all-zero identifier reserved for the global configuration
    /// section.
    pub const GLOBAL: PluginId = PluginId(Uuid::nil());

    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an identifier from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Return the inner UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// Return a reference to the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether this is the reserved all-zero global identifier.
    pub fn is_global(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for PluginId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PluginId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for PluginId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<PluginId> for Uuid {
    fn from(id: PluginId) -> Uuid {
        id.0
    }
}
