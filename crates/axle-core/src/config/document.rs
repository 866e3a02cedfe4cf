//! The plugin section document.
//!
//! Plugin-facing configuration lives in its own TOML document, separate from
//! the typed host settings: an ordered list of sections keyed by plugin id,
//! each holding ordered multi-valued string properties. The all-zero id
//! marks the global section.
//!
//! ```toml
//! [[section]]
//! id = "00000000-0000-0000-0000-000000000000"
//!
//! [[section.property]]
//! key = "Environment"
//! values = ["production"]
//! ```
//!
//! Any malformed content fails the whole load: unreadable file, TOML syntax
//! errors, ids that are not UUIDs, duplicate section ids, or keys that
//! collide case-insensitively within one section. A plugin *without* a
//! section is not an error; it simply resolves to the global view.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::id::PluginId;
use crate::result::HostResult;

/// One `key = values` property within a section, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEntry {
    /// Property key, unique case-insensitively within its section.
    pub key: String,
    /// Ordered values. May be empty.
    #[serde(default)]
    pub values: Vec<String>,
}

/// One validated section of the document.
#[derive(Debug, Clone)]
pub struct Section {
    /// The plugin this section configures, or [`PluginId::GLOBAL`].
    pub id: PluginId,
    /// Properties in document order.
    pub properties: Vec<PropertyEntry>,
}

/// The parsed and validated section document.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    /// Sections in document order.
    pub sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default, rename = "section")]
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    id: String,
    #[serde(default, rename = "property")]
    properties: Vec<PropertyEntry>,
}

impl ConfigDocument {
    /// Read and parse the section document at `path`.
    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HostError::with_source(
                crate::error::ErrorKind::ConfigLoad,
                format!("Failed to read section document {}: {e}", path.display()),
                e,
            )
        })?;
        Self::parse(&text)
    }

    /// Parse and validate section document text.
    pub fn parse(text: &str) -> HostResult<Self> {
        let raw: RawDocument = toml::from_str(text)?;

        let mut sections = Vec::with_capacity(raw.sections.len());
        let mut seen_ids = HashSet::new();

        for section in raw.sections {
            let id: PluginId = section.id.parse().map_err(|_| {
                HostError::config_load(format!(
                    "Section id '{}' is not a valid UUID",
                    section.id
                ))
            })?;

            if !seen_ids.insert(id) {
                return Err(HostError::config_load(format!(
                    "Duplicate section id {id}"
                )));
            }

            let mut seen_keys = HashSet::new();
            for property in &section.properties {
                if !seen_keys.insert(property.key.to_ascii_lowercase()) {
                    return Err(HostError::config_load(format!(
                        "Duplicate key '{}' in section {id}",
                        property.key
                    )));
                }
            }

            sections.push(Section {
                id,
                properties: section.properties,
            });
        }

        Ok(Self { sections })
    }
}
