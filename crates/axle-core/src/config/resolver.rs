//! Layered plugin configuration resolution.
//!
//! Each plugin sees one merged [`ConfigSection`]: the global section plus
//! its own section, where a plugin key shadows the global key wholesale.
//! Values under a shadowed key are fully replaced, never unioned. Snapshots
//! are resolved once at handle construction and stay immutable for the
//! handle's lifetime.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::config::document::{ConfigDocument, PropertyEntry};
use crate::id::PluginId;
use crate::result::HostResult;

/// An immutable merged configuration view handed to one plugin.
///
/// Keys keep document order (global entries first, shadowed in place;
/// plugin-only entries appended) and are unique case-insensitively.
/// Lookups are case-insensitive. A missing key yields an empty value
/// sequence, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigSection {
    entries: Vec<PropertyEntry>,
}

impl ConfigSection {
    /// Build a section from already-validated entries.
    pub fn from_entries(entries: Vec<PropertyEntry>) -> Self {
        Self { entries }
    }

    /// Keys in section order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// All values under `key`, in order. Empty when the key is absent.
    pub fn values(&self, key: &str) -> &[String] {
        self.entry(key).map(|e| e.values.as_slice()).unwrap_or(&[])
    }

    /// The first value under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values(key).first().map(String::as_str)
    }

    /// The first value under `key` interpreted as a boolean.
    ///
    /// `"true"` and `"1"` (case-insensitive) are true; `"false"` and `"0"`
    /// are false; anything else is `None`.
    pub fn bool_value(&self, key: &str) -> Option<bool> {
        match self.value(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// The first value under `key` parsed as an integer.
    pub fn int_value(&self, key: &str) -> Option<i64> {
        self.value(key)?.trim().parse().ok()
    }

    /// Whether `key` is present (case-insensitive).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Number of keys in the section.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the section has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, values)` pairs in section order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.values.as_slice()))
    }

    fn entry(&self, key: &str) -> Option<&PropertyEntry> {
        self.entries
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(key))
    }
}

/// Resolves merged configuration views from a loaded section document.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    global: Vec<PropertyEntry>,
    sections: HashMap<PluginId, Vec<PropertyEntry>>,
}

impl ConfigResolver {
    /// Build a resolver from a validated document.
    pub fn from_document(document: ConfigDocument) -> Self {
        let mut global = Vec::new();
        let mut sections = HashMap::new();

        for section in document.sections {
            if section.id.is_global() {
                global = section.properties;
            } else {
                sections.insert(section.id, section.properties);
            }
        }

        Self { global, sections }
    }

    /// Load the section document at `path` and build a resolver.
    ///
    /// Fails with a `ConfigLoad` error on any malformed content; this is
    /// checked before any plugin is invoked.
    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        Ok(Self::from_document(ConfigDocument::load(path)?))
    }

    /// The merged view for `plugin_id`.
    ///
    /// Global entries come first in document order; a plugin key matching a
    /// global key (case-insensitive) replaces that entry in place; plugin
    /// keys without a global counterpart are appended in document order.
    /// A plugin without a section sees the global entries alone.
    pub fn resolve(&self, plugin_id: PluginId) -> ConfigSection {
        let mut entries = self.global.clone();

        if let Some(own) = self.sections.get(&plugin_id) {
            for property in own {
                match entries
                    .iter()
                    .position(|e| e.key.eq_ignore_ascii_case(&property.key))
                {
                    Some(pos) => entries[pos] = property.clone(),
                    None => entries.push(property.clone()),
                }
            }
        }

        ConfigSection::from_entries(entries)
    }

    /// The global section alone.
    pub fn global(&self) -> ConfigSection {
        ConfigSection::from_entries(self.global.clone())
    }

    /// Whether `plugin_id` has its own section in the document.
    pub fn has_section(&self, plugin_id: PluginId) -> bool {
        self.sections.contains_key(&plugin_id)
    }
}
