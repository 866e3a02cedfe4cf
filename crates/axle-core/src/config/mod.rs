//! Host configuration schemas.
//!
//! Typed host settings are deserialized from a TOML file via the `config`
//! crate with an `AXLE`-prefixed environment overlay. Plugin-facing
//! key-value configuration lives in a separate section document, handled by
//! [`document`] and [`resolver`].

pub mod document;
pub mod resolver;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Root host configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration file and environment variables. Every section has
/// full defaults so the host can start without a configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scheduler and lifecycle settings.
    #[serde(default)]
    pub host: HostConfig,
    /// Event bus delivery settings.
    #[serde(default)]
    pub events: EventConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Mail collaborator settings.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// SQL collaborator settings.
    #[serde(default)]
    pub sql: SqlConfig,
    /// Directory collaborator settings.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

/// Scheduler and lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Seconds between scheduled plugin cycles.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// Seconds an in-flight invocation may keep running after shutdown is
    /// signalled before it is forcibly terminated.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Path to the plugin section document.
    #[serde(default = "default_plugin_config")]
    pub plugin_config: String,
    /// Disable a plugin after this many consecutive failures.
    /// Absent means failures never disable a plugin.
    #[serde(default)]
    pub disable_after_failures: Option<u32>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            shutdown_grace_seconds: default_shutdown_grace(),
            plugin_config: default_plugin_config(),
            disable_after_failures: None,
        }
    }
}

/// Policy for plugins that publish event kinds in the host-reserved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservedRangePolicy {
    /// Log a warning and deliver the event anyway.
    Warn,
    /// Refuse the publication with an error; nothing is delivered.
    Reject,
}

/// Event bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Whether published events are also delivered back to their sender.
    #[serde(default = "default_true")]
    pub deliver_to_sender: bool,
    /// Per-plugin invocation queue capacity. When full, the oldest queued
    /// invocation is dropped with a warning.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// What to do when a plugin publishes a host-reserved event kind.
    #[serde(default = "default_reserved_range")]
    pub reserved_range: ReservedRangePolicy,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            deliver_to_sender: default_true(),
            queue_capacity: default_queue_capacity(),
            reserved_range: default_reserved_range(),
        }
    }
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format: `"json"` or `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Mail collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Sender address for host-originated mail.
    #[serde(default = "default_smtp_from")]
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            from: default_smtp_from(),
        }
    }
}

/// Named SQL connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConnectionConfig {
    /// Database server host.
    pub host: String,
    /// Database name.
    pub database: String,
    /// Optional login user.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional login password.
    #[serde(default)]
    pub password: Option<String>,
}

/// SQL collaborator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Named connections available to plugins through the SQL collaborator.
    #[serde(default)]
    pub connections: HashMap<String, SqlConnectionConfig>,
}

/// One user entry served by the static directory collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUserEntry {
    /// Account name plugins look up.
    pub account: String,
    /// Human display name.
    pub display_name: String,
    /// Mail address.
    #[serde(default)]
    pub email: Option<String>,
    /// Group memberships.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Directory collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Domain suffix used to synthesize principal names.
    #[serde(default = "default_directory_domain")]
    pub domain: String,
    /// Users served by the static directory collaborator.
    #[serde(default)]
    pub users: Vec<DirectoryUserEntry>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            domain: default_directory_domain(),
            users: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Merges the file (optional; defaults apply when it is missing) with
    /// environment variables prefixed with `AXLE_`.
    pub fn load(path: &str) -> Result<Self, HostError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("AXLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| HostError::config_load(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| HostError::config_load(format!("Failed to deserialize config: {e}")))
    }
}

fn default_tick_interval() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_plugin_config() -> String {
    "config/plugins.toml".to_string()
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    16
}

fn default_reserved_range() -> ReservedRangePolicy {
    ReservedRangePolicy::Warn
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_smtp_from() -> String {
    "axle@localhost".to_string()
}

fn default_directory_domain() -> String {
    "example.org".to_string()
}
