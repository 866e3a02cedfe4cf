//! Unified host error types for Axle.
//!
//! All crates map their internal errors into [`HostError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The configuration (host settings or the plugin section document)
    /// could not be loaded. Fatal on startup paths.
    ConfigLoad,
    /// A plugin invocation failed.
    Plugin,
    /// A published event kind violated the reserved range policy.
    EventRange,
    /// A registry operation failed (duplicate or unknown plugin).
    Registry,
    /// An external collaborator (mail, SQL, directory) failed or is not
    /// wired into this host build.
    Collaborator,
    /// An I/O error occurred.
    Io,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// The host is shutting down and refused new work.
    Shutdown,
    /// An internal host error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigLoad => write!(f, "CONFIG_LOAD"),
            Self::Plugin => write!(f, "PLUGIN"),
            Self::EventRange => write!(f, "EVENT_RANGE"),
            Self::Registry => write!(f, "REGISTRY"),
            Self::Collaborator => write!(f, "COLLABORATOR"),
            Self::Io => write!(f, "IO"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Shutdown => write!(f, "SHUTDOWN"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout the Axle host.
///
/// All crate-specific errors are mapped into `HostError` using `From` impls
/// or explicit `.map_err()` calls. Plugin-authored code uses `anyhow` at the
/// trait boundary instead; the host converts captured failures into
/// per-handle run outcomes rather than letting them cross into control flow.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct HostError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HostError {
    /// Create a new host error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new host error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration-load error.
    pub fn config_load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigLoad, message)
    }

    /// Create a plugin invocation error.
    pub fn plugin(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Plugin, message)
    }

    /// Create an event range policy error.
    pub fn event_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EventRange, message)
    }

    /// Create a registry error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Registry, message)
    }

    /// Create a collaborator error.
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Collaborator, message)
    }

    /// Create a shutdown error.
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shutdown, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for HostError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Io, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for HostError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::ConfigLoad,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<toml::de::Error> for HostError {
    fn from(err: toml::de::Error) -> Self {
        Self::with_source(
            ErrorKind::ConfigLoad,
            format!("Section document parse error: {err}"),
            err,
        )
    }
}
