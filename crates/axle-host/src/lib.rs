//! # axle-host
//!
//! Plugin execution core for Axle. Provides:
//!
//! - The [`Plugin`] trait and per-plugin execution context
//! - Plugin handles with a bounded invocation mailbox and fault capture
//! - The event bus routing typed events between plugins
//! - The repeating scheduler cycle with cooperative shutdown
//! - The [`PluginHost`] facade tying registry, bus, and scheduler together
//! - Default collaborator stand-ins for mail, SQL, and directory access

pub mod bus;
pub mod collab;
pub mod context;
pub mod handle;
pub mod host;
pub mod mailbox;
pub mod plugin;
pub mod registry;
pub mod scheduler;

pub use bus::EventBus;
pub use context::{EventPublisher, PluginContext};
pub use handle::{HandleSnapshot, HandleState, LastRun, PluginHandle, RunOutcome};
pub use host::{PluginHost, PluginHostBuilder, RunReport};
pub use mailbox::Invocation;
pub use plugin::{Plugin, PluginIdentity};
pub use registry::HandleRegistry;
pub use scheduler::Scheduler;
