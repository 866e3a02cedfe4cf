//! # axle-plugin-sdk
//!
//! SDK for developing plugins for the Axle host.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axle_plugin_sdk::prelude::*;
//!
//! #[derive(Debug)]
//! struct MyPlugin;
//!
//! #[async_trait]
//! impl Plugin for MyPlugin {
//!     fn identity(&self) -> PluginIdentity {
//!         PluginIdentity::new(
//!             "b6f0a6be-6f4e-4f58-9f26-1f2a3a9a0c11".parse().unwrap(),
//!             "My Plugin",
//!         )
//!     }
//!
//!     async fn run(&self, ctx: &PluginContext) -> anyhow::Result<()> {
//!         for key in ctx.config.keys() {
//!             tracing::info!(key, values = ?ctx.config.values(key), "configured");
//!         }
//!         ctx.events
//!             .publish(EventKind(1100), EventPayload::new().with_string("hello", "world"))
//!             .await?;
//!         Ok(())
//!     }
//!
//!     async fn run_event(&self, _ctx: &PluginContext, event: &Event) -> anyhow::Result<()> {
//!         tracing::info!(kind = %event.kind, sender = %event.sender, "event received");
//!         Ok(())
//!     }
//! }
//! ```
//!
//! The id returned by `identity` must be stable across runs: it keys the
//! plugin's configuration section and its event subscription.

/// Prelude for convenient imports.
pub mod prelude {
    pub use anyhow;
    pub use async_trait::async_trait;

    pub use axle_core::HostResult;
    pub use axle_core::config::resolver::ConfigSection;
    pub use axle_core::event::{Event, EventKind, EventPayload};
    pub use axle_core::id::PluginId;
    pub use axle_core::traits::{
        DirectoryLookup, DirectoryUser, MailMessage, MailSender, SqlRow, SqlRunner,
    };

    pub use axle_host::{EventPublisher, Plugin, PluginContext, PluginIdentity};
}
