//! # axle-core
//!
//! Core crate for the Axle plugin host. Contains typed identifiers, the
//! event data model, configuration schemas, the plugin section document,
//! collaborator traits, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Axle crates.

pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod result;
pub mod traits;

pub use error::HostError;
pub use result::HostResult;
