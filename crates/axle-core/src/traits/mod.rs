//! Collaborator traits for external systems.
//!
//! Mail delivery, SQL access, and directory lookups stay outside the host
//! core. Plugins reach them only through these narrow traits; deployments
//! inject real implementations, and the host ships minimal stand-ins.

pub mod directory;
pub mod mail;
pub mod sql;

pub use directory::{DirectoryLookup, DirectoryUser};
pub use mail::{MailMessage, MailSender};
pub use sql::{SqlRow, SqlRunner};
