//! User directory lookup trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::HostResult;

/// A user record returned by a directory lookup.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DirectoryUser {
    /// Account name (the lookup key).
    pub account: String,
    /// Human display name.
    pub display_name: String,
    /// Mail address, when the directory has one.
    pub email: Option<String>,
    /// Distinguished name within the directory tree.
    pub distinguished_name: String,
    /// User principal name (`account@domain`).
    pub principal_name: String,
    /// Directory object id.
    pub id: Uuid,
    /// Group memberships.
    pub groups: Vec<String>,
}

/// Trait for user directory backends.
#[async_trait]
pub trait DirectoryLookup: Send + Sync + std::fmt::Debug + 'static {
    /// Look up a user by account name. `Ok(None)` means the directory
    /// answered and no such user exists.
    async fn lookup_user(&self, account: &str) -> HostResult<Option<DirectoryUser>>;
}
