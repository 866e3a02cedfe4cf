//! SQL access trait.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::result::HostResult;

/// One result row, column name to value.
pub type SqlRow = HashMap<String, serde_json::Value>;

/// Trait for SQL backends.
///
/// Connections are named; the names map to `[sql.connections.<NAME>]`
/// entries in the host configuration. The host core never manages
/// connections itself.
#[async_trait]
pub trait SqlRunner: Send + Sync + std::fmt::Debug + 'static {
    /// Run a query on the named connection and return all rows.
    async fn query(&self, connection: &str, sql: &str) -> HostResult<Vec<SqlRow>>;

    /// Run a statement on the named connection and return the affected
    /// row count.
    async fn execute(&self, connection: &str, sql: &str) -> HostResult<u64>;
}
