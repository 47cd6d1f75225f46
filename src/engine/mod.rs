pub mod statement;
pub use statement::*;

pub mod memory;
pub use memory::*;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;

/// Result set of one executed statement.
///
/// `rows` holds JSON objects keyed by column name; `rows_affected` counts the
/// rows a mutating statement touched (0 for pure reads that return rows).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<Value>,
    pub rows_affected: u64,
}

/// Execution seam between the relation manager and a database engine.
///
/// Implementations run fully-formed SQL text and provide the engine's native
/// bulk-copy from a CSV file. The handle is shared: several relation managers
/// may issue statements through one executor concurrently, and the executor
/// owns whatever locking or connection state that requires.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute one statement. `params` supplies values for `$1..$n`
    /// placeholders, in order.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, EngineError>;

    /// Bulk-copy a CSV file into `relation`, one file column per name in
    /// `columns`, in order. Returns the number of rows loaded. A failed load
    /// must never pass silently as a partial one.
    async fn bulk_load(
        &self,
        filepath: &Path,
        relation: &str,
        columns: &[String],
    ) -> Result<u64, EngineError>;
}
