use crate::errors::ChatError;
use crate::types::DataFrame;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a storage backend.
///
/// This trait defines a common interface for executing queries against different
/// database providers (e.g., Cloud SQL for PostgreSQL, SQLite). Errors from the
/// driver are returned as-is; there is no retry and no partial result.
#[async_trait]
pub trait Storage: Send + Sync + DynClone + Debug {
    /// Returns the name of the storage provider (e.g., "Cloud SQL", "SQLite").
    fn name(&self) -> &str;

    /// The SQL dialect the model should write for this backend.
    fn dialect(&self) -> &str;

    /// Executes a SQL query and returns its rows.
    async fn run_sql(&self, sql: &str) -> Result<DataFrame, ChatError>;
}

dyn_clone::clone_trait_object!(Storage);
