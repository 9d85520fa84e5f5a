use crate::{errors::ChatError, providers::db::storage::Storage, types::DataFrame};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Debug};
use tracing::debug;
use turso::{Database, Value as TursoValue};

/// A provider for running queries against a local SQLite database using Turso.
///
/// This provider holds a `Database` instance, which hands out connections on demand.
/// When cloned, it shares the same underlying database, allowing for concurrent and
/// shared access to the same database file or in-memory instance.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path or in-memory.
    ///
    /// # Arguments
    ///
    /// * `db_path`: The path to the SQLite database file. Use ":memory:" for a unique,
    ///   isolated in-memory database. To share an in-memory database across multiple
    ///   `SqliteProvider` instances (e.g., in tests), create one provider and
    ///   then `.clone()` it.
    pub async fn new(db_path: &str) -> Result<Self, ChatError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| ChatError::StorageConnection(e.to_string()))?;
        Ok(Self { db })
    }

    /// Executes multiple `;`-separated statements, e.g. to seed a database.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), ChatError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| ChatError::StorageConnection(e.to_string()))?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ())
                .await
                .map_err(|e| ChatError::StorageQueryFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

/// Converts a Turso value to a serde_json::Value.
fn turso_value_to_json(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) => Value::Number(i.into()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TursoValue::Text(s) => Value::String(s),
        TursoValue::Blob(_) => Value::String("<blob>".to_string()),
    }
}

#[async_trait]
impl Storage for SqliteProvider {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn dialect(&self) -> &str {
        "SQLite"
    }

    async fn run_sql(&self, sql: &str) -> Result<DataFrame, ChatError> {
        debug!(sql = %sql, "--> Executing SQLite query");

        let conn = self
            .db
            .connect()
            .map_err(|e| ChatError::StorageConnection(e.to_string()))?;

        let mut stmt = conn
            .prepare(sql)
            .await
            .map_err(|e| ChatError::StorageQueryFailed(e.to_string()))?;

        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = stmt
            .query(())
            .await
            .map_err(|e| ChatError::StorageQueryFailed(e.to_string()))?;

        let mut frame_rows = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ChatError::StorageQueryFailed(e.to_string()))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value = row
                    .get_value(i)
                    .map_err(|e| ChatError::StorageQueryFailed(e.to_string()))?;
                values.push(turso_value_to_json(value));
            }
            frame_rows.push(values);
        }

        Ok(DataFrame::new(columns, frame_rows))
    }
}
