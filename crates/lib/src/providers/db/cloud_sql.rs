//! # Cloud SQL (PostgreSQL) Provider
//!
//! Runs queries against a managed PostgreSQL instance. The [`CloudSqlConnector`]
//! is the connection factory: it knows how to reach an instance by its
//! connection name, and the pool invokes it lazily whenever it needs a new
//! connection. Nothing touches the network until the first query.

use crate::{
    config::CloudSqlConfig, errors::ChatError, providers::db::storage::Storage, types::DataFrame,
};
use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use serde_json::Value;
use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow},
    types::BigDecimal,
    Column, Executor, Row, Statement, TypeInfo,
};
use std::fmt::{self, Debug};
use tracing::{debug, error, info};

const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Builds authenticated connection options for one Cloud SQL instance.
#[derive(Clone)]
pub struct CloudSqlConnector {
    config: CloudSqlConfig,
}

impl CloudSqlConnector {
    pub fn new(config: CloudSqlConfig) -> Result<Self, ChatError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Connection options for the instance.
    ///
    /// With a `host` configured this targets a TCP proxy; otherwise the auth proxy's
    /// unix socket directory `{socket_dir}/{instance_connection_name}`.
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .username(&self.config.db_user)
            .password(&self.config.db_pass)
            .database(&self.config.db_name);
        match &self.config.host {
            Some(host) => options
                .host(host)
                .port(self.config.port.unwrap_or(DEFAULT_POSTGRES_PORT)),
            None => options.socket(self.socket_path()),
        }
    }

    pub fn socket_path(&self) -> String {
        format!(
            "{}/{}",
            self.config.socket_dir.trim_end_matches('/'),
            self.config.instance_connection_name
        )
    }

    pub fn instance_connection_name(&self) -> &str {
        &self.config.instance_connection_name
    }
}

impl Debug for CloudSqlConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudSqlConnector")
            .field("instance", &self.config.instance_connection_name)
            .field("db_name", &self.config.db_name)
            .field("db_user", &self.config.db_user)
            .finish_non_exhaustive()
    }
}

/// A provider for a Cloud SQL for PostgreSQL database.
#[derive(Clone)]
pub struct CloudSqlProvider {
    pool: PgPool,
    instance: String,
}

impl CloudSqlProvider {
    /// Creates the provider with a lazily connecting pool.
    pub fn new(connector: CloudSqlConnector, max_connections: u32) -> Self {
        info!(
            instance = %connector.instance_connection_name(),
            max_connections,
            "Configured Cloud SQL connection pool."
        );
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(connector.connect_options());
        Self {
            pool,
            instance: connector.instance_connection_name().to_string(),
        }
    }

    pub fn from_config(config: &CloudSqlConfig) -> Result<Self, ChatError> {
        let connector = CloudSqlConnector::new(config.clone())?;
        Ok(Self::new(connector, config.max_connections))
    }
}

impl Debug for CloudSqlProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudSqlProvider")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

/// Decodes one column of a row into JSON based on its Postgres type.
fn decode_value(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|f| Value::from(f64::from(f))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::from),
        "NUMERIC" => row.try_get::<Option<BigDecimal>, _>(index)?.map(|d| {
            d.to_f64()
                .map(Value::from)
                .unwrap_or_else(|| Value::String(d.to_string()))
        }),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            row.try_get::<Option<String>, _>(index)?.map(Value::String)
        }
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)?
            .map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(|t| Value::String(t.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|t| Value::String(t.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)?
            .map(|t| Value::String(t.to_string())),
        other => {
            debug!(type_name = %other, index, "Unsupported column type, returning null.");
            None
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

#[async_trait]
impl Storage for CloudSqlProvider {
    fn name(&self) -> &str {
        "Cloud SQL"
    }

    fn dialect(&self) -> &str {
        "PostgreSQL"
    }

    async fn run_sql(&self, sql: &str) -> Result<DataFrame, ChatError> {
        info!("--> Executing Cloud SQL query: {sql}");

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ChatError::StorageConnection(e.to_string()))?;

        let statement = (&mut *conn).prepare(sql).await.map_err(|e| {
            error!("Cloud SQL query preparation failed: {e}");
            ChatError::StorageQueryFailed(e.to_string())
        })?;

        let columns: Vec<(String, String)> = statement
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.type_info().name().to_string()))
            .collect();

        let rows = statement
            .query()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ChatError::StorageQueryFailed(e.to_string()))?;

        let mut frame_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for (i, (_, type_name)) in columns.iter().enumerate() {
                let value = decode_value(row, i, type_name)
                    .map_err(|e| ChatError::StorageQueryFailed(e.to_string()))?;
                values.push(value);
            }
            frame_rows.push(values);
        }
        debug!(rows = frame_rows.len(), "<-- Cloud SQL query returned");

        Ok(DataFrame::new(
            columns.into_iter().map(|(name, _)| name).collect(),
            frame_rows,
        ))
    }
}
