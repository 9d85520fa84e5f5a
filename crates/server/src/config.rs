//! # Server Configuration
//!
//! This module defines the configuration structure for the `sqlchat-server` and
//! loads it from an optional `config.yml` file and environment variables.
//!
//! Layers, later ones winning:
//! 1. `config.yml` (or the path passed to `get_config`), with `${VAR}` placeholders
//!    substituted from the environment.
//! 2. Plain environment variables for top-level keys (`PORT`, `QDRANT_HOST`,
//!    `QDRANT_API_KEY`).
//! 3. `SQLCHAT_`-prefixed variables with `__` between nested keys, e.g.
//!    `SQLCHAT_CLOUD_SQL__DB_PASS`.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use sqlchat::{
    AppConfig, AssistantOptions, CloudSqlConfig, EmbeddingConfig, VectorStoreConfig, VertexConfig,
};
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The Qdrant URL. Loaded from `QDRANT_HOST` env var.
    #[serde(default)]
    pub qdrant_host: Option<String>,
    /// The Qdrant API key. Loaded from `QDRANT_API_KEY` env var.
    #[serde(default)]
    pub qdrant_api_key: Option<String>,

    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub vertex: VertexConfig,
    #[serde(default)]
    pub cloud_sql: CloudSqlConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub assistant: AssistantOptions,
}

/// Provides a default value for the `port` field if not set in the environment.
fn default_port() -> u16 {
    8084
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// The library configuration, with `QDRANT_*` taking precedence over the
    /// `vector_store` section.
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            project_id: self.project_id.clone(),
            vertex: self.vertex.clone(),
            cloud_sql: self.cloud_sql.clone(),
            vector_store: VectorStoreConfig {
                url: non_empty(&self.qdrant_host).or_else(|| non_empty(&self.vector_store.url)),
                api_key: non_empty(&self.qdrant_api_key)
                    .or_else(|| non_empty(&self.vector_store.api_key)),
            },
            embedding: self.embedding.clone(),
            assistant: self.assistant.clone(),
        }
    }
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the server configuration from a file and environment variables.
///
/// Without an override, `config.yml` next to the crate manifest is used when it
/// exists; its absence is not an error since every key can come from the
/// environment. An override path that does not exist is reported as `NotFound`.
pub fn get_config(config_path_override: Option<&str>) -> Result<Config, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder();

    let content = match config_path_override {
        Some(path) => Some(read_and_substitute(path)?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{path}'."))
        })?),
        None => {
            let user_config_path = format!("{base_path}/config.yml");
            let content = read_and_substitute(&user_config_path)?;
            if content.is_some() {
                info!("Loading configuration from '{user_config_path}'.");
            } else {
                info!("'{user_config_path}' not found. Using environment variables only.");
            }
            content
        }
    };
    if let Some(content) = content {
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Top-level keys like PORT and QDRANT_HOST.
        .add_source(Environment::default())
        // Prefixed variables for nested keys.
        .add_source(
            Environment::with_prefix("SQLCHAT")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
