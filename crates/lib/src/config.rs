//! # Application Configuration
//!
//! Typed configuration for every adapter the assistant is composed of. The
//! structs are plain `serde` types so that any loader (the server uses the
//! `config` crate) can populate them. `AppConfig::validate` is the single
//! place where required settings are checked, and it runs before any adapter
//! is constructed.

use crate::constants::DEFAULT_ASSISTANT_TTL_SECS;
use crate::errors::ChatError;
use serde::Deserialize;

/// The root configuration, held for the lifetime of the process.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// The Google Cloud project hosting the database and the model.
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

impl AppConfig {
    /// Checks every required field, failing on the first one that is absent or empty.
    ///
    /// The vector store is deliberately not checked here: a missing host is reported
    /// as a connection failure the first time the assistant is built.
    pub fn validate(&self) -> Result<(), ChatError> {
        require("project_id", &self.project_id)?;
        self.vertex.validate()?;
        self.cloud_sql.validate()?;
        require("embedding.api_url", &self.embedding.api_url)?;
        require("embedding.model_name", &self.embedding.model_name)?;
        Ok(())
    }
}

/// Settings for the hosted, fine-tuned text generation model.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct VertexConfig {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub location: String,
    /// The base model the tuned model was trained from, e.g. `text-bison@002`.
    /// Only reported in logs; requests are routed by `tuned_model_id`.
    #[serde(default)]
    pub model_name: String,
    /// The id of the endpoint serving the tuned model. The derived URL is
    /// `.../endpoints/{tuned_model_id}:predict`.
    #[serde(default)]
    pub tuned_model_id: String,
    /// Overrides the derived `:predict` URL. Mostly useful for tests and proxies.
    #[serde(default)]
    pub api_url: Option<String>,
    /// An OAuth bearer token, e.g. from `gcloud auth print-access-token`.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl VertexConfig {
    pub fn validate(&self) -> Result<(), ChatError> {
        require("vertex.project", &self.project)?;
        require("vertex.location", &self.location)?;
        require("vertex.model_name", &self.model_name)?;
        require("vertex.tuned_model_id", &self.tuned_model_id)?;
        Ok(())
    }

    /// The URL predictions are posted to.
    pub fn predict_url(&self) -> String {
        match &self.api_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!(
                "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/endpoints/{endpoint}:predict",
                location = self.location,
                project = self.project,
                endpoint = self.tuned_model_id
            ),
        }
    }
}

/// Settings for the managed PostgreSQL instance.
#[derive(Debug, Deserialize, Clone)]
pub struct CloudSqlConfig {
    /// `project:region:instance`.
    #[serde(default)]
    pub instance_connection_name: String,
    #[serde(default)]
    pub db_user: String,
    #[serde(default)]
    pub db_pass: String,
    #[serde(default)]
    pub db_name: String,
    /// Directory where the auth proxy exposes one socket directory per instance.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: String,
    /// When set, connect over TCP (e.g. a local auth proxy) instead of the socket.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_socket_dir() -> String {
    "/cloudsql".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for CloudSqlConfig {
    fn default() -> Self {
        Self {
            instance_connection_name: String::new(),
            db_user: String::new(),
            db_pass: String::new(),
            db_name: String::new(),
            socket_dir: default_socket_dir(),
            host: None,
            port: None,
            max_connections: default_max_connections(),
        }
    }
}

impl CloudSqlConfig {
    pub fn validate(&self) -> Result<(), ChatError> {
        require(
            "cloud_sql.instance_connection_name",
            &self.instance_connection_name,
        )?;
        if self.instance_connection_name.split(':').count() != 3 {
            return Err(ChatError::MissingConfig(format!(
                "`cloud_sql.instance_connection_name` must look like project:region:instance, got '{}'",
                self.instance_connection_name
            )));
        }
        require("cloud_sql.db_user", &self.db_user)?;
        require("cloud_sql.db_pass", &self.db_pass)?;
        require("cloud_sql.db_name", &self.db_name)?;
        Ok(())
    }
}

/// Settings for the Qdrant vector store.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct VectorStoreConfig {
    /// Loaded from `QDRANT_HOST`.
    #[serde(default)]
    pub url: Option<String>,
    /// Loaded from `QDRANT_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Configuration for the embedding model provider.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Behavioural knobs of the composed assistant.
#[derive(Debug, Deserialize, Clone)]
pub struct AssistantOptions {
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// When set, model answers are requested in this language.
    #[serde(default)]
    pub language: Option<String>,
    /// How many entries to retrieve from each collection.
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    /// Approximate token budget for the system prompt.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_assistant_ttl_secs")]
    pub assistant_ttl_secs: u64,
    /// Lets the model run intermediate queries to look at column values.
    #[serde(default = "default_allow_llm_to_see_data")]
    pub allow_llm_to_see_data: bool,
}

fn default_dialect() -> String {
    "PostgreSQL".to_string()
}

fn default_n_results() -> usize {
    10
}

fn default_max_tokens() -> usize {
    14000
}

fn default_assistant_ttl_secs() -> u64 {
    DEFAULT_ASSISTANT_TTL_SECS
}

fn default_allow_llm_to_see_data() -> bool {
    true
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            language: None,
            n_results: default_n_results(),
            max_tokens: default_max_tokens(),
            assistant_ttl_secs: default_assistant_ttl_secs(),
            allow_llm_to_see_data: default_allow_llm_to_see_data(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ChatError> {
    if value.trim().is_empty() {
        return Err(ChatError::missing(field));
    }
    Ok(())
}
