use thiserror::Error;

/// Custom error types for the application.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Missing or invalid configuration: {0}")]
    MissingConfig(String),
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("Vector store connection error: {0}")]
    VectorStoreConnection(String),
    #[error("Vector store request failed: {0}")]
    VectorStoreRequest(reqwest::Error),
    #[error("Vector store returned an error: {0}")]
    VectorStoreApi(String),
    #[error("Storage provider connection error: {0}")]
    StorageConnection(String),
    #[error("Storage query execution failed: {0}")]
    StorageQueryFailed(String),
    #[error("Invalid training request: {0}")]
    InvalidTrainingRequest(String),
    #[error("No training data found with id '{0}'")]
    UnknownTrainingId(String),
    #[error("Failed to serialize or deserialize JSON: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl ChatError {
    /// Shorthand for a configuration error naming the offending field.
    pub fn missing(field: &str) -> Self {
        ChatError::MissingConfig(format!("`{field}` must be set and non-empty"))
    }
}
