use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlchat::DataFrame;

#[derive(Debug, Deserialize, Default)]
pub struct DebugParams {
    pub debug: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    pub result: T,
}

// --- Request bodies ---

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    pub sql: String,
}

/// A question, the SQL that answered it and the resulting frame.
#[derive(Debug, Deserialize)]
pub struct ResultRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub sql: String,
    pub df: DataFrame,
}

#[derive(Debug, Deserialize)]
pub struct PlotRequest {
    pub code: String,
    pub df: DataFrame,
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct RemoveTrainingDataRequest {
    pub id: String,
}
