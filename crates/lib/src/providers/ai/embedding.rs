//! # Embeddings Provider
//!
//! This module provides functionality for generating vector embeddings by calling
//! an external Gemini or OpenAI-compatible embeddings API.

use crate::{config::EmbeddingConfig, errors::ChatError};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// Turns text into a vector for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync + Debug {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, ChatError>;
}

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize, Debug)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

// --- Gemini-specific request and response structures ---

#[derive(Serialize, Debug)]
struct GeminiEmbeddingRequest<'a> {
    model: String,
    content: GeminiEmbeddingContent<'a>,
}

#[derive(Serialize, Debug)]
struct GeminiEmbeddingContent<'a> {
    parts: Vec<GeminiEmbeddingPart<'a>>,
}

#[derive(Serialize, Debug)]
struct GeminiEmbeddingPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GeminiEmbeddingResponse {
    embedding: GeminiEmbeddingValue,
}

#[derive(Deserialize, Debug)]
struct GeminiEmbeddingValue {
    values: Vec<f32>,
}

/// Calls a remote embeddings endpoint.
///
/// The payload shape is picked from the URL: Gemini endpoints (the Google host,
/// or any URL ending in `:embedContent`) get an `embedContent` body, everything
/// else an OpenAI-compatible one.
#[derive(Clone, Debug)]
pub struct HttpEmbedder {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ChatError> {
        if config.api_url.trim().is_empty() {
            return Err(ChatError::missing("embedding.api_url"));
        }
        if config.model_name.trim().is_empty() {
            return Err(ChatError::missing("embedding.model_name"));
        }
        let client = ReqwestClient::builder()
            .build()
            .map_err(ChatError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model_name.clone(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
        })
    }

    fn is_gemini(&self) -> bool {
        self.api_url.contains("generativelanguage.googleapis.com")
            || self.api_url.ends_with(":embedContent")
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, ChatError> {
        let mut request_builder = self.client.post(&self.api_url);
        let is_gemini = self.is_gemini();

        // --- 1. Construct the appropriate request body and apply auth ---
        if is_gemini {
            // Gemini requires the model name to be prefixed with "models/" in the payload.
            let gemini_model_name = if self.model.starts_with("models/") {
                self.model.clone()
            } else {
                format!("models/{}", self.model)
            };

            let request_body = GeminiEmbeddingRequest {
                model: gemini_model_name,
                content: GeminiEmbeddingContent {
                    parts: vec![GeminiEmbeddingPart { text: input }],
                },
            };
            debug!(payload = ?request_body, "--> Sending request to Gemini Embeddings API");
            request_builder = request_builder.json(&request_body);
            if let Some(key) = &self.api_key {
                request_builder = request_builder.header("x-goog-api-key", key);
            }
        } else {
            let request_body = OpenAIEmbeddingRequest {
                model: &self.model,
                input,
            };
            debug!(payload = ?request_body, "--> Sending request to OpenAI-compatible Embeddings API");
            request_builder = request_builder.json(&request_body);
            if let Some(key) = &self.api_key {
                request_builder = request_builder.bearer_auth(key);
            }
        }

        // --- 2. Send the request and handle the response ---
        let response = request_builder
            .send()
            .await
            .map_err(ChatError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::AiApi(error_text));
        }

        if is_gemini {
            let gemini_response: GeminiEmbeddingResponse = response
                .json()
                .await
                .map_err(ChatError::AiDeserialization)?;
            Ok(gemini_response.embedding.values)
        } else {
            let openai_response: OpenAIEmbeddingResponse = response
                .json()
                .await
                .map_err(ChatError::AiDeserialization)?;

            openai_response
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| {
                    ChatError::AiApi("OpenAI-compatible API returned no embeddings".to_string())
                })
        }
    }
}
