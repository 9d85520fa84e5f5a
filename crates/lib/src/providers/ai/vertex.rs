use crate::{
    config::VertexConfig,
    constants::EMPTY_PROMPT_REPLY,
    errors::ChatError,
    providers::ai::{AiProvider, GenerationOverrides, GenerationParameters},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use tracing::{debug, info};

// --- Vertex AI predict request and response structures ---

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Deserialize, Debug)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize, Debug)]
struct Prediction {
    #[serde(default)]
    content: String,
}

// --- Vertex Provider implementation ---

/// A provider for a fine-tuned text generation model served on Vertex AI.
#[derive(Clone)]
pub struct VertexTextProvider {
    client: ReqwestClient,
    api_url: String,
    access_token: Option<String>,
    model_name: String,
    tuned_model_id: String,
    parameters: GenerationParameters,
}

impl VertexTextProvider {
    /// Creates a new `VertexTextProvider`.
    ///
    /// Fails with [`ChatError::MissingConfig`] if project, location, model name or
    /// tuned model id is missing. No request is sent until a prompt is submitted.
    pub fn new(config: &VertexConfig) -> Result<Self, ChatError> {
        config.validate()?;
        let client = ReqwestClient::builder()
            .build()
            .map_err(ChatError::ReqwestClientBuild)?;
        let api_url = config.predict_url();
        info!(
            model = %config.model_name,
            tuned_model = %config.tuned_model_id,
            "Configured Vertex AI text provider at {api_url}"
        );
        Ok(Self {
            client,
            api_url,
            access_token: config
                .access_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
            model_name: config.model_name.clone(),
            tuned_model_id: config.tuned_model_id.clone(),
            parameters: GenerationParameters::default(),
        })
    }

    /// The parameters used when no overrides are given.
    pub fn parameters(&self) -> &GenerationParameters {
        &self.parameters
    }
}

impl Debug for VertexTextProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexTextProvider")
            .field("api_url", &self.api_url)
            .field("model_name", &self.model_name)
            .field("tuned_model_id", &self.tuned_model_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AiProvider for VertexTextProvider {
    async fn submit_prompt(
        &self,
        prompt: &str,
        overrides: Option<&GenerationOverrides>,
    ) -> Result<String, ChatError> {
        if prompt.trim().is_empty() {
            return Ok(EMPTY_PROMPT_REPLY.to_string());
        }

        let request_body = PredictRequest {
            instances: vec![Instance { prompt }],
            parameters: self.parameters.merged(overrides),
        };
        debug!(prompt = %prompt, "--> Sending prompt to Vertex AI");

        let mut request_builder = self.client.post(&self.api_url);
        if let Some(token) = &self.access_token {
            request_builder = request_builder.bearer_auth(token);
        }

        let response = request_builder
            .json(&request_body)
            .send()
            .await
            .map_err(ChatError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::AiApi(error_text));
        }

        let predict_response: PredictResponse = response
            .json()
            .await
            .map_err(ChatError::AiDeserialization)?;

        let text = predict_response
            .predictions
            .into_iter()
            .next()
            .map(|p| p.content)
            .unwrap_or_default();
        debug!("<-- Vertex AI response: {text}");

        Ok(text)
    }
}
