pub mod embedding;
pub mod vertex;

use crate::errors::ChatError;
use crate::types::{ChatMessage, Role};
use async_trait::async_trait;
use dyn_clone::DynClone;
pub use embedding::{Embedder, HttpEmbedder};
use serde::Serialize;
use std::fmt::Debug;

/// Sampling settings sent with every prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    pub candidate_count: u32,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            candidate_count: 1,
            max_output_tokens: 1024,
            temperature: 0.9,
            top_p: 1.0,
        }
    }
}

/// Per-call replacements for individual [`GenerationParameters`] fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOverrides {
    pub candidate_count: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl GenerationParameters {
    /// Returns a copy with every field set in `overrides` replaced.
    pub fn merged(&self, overrides: Option<&GenerationOverrides>) -> Self {
        let Some(o) = overrides else {
            return self.clone();
        };
        Self {
            candidate_count: o.candidate_count.unwrap_or(self.candidate_count),
            max_output_tokens: o.max_output_tokens.unwrap_or(self.max_output_tokens),
            temperature: o.temperature.unwrap_or(self.temperature),
            top_p: o.top_p.unwrap_or(self.top_p),
        }
    }
}

/// A trait for interacting with a hosted language model.
///
/// The framing methods tag text with a role so the assistant can build prompts
/// without knowing the provider. `submit_prompt` is the only remote operation.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    fn system_message(&self, message: &str) -> ChatMessage {
        ChatMessage::new(Role::System, message)
    }

    fn user_message(&self, message: &str) -> ChatMessage {
        ChatMessage::new(Role::User, message)
    }

    fn assistant_message(&self, message: &str) -> ChatMessage {
        ChatMessage::new(Role::Assistant, message)
    }

    /// Sends a prompt to the model and returns the generated text.
    async fn submit_prompt(
        &self,
        prompt: &str,
        overrides: Option<&GenerationOverrides>,
    ) -> Result<String, ChatError>;
}

dyn_clone::clone_trait_object!(AiProvider);

/// Flattens a message log into a single role-tagged transcript for text models.
pub fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
