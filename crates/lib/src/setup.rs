//! # Assistant Setup
//!
//! Constructing an assistant means building each adapter from configuration,
//! injecting them into a [`SqlAssistant`], and computing a schema training plan
//! from the database's information schema. The plan is stored on the assistant
//! as pending; applying it is a separate, explicit step.

use crate::{
    assistant::SqlAssistant,
    config::{AppConfig, AssistantOptions},
    constants::INFORMATION_SCHEMA_QUERY,
    errors::ChatError,
    providers::{
        ai::{vertex::VertexTextProvider, AiProvider, HttpEmbedder},
        db::{cloud_sql::CloudSqlProvider, storage::Storage},
        vector::{KnowledgeStore, QdrantStore},
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Builds a fresh assistant. Called by the orchestrator whenever its cached
/// instance is missing or expired.
#[async_trait]
pub trait AssistantFactory: Send + Sync {
    async fn build(&self) -> Result<SqlAssistant, ChatError>;
}

/// Composes an assistant from ready adapters and computes its pending training plan.
pub async fn assemble_assistant(
    store: Arc<dyn KnowledgeStore>,
    llm: Arc<dyn AiProvider>,
    storage: Arc<dyn Storage>,
    options: AssistantOptions,
) -> Result<SqlAssistant, ChatError> {
    let assistant = SqlAssistant::new(store, llm, storage, options);

    let information_schema = assistant.run_sql(INFORMATION_SCHEMA_QUERY).await?;
    let plan = assistant.get_training_plan_generic(&information_schema);
    info!(
        columns = information_schema.len(),
        items = plan.len(),
        "Computed schema training plan; it will not be applied until requested."
    );
    assistant.set_pending_plan(plan).await;

    Ok(assistant)
}

/// The production factory: Qdrant + Vertex AI + Cloud SQL.
#[derive(Debug, Clone)]
pub struct CloudAssistantFactory {
    config: AppConfig,
}

impl CloudAssistantFactory {
    /// Validates the configuration up front so no adapter is built from a partial one.
    pub fn new(config: AppConfig) -> Result<Self, ChatError> {
        config.validate()?;
        info!(project_id = %config.project_id, "Assistant factory configured.");
        Ok(Self { config })
    }
}

#[async_trait]
impl AssistantFactory for CloudAssistantFactory {
    async fn build(&self) -> Result<SqlAssistant, ChatError> {
        info!("Building assistant.");
        let embedder = Arc::new(HttpEmbedder::new(&self.config.embedding)?);
        let store = Arc::new(QdrantStore::new(
            &self.config.vector_store,
            embedder,
            self.config.assistant.n_results,
        )?);
        let llm = Arc::new(VertexTextProvider::new(&self.config.vertex)?);
        let storage = Arc::new(CloudSqlProvider::from_config(&self.config.cloud_sql)?);

        assemble_assistant(store, llm, storage, self.config.assistant.clone()).await
    }
}
