#![allow(dead_code)]
//! # Common Test Utilities
//!
//! This module provides shared utilities for testing, such as mock providers,
//! to ensure tests are isolated and repeatable.

use async_trait::async_trait;
use dotenvy::dotenv;
use serde_json::json;
use sqlchat::providers::ai::{AiProvider, GenerationOverrides};
use sqlchat::providers::db::storage::Storage;
use sqlchat::providers::vector::KnowledgeStore;
use sqlchat::{
    assemble_assistant, AssistantFactory, AssistantOptions, ChatError, DataFrame, QuestionSql,
    SqlAssistant, TrainingData,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once, RwLock};

#[cfg(test)]
static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
#[cfg(test)]
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        tracing_subscriber::fmt::init();
    });
}

// --- Mock AI Provider for Logic Testing ---
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    pub call_history: Arc<RwLock<Vec<String>>>,
    pub responses: Arc<RwLock<Vec<String>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(responses.into_iter().rev().collect())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.call_history.read().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn submit_prompt(
        &self,
        prompt: &str,
        _overrides: Option<&GenerationOverrides>,
    ) -> Result<String, ChatError> {
        self.call_history.write().unwrap().push(prompt.to_string());

        if let Some(response) = self.responses.write().unwrap().pop() {
            Ok(response)
        } else {
            Ok("Default mock response".to_string())
        }
    }
}

// --- Mock Knowledge Store ---
/// Returns canned retrieval results and records every write.
#[derive(Clone, Debug, Default)]
pub struct MockKnowledgeStore {
    pub question_sql: Vec<QuestionSql>,
    pub ddl: Vec<String>,
    pub documentation: Vec<String>,
    pub added: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockKnowledgeStore {
    pub fn added(&self) -> Vec<(String, String)> {
        self.added.read().unwrap().clone()
    }

    fn record(&self, kind: &str, content: String) -> String {
        let mut added = self.added.write().unwrap();
        added.push((kind.to_string(), content));
        format!("{}-{kind}", added.len())
    }
}

#[async_trait]
impl KnowledgeStore for MockKnowledgeStore {
    async fn add_question_sql(&self, question: &str, sql: &str) -> Result<String, ChatError> {
        Ok(self.record("sql", json!({ "question": question, "sql": sql }).to_string()))
    }

    async fn add_ddl(&self, ddl: &str) -> Result<String, ChatError> {
        Ok(self.record("ddl", ddl.to_string()))
    }

    async fn add_documentation(&self, documentation: &str) -> Result<String, ChatError> {
        Ok(self.record("doc", documentation.to_string()))
    }

    async fn get_similar_question_sql(
        &self,
        _question: &str,
    ) -> Result<Vec<QuestionSql>, ChatError> {
        Ok(self.question_sql.clone())
    }

    async fn get_related_ddl(&self, _question: &str) -> Result<Vec<String>, ChatError> {
        Ok(self.ddl.clone())
    }

    async fn get_related_documentation(&self, _question: &str) -> Result<Vec<String>, ChatError> {
        Ok(self.documentation.clone())
    }

    async fn get_training_data(&self) -> Result<Vec<TrainingData>, ChatError> {
        Ok(Vec::new())
    }

    async fn remove_training_data(&self, id: &str) -> Result<bool, ChatError> {
        Ok(id.ends_with("-sql") || id.ends_with("-ddl") || id.ends_with("-doc"))
    }
}

// --- Mock Storage Provider for Testing ---
/// Answers queries from a table of canned frames; anything else is an empty frame.
#[derive(Clone, Debug, Default)]
pub struct MockStorageProvider {
    pub frames: HashMap<String, DataFrame>,
    pub executed: Arc<RwLock<Vec<String>>>,
}

impl MockStorageProvider {
    pub fn with_frame(mut self, sql: &str, df: DataFrame) -> Self {
        self.frames.insert(sql.to_string(), df);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.read().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MockStorageProvider {
    fn name(&self) -> &str {
        "MockDB"
    }

    fn dialect(&self) -> &str {
        "PostgreSQL"
    }

    async fn run_sql(&self, sql: &str) -> Result<DataFrame, ChatError> {
        self.executed.write().unwrap().push(sql.to_string());
        if sql.contains("missing_table") {
            return Err(ChatError::StorageQueryFailed(
                "relation \"missing_table\" does not exist".to_string(),
            ));
        }
        Ok(self.frames.get(sql).cloned().unwrap_or_default())
    }
}

/// Builds an assistant from the given mocks with default options.
pub fn build_assistant(
    ai: &MockAiProvider,
    store: &MockKnowledgeStore,
    storage: &MockStorageProvider,
) -> SqlAssistant {
    SqlAssistant::new(
        Arc::new(store.clone()),
        Arc::new(ai.clone()),
        Arc::new(storage.clone()),
        AssistantOptions::default(),
    )
}

/// An `information_schema.columns`-shaped frame describing two tables.
pub fn information_schema_frame() -> DataFrame {
    DataFrame::new(
        vec![
            "table_catalog".into(),
            "table_schema".into(),
            "table_name".into(),
            "column_name".into(),
            "data_type".into(),
        ],
        vec![
            vec![json!("shop"), json!("public"), json!("sales"), json!("id"), json!("integer")],
            vec![json!("shop"), json!("public"), json!("sales"), json!("amount"), json!("numeric")],
            vec![json!("shop"), json!("public"), json!("customers"), json!("name"), json!("text")],
        ],
    )
}

/// A two-row frame with one categorical and one numeric column.
pub fn sales_frame() -> DataFrame {
    DataFrame::new(
        vec!["region".into(), "total".into()],
        vec![
            vec![json!("North"), json!(162.75)],
            vec![json!("South"), json!(80.0)],
        ],
    )
}

// --- Counting Assistant Factory ---
/// Builds assistants from shared mocks and counts the builds.
#[derive(Clone, Debug)]
pub struct CountingFactory {
    pub ai: MockAiProvider,
    pub store: MockKnowledgeStore,
    pub storage: MockStorageProvider,
    pub builds: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn new(ai: MockAiProvider) -> Self {
        Self {
            ai,
            store: MockKnowledgeStore::default(),
            storage: MockStorageProvider::default()
                .with_frame(sqlchat::constants::INFORMATION_SCHEMA_QUERY, information_schema_frame()),
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantFactory for CountingFactory {
    async fn build(&self) -> Result<SqlAssistant, ChatError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        assemble_assistant(
            Arc::new(self.store.clone()),
            Arc::new(self.ai.clone()),
            Arc::new(self.storage.clone()),
            AssistantOptions::default(),
        )
        .await
    }
}
