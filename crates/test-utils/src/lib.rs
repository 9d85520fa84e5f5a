use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use sqlchat::constants::{DDL_ID_SUFFIX, DOCUMENTATION_ID_SUFFIX, SQL_ID_SUFFIX};
use sqlchat::providers::ai::{AiProvider, GenerationOverrides};
use sqlchat::providers::db::sqlite::SqliteProvider;
use sqlchat::providers::db::storage::Storage;
use sqlchat::providers::vector::KnowledgeStore;
use sqlchat::{
    assemble_assistant, AssistantFactory, AssistantOptions, ChatError, QuestionSql, SqlAssistant,
    TrainingData, TrainingDataKind,
};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// --- Test Setup ---

/// A small sales schema plus an `information_schema`-shaped listing of it, so the
/// schema training plan can be computed against SQLite.
pub const SEED_SQL: &str = "
    CREATE TABLE sales (id INTEGER PRIMARY KEY, region TEXT NOT NULL, amount REAL NOT NULL);
    INSERT INTO sales (id, region, amount) VALUES (1, 'North', 120.5);
    INSERT INTO sales (id, region, amount) VALUES (2, 'South', 80.0);
    INSERT INTO sales (id, region, amount) VALUES (3, 'North', 42.25);
    CREATE TABLE information_schema_columns (table_catalog TEXT, table_schema TEXT, table_name TEXT, column_name TEXT, data_type TEXT);
    INSERT INTO information_schema_columns VALUES ('shop', 'public', 'sales', 'id', 'integer');
    INSERT INTO information_schema_columns VALUES ('shop', 'public', 'sales', 'region', 'text');
    INSERT INTO information_schema_columns VALUES ('shop', 'public', 'sales', 'amount', 'real');
";

/// Wraps a seeded SQLite database and answers the information schema query from
/// the `information_schema_columns` table.
#[derive(Clone, Debug)]
pub struct SeededStorage {
    pub sqlite: SqliteProvider,
    pub executed: Arc<Mutex<Vec<String>>>,
}

impl SeededStorage {
    /// Creates a new, isolated in-memory database loaded with [`SEED_SQL`].
    pub async fn new() -> Result<Self> {
        let sqlite = SqliteProvider::new(":memory:").await?;
        sqlite.initialize_with_data(SEED_SQL).await?;
        Ok(Self {
            sqlite,
            executed: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for SeededStorage {
    fn name(&self) -> &str {
        "SeededSQLite"
    }

    fn dialect(&self) -> &str {
        "PostgreSQL"
    }

    async fn run_sql(&self, sql: &str) -> Result<sqlchat::DataFrame, ChatError> {
        self.executed.lock().unwrap().push(sql.to_string());
        let sql = if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
            "SELECT * FROM information_schema_columns"
        } else {
            sql
        };
        self.sqlite.run_sql(sql).await
    }
}

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<Vec<(String, String)>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-programs a response for any prompt containing `key`.
    /// Keys are matched in the order they were added.
    pub fn add_response(&self, key: &str, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((key.to_string(), response.to_string()));
    }

    /// Retrieves the recorded prompts for assertion.
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn submit_prompt(
        &self,
        prompt: &str,
        _overrides: Option<&GenerationOverrides>,
    ) -> Result<String, ChatError> {
        self.calls.lock().unwrap().push(prompt.to_string());

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if prompt.contains(key.as_str()) {
                return Ok(response.clone());
            }
        }

        Err(ChatError::AiApi(format!(
            "MockAiProvider: No response programmed for prompt. Got: '{prompt}'"
        )))
    }
}

// --- In-Memory Knowledge Store ---

/// Keeps training data in insertion order. Every lookup returns all entries of
/// the requested kind.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKnowledgeStore {
    entries: Arc<Mutex<Vec<TrainingData>>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TrainingData> {
        self.entries.lock().unwrap().clone()
    }

    fn insert(
        &self,
        kind: TrainingDataKind,
        suffix: &str,
        question: Option<&str>,
        content: &str,
    ) -> String {
        let identity = json!({ "question": question, "content": content }).to_string();
        let id = format!(
            "{}{suffix}",
            Uuid::new_v5(&Uuid::NAMESPACE_OID, identity.as_bytes())
        );
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.id != id);
        entries.push(TrainingData {
            id: id.clone(),
            kind,
            question: question.map(String::from),
            content: content.to_string(),
        });
        id
    }

    fn contents(&self, kind: TrainingDataKind) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.content.clone())
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn add_question_sql(&self, question: &str, sql: &str) -> Result<String, ChatError> {
        Ok(self.insert(TrainingDataKind::Sql, SQL_ID_SUFFIX, Some(question), sql))
    }

    async fn add_ddl(&self, ddl: &str) -> Result<String, ChatError> {
        Ok(self.insert(TrainingDataKind::Ddl, DDL_ID_SUFFIX, None, ddl))
    }

    async fn add_documentation(&self, documentation: &str) -> Result<String, ChatError> {
        Ok(self.insert(
            TrainingDataKind::Documentation,
            DOCUMENTATION_ID_SUFFIX,
            None,
            documentation,
        ))
    }

    async fn get_similar_question_sql(
        &self,
        _question: &str,
    ) -> Result<Vec<QuestionSql>, ChatError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == TrainingDataKind::Sql)
            .map(|e| QuestionSql {
                question: e.question.clone().unwrap_or_default(),
                sql: e.content.clone(),
            })
            .collect())
    }

    async fn get_related_ddl(&self, _question: &str) -> Result<Vec<String>, ChatError> {
        Ok(self.contents(TrainingDataKind::Ddl))
    }

    async fn get_related_documentation(&self, _question: &str) -> Result<Vec<String>, ChatError> {
        Ok(self.contents(TrainingDataKind::Documentation))
    }

    async fn get_training_data(&self) -> Result<Vec<TrainingData>, ChatError> {
        Ok(self.entries())
    }

    async fn remove_training_data(&self, id: &str) -> Result<bool, ChatError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }
}

// --- Assistant Factory ---

/// Builds assistants from shared mock adapters and counts how often it was asked to.
#[derive(Clone, Debug)]
pub struct MockAssistantFactory {
    pub ai: MockAiProvider,
    pub store: InMemoryKnowledgeStore,
    pub storage: SeededStorage,
    pub options: AssistantOptions,
    builds: Arc<AtomicUsize>,
}

impl MockAssistantFactory {
    pub async fn new(ai: MockAiProvider) -> Result<Self> {
        Ok(Self {
            ai,
            store: InMemoryKnowledgeStore::new(),
            storage: SeededStorage::new().await?,
            options: AssistantOptions::default(),
            builds: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// How many assistants have been built so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantFactory for MockAssistantFactory {
    async fn build(&self) -> Result<SqlAssistant, ChatError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        assemble_assistant(
            Arc::new(self.store.clone()),
            Arc::new(self.ai.clone()),
            Arc::new(self.storage.clone()),
            self.options.clone(),
        )
        .await
    }
}
