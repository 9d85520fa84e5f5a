pub mod qdrant;

use crate::errors::ChatError;
use crate::types::{QuestionSql, TrainingData};
use async_trait::async_trait;
use std::fmt::Debug;

pub use qdrant::QdrantStore;

/// A trait for the embedding-backed store of schema and query examples.
///
/// The `add_*` methods return the id under which the entry was stored; that id
/// is accepted by `remove_training_data`.
#[async_trait]
pub trait KnowledgeStore: Send + Sync + Debug {
    async fn add_question_sql(&self, question: &str, sql: &str) -> Result<String, ChatError>;

    async fn add_ddl(&self, ddl: &str) -> Result<String, ChatError>;

    async fn add_documentation(&self, documentation: &str) -> Result<String, ChatError>;

    /// Question/SQL pairs most similar to `question`.
    async fn get_similar_question_sql(&self, question: &str)
        -> Result<Vec<QuestionSql>, ChatError>;

    async fn get_related_ddl(&self, question: &str) -> Result<Vec<String>, ChatError>;

    async fn get_related_documentation(&self, question: &str) -> Result<Vec<String>, ChatError>;

    /// Every stored entry, across all collections.
    async fn get_training_data(&self) -> Result<Vec<TrainingData>, ChatError>;

    /// Removes one entry. Returns `false` if nothing was stored under `id`.
    async fn remove_training_data(&self, id: &str) -> Result<bool, ChatError>;
}
