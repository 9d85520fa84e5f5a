//! # Natural Language to SQL
//!
//! This crate answers questions about a Postgres database in plain language. A
//! tuned Vertex AI text model writes the SQL, a Qdrant collection supplies schema
//! and example context, and a Cloud SQL pool runs the query.
//!
//! The pieces are wired together by [`SqlAssistant`]. Front-ends talk to an
//! [`Orchestrator`], which keeps one assistant alive per expiry window and caches
//! each action's result by its arguments.

pub mod assistant;
pub mod cache;
pub mod chart;
pub mod config;
pub mod constants;
pub mod errors;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod setup;
pub mod types;

pub use assistant::{RetrievedContext, SqlAssistant};
pub use cache::{AssistantSlot, CacheKey, CachePolicy, ResultCache};
pub use chart::PlotlyFigure;
pub use config::{
    AppConfig, AssistantOptions, CloudSqlConfig, EmbeddingConfig, VectorStoreConfig, VertexConfig,
};
pub use errors::ChatError;
pub use orchestrator::{CacheSettings, Orchestrator};
pub use setup::{assemble_assistant, AssistantFactory, CloudAssistantFactory};
pub use types::{
    ChatMessage, DataFrame, QuestionSql, Role, TrainingData, TrainingDataKind, TrainingPlan,
    TrainingPlanItem, TrainingPlanItemKind, TrainingRequest,
};
