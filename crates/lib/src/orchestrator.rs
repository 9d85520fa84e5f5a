//! # Cached Orchestration
//!
//! The entry points called by the front-end, one per user-facing action. Each one
//! looks up its own result cache first, and only on a miss obtains the shared
//! assistant (rebuilt at most once per expiry window) and forwards its arguments
//! unchanged. Errors pass through untouched and are never cached.

use crate::{
    assistant::SqlAssistant,
    cache::{AssistantSlot, CacheKey, CachePolicy, ResultCache},
    chart::PlotlyFigure,
    constants::{DEFAULT_ASSISTANT_TTL_SECS, DEFAULT_FOLLOWUP_COUNT},
    errors::ChatError,
    setup::AssistantFactory,
    types::{DataFrame, TrainingData, TrainingPlan, TrainingRequest},
};
use std::{sync::Arc, time::Duration};
use tracing::info;

/// Expiry settings for the two cache layers.
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub assistant_ttl: Duration,
    pub result_policy: CachePolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            assistant_ttl: Duration::from_secs(DEFAULT_ASSISTANT_TTL_SECS),
            result_policy: CachePolicy::forever(),
        }
    }
}

pub struct Orchestrator {
    factory: Arc<dyn AssistantFactory>,
    assistant: AssistantSlot,
    results: ResultCache,
    result_policy: CachePolicy,
}

impl Orchestrator {
    pub fn new(factory: Arc<dyn AssistantFactory>, settings: CacheSettings) -> Self {
        Self {
            factory,
            assistant: AssistantSlot::new(settings.assistant_ttl),
            results: ResultCache::new(),
            result_policy: settings.result_policy,
        }
    }

    /// The shared assistant for the current window.
    pub async fn setup_assistant(&self) -> Result<Arc<SqlAssistant>, ChatError> {
        self.assistant
            .get_or_try_init(|| self.factory.build())
            .await
    }

    async fn cached<T, F, Fut>(&self, key: CacheKey, compute: F) -> Result<T, ChatError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Arc<SqlAssistant>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ChatError>>,
    {
        self.results
            .get_or_try_insert_with(key, self.result_policy, || async {
                let assistant = self.setup_assistant().await?;
                compute(assistant).await
            })
            .await
    }

    pub async fn generate_questions(&self) -> Result<Vec<String>, ChatError> {
        let key = CacheKey::new("generate_questions", &())?;
        self.cached(key, |a| async move { a.generate_questions().await })
            .await
    }

    pub async fn generate_sql(&self, question: &str) -> Result<String, ChatError> {
        let key = CacheKey::new("generate_sql", &(question,))?;
        self.cached(key, |a| async move {
            let allow = a.options().allow_llm_to_see_data;
            a.generate_sql(question, allow).await
        })
        .await
    }

    pub async fn is_sql_valid(&self, sql: &str) -> Result<bool, ChatError> {
        let key = CacheKey::new("is_sql_valid", &(sql,))?;
        self.cached(key, |a| async move { Ok(a.is_sql_valid(sql)) })
            .await
    }

    pub async fn run_sql(&self, sql: &str) -> Result<DataFrame, ChatError> {
        let key = CacheKey::new("run_sql", &(sql,))?;
        self.cached(key, |a| async move { a.run_sql(sql).await })
            .await
    }

    /// `question` and `sql` take part in the cache key only.
    pub async fn should_generate_chart(
        &self,
        question: &str,
        sql: &str,
        df: &DataFrame,
    ) -> Result<bool, ChatError> {
        let key = CacheKey::new("should_generate_chart", &(question, sql, df))?;
        self.cached(key, |a| async move { Ok(a.should_generate_chart(df)) })
            .await
    }

    pub async fn generate_plotly_code(
        &self,
        question: &str,
        sql: &str,
        df: &DataFrame,
    ) -> Result<String, ChatError> {
        let key = CacheKey::new("generate_plotly_code", &(question, sql, df))?;
        self.cached(key, |a| async move {
            a.generate_plotly_code(question, sql, df).await
        })
        .await
    }

    pub async fn generate_plot(
        &self,
        code: &str,
        df: &DataFrame,
        dark_mode: bool,
    ) -> Result<Option<PlotlyFigure>, ChatError> {
        let key = CacheKey::new("generate_plot", &(code, df, dark_mode))?;
        self.cached(key, |a| async move {
            Ok(a.get_plotly_figure(code, df, dark_mode))
        })
        .await
    }

    pub async fn generate_followup(
        &self,
        question: &str,
        sql: &str,
        df: &DataFrame,
    ) -> Result<Vec<String>, ChatError> {
        let key = CacheKey::new("generate_followup", &(question, sql, df))?;
        self.cached(key, |a| async move {
            a.generate_followup_questions(question, sql, df, DEFAULT_FOLLOWUP_COUNT)
                .await
        })
        .await
    }

    pub async fn generate_summary(
        &self,
        question: &str,
        df: &DataFrame,
    ) -> Result<String, ChatError> {
        let key = CacheKey::new("generate_summary", &(question, df))?;
        self.cached(key, |a| async move { a.generate_summary(question, df).await })
            .await
    }

    // --- Uncached operator actions ---

    /// The training plan computed when the current assistant was built.
    pub async fn pending_plan(&self) -> Result<Option<TrainingPlan>, ChatError> {
        Ok(self.setup_assistant().await?.pending_plan().await)
    }

    /// Applies the pending schema training plan.
    pub async fn train_pending_plan(&self) -> Result<Vec<String>, ChatError> {
        let ids = self.setup_assistant().await?.train_pending_plan().await?;
        info!(stored = ids.len(), "Pending training plan applied.");
        Ok(ids)
    }

    pub async fn train(&self, request: TrainingRequest) -> Result<String, ChatError> {
        self.setup_assistant().await?.train(request).await
    }

    pub async fn get_training_data(&self) -> Result<Vec<TrainingData>, ChatError> {
        self.setup_assistant().await?.get_training_data().await
    }

    pub async fn remove_training_data(&self, id: &str) -> Result<(), ChatError> {
        self.setup_assistant().await?.remove_training_data(id).await
    }

    /// Drops every cached result. The assistant itself is kept.
    pub async fn clear_cache(&self) {
        info!("Clearing cached results.");
        self.results.clear().await;
    }

    /// Forces the next call to build a new assistant.
    pub async fn reset_assistant(&self) {
        self.assistant.invalidate().await;
    }
}
