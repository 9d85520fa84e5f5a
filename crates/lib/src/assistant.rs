//! # The Composed Assistant
//!
//! `SqlAssistant` holds a knowledge store, a language model and a database, each
//! injected independently, and implements the full question-answering contract on
//! top of them: training, retrieval, SQL generation and validation, execution,
//! charting, follow-up questions and summaries.

use crate::{
    chart::{build_figure, PlotlyFigure},
    config::AssistantOptions,
    constants::FOLLOWUP_PREVIEW_ROWS,
    errors::ChatError,
    prompts::{
        append_within_budget, extract_python_code, extract_sql, is_select_statement,
        response_language, sanitize_plotly_code, strip_numbering, DEFAULT_SQL_SYSTEM_PROMPT,
        FOLLOWUP_USER_PROMPT, INTERMEDIATE_SQL_MARKER, PLOTLY_CODE_USER_PROMPT,
        QUESTION_FROM_SQL_SYSTEM_PROMPT, SQL_RESPONSE_GUIDELINES, SUMMARY_USER_PROMPT,
    },
    providers::{
        ai::{render_transcript, AiProvider},
        db::storage::Storage,
        vector::KnowledgeStore,
    },
    types::{
        cell_text, ChatMessage, DataFrame, QuestionSql, TrainingData, TrainingPlan,
        TrainingPlanItem, TrainingPlanItemKind, TrainingRequest,
    },
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Context retrieved from the knowledge store for one question.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub question_sql: Vec<QuestionSql>,
    pub ddl: Vec<String>,
    pub documentation: Vec<String>,
}

/// The assistant composed from a knowledge store, a model and a database.
pub struct SqlAssistant {
    store: Arc<dyn KnowledgeStore>,
    llm: Arc<dyn AiProvider>,
    storage: Arc<dyn Storage>,
    options: AssistantOptions,
    /// A training plan computed at setup that has not been applied yet.
    pending_plan: RwLock<Option<TrainingPlan>>,
}

impl fmt::Debug for SqlAssistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlAssistant")
            .field("store", &self.store)
            .field("llm", &self.llm)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl SqlAssistant {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        llm: Arc<dyn AiProvider>,
        storage: Arc<dyn Storage>,
        options: AssistantOptions,
    ) -> Self {
        Self {
            store,
            llm,
            storage,
            options,
            pending_plan: RwLock::new(None),
        }
    }

    pub fn options(&self) -> &AssistantOptions {
        &self.options
    }

    async fn submit(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let prompt = render_transcript(messages);
        debug!(prompt = %prompt, "--> Sending prompt to AI Provider");
        self.llm.submit_prompt(&prompt, None).await
    }

    fn language_suffix(&self) -> String {
        response_language(self.options.language.as_deref())
    }

    // --- Training ---

    /// Stores one piece of training material and returns its id.
    pub async fn train(&self, request: TrainingRequest) -> Result<String, ChatError> {
        if let Some(documentation) = request.documentation.filter(|d| !d.trim().is_empty()) {
            info!("Adding documentation to the knowledge store.");
            return self.store.add_documentation(&documentation).await;
        }

        if let Some(sql) = request.sql.filter(|s| !s.trim().is_empty()) {
            let question = match request.question.filter(|q| !q.trim().is_empty()) {
                Some(question) => question,
                None => {
                    info!("No question supplied for SQL, asking the model to write one.");
                    self.generate_question(&sql).await?
                }
            };
            info!(question = %question, "Adding question/SQL pair to the knowledge store.");
            return self.store.add_question_sql(&question, &sql).await;
        }

        if let Some(ddl) = request.ddl.filter(|d| !d.trim().is_empty()) {
            info!("Adding DDL to the knowledge store.");
            return self.store.add_ddl(&ddl).await;
        }

        Err(ChatError::InvalidTrainingRequest(
            "expected sql, ddl or documentation".to_string(),
        ))
    }

    /// Asks the model which business question a query answers.
    pub async fn generate_question(&self, sql: &str) -> Result<String, ChatError> {
        let messages = vec![
            self.llm.system_message(QUESTION_FROM_SQL_SYSTEM_PROMPT),
            self.llm.user_message(sql),
        ];
        self.submit(&messages).await
    }

    /// Breaks an information schema listing into one documentation chunk per table.
    ///
    /// Rows are grouped by `table_catalog`, `table_schema` and `table_name`; a frame
    /// lacking any of these columns yields an empty plan.
    pub fn get_training_plan_generic(&self, df: &DataFrame) -> TrainingPlan {
        let (Some(catalog), Some(schema), Some(table)) = (
            df.column_index("table_catalog"),
            df.column_index("table_schema"),
            df.column_index("table_name"),
        ) else {
            return TrainingPlan::default();
        };

        let mut groups: BTreeMap<(String, String, String), Vec<Vec<serde_json::Value>>> =
            BTreeMap::new();
        for row in &df.rows {
            let key = (
                row.get(catalog).map(cell_text).unwrap_or_default(),
                row.get(schema).map(cell_text).unwrap_or_default(),
                row.get(table).map(cell_text).unwrap_or_default(),
            );
            groups.entry(key).or_default().push(row.clone());
        }

        let items = groups
            .into_iter()
            .map(|((catalog, schema, table), rows)| {
                let chunk = DataFrame::new(df.columns.clone(), rows);
                TrainingPlanItem {
                    kind: TrainingPlanItemKind::InformationSchema,
                    group: format!("{catalog}.{schema}"),
                    name: table.clone(),
                    value: format!(
                        "The following columns are in the {table} table in the {catalog} database:\n\n{}",
                        chunk.to_markdown()
                    ),
                }
            })
            .collect();

        TrainingPlan { items }
    }

    /// Stores every item of a plan.
    pub async fn train_plan(&self, plan: &TrainingPlan) -> Result<Vec<String>, ChatError> {
        info!(items = plan.len(), "Applying training plan.");
        let mut ids = Vec::with_capacity(plan.len());
        for item in &plan.items {
            let id = match item.kind {
                TrainingPlanItemKind::Sql => {
                    self.store.add_question_sql(&item.name, &item.value).await?
                }
                TrainingPlanItemKind::Ddl => self.store.add_ddl(&item.value).await?,
                TrainingPlanItemKind::InformationSchema => {
                    self.store.add_documentation(&item.value).await?
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    pub async fn set_pending_plan(&self, plan: TrainingPlan) {
        *self.pending_plan.write().await = Some(plan);
    }

    pub async fn pending_plan(&self) -> Option<TrainingPlan> {
        self.pending_plan.read().await.clone()
    }

    /// Applies the plan computed at setup, if any, and clears it.
    pub async fn train_pending_plan(&self) -> Result<Vec<String>, ChatError> {
        let Some(plan) = self.pending_plan().await else {
            return Ok(Vec::new());
        };
        let ids = self.train_plan(&plan).await?;
        *self.pending_plan.write().await = None;
        Ok(ids)
    }

    pub async fn get_training_data(&self) -> Result<Vec<TrainingData>, ChatError> {
        self.store.get_training_data().await
    }

    pub async fn remove_training_data(&self, id: &str) -> Result<(), ChatError> {
        if self.store.remove_training_data(id).await? {
            Ok(())
        } else {
            Err(ChatError::UnknownTrainingId(id.to_string()))
        }
    }

    // --- Retrieval and SQL ---

    pub async fn retrieve_context(&self, question: &str) -> Result<RetrievedContext, ChatError> {
        Ok(RetrievedContext {
            question_sql: self.store.get_similar_question_sql(question).await?,
            ddl: self.store.get_related_ddl(question).await?,
            documentation: self.store.get_related_documentation(question).await?,
        })
    }

    /// Builds the message log for SQL generation.
    pub fn get_sql_prompt(&self, question: &str, context: &RetrievedContext) -> Vec<ChatMessage> {
        let dialect = &self.options.dialect;
        let max_tokens = self.options.max_tokens;

        let mut system = DEFAULT_SQL_SYSTEM_PROMPT.replace("{dialect}", dialect);
        append_within_budget(&mut system, "\n===Tables \n", &context.ddl, max_tokens);
        append_within_budget(
            &mut system,
            "\n===Additional Context \n\n",
            &context.documentation,
            max_tokens,
        );
        system.push_str(&SQL_RESPONSE_GUIDELINES.replace("{dialect}", dialect));

        let mut messages = vec![self.llm.system_message(&system)];
        for example in &context.question_sql {
            messages.push(self.llm.user_message(&example.question));
            messages.push(self.llm.assistant_message(&example.sql));
        }
        messages.push(self.llm.user_message(question));
        messages
    }

    /// Generates SQL answering `question`.
    ///
    /// When the model asks for an intermediate query and `allow_llm_to_see_data`
    /// is set, the intermediate query is run and its result is added to the context
    /// of a second prompt.
    pub async fn generate_sql(
        &self,
        question: &str,
        allow_llm_to_see_data: bool,
    ) -> Result<String, ChatError> {
        info!("[generate_sql] received question: {question:?}");
        let mut context = self.retrieve_context(question).await?;
        let prompt = self.get_sql_prompt(question, &context);
        let mut response = self.submit(&prompt).await?;
        debug!("<-- SQL response from AI: {response}");

        if response.contains(INTERMEDIATE_SQL_MARKER) && allow_llm_to_see_data {
            let intermediate_sql = extract_sql(&response)?;
            info!("[generate_sql] running intermediate SQL: {intermediate_sql}");
            let df = self.run_sql(&intermediate_sql).await?;
            context.documentation.push(format!(
                "The following is a pandas DataFrame with the results of the intermediate SQL query {intermediate_sql}: \n{}",
                df.to_markdown()
            ));
            let prompt = self.get_sql_prompt(question, &context);
            response = self.submit(&prompt).await?;
            debug!("<-- SQL response from AI after intermediate query: {response}");
        }

        Ok(extract_sql(&response)?)
    }

    pub fn is_sql_valid(&self, sql: &str) -> bool {
        is_select_statement(sql)
    }

    pub async fn run_sql(&self, sql: &str) -> Result<DataFrame, ChatError> {
        let result = self.storage.run_sql(sql).await;
        if let Err(e) = &result {
            error!("[run_sql] Query execution error: {e:?}");
        }
        result
    }

    // --- Charts ---

    /// Charts are worth drawing for more than one row with at least one numeric column.
    pub fn should_generate_chart(&self, df: &DataFrame) -> bool {
        df.len() > 1 && !df.numeric_columns().is_empty()
    }

    pub async fn generate_plotly_code(
        &self,
        question: &str,
        sql: &str,
        df: &DataFrame,
    ) -> Result<String, ChatError> {
        let mut system = if question.trim().is_empty() {
            "The following is a pandas DataFrame ".to_string()
        } else {
            format!(
                "The following is a pandas DataFrame that contains the results of the query that answers the question the user asked: '{question}'"
            )
        };
        if !sql.trim().is_empty() {
            system.push_str(&format!(
                "\n\nThe DataFrame was produced using this query: {sql}\n\n"
            ));
        }
        system.push_str(&format!(
            "The following is information about the resulting pandas DataFrame 'df': \n{}",
            df.dtypes()
        ));

        let messages = vec![
            self.llm.system_message(&system),
            self.llm.user_message(PLOTLY_CODE_USER_PROMPT),
        ];
        let response = self.submit(&messages).await?;
        Ok(sanitize_plotly_code(&extract_python_code(&response)?))
    }

    pub fn get_plotly_figure(
        &self,
        plotly_code: &str,
        df: &DataFrame,
        dark_mode: bool,
    ) -> Option<PlotlyFigure> {
        build_figure(df, plotly_code, dark_mode)
    }

    // --- Questions and summaries ---

    /// Questions of the stored examples, as conversation starters.
    pub async fn generate_questions(&self) -> Result<Vec<String>, ChatError> {
        Ok(self
            .store
            .get_similar_question_sql("")
            .await?
            .into_iter()
            .map(|q| q.question)
            .collect())
    }

    pub async fn generate_followup_questions(
        &self,
        question: &str,
        sql: &str,
        df: &DataFrame,
        n_questions: usize,
    ) -> Result<Vec<String>, ChatError> {
        let messages = vec![
            self.llm.system_message(&format!(
                "You are a helpful data assistant. The user asked the question: '{question}'\n\nThe SQL query for this question was: {sql}\n\nThe following is a pandas DataFrame with the results of the query: \n{}\n\n",
                df.head(FOLLOWUP_PREVIEW_ROWS).to_markdown()
            )),
            self.llm.user_message(&format!(
                "{}{}",
                FOLLOWUP_USER_PROMPT.replace("{n_questions}", &n_questions.to_string()),
                self.language_suffix()
            )),
        ];
        let response = self.submit(&messages).await?;
        Ok(response
            .lines()
            .map(strip_numbering)
            .filter(|q| !q.is_empty())
            .collect())
    }

    pub async fn generate_summary(
        &self,
        question: &str,
        df: &DataFrame,
    ) -> Result<String, ChatError> {
        let messages = vec![
            self.llm.system_message(&format!(
                "You are a helpful data assistant. The user asked the question: '{question}'\n\nThe following is a pandas DataFrame with the results of the query: \n{}\n\n",
                df.to_markdown()
            )),
            self.llm.user_message(&format!(
                "{SUMMARY_USER_PROMPT}{}",
                self.language_suffix()
            )),
        ];
        self.submit(&messages).await
    }
}
