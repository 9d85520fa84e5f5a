//! # Question and Answer Handlers
//!
//! One handler per step of the chat flow: suggest questions, write SQL, check and
//! run it, then chart, summarize and suggest follow-ups. Every handler forwards
//! to the orchestrator, so repeated requests with the same arguments are served
//! from its cache.

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::{PlotRequest, QuestionRequest, ResultRequest, SqlRequest};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlchat::{DataFrame, PlotlyFigure};
use tracing::info;

// --- API Payloads ---

#[derive(Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SqlResponse {
    pub sql: String,
}

#[derive(Serialize, Deserialize)]
pub struct ValidityResponse {
    pub valid: bool,
}

#[derive(Serialize, Deserialize)]
pub struct FrameResponse {
    pub df: DataFrame,
}

#[derive(Serialize, Deserialize)]
pub struct ShouldChartResponse {
    pub should_generate_chart: bool,
}

#[derive(Serialize, Deserialize)]
pub struct CodeResponse {
    pub code: String,
}

#[derive(Serialize, Deserialize)]
pub struct PlotResponse {
    pub fig: Option<PlotlyFigure>,
}

#[derive(Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

// --- Handlers ---

pub async fn generate_questions_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<QuestionsResponse>>, AppError> {
    let questions = app_state.orchestrator.generate_questions().await?;
    let debug_info = json!({ "count": questions.len() });
    Ok(wrap_response(
        QuestionsResponse { questions },
        debug_params,
        Some(debug_info),
    ))
}

pub async fn generate_sql_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<QuestionRequest>,
) -> Result<Json<ApiResponse<SqlResponse>>, AppError> {
    info!("Received generate_sql request: '{}'", payload.question);
    let sql = app_state
        .orchestrator
        .generate_sql(&payload.question)
        .await?;
    let debug_info = json!({ "question": payload.question });
    Ok(wrap_response(SqlResponse { sql }, debug_params, Some(debug_info)))
}

pub async fn is_sql_valid_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<SqlRequest>,
) -> Result<Json<ApiResponse<ValidityResponse>>, AppError> {
    let valid = app_state.orchestrator.is_sql_valid(&payload.sql).await?;
    Ok(wrap_response(ValidityResponse { valid }, debug_params, None))
}

pub async fn run_sql_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<SqlRequest>,
) -> Result<Json<ApiResponse<FrameResponse>>, AppError> {
    info!("Received run_sql request: '{}'", payload.sql);
    let df = app_state.orchestrator.run_sql(&payload.sql).await?;
    let debug_info = json!({ "sql": payload.sql, "row_count": df.len() });
    Ok(wrap_response(FrameResponse { df }, debug_params, Some(debug_info)))
}

pub async fn should_generate_chart_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<ResultRequest>,
) -> Result<Json<ApiResponse<ShouldChartResponse>>, AppError> {
    let should_generate_chart = app_state
        .orchestrator
        .should_generate_chart(&payload.question, &payload.sql, &payload.df)
        .await?;
    Ok(wrap_response(
        ShouldChartResponse {
            should_generate_chart,
        },
        debug_params,
        None,
    ))
}

pub async fn generate_plotly_code_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<ResultRequest>,
) -> Result<Json<ApiResponse<CodeResponse>>, AppError> {
    let code = app_state
        .orchestrator
        .generate_plotly_code(&payload.question, &payload.sql, &payload.df)
        .await?;
    Ok(wrap_response(CodeResponse { code }, debug_params, None))
}

pub async fn generate_plot_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<PlotRequest>,
) -> Result<Json<ApiResponse<PlotResponse>>, AppError> {
    let fig = app_state
        .orchestrator
        .generate_plot(&payload.code, &payload.df, payload.dark_mode)
        .await?;
    let debug_info = json!({ "dark_mode": payload.dark_mode });
    Ok(wrap_response(PlotResponse { fig }, debug_params, Some(debug_info)))
}

pub async fn generate_followup_questions_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<ResultRequest>,
) -> Result<Json<ApiResponse<QuestionsResponse>>, AppError> {
    let questions = app_state
        .orchestrator
        .generate_followup(&payload.question, &payload.sql, &payload.df)
        .await?;
    Ok(wrap_response(QuestionsResponse { questions }, debug_params, None))
}

pub async fn generate_summary_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<ResultRequest>,
) -> Result<Json<ApiResponse<SummaryResponse>>, AppError> {
    let summary = app_state
        .orchestrator
        .generate_summary(&payload.question, &payload.df)
        .await?;
    Ok(wrap_response(SummaryResponse { summary }, debug_params, None))
}
