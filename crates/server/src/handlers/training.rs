//! # Training Handlers
//!
//! Operator endpoints for the knowledge store. None of these are cached. The
//! schema training plan computed at setup is only applied through
//! `POST /api/v0/train_plan`.

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::RemoveTrainingDataRequest;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlchat::{TrainingData, TrainingPlan, TrainingRequest};
use tracing::info;

#[derive(Serialize, Deserialize)]
pub struct TrainingPlanResponse {
    pub plan: Option<TrainingPlan>,
}

#[derive(Serialize, Deserialize)]
pub struct TrainedIdsResponse {
    pub ids: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct TrainedIdResponse {
    pub id: String,
}

#[derive(Serialize, Deserialize)]
pub struct TrainingDataResponse {
    pub training_data: Vec<TrainingData>,
}

#[derive(Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn training_plan_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<TrainingPlanResponse>>, AppError> {
    let plan = app_state.orchestrator.pending_plan().await?;
    let debug_info = plan.as_ref().map(|p| json!({ "summary": p.summary() }));
    Ok(wrap_response(
        TrainingPlanResponse { plan },
        debug_params,
        debug_info,
    ))
}

pub async fn train_plan_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<TrainedIdsResponse>>, AppError> {
    info!("Applying the pending training plan.");
    let ids = app_state.orchestrator.train_pending_plan().await?;
    Ok(wrap_response(TrainedIdsResponse { ids }, debug_params, None))
}

pub async fn train_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<TrainingRequest>,
) -> Result<Json<ApiResponse<TrainedIdResponse>>, AppError> {
    let id = app_state.orchestrator.train(payload).await?;
    info!("Stored training data with id '{id}'.");
    Ok(wrap_response(TrainedIdResponse { id }, debug_params, None))
}

pub async fn training_data_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<TrainingDataResponse>>, AppError> {
    let training_data = app_state.orchestrator.get_training_data().await?;
    Ok(wrap_response(
        TrainingDataResponse { training_data },
        debug_params,
        None,
    ))
}

pub async fn remove_training_data_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<RemoveTrainingDataRequest>,
) -> Result<Json<ApiResponse<SuccessResponse>>, AppError> {
    info!("Removing training data '{}'.", payload.id);
    app_state
        .orchestrator
        .remove_training_data(&payload.id)
        .await?;
    Ok(wrap_response(SuccessResponse { success: true }, debug_params, None))
}

pub async fn clear_cache_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<SuccessResponse>>, AppError> {
    app_state.orchestrator.clear_cache().await;
    Ok(wrap_response(SuccessResponse { success: true }, debug_params, None))
}
