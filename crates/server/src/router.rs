use super::{handlers, state::AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v0/generate_questions",
            get(handlers::generate_questions_handler),
        )
        .route("/api/v0/generate_sql", post(handlers::generate_sql_handler))
        .route("/api/v0/is_sql_valid", post(handlers::is_sql_valid_handler))
        .route("/api/v0/run_sql", post(handlers::run_sql_handler))
        .route(
            "/api/v0/should_generate_chart",
            post(handlers::should_generate_chart_handler),
        )
        .route(
            "/api/v0/generate_plotly_code",
            post(handlers::generate_plotly_code_handler),
        )
        .route("/api/v0/generate_plot", post(handlers::generate_plot_handler))
        .route(
            "/api/v0/generate_followup_questions",
            post(handlers::generate_followup_questions_handler),
        )
        .route(
            "/api/v0/generate_summary",
            post(handlers::generate_summary_handler),
        )
        .route("/api/v0/training_plan", get(handlers::training_plan_handler))
        .route("/api/v0/train_plan", post(handlers::train_plan_handler))
        .route("/api/v0/train", post(handlers::train_handler))
        .route("/api/v0/training_data", get(handlers::training_data_handler))
        .route(
            "/api/v0/remove_training_data",
            post(handlers::remove_training_data_handler),
        )
        .route("/api/v0/clear_cache", post(handlers::clear_cache_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
