use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlchat::ChatError;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within the server,
/// allowing them to be converted into appropriate HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors originating from the `sqlchat` library.
    Chat(ChatError),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

/// Conversion from `ChatError` to `AppError`.
impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::Chat(err)
    }
}

/// Conversion from `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

/// The status code a library error is reported with.
pub fn status_for(err: &ChatError) -> StatusCode {
    match err {
        ChatError::MissingConfig(_)
        | ChatError::ReqwestClientBuild(_)
        | ChatError::StorageConnection(_)
        | ChatError::JsonSerialization(_)
        | ChatError::Regex(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ChatError::AiRequest(_)
        | ChatError::AiDeserialization(_)
        | ChatError::AiApi(_)
        | ChatError::VectorStoreConnection(_)
        | ChatError::VectorStoreRequest(_)
        | ChatError::VectorStoreApi(_) => StatusCode::BAD_GATEWAY,
        ChatError::StorageQueryFailed(_) | ChatError::InvalidTrainingRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        ChatError::UnknownTrainingId(_) => StatusCode::NOT_FOUND,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Chat(err) => {
                // Log the original error for debugging purposes
                error!("ChatError: {:?}", err);
                (status_for(&err), err.to_string())
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
