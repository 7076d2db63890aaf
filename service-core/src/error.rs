use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Error type shared by the HTTP handlers.
///
/// Every variant renders as a JSON object with an `error` field and, where the
/// caller benefits from the underlying cause, a `message` field.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(anyhow::Error),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    ConfigError(anyhow::Error),

    /// A downstream collaborator rejected or failed a call.
    #[error("{error}: {message}")]
    Upstream { error: String, message: String },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::ConfigError(_)
            | AppError::Upstream { .. }
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::BadRequest(err) | AppError::ConfigError(err) => ErrorResponse {
                error: err.to_string(),
                message: None,
            },
            AppError::MethodNotAllowed => ErrorResponse {
                error: "Method not allowed".to_string(),
                message: None,
            },
            AppError::Upstream { error, message } => ErrorResponse {
                error,
                message: Some(message),
            },
            AppError::InternalError(err) => ErrorResponse {
                error: "Internal server error".to_string(),
                message: Some(format!("{:#}", err)),
            },
        };

        (status, Json(body)).into_response()
    }
}
