use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("path escapes confined root")]
    PathEscape,
    #[error("not found")]
    NotFound,
    #[error("is a directory")]
    IsADirectory,
    #[error("not a directory")]
    NotADirectory,
    #[error("failed to spawn shell: {0}")]
    SpawnFailed(String),
    #[error("io error: {0}")]
    Io(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "Unauthorized",
            AppError::PathEscape => "PathEscape",
            AppError::NotFound => "NotFound",
            AppError::IsADirectory => "IsADirectory",
            AppError::NotADirectory => "NotADirectory",
            AppError::SpawnFailed(_) => "SpawnFailed",
            AppError::Io(_) => "IoError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::SpawnFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // every file-operation failure is the client's problem, not a
            // server fault
            AppError::PathEscape
            | AppError::NotFound
            | AppError::IsADirectory
            | AppError::NotADirectory
            | AppError::Io(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({"error": self.to_string(), "code": self.code()});
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
