use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::models::question::Difficulty;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not enough {difficulty} questions in the pool: requested {requested}, available {available}")]
    InsufficientPool {
        difficulty: Difficulty,
        requested: usize,
        available: usize,
    },

    #[error("Candidate already has an assigned question set")]
    AlreadyAssigned,

    #[error("Question {question_id} is already claimed by another batch")]
    QuestionUnavailable { question_id: i32 },

    #[error("Candidate is not assigned to a batch")]
    NotAssignedToBatch,

    #[error("Exam has already been submitted")]
    AlreadySubmitted,

    #[error("No ongoing exam session found")]
    NoActiveSession,

    #[error("Question is not assigned to this candidate")]
    NotAssigned,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            e @ Error::InsufficientPool { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
            e @ Error::AlreadyAssigned => (StatusCode::CONFLICT, e.to_string()),
            e @ Error::QuestionUnavailable { .. } => (StatusCode::CONFLICT, e.to_string()),
            e @ Error::NotAssignedToBatch => (StatusCode::BAD_REQUEST, e.to_string()),
            e @ Error::AlreadySubmitted => (StatusCode::FORBIDDEN, e.to_string()),
            e @ Error::NoActiveSession => (StatusCode::BAD_REQUEST, e.to_string()),
            e @ Error::NotAssigned => (StatusCode::FORBIDDEN, e.to_string()),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Anyhow(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(_) | Error::Config(_) | Error::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
