//! Unified API error handling.
//!
//! Every failing handler returns `ApiError`, rendered as
//! `{ "error": <code>, "message": <text>, "requestId": <uuid> }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{DifficultyError, SessionError, StoreError, TrialError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 400
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// 500
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        tracing::error!(
            target: "knowledge_quest_backend",
            error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DifficultyError> for ApiError {
    fn from(err: DifficultyError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<TrialError> for ApiError {
    fn from(err: TrialError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Difficulty(e) => e.into(),
            SessionError::Trial(e) => e.into(),
            SessionError::Store(e) => e.into(),
            SessionError::NotFound(id) => ApiError::NotFound(format!("session {id}")),
        }
    }
}
