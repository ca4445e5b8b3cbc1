//! API error type and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::domain::errors::DomainError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.kind(),
            ApiError::BadRequest(_) => "bad_args",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                DomainError::BadArgs(_) | DomainError::ClipTooLong { .. } => {
                    StatusCode::BAD_REQUEST
                }
                DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                DomainError::FileNotFound(_) => StatusCode::NOT_FOUND,
                DomainError::DownloadFailure(_)
                | DomainError::ProbeFailure(_)
                | DomainError::ExtractionFailure { .. }
                | DomainError::TranscriptionFailure(_)
                | DomainError::RenderFailure(_) => StatusCode::BAD_GATEWAY,
                DomainError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "Request rejected");
        }

        let details = match &self {
            ApiError::Domain(DomainError::ExtractionFailure { stderr, .. }) => stderr.clone(),
            _ => None,
        };
        let body = ErrorResponse {
            status: "error",
            error: self.kind(),
            message: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
