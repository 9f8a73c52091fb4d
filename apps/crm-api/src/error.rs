//! Error types for the CRM API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crm_docgen::{GenerateError, StoreError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Generation failed: {0}")]
    Generation(GenerateError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::TemplateNotFound(id) => ApiError::TemplateNotFound(id),
            GenerateError::LeadNotFound(id) => ApiError::LeadNotFound(id),
            other => ApiError::Generation(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::TemplateNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Template not found: {}", id))
            }
            ApiError::LeadNotFound(id) => (StatusCode::NOT_FOUND, format!("Lead not found: {}", id)),
            ApiError::DocumentNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Document not found: {}", id))
            }
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Storage(StoreError::LeadNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("Lead not found: {}", id))
            }
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Generation(e) => {
                tracing::error!("Generation failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Document generation failed".to_string(),
                )
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
