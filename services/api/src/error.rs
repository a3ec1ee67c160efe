//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how request
//! failures are rendered as HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use psico_core::{PortError, RawFields, Rejected, SubmissionError, SubmissionState, ValidationErrors};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `psico_api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A submission that did not reach the store.
    #[error("Submission rejected: {0}")]
    Rejected(#[from] Rejected),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Messages per offending field, present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<ValidationErrors>,
    /// The stage a submission had reached when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub stage: Option<SubmissionState>,
    /// The submitted fields, echoed back so they can be offered again.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub input: Option<RawFields>,
}

impl ErrorResponse {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
            stage: None,
            input: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Rejected(rejected) => rejected_response(rejected),
            ApiError::Port(PortError::NotFound(message)) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::message(message))).into_response()
            }
            ApiError::Port(PortError::Conflict(message)) => {
                (StatusCode::CONFLICT, Json(ErrorResponse::message(message))).into_response()
            }
            other => {
                error!("Request failed: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::message("Internal server error")),
                )
                    .into_response()
            }
        }
    }
}

/// Field errors are rendered per field; every other failure gets a single
/// message. The submitted input is always echoed back so nothing typed is lost.
fn rejected_response(rejected: Rejected) -> Response {
    let Rejected { error, failed_in, input } = rejected;
    let (status, message, fields) = match error {
        SubmissionError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Verifique os campos destacados.".to_string(),
            Some(errors),
        ),
        SubmissionError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
        SubmissionError::Configuration(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "O assistente de IA não está configurado. Tente novamente mais tarde.".to_string(),
            None,
        ),
        SubmissionError::Gateway(detail) => (
            StatusCode::BAD_GATEWAY,
            format!("Não foi possível obter a resposta da IA: {detail}"),
            None,
        ),
        SubmissionError::Storage(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Não foi possível salvar o registro. Tente novamente.".to_string(),
            None,
        ),
    };

    let body = ErrorResponse {
        error: message,
        fields,
        stage: Some(failed_in),
        input: Some(input),
    };
    (status, Json(body)).into_response()
}
