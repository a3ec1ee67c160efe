//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::error::ErrorResponse;

/// Header set by the upstream identity provider once the practitioner is signed in.
pub const PRACTITIONER_HEADER: &str = "x-practitioner-id";

/// The practitioner on whose behalf a request runs. Every record access is
/// scoped to this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PractitionerId(pub Uuid);

/// Middleware that reads the practitioner id from the request headers.
///
/// If valid, inserts a `PractitionerId` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_practitioner(mut req: Request, next: Next) -> Response {
    let practitioner = req
        .headers()
        .get(PRACTITIONER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok());

    let Some(practitioner) = practitioner else {
        debug!("Rejecting request without a valid {} header", PRACTITIONER_HEADER);
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::message(
                "Identificação do profissional ausente ou inválida.",
            )),
        )
            .into_response();
    };

    req.extensions_mut().insert(PractitionerId(practitioner));
    next.run(req).await
}
