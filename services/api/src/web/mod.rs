pub mod middleware;
pub mod rest;
pub mod state;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_practitioner;
use rest::*;
use state::AppState;

/// Builds the full application router: the practitioner-scoped REST API plus
/// the Swagger UI, which needs no practitioner id.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route(
            "/patients",
            get(list_patients_handler).post(create_patient_handler),
        )
        .route(
            "/patients/{id}",
            get(get_patient_handler)
                .put(update_patient_handler)
                .delete(delete_patient_handler),
        )
        .route("/plans", get(list_plans_handler).post(create_plan_handler))
        .route(
            "/plans/{id}",
            get(get_plan_handler)
                .put(update_plan_handler)
                .delete(delete_plan_handler),
        )
        .route(
            "/session-notes",
            get(list_session_notes_handler).post(create_session_note_handler),
        )
        .route(
            "/session-notes/{id}",
            get(get_session_note_handler).delete(delete_session_note_handler),
        )
        .route(
            "/exercises",
            get(list_exercises_handler).post(create_exercise_handler),
        )
        .route(
            "/exercises/{id}",
            get(get_exercise_handler).delete(delete_exercise_handler),
        )
        .route(
            "/educational-contents",
            get(list_educational_contents_handler).post(create_educational_content_handler),
        )
        .route(
            "/educational-contents/{id}",
            get(get_educational_content_handler)
                .put(update_educational_content_handler)
                .delete(delete_educational_content_handler),
        )
        .layer(axum_middleware::from_fn(require_practitioner))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
