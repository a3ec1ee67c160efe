//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Create and resubmit requests for AI-assisted records are handed to the
//! submission orchestrator. Reads and deletes go straight to the record store.

use crate::error::{ApiError, ErrorResponse};
use crate::web::middleware::PractitionerId;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use psico_core::domain::{EducationalContent, Exercise, Patient, RecordId, SessionNote, TreatmentPlan};
use psico_core::validation::normalize_reference;
use psico_core::{Accepted, ListFilter, RawFields, Target, TaskKind};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi};
use uuid::Uuid;

/// Set to `true` on a submission response when the AI call failed and a
/// placeholder was stored instead of a draft.
pub const DEGRADED_HEADER: &str = "x-ai-degraded";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_patients_handler,
        create_patient_handler,
        get_patient_handler,
        update_patient_handler,
        delete_patient_handler,
        list_plans_handler,
        create_plan_handler,
        get_plan_handler,
        update_plan_handler,
        delete_plan_handler,
        list_session_notes_handler,
        create_session_note_handler,
        get_session_note_handler,
        delete_session_note_handler,
        list_exercises_handler,
        create_exercise_handler,
        get_exercise_handler,
        delete_exercise_handler,
        list_educational_contents_handler,
        create_educational_content_handler,
        get_educational_content_handler,
        update_educational_content_handler,
        delete_educational_content_handler,
    ),
    components(
        schemas(ErrorResponse)
    ),
    tags(
        (name = "Psico Assistant API", description = "Patient records and AI-assisted clinical drafting.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Optional `?paciente=` filter for list endpoints. A non-numeric value is ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientFilter {
    paciente: Option<String>,
}

impl PatientFilter {
    fn to_list_filter(&self) -> ListFilter {
        ListFilter {
            patient_id: self.paciente.as_deref().and_then(normalize_reference),
        }
    }
}

fn submission_response(status: StatusCode, accepted: Accepted) -> Response {
    let degraded = accepted.degraded;
    let mut response = (status, Json(accepted.record)).into_response();
    if degraded {
        response
            .headers_mut()
            .insert(DEGRADED_HEADER, HeaderValue::from_static("true"));
    }
    response
}

async fn submit(
    state: &AppState,
    owner: Uuid,
    kind: TaskKind,
    target: Target,
    input: RawFields,
) -> Result<Response, ApiError> {
    let status = match target {
        Target::Create => StatusCode::CREATED,
        Target::Update(_) => StatusCode::OK,
    };
    let accepted = state
        .orchestrator
        .submit(owner, kind, target, input)
        .await?;
    Ok(submission_response(status, accepted))
}

//=========================================================================================
// Patients
//=========================================================================================

/// List the practitioner's patients, most recent first.
#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Patients owned by the practitioner", body = serde_json::Value),
        (status = 401, description = "Missing or invalid practitioner id", body = ErrorResponse)
    ),
    params(("x-practitioner-id" = Uuid, Header, description = "The practitioner's id."))
)]
pub async fn list_patients_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.store().list_patients(owner).await?))
}

/// Register a patient.
#[utoipa::path(
    post,
    path = "/patients",
    request_body(content = serde_json::Value, description = "nome_completo, data_nascimento, contato_emergencia"),
    responses(
        (status = 201, description = "Patient registered", body = serde_json::Value),
        (status = 422, description = "Invalid fields or duplicate name", body = ErrorResponse)
    ),
    params(("x-practitioner-id" = Uuid, Header, description = "The practitioner's id."))
)]
pub async fn create_patient_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Json(input): Json<RawFields>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let patient = state
        .orchestrator
        .save_patient(owner, Target::Create, input)
        .await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    responses(
        (status = 200, description = "The patient", body = serde_json::Value),
        (status = 404, description = "No such patient for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Patient id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn get_patient_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.store().get_patient(owner, id).await?))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    request_body(content = serde_json::Value, description = "nome_completo, data_nascimento, contato_emergencia"),
    responses(
        (status = 200, description = "Patient updated", body = serde_json::Value),
        (status = 404, description = "No such patient for this practitioner", body = ErrorResponse),
        (status = 422, description = "Invalid fields or duplicate name", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Patient id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn update_patient_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
    Json(input): Json<RawFields>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state
        .orchestrator
        .save_patient(owner, Target::Update(id), input)
        .await?;
    Ok(Json(patient))
}

/// Delete a patient together with its plans, session notes and exercises.
#[utoipa::path(
    delete,
    path = "/patients/{id}",
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "No such patient for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Patient id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn delete_patient_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_patient(owner, id).await?;
    info!(%owner, patient_id = id, "Patient deleted.");
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Treatment plans
//=========================================================================================

#[utoipa::path(
    get,
    path = "/plans",
    responses((status = 200, description = "Treatment plans, most recent first", body = serde_json::Value)),
    params(
        PatientFilter,
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn list_plans_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Query(filter): Query<PatientFilter>,
) -> Result<Json<Vec<TreatmentPlan>>, ApiError> {
    let plans = state
        .store()
        .list_treatment_plans(owner, filter.to_list_filter())
        .await?;
    Ok(Json(plans))
}

/// Create a treatment plan. The AI reviews the diagnosis and goals before it is stored.
#[utoipa::path(
    post,
    path = "/plans",
    request_body(content = serde_json::Value, description = "paciente, titulo, diagnostico_base, metas_tratamento, abordagem, frequencia_sessoes, data_inicio_prevista"),
    responses(
        (status = 201, description = "Plan stored with AI feedback", body = serde_json::Value),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 502, description = "The AI call failed; nothing was stored", body = ErrorResponse),
        (status = 503, description = "The AI assistant is not configured", body = ErrorResponse)
    ),
    params(("x-practitioner-id" = Uuid, Header, description = "The practitioner's id."))
)]
pub async fn create_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Json(input): Json<RawFields>,
) -> Result<Response, ApiError> {
    submit(&state, owner, TaskKind::PlanFeedback, Target::Create, input).await
}

#[utoipa::path(
    get,
    path = "/plans/{id}",
    responses(
        (status = 200, description = "The treatment plan", body = serde_json::Value),
        (status = 404, description = "No such plan for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Plan id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn get_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<Json<TreatmentPlan>, ApiError> {
    Ok(Json(state.store().get_treatment_plan(owner, id).await?))
}

/// Resubmit a treatment plan. Feedback already stored on the plan is kept.
#[utoipa::path(
    put,
    path = "/plans/{id}",
    request_body(content = serde_json::Value, description = "Same fields as on creation"),
    responses(
        (status = 200, description = "Plan updated", body = serde_json::Value),
        (status = 404, description = "No such plan for this practitioner", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Plan id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn update_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
    Json(input): Json<RawFields>,
) -> Result<Response, ApiError> {
    submit(&state, owner, TaskKind::PlanFeedback, Target::Update(id), input).await
}

#[utoipa::path(
    delete,
    path = "/plans/{id}",
    responses(
        (status = 204, description = "Plan deleted"),
        (status = 404, description = "No such plan for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Plan id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn delete_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_treatment_plan(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Session notes
//=========================================================================================

#[utoipa::path(
    get,
    path = "/session-notes",
    responses((status = 200, description = "Session notes, most recent first", body = serde_json::Value)),
    params(
        PatientFilter,
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn list_session_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Query(filter): Query<PatientFilter>,
) -> Result<Json<Vec<SessionNote>>, ApiError> {
    let notes = state
        .store()
        .list_session_notes(owner, filter.to_list_filter())
        .await?;
    Ok(Json(notes))
}

/// Record a session. The AI summarises the raw notes before they are stored.
#[utoipa::path(
    post,
    path = "/session-notes",
    request_body(content = serde_json::Value, description = "paciente, data_sessao, anotacoes_brutas"),
    responses(
        (status = 201, description = "Note stored with summary, diagnosis suggestion and language patterns", body = serde_json::Value),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 502, description = "The AI call failed; nothing was stored", body = ErrorResponse),
        (status = 503, description = "The AI assistant is not configured", body = ErrorResponse)
    ),
    params(("x-practitioner-id" = Uuid, Header, description = "The practitioner's id."))
)]
pub async fn create_session_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Json(input): Json<RawFields>,
) -> Result<Response, ApiError> {
    submit(&state, owner, TaskKind::SessionSummary, Target::Create, input).await
}

#[utoipa::path(
    get,
    path = "/session-notes/{id}",
    responses(
        (status = 200, description = "The session note", body = serde_json::Value),
        (status = 404, description = "No such note for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Session note id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn get_session_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<Json<SessionNote>, ApiError> {
    Ok(Json(state.store().get_session_note(owner, id).await?))
}

#[utoipa::path(
    delete,
    path = "/session-notes/{id}",
    responses(
        (status = 204, description = "Session note deleted"),
        (status = 404, description = "No such note for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Session note id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn delete_session_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_session_note(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Exercises
//=========================================================================================

#[utoipa::path(
    get,
    path = "/exercises",
    responses((status = 200, description = "Exercises, most recent first", body = serde_json::Value)),
    params(
        PatientFilter,
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn list_exercises_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Query(filter): Query<PatientFilter>,
) -> Result<Json<Vec<Exercise>>, ApiError> {
    let exercises = state
        .store()
        .list_exercises(owner, filter.to_list_filter())
        .await?;
    Ok(Json(exercises))
}

/// Generate a therapeutic exercise for a theme and approach.
#[utoipa::path(
    post,
    path = "/exercises",
    request_body(content = serde_json::Value, description = "paciente, abordagem_teorica, tema_principal, detalhes_personalizacao"),
    responses(
        (status = 201, description = "Exercise stored", body = serde_json::Value),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 502, description = "The AI call failed; nothing was stored", body = ErrorResponse),
        (status = 503, description = "The AI assistant is not configured", body = ErrorResponse)
    ),
    params(("x-practitioner-id" = Uuid, Header, description = "The practitioner's id."))
)]
pub async fn create_exercise_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Json(input): Json<RawFields>,
) -> Result<Response, ApiError> {
    submit(&state, owner, TaskKind::ExerciseGeneration, Target::Create, input).await
}

#[utoipa::path(
    get,
    path = "/exercises/{id}",
    responses(
        (status = 200, description = "The exercise", body = serde_json::Value),
        (status = 404, description = "No such exercise for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Exercise id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn get_exercise_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<Json<Exercise>, ApiError> {
    Ok(Json(state.store().get_exercise(owner, id).await?))
}

#[utoipa::path(
    delete,
    path = "/exercises/{id}",
    responses(
        (status = 204, description = "Exercise deleted"),
        (status = 404, description = "No such exercise for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Exercise id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn delete_exercise_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_exercise(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Educational content
//=========================================================================================

#[utoipa::path(
    get,
    path = "/educational-contents",
    responses((status = 200, description = "Educational content, most recent first", body = serde_json::Value)),
    params(("x-practitioner-id" = Uuid, Header, description = "The practitioner's id."))
)]
pub async fn list_educational_contents_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
) -> Result<Json<Vec<EducationalContent>>, ApiError> {
    Ok(Json(state.store().list_educational_contents(owner).await?))
}

/// Draft a post, article or patient handout together with title, hashtag and image ideas.
#[utoipa::path(
    post,
    path = "/educational-contents",
    request_body(content = serde_json::Value, description = "titulo, tipo_conteudo, tema, publico_alvo, tom_voz, palavras_chave"),
    responses(
        (status = 201, description = "Content stored with the generated draft", body = serde_json::Value),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 502, description = "The AI call failed; nothing was stored", body = ErrorResponse),
        (status = 503, description = "The AI assistant is not configured", body = ErrorResponse)
    ),
    params(("x-practitioner-id" = Uuid, Header, description = "The practitioner's id."))
)]
pub async fn create_educational_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Json(input): Json<RawFields>,
) -> Result<Response, ApiError> {
    submit(&state, owner, TaskKind::EducationalContent, Target::Create, input).await
}

#[utoipa::path(
    get,
    path = "/educational-contents/{id}",
    responses(
        (status = 200, description = "The educational content", body = serde_json::Value),
        (status = 404, description = "No such content for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Educational content id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn get_educational_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<Json<EducationalContent>, ApiError> {
    Ok(Json(state.store().get_educational_content(owner, id).await?))
}

/// Resubmit educational content. A generated draft already stored is kept.
#[utoipa::path(
    put,
    path = "/educational-contents/{id}",
    request_body(content = serde_json::Value, description = "Same fields as on creation"),
    responses(
        (status = 200, description = "Content updated", body = serde_json::Value),
        (status = 404, description = "No such content for this practitioner", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Educational content id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn update_educational_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
    Json(input): Json<RawFields>,
) -> Result<Response, ApiError> {
    submit(&state, owner, TaskKind::EducationalContent, Target::Update(id), input).await
}

#[utoipa::path(
    delete,
    path = "/educational-contents/{id}",
    responses(
        (status = 204, description = "Educational content deleted"),
        (status = 404, description = "No such content for this practitioner", body = ErrorResponse)
    ),
    params(
        ("id" = i64, Path, description = "Educational content id."),
        ("x-practitioner-id" = Uuid, Header, description = "The practitioner's id.")
    )
)]
pub async fn delete_educational_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(PractitionerId(owner)): Extension<PractitionerId>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_educational_content(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
