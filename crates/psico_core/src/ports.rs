//! crates/psico_core/src/ports.rs
//!
//! Defines the service contracts (traits) the submission core depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the concrete database and of the text-generation API.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    EducationalContent, Exercise, NewEducationalContent, NewExercise, NewPatient,
    NewSessionNote, NewTreatmentPlan, Patient, RecordId, SessionNote, TreatmentPlan,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting record: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Record Store
//=========================================================================================

/// Optional filters for the list operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub patient_id: Option<RecordId>,
}

/// Persistent storage for every record of the practice.
///
/// Every operation is scoped to `owner`: a record owned by another
/// practitioner behaves exactly like a missing one. Lists are ordered from the
/// most recent record to the oldest.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Patients ---
    async fn create_patient(&self, owner: Uuid, patient: NewPatient) -> PortResult<Patient>;

    async fn update_patient(
        &self,
        owner: Uuid,
        id: RecordId,
        patient: NewPatient,
    ) -> PortResult<Patient>;

    async fn get_patient(&self, owner: Uuid, id: RecordId) -> PortResult<Patient>;

    async fn list_patients(&self, owner: Uuid) -> PortResult<Vec<Patient>>;

    /// Deletes the patient together with its plans, notes and exercises.
    async fn delete_patient(&self, owner: Uuid, id: RecordId) -> PortResult<()>;

    // --- Treatment plans ---
    async fn create_treatment_plan(
        &self,
        owner: Uuid,
        plan: NewTreatmentPlan,
    ) -> PortResult<TreatmentPlan>;

    async fn update_treatment_plan(
        &self,
        owner: Uuid,
        id: RecordId,
        plan: NewTreatmentPlan,
    ) -> PortResult<TreatmentPlan>;

    async fn get_treatment_plan(&self, owner: Uuid, id: RecordId) -> PortResult<TreatmentPlan>;

    async fn list_treatment_plans(
        &self,
        owner: Uuid,
        filter: ListFilter,
    ) -> PortResult<Vec<TreatmentPlan>>;

    async fn delete_treatment_plan(&self, owner: Uuid, id: RecordId) -> PortResult<()>;

    // --- Session notes ---
    async fn create_session_note(
        &self,
        owner: Uuid,
        note: NewSessionNote,
    ) -> PortResult<SessionNote>;

    async fn update_session_note(
        &self,
        owner: Uuid,
        id: RecordId,
        note: NewSessionNote,
    ) -> PortResult<SessionNote>;

    async fn get_session_note(&self, owner: Uuid, id: RecordId) -> PortResult<SessionNote>;

    async fn list_session_notes(
        &self,
        owner: Uuid,
        filter: ListFilter,
    ) -> PortResult<Vec<SessionNote>>;

    async fn delete_session_note(&self, owner: Uuid, id: RecordId) -> PortResult<()>;

    // --- Exercises ---
    async fn create_exercise(&self, owner: Uuid, exercise: NewExercise) -> PortResult<Exercise>;

    async fn update_exercise(
        &self,
        owner: Uuid,
        id: RecordId,
        exercise: NewExercise,
    ) -> PortResult<Exercise>;

    async fn get_exercise(&self, owner: Uuid, id: RecordId) -> PortResult<Exercise>;

    async fn list_exercises(&self, owner: Uuid, filter: ListFilter) -> PortResult<Vec<Exercise>>;

    async fn delete_exercise(&self, owner: Uuid, id: RecordId) -> PortResult<()>;

    // --- Educational content ---
    async fn create_educational_content(
        &self,
        owner: Uuid,
        content: NewEducationalContent,
    ) -> PortResult<EducationalContent>;

    async fn update_educational_content(
        &self,
        owner: Uuid,
        id: RecordId,
        content: NewEducationalContent,
    ) -> PortResult<EducationalContent>;

    async fn get_educational_content(
        &self,
        owner: Uuid,
        id: RecordId,
    ) -> PortResult<EducationalContent>;

    async fn list_educational_contents(&self, owner: Uuid)
        -> PortResult<Vec<EducationalContent>>;

    async fn delete_educational_content(&self, owner: Uuid, id: RecordId) -> PortResult<()>;
}

//=========================================================================================
// Text Generation
//=========================================================================================

/// One prompt sent to the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    /// Ask the service for a JSON object instead of free prose.
    pub structured: bool,
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Issues exactly one completion call and returns the raw text of the reply.
    async fn generate(&self, request: &GenerationRequest) -> PortResult<String>;
}
