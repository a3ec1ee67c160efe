//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RecordStore` port from the `psico_core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every statement carries the owner in its `WHERE` clause, so a row owned by
//! another practitioner is indistinguishable from a missing one.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use psico_core::domain::{
    ContentType, EducationalContent, Exercise, GeneratedContent, NewEducationalContent,
    NewExercise, NewPatient, NewSessionNote, NewTreatmentPlan, Patient, RecordId,
    SessionInsights, SessionNote, TheoreticalApproach, TreatmentPlan,
};
use psico_core::ports::{ListFilter, PortError, PortResult, RecordStore};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RecordStore` port.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Creates a new `PgRecordStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Fails with `NotFound` unless the referenced patient belongs to `owner`.
    async fn ensure_patient(&self, owner: Uuid, patient_id: Option<RecordId>) -> PortResult<()> {
        let Some(patient_id) = patient_id else {
            return Ok(());
        };
        sqlx::query("SELECT id FROM patients WHERE id = $1 AND owner_id = $2")
            .bind(patient_id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Patient", patient_id))?;
        Ok(())
    }
}

/// Maps a `sqlx` error onto the port's error vocabulary.
fn map_db_error(e: sqlx::Error, entity: &str, id: RecordId) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} {} not found", entity, id)),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => PortError::Conflict(db_err.message().to_string()),
            // foreign_key_violation: the patient vanished between check and write
            Some("23503") => PortError::NotFound(format!("Patient referenced by {} not found", entity)),
            _ => PortError::Unexpected(db_err.to_string()),
        },
        other => PortError::Unexpected(other.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Turns a zero-row `DELETE` into `NotFound`.
fn expect_deleted(rows: u64, entity: &str, id: RecordId) -> PortResult<()> {
    if rows == 0 {
        Err(PortError::NotFound(format!("{} {} not found", entity, id)))
    } else {
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const PATIENT_COLUMNS: &str =
    "id, owner_id, full_name, birth_date, emergency_contact, registered_at";

#[derive(FromRow)]
struct PatientRow {
    id: i64,
    owner_id: Uuid,
    full_name: String,
    birth_date: Option<NaiveDate>,
    emergency_contact: Option<String>,
    registered_at: DateTime<Utc>,
}
impl PatientRow {
    fn to_domain(self) -> Patient {
        Patient {
            id: self.id,
            owner_id: self.owner_id,
            full_name: self.full_name,
            birth_date: self.birth_date,
            emergency_contact: self.emergency_contact,
            registered_at: self.registered_at,
        }
    }
}

const PLAN_COLUMNS: &str = "id, owner_id, patient_id, title, base_diagnosis, treatment_goals, \
     approach, session_frequency, planned_start, ai_feedback, created_at";

#[derive(FromRow)]
struct PlanRow {
    id: i64,
    owner_id: Uuid,
    patient_id: i64,
    title: String,
    base_diagnosis: String,
    treatment_goals: String,
    approach: Option<String>,
    session_frequency: Option<String>,
    planned_start: NaiveDate,
    ai_feedback: Option<String>,
    created_at: DateTime<Utc>,
}
impl PlanRow {
    fn to_domain(self) -> TreatmentPlan {
        TreatmentPlan {
            id: self.id,
            owner_id: self.owner_id,
            patient_id: self.patient_id,
            title: self.title,
            base_diagnosis: self.base_diagnosis,
            treatment_goals: self.treatment_goals,
            approach: self.approach,
            session_frequency: self.session_frequency,
            planned_start: self.planned_start,
            ai_feedback: self.ai_feedback,
            created_at: self.created_at,
        }
    }
}

const NOTE_COLUMNS: &str = "id, owner_id, patient_id, session_date, raw_notes, summary, \
     diagnosis_suggestion, language_patterns, created_at";

#[derive(FromRow)]
struct NoteRow {
    id: i64,
    owner_id: Uuid,
    patient_id: Option<i64>,
    session_date: NaiveDate,
    raw_notes: String,
    summary: Option<String>,
    diagnosis_suggestion: Option<String>,
    language_patterns: Option<String>,
    created_at: DateTime<Utc>,
}
impl NoteRow {
    fn to_domain(self) -> SessionNote {
        // The table constraint keeps the three columns null together.
        let insights = match (self.summary, self.diagnosis_suggestion, self.language_patterns) {
            (Some(summary), Some(diagnosis_suggestion), Some(language_patterns)) => {
                Some(SessionInsights {
                    summary,
                    diagnosis_suggestion,
                    language_patterns,
                })
            }
            _ => None,
        };
        SessionNote {
            id: self.id,
            owner_id: self.owner_id,
            patient_id: self.patient_id,
            session_date: self.session_date,
            raw_notes: self.raw_notes,
            insights,
            created_at: self.created_at,
        }
    }
}

const EXERCISE_COLUMNS: &str =
    "id, owner_id, patient_id, approach, main_theme, personalization, exercise_text, created_at";

#[derive(FromRow)]
struct ExerciseRow {
    id: i64,
    owner_id: Uuid,
    patient_id: Option<i64>,
    approach: String,
    main_theme: String,
    personalization: Option<String>,
    exercise_text: Option<String>,
    created_at: DateTime<Utc>,
}
impl ExerciseRow {
    fn to_domain(self) -> PortResult<Exercise> {
        let approach = TheoreticalApproach::from_code(&self.approach).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown theoretical approach '{}'", self.approach))
        })?;
        Ok(Exercise {
            id: self.id,
            owner_id: self.owner_id,
            patient_id: self.patient_id,
            approach,
            main_theme: self.main_theme,
            personalization: self.personalization,
            exercise_text: self.exercise_text,
            created_at: self.created_at,
        })
    }
}

const CONTENT_COLUMNS: &str = "id, owner_id, title, content_type, theme, target_audience, \
     tone_of_voice, keywords, body, title_suggestions, hashtags, image_suggestions, \
     created_at, updated_at";

#[derive(FromRow)]
struct ContentRow {
    id: i64,
    owner_id: Uuid,
    title: String,
    content_type: String,
    theme: String,
    target_audience: Option<String>,
    tone_of_voice: String,
    keywords: Option<String>,
    body: Option<String>,
    title_suggestions: Option<String>,
    hashtags: Option<String>,
    image_suggestions: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ContentRow {
    fn to_domain(self) -> PortResult<EducationalContent> {
        let content_type = ContentType::from_code(&self.content_type).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown content type '{}'", self.content_type))
        })?;
        let generated = match (
            self.body,
            self.title_suggestions,
            self.hashtags,
            self.image_suggestions,
        ) {
            (Some(body), Some(title_suggestions), Some(hashtags), Some(image_suggestions)) => {
                Some(GeneratedContent {
                    body,
                    title_suggestions,
                    hashtags,
                    image_suggestions,
                })
            }
            _ => None,
        };
        Ok(EducationalContent {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            content_type,
            theme: self.theme,
            target_audience: self.target_audience,
            tone_of_voice: self.tone_of_voice,
            keywords: self.keywords,
            generated,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for PgRecordStore {
    // --- Patients ---

    async fn create_patient(&self, owner: Uuid, patient: NewPatient) -> PortResult<Patient> {
        let sql = format!(
            "INSERT INTO patients (owner_id, full_name, birth_date, emergency_contact) \
             VALUES ($1, $2, $3, $4) RETURNING {PATIENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(owner)
            .bind(&patient.full_name)
            .bind(patient.birth_date)
            .bind(&patient.emergency_contact)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Patient", 0))?;
        Ok(row.to_domain())
    }

    async fn update_patient(
        &self,
        owner: Uuid,
        id: RecordId,
        patient: NewPatient,
    ) -> PortResult<Patient> {
        let sql = format!(
            "UPDATE patients SET full_name = $3, birth_date = $4, emergency_contact = $5 \
             WHERE id = $1 AND owner_id = $2 RETURNING {PATIENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(&patient.full_name)
            .bind(patient.birth_date)
            .bind(&patient.emergency_contact)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Patient", id))?;
        Ok(row.to_domain())
    }

    async fn get_patient(&self, owner: Uuid, id: RecordId) -> PortResult<Patient> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1 AND owner_id = $2");
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Patient", id))?;
        Ok(row.to_domain())
    }

    async fn list_patients(&self, owner: Uuid) -> PortResult<Vec<Patient>> {
        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE owner_id = $1 \
             ORDER BY registered_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(PatientRow::to_domain).collect())
    }

    async fn delete_patient(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        // Plans, notes and exercises go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM patients WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Patient", id)
    }

    // --- Treatment plans ---

    async fn create_treatment_plan(
        &self,
        owner: Uuid,
        plan: NewTreatmentPlan,
    ) -> PortResult<TreatmentPlan> {
        self.ensure_patient(owner, Some(plan.patient_id)).await?;
        let sql = format!(
            "INSERT INTO treatment_plans (owner_id, patient_id, title, base_diagnosis, \
             treatment_goals, approach, session_frequency, planned_start, ai_feedback) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {PLAN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(owner)
            .bind(plan.patient_id)
            .bind(&plan.title)
            .bind(&plan.base_diagnosis)
            .bind(&plan.treatment_goals)
            .bind(&plan.approach)
            .bind(&plan.session_frequency)
            .bind(plan.planned_start)
            .bind(&plan.ai_feedback)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Treatment plan", 0))?;
        Ok(row.to_domain())
    }

    async fn update_treatment_plan(
        &self,
        owner: Uuid,
        id: RecordId,
        plan: NewTreatmentPlan,
    ) -> PortResult<TreatmentPlan> {
        self.ensure_patient(owner, Some(plan.patient_id)).await?;
        let sql = format!(
            "UPDATE treatment_plans SET patient_id = $3, title = $4, base_diagnosis = $5, \
             treatment_goals = $6, approach = $7, session_frequency = $8, planned_start = $9, \
             ai_feedback = $10 WHERE id = $1 AND owner_id = $2 RETURNING {PLAN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(plan.patient_id)
            .bind(&plan.title)
            .bind(&plan.base_diagnosis)
            .bind(&plan.treatment_goals)
            .bind(&plan.approach)
            .bind(&plan.session_frequency)
            .bind(plan.planned_start)
            .bind(&plan.ai_feedback)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Treatment plan", id))?;
        Ok(row.to_domain())
    }

    async fn get_treatment_plan(&self, owner: Uuid, id: RecordId) -> PortResult<TreatmentPlan> {
        let sql =
            format!("SELECT {PLAN_COLUMNS} FROM treatment_plans WHERE id = $1 AND owner_id = $2");
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Treatment plan", id))?;
        Ok(row.to_domain())
    }

    async fn list_treatment_plans(
        &self,
        owner: Uuid,
        filter: ListFilter,
    ) -> PortResult<Vec<TreatmentPlan>> {
        let sql = format!(
            "SELECT {PLAN_COLUMNS} FROM treatment_plans \
             WHERE owner_id = $1 AND ($2::BIGINT IS NULL OR patient_id = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(owner)
            .bind(filter.patient_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(PlanRow::to_domain).collect())
    }

    async fn delete_treatment_plan(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM treatment_plans WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Treatment plan", id)
    }

    // --- Session notes ---

    async fn create_session_note(
        &self,
        owner: Uuid,
        note: NewSessionNote,
    ) -> PortResult<SessionNote> {
        self.ensure_patient(owner, note.patient_id).await?;
        let insights = note.insights.as_ref();
        let sql = format!(
            "INSERT INTO session_notes (owner_id, patient_id, session_date, raw_notes, summary, \
             diagnosis_suggestion, language_patterns) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(owner)
            .bind(note.patient_id)
            .bind(note.session_date)
            .bind(&note.raw_notes)
            .bind(insights.map(|i| i.summary.as_str()))
            .bind(insights.map(|i| i.diagnosis_suggestion.as_str()))
            .bind(insights.map(|i| i.language_patterns.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Session note", 0))?;
        Ok(row.to_domain())
    }

    async fn update_session_note(
        &self,
        owner: Uuid,
        id: RecordId,
        note: NewSessionNote,
    ) -> PortResult<SessionNote> {
        self.ensure_patient(owner, note.patient_id).await?;
        let insights = note.insights.as_ref();
        let sql = format!(
            "UPDATE session_notes SET patient_id = $3, session_date = $4, raw_notes = $5, \
             summary = $6, diagnosis_suggestion = $7, language_patterns = $8 \
             WHERE id = $1 AND owner_id = $2 RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(note.patient_id)
            .bind(note.session_date)
            .bind(&note.raw_notes)
            .bind(insights.map(|i| i.summary.as_str()))
            .bind(insights.map(|i| i.diagnosis_suggestion.as_str()))
            .bind(insights.map(|i| i.language_patterns.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Session note", id))?;
        Ok(row.to_domain())
    }

    async fn get_session_note(&self, owner: Uuid, id: RecordId) -> PortResult<SessionNote> {
        let sql =
            format!("SELECT {NOTE_COLUMNS} FROM session_notes WHERE id = $1 AND owner_id = $2");
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Session note", id))?;
        Ok(row.to_domain())
    }

    async fn list_session_notes(
        &self,
        owner: Uuid,
        filter: ListFilter,
    ) -> PortResult<Vec<SessionNote>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM session_notes \
             WHERE owner_id = $1 AND ($2::BIGINT IS NULL OR patient_id = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(owner)
            .bind(filter.patient_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(NoteRow::to_domain).collect())
    }

    async fn delete_session_note(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM session_notes WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Session note", id)
    }

    // --- Exercises ---

    async fn create_exercise(&self, owner: Uuid, exercise: NewExercise) -> PortResult<Exercise> {
        self.ensure_patient(owner, exercise.patient_id).await?;
        let sql = format!(
            "INSERT INTO exercises (owner_id, patient_id, approach, main_theme, personalization, \
             exercise_text) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {EXERCISE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(owner)
            .bind(exercise.patient_id)
            .bind(exercise.approach.code())
            .bind(&exercise.main_theme)
            .bind(&exercise.personalization)
            .bind(&exercise.exercise_text)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Exercise", 0))?;
        row.to_domain()
    }

    async fn update_exercise(
        &self,
        owner: Uuid,
        id: RecordId,
        exercise: NewExercise,
    ) -> PortResult<Exercise> {
        self.ensure_patient(owner, exercise.patient_id).await?;
        let sql = format!(
            "UPDATE exercises SET patient_id = $3, approach = $4, main_theme = $5, \
             personalization = $6, exercise_text = $7 \
             WHERE id = $1 AND owner_id = $2 RETURNING {EXERCISE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(exercise.patient_id)
            .bind(exercise.approach.code())
            .bind(&exercise.main_theme)
            .bind(&exercise.personalization)
            .bind(&exercise.exercise_text)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Exercise", id))?;
        row.to_domain()
    }

    async fn get_exercise(&self, owner: Uuid, id: RecordId) -> PortResult<Exercise> {
        let sql =
            format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1 AND owner_id = $2");
        let row = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Exercise", id))?;
        row.to_domain()
    }

    async fn list_exercises(&self, owner: Uuid, filter: ListFilter) -> PortResult<Vec<Exercise>> {
        let sql = format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises \
             WHERE owner_id = $1 AND ($2::BIGINT IS NULL OR patient_id = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(owner)
            .bind(filter.patient_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        rows.into_iter().map(ExerciseRow::to_domain).collect()
    }

    async fn delete_exercise(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM exercises WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Exercise", id)
    }

    // --- Educational content ---

    async fn create_educational_content(
        &self,
        owner: Uuid,
        content: NewEducationalContent,
    ) -> PortResult<EducationalContent> {
        let generated = content.generated.as_ref();
        let sql = format!(
            "INSERT INTO educational_contents (owner_id, title, content_type, theme, \
             target_audience, tone_of_voice, keywords, body, title_suggestions, hashtags, \
             image_suggestions) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(owner)
            .bind(&content.title)
            .bind(content.content_type.code())
            .bind(&content.theme)
            .bind(&content.target_audience)
            .bind(&content.tone_of_voice)
            .bind(&content.keywords)
            .bind(generated.map(|g| g.body.as_str()))
            .bind(generated.map(|g| g.title_suggestions.as_str()))
            .bind(generated.map(|g| g.hashtags.as_str()))
            .bind(generated.map(|g| g.image_suggestions.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Educational content", 0))?;
        row.to_domain()
    }

    async fn update_educational_content(
        &self,
        owner: Uuid,
        id: RecordId,
        content: NewEducationalContent,
    ) -> PortResult<EducationalContent> {
        let generated = content.generated.as_ref();
        let sql = format!(
            "UPDATE educational_contents SET title = $3, content_type = $4, theme = $5, \
             target_audience = $6, tone_of_voice = $7, keywords = $8, body = $9, \
             title_suggestions = $10, hashtags = $11, image_suggestions = $12, \
             updated_at = now() WHERE id = $1 AND owner_id = $2 RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(&content.title)
            .bind(content.content_type.code())
            .bind(&content.theme)
            .bind(&content.target_audience)
            .bind(&content.tone_of_voice)
            .bind(&content.keywords)
            .bind(generated.map(|g| g.body.as_str()))
            .bind(generated.map(|g| g.title_suggestions.as_str()))
            .bind(generated.map(|g| g.hashtags.as_str()))
            .bind(generated.map(|g| g.image_suggestions.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Educational content", id))?;
        row.to_domain()
    }

    async fn get_educational_content(
        &self,
        owner: Uuid,
        id: RecordId,
    ) -> PortResult<EducationalContent> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM educational_contents WHERE id = $1 AND owner_id = $2"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Educational content", id))?;
        row.to_domain()
    }

    async fn list_educational_contents(
        &self,
        owner: Uuid,
    ) -> PortResult<Vec<EducationalContent>> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM educational_contents WHERE owner_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        rows.into_iter().map(ContentRow::to_domain).collect()
    }

    async fn delete_educational_content(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let result =
            sqlx::query("DELETE FROM educational_contents WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Educational content", id)
    }
}
