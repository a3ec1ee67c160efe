//! crates/psico_core/src/testing.rs
//!
//! Deterministic in-memory implementations of the ports, for tests and local
//! experiments. They never touch the network or a database.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    EducationalContent, Exercise, NewEducationalContent, NewExercise, NewPatient,
    NewSessionNote, NewTreatmentPlan, Patient, RecordId, SessionNote, TreatmentPlan,
};
use crate::ports::{
    GenerationRequest, ListFilter, PortError, PortResult, RecordStore, TextGenerationService,
};

//=========================================================================================
// Scripted text generation
//=========================================================================================

enum Script {
    Replies(VecDeque<String>),
    Failure(String),
}

/// A `TextGenerationService` that answers from a fixed script and records
/// every request it receives.
pub struct ScriptedGenerator {
    script: Mutex<Script>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    /// Answers with `replies` in order, then fails.
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Replies(replies.into_iter().map(Into::into).collect()))
    }

    /// Fails every call with `detail`, as an unreachable service would.
    pub fn failing(detail: impl Into<String>) -> Self {
        Self::with_script(Script::Failure(detail.into()))
    }

    fn with_script(script: Script) -> Self {
        Self { script: Mutex::new(script), requests: Mutex::new(Vec::new()), delay: None }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> PortResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock().map_err(|_| poisoned())?;
        match &mut *script {
            Script::Replies(replies) => replies
                .pop_front()
                .ok_or_else(|| PortError::Unexpected("no scripted reply left".to_string())),
            Script::Failure(detail) => Err(PortError::Unexpected(detail.clone())),
        }
    }
}

//=========================================================================================
// In-memory record store
//=========================================================================================

#[derive(Default)]
struct Tables {
    last_id: RecordId,
    patients: Vec<Patient>,
    plans: Vec<TreatmentPlan>,
    notes: Vec<SessionNote>,
    exercises: Vec<Exercise>,
    contents: Vec<EducationalContent>,
}

impl Tables {
    fn next_id(&mut self) -> RecordId {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_patient(&self, owner: Uuid, id: Option<RecordId>) -> PortResult<()> {
        match id {
            Some(id) if !self.patients.iter().any(|p| p.owner_id == owner && p.id == id) => {
                Err(PortError::NotFound(format!("Patient {id} not found")))
            }
            _ => Ok(()),
        }
    }

    fn ensure_unique_name(&self, owner: Uuid, name: &str, except: Option<RecordId>) -> PortResult<()> {
        let taken = self
            .patients
            .iter()
            .any(|p| p.owner_id == owner && p.full_name == name && Some(p.id) != except);
        if taken {
            Err(PortError::Conflict(format!("Patient '{name}' already exists")))
        } else {
            Ok(())
        }
    }
}

/// A `RecordStore` kept in process memory.
///
/// `fail_writes(true)` makes every subsequent write fail, which stands in for an
/// unavailable database.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| poisoned())
    }

    fn write(&self) -> PortResult<MutexGuard<'_, Tables>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("storage unavailable".to_string()));
        }
        self.read()
    }

    fn committed<T>(&self, value: T) -> PortResult<T> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }
}

fn poisoned() -> PortError {
    PortError::Unexpected("lock poisoned".to_string())
}

fn not_found(what: &str, id: RecordId) -> PortError {
    PortError::NotFound(format!("{what} {id} not found"))
}

/// Owner-scoped, newest first.
fn owned<T: Clone>(rows: &[T], keep: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().rev().filter(|row| keep(row)).cloned().collect()
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create_patient(&self, owner: Uuid, patient: NewPatient) -> PortResult<Patient> {
        let mut tables = self.write()?;
        tables.ensure_unique_name(owner, &patient.full_name, None)?;
        let record = Patient {
            id: tables.next_id(),
            owner_id: owner,
            full_name: patient.full_name,
            birth_date: patient.birth_date,
            emergency_contact: patient.emergency_contact,
            registered_at: Utc::now(),
        };
        tables.patients.push(record.clone());
        self.committed(record)
    }

    async fn update_patient(
        &self,
        owner: Uuid,
        id: RecordId,
        patient: NewPatient,
    ) -> PortResult<Patient> {
        let mut tables = self.write()?;
        tables.ensure_unique_name(owner, &patient.full_name, Some(id))?;
        let record = tables
            .patients
            .iter_mut()
            .find(|p| p.owner_id == owner && p.id == id)
            .ok_or_else(|| not_found("Patient", id))?;
        record.full_name = patient.full_name;
        record.birth_date = patient.birth_date;
        record.emergency_contact = patient.emergency_contact;
        let updated = record.clone();
        self.committed(updated)
    }

    async fn get_patient(&self, owner: Uuid, id: RecordId) -> PortResult<Patient> {
        self.read()?
            .patients
            .iter()
            .find(|p| p.owner_id == owner && p.id == id)
            .cloned()
            .ok_or_else(|| not_found("Patient", id))
    }

    async fn list_patients(&self, owner: Uuid) -> PortResult<Vec<Patient>> {
        Ok(owned(&self.read()?.patients, |p| p.owner_id == owner))
    }

    async fn delete_patient(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let mut tables = self.write()?;
        tables.ensure_patient(owner, Some(id)).map_err(|_| not_found("Patient", id))?;
        tables.patients.retain(|p| p.id != id);
        tables.plans.retain(|p| p.patient_id != id);
        tables.notes.retain(|n| n.patient_id != Some(id));
        tables.exercises.retain(|e| e.patient_id != Some(id));
        self.committed(())
    }

    async fn create_treatment_plan(
        &self,
        owner: Uuid,
        plan: NewTreatmentPlan,
    ) -> PortResult<TreatmentPlan> {
        let mut tables = self.write()?;
        tables.ensure_patient(owner, Some(plan.patient_id))?;
        let record = TreatmentPlan {
            id: tables.next_id(),
            owner_id: owner,
            patient_id: plan.patient_id,
            title: plan.title,
            base_diagnosis: plan.base_diagnosis,
            treatment_goals: plan.treatment_goals,
            approach: plan.approach,
            session_frequency: plan.session_frequency,
            planned_start: plan.planned_start,
            ai_feedback: plan.ai_feedback,
            created_at: Utc::now(),
        };
        tables.plans.push(record.clone());
        self.committed(record)
    }

    async fn update_treatment_plan(
        &self,
        owner: Uuid,
        id: RecordId,
        plan: NewTreatmentPlan,
    ) -> PortResult<TreatmentPlan> {
        let mut tables = self.write()?;
        tables.ensure_patient(owner, Some(plan.patient_id))?;
        let record = tables
            .plans
            .iter_mut()
            .find(|p| p.owner_id == owner && p.id == id)
            .ok_or_else(|| not_found("Treatment plan", id))?;
        record.patient_id = plan.patient_id;
        record.title = plan.title;
        record.base_diagnosis = plan.base_diagnosis;
        record.treatment_goals = plan.treatment_goals;
        record.approach = plan.approach;
        record.session_frequency = plan.session_frequency;
        record.planned_start = plan.planned_start;
        record.ai_feedback = plan.ai_feedback;
        let updated = record.clone();
        self.committed(updated)
    }

    async fn get_treatment_plan(&self, owner: Uuid, id: RecordId) -> PortResult<TreatmentPlan> {
        self.read()?
            .plans
            .iter()
            .find(|p| p.owner_id == owner && p.id == id)
            .cloned()
            .ok_or_else(|| not_found("Treatment plan", id))
    }

    async fn list_treatment_plans(
        &self,
        owner: Uuid,
        filter: ListFilter,
    ) -> PortResult<Vec<TreatmentPlan>> {
        Ok(owned(&self.read()?.plans, |p| {
            p.owner_id == owner && filter.patient_id.map_or(true, |id| p.patient_id == id)
        }))
    }

    async fn delete_treatment_plan(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let mut tables = self.write()?;
        let before = tables.plans.len();
        tables.plans.retain(|p| !(p.owner_id == owner && p.id == id));
        if tables.plans.len() == before {
            return Err(not_found("Treatment plan", id));
        }
        self.committed(())
    }

    async fn create_session_note(
        &self,
        owner: Uuid,
        note: NewSessionNote,
    ) -> PortResult<SessionNote> {
        let mut tables = self.write()?;
        tables.ensure_patient(owner, note.patient_id)?;
        let record = SessionNote {
            id: tables.next_id(),
            owner_id: owner,
            patient_id: note.patient_id,
            session_date: note.session_date,
            raw_notes: note.raw_notes,
            insights: note.insights,
            created_at: Utc::now(),
        };
        tables.notes.push(record.clone());
        self.committed(record)
    }

    async fn update_session_note(
        &self,
        owner: Uuid,
        id: RecordId,
        note: NewSessionNote,
    ) -> PortResult<SessionNote> {
        let mut tables = self.write()?;
        tables.ensure_patient(owner, note.patient_id)?;
        let record = tables
            .notes
            .iter_mut()
            .find(|n| n.owner_id == owner && n.id == id)
            .ok_or_else(|| not_found("Session note", id))?;
        record.patient_id = note.patient_id;
        record.session_date = note.session_date;
        record.raw_notes = note.raw_notes;
        record.insights = note.insights;
        let updated = record.clone();
        self.committed(updated)
    }

    async fn get_session_note(&self, owner: Uuid, id: RecordId) -> PortResult<SessionNote> {
        self.read()?
            .notes
            .iter()
            .find(|n| n.owner_id == owner && n.id == id)
            .cloned()
            .ok_or_else(|| not_found("Session note", id))
    }

    async fn list_session_notes(
        &self,
        owner: Uuid,
        filter: ListFilter,
    ) -> PortResult<Vec<SessionNote>> {
        Ok(owned(&self.read()?.notes, |n| {
            n.owner_id == owner && filter.patient_id.map_or(true, |id| n.patient_id == Some(id))
        }))
    }

    async fn delete_session_note(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let mut tables = self.write()?;
        let before = tables.notes.len();
        tables.notes.retain(|n| !(n.owner_id == owner && n.id == id));
        if tables.notes.len() == before {
            return Err(not_found("Session note", id));
        }
        self.committed(())
    }

    async fn create_exercise(&self, owner: Uuid, exercise: NewExercise) -> PortResult<Exercise> {
        let mut tables = self.write()?;
        tables.ensure_patient(owner, exercise.patient_id)?;
        let record = Exercise {
            id: tables.next_id(),
            owner_id: owner,
            patient_id: exercise.patient_id,
            approach: exercise.approach,
            main_theme: exercise.main_theme,
            personalization: exercise.personalization,
            exercise_text: exercise.exercise_text,
            created_at: Utc::now(),
        };
        tables.exercises.push(record.clone());
        self.committed(record)
    }

    async fn update_exercise(
        &self,
        owner: Uuid,
        id: RecordId,
        exercise: NewExercise,
    ) -> PortResult<Exercise> {
        let mut tables = self.write()?;
        tables.ensure_patient(owner, exercise.patient_id)?;
        let record = tables
            .exercises
            .iter_mut()
            .find(|e| e.owner_id == owner && e.id == id)
            .ok_or_else(|| not_found("Exercise", id))?;
        record.patient_id = exercise.patient_id;
        record.approach = exercise.approach;
        record.main_theme = exercise.main_theme;
        record.personalization = exercise.personalization;
        record.exercise_text = exercise.exercise_text;
        let updated = record.clone();
        self.committed(updated)
    }

    async fn get_exercise(&self, owner: Uuid, id: RecordId) -> PortResult<Exercise> {
        self.read()?
            .exercises
            .iter()
            .find(|e| e.owner_id == owner && e.id == id)
            .cloned()
            .ok_or_else(|| not_found("Exercise", id))
    }

    async fn list_exercises(&self, owner: Uuid, filter: ListFilter) -> PortResult<Vec<Exercise>> {
        Ok(owned(&self.read()?.exercises, |e| {
            e.owner_id == owner && filter.patient_id.map_or(true, |id| e.patient_id == Some(id))
        }))
    }

    async fn delete_exercise(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let mut tables = self.write()?;
        let before = tables.exercises.len();
        tables.exercises.retain(|e| !(e.owner_id == owner && e.id == id));
        if tables.exercises.len() == before {
            return Err(not_found("Exercise", id));
        }
        self.committed(())
    }

    async fn create_educational_content(
        &self,
        owner: Uuid,
        content: NewEducationalContent,
    ) -> PortResult<EducationalContent> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let record = EducationalContent {
            id: tables.next_id(),
            owner_id: owner,
            title: content.title,
            content_type: content.content_type,
            theme: content.theme,
            target_audience: content.target_audience,
            tone_of_voice: content.tone_of_voice,
            keywords: content.keywords,
            generated: content.generated,
            created_at: now,
            updated_at: now,
        };
        tables.contents.push(record.clone());
        self.committed(record)
    }

    async fn update_educational_content(
        &self,
        owner: Uuid,
        id: RecordId,
        content: NewEducationalContent,
    ) -> PortResult<EducationalContent> {
        let mut tables = self.write()?;
        let record = tables
            .contents
            .iter_mut()
            .find(|c| c.owner_id == owner && c.id == id)
            .ok_or_else(|| not_found("Educational content", id))?;
        record.title = content.title;
        record.content_type = content.content_type;
        record.theme = content.theme;
        record.target_audience = content.target_audience;
        record.tone_of_voice = content.tone_of_voice;
        record.keywords = content.keywords;
        record.generated = content.generated;
        record.updated_at = Utc::now();
        let updated = record.clone();
        self.committed(updated)
    }

    async fn get_educational_content(
        &self,
        owner: Uuid,
        id: RecordId,
    ) -> PortResult<EducationalContent> {
        self.read()?
            .contents
            .iter()
            .find(|c| c.owner_id == owner && c.id == id)
            .cloned()
            .ok_or_else(|| not_found("Educational content", id))
    }

    async fn list_educational_contents(
        &self,
        owner: Uuid,
    ) -> PortResult<Vec<EducationalContent>> {
        Ok(owned(&self.read()?.contents, |c| c.owner_id == owner))
    }

    async fn delete_educational_content(&self, owner: Uuid, id: RecordId) -> PortResult<()> {
        let mut tables = self.write()?;
        let before = tables.contents.len();
        tables.contents.retain(|c| !(c.owner_id == owner && c.id == id));
        if tables.contents.len() == before {
            return Err(not_found("Educational content", id));
        }
        self.committed(())
    }
}
