//! crates/psico_core/src/orchestrator.rs
//!
//! The submission workflow shared by every AI-assisted record:
//!
//! ```text
//! Received ──validate──▶ Validated ──draft──▶ Drafted ──write──▶ Persisted
//!     │                      │                   │
//!     └──────────────────────┴───────────────────┴──────▶ Failed
//! ```
//!
//! The workflow is entity-agnostic. Everything that differs between entities
//! comes from the task table in [`crate::tasks`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{
    ContentType, GeneratedContent, NewEducationalContent, NewExercise, NewPatient, NewRecord,
    NewSessionNote, NewTreatmentPlan, Patient, Record, RecordId, SessionInsights,
    TheoreticalApproach, DEFAULT_TONE_OF_VOICE,
};
use crate::gateway::{AiGateway, GatewayError, GeneratedFields};
use crate::ports::{PortError, RecordStore};
use crate::tasks::{FailurePolicy, TaskKind, TaskSpec, PATIENT_FIELDS};
use crate::validation::{validate, FieldShape, RawFields, ValidatedFields, ValidationErrors};

/// Prefix of the text stored in place of AI output by fail-open task kinds.
pub const PLACEHOLDER_PREFIX: &str = "Erro na comunicação com a IA";

const UNKNOWN_PATIENT_MESSAGE: &str = "Paciente não encontrado.";
const DUPLICATE_PATIENT_MESSAGE: &str = "Já existe um paciente com este nome.";

//=========================================================================================
// Public types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Received,
    Validated,
    Drafted,
    Persisted,
    Failed,
}

/// Whether a submission creates a record or rewrites an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Create,
    Update(RecordId),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("invalid submission: {0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("AI drafting is not configured: {0}")]
    Configuration(String),
    #[error("AI drafting failed: {0}")]
    Gateway(String),
    #[error("could not store the record: {0}")]
    Storage(#[source] PortError),
}

/// A failed submission. `input` is the practitioner's original mapping so the
/// presentation layer can offer it again for correction.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Rejected {
    pub error: SubmissionError,
    pub failed_in: SubmissionState,
    pub input: RawFields,
}

#[derive(Debug)]
pub struct Accepted {
    pub record: Record,
    /// The AI call failed and a placeholder was stored instead (fail-open kinds).
    pub degraded: bool,
}

/// Failure policy overrides, keyed by task kind.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    policies: BTreeMap<TaskKind, FailurePolicy>,
}

impl OrchestratorConfig {
    pub fn with_policy(mut self, kind: TaskKind, policy: FailurePolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    pub fn policy_for(&self, kind: TaskKind) -> FailurePolicy {
        self.policies
            .get(&kind)
            .copied()
            .unwrap_or(kind.spec().default_policy)
    }
}

//=========================================================================================
// State tracking
//=========================================================================================

struct Progress {
    kind: &'static str,
    owner: Uuid,
    state: SubmissionState,
}

impl Progress {
    fn received(kind: &'static str, owner: Uuid) -> Self {
        debug!(task = kind, %owner, "Submission received.");
        Self { kind, owner, state: SubmissionState::Received }
    }

    fn advance(&mut self, next: SubmissionState) {
        debug!(task = self.kind, owner = %self.owner, from = ?self.state, to = ?next, "Submission advanced.");
        self.state = next;
    }

    /// Moves to `Failed`; the rejection keeps the last state that was reached.
    fn fail(mut self, error: SubmissionError, input: RawFields) -> Rejected {
        let failed_in = self.state;
        self.advance(SubmissionState::Failed);
        match &error {
            SubmissionError::Validation(errors) => {
                debug!(task = self.kind, owner = %self.owner, fields = ?errors.fields(), "Submission rejected by validation.")
            }
            SubmissionError::NotFound(detail) => {
                debug!(task = self.kind, owner = %self.owner, %detail, "Submission target not found.")
            }
            SubmissionError::Configuration(detail) | SubmissionError::Gateway(detail) => {
                warn!(task = self.kind, owner = %self.owner, %detail, "Submission aborted by the AI gateway.")
            }
            SubmissionError::Storage(source) => {
                error!(task = self.kind, owner = %self.owner, error = %source, "Submission could not be stored.")
            }
        }
        Rejected { error, failed_in, input }
    }
}

//=========================================================================================
// Orchestrator
//=========================================================================================

/// Coordinates validate → draft → persist for every submission.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    gateway: AiGateway,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn RecordStore>, gateway: AiGateway, config: OrchestratorConfig) -> Self {
        Self { store, gateway, config }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    pub fn policy_for(&self, kind: TaskKind) -> FailurePolicy {
        self.config.policy_for(kind)
    }

    /// Runs one AI-assisted submission to completion.
    ///
    /// Nothing is written unless the submission reaches `Persisted`, except
    /// for fail-open kinds, which persist a placeholder when the AI call fails.
    pub async fn submit(
        &self,
        owner: Uuid,
        kind: TaskKind,
        target: Target,
        input: RawFields,
    ) -> Result<Accepted, Rejected> {
        let spec = kind.spec();
        let mut progress = Progress::received(kind.as_str(), owner);

        // Received → Validated
        let fields = match self.validated(owner, spec, &input).await {
            Ok(fields) => fields,
            Err(e) => return Err(progress.fail(e, input)),
        };
        let existing = match target {
            Target::Create => None,
            Target::Update(id) => match self.load(owner, kind, id).await {
                Ok(record) => Some(record),
                Err(e) => return Err(progress.fail(e, input)),
            },
        };
        progress.advance(SubmissionState::Validated);

        // Validated → Drafted
        let reused = existing.as_ref().and_then(existing_outputs);
        let fresh_draft = reused.is_none();
        let (generated, degraded) = match reused {
            Some(outputs) => {
                debug!(task = kind.as_str(), "Keeping AI output already stored on the record.");
                (outputs, false)
            }
            None => match self.gateway.draft(spec, &fields).await {
                Ok(outputs) => (outputs, false),
                Err(GatewayError::NotConfigured) => {
                    let error = SubmissionError::Configuration(GatewayError::NotConfigured.to_string());
                    return Err(progress.fail(error, input));
                }
                Err(e) => match self.config.policy_for(kind) {
                    FailurePolicy::FailClosed => {
                        return Err(progress.fail(SubmissionError::Gateway(e.to_string()), input))
                    }
                    FailurePolicy::FailOpen => {
                        warn!(task = kind.as_str(), error = %e, "AI drafting failed; storing placeholder.");
                        (placeholder_outputs(spec, &e), true)
                    }
                },
            },
        };
        progress.advance(SubmissionState::Drafted);

        // Drafted → Persisted
        let today = Utc::now().date_naive();
        let new_record = assemble(kind, &fields, &generated, today);
        match self.persist(owner, target, new_record).await {
            Ok(record) => {
                progress.advance(SubmissionState::Persisted);
                info!(task = kind.as_str(), %owner, record_id = record.id(), degraded, "Submission persisted.");
                Ok(Accepted { record, degraded })
            }
            Err(e) => {
                if fresh_draft && !degraded {
                    error!(
                        task = kind.as_str(),
                        %owner,
                        draft_discarded = true,
                        "Generated draft lost: the record could not be written after a successful AI call."
                    );
                }
                Err(progress.fail(SubmissionError::Storage(e), input))
            }
        }
    }

    /// Creates or updates a patient. Patients have no AI step.
    pub async fn save_patient(
        &self,
        owner: Uuid,
        target: Target,
        input: RawFields,
    ) -> Result<Patient, Rejected> {
        let mut progress = Progress::received(PATIENT_FIELDS.entity, owner);
        let fields = match validate(&input, &PATIENT_FIELDS) {
            Ok(fields) => fields,
            Err(errors) => return Err(progress.fail(SubmissionError::Validation(errors), input)),
        };
        progress.advance(SubmissionState::Validated);

        let patient = NewPatient {
            full_name: text(&fields, "nome_completo"),
            birth_date: fields.date("data_nascimento"),
            emergency_contact: optional_text(&fields, "contato_emergencia"),
        };
        let result = match target {
            Target::Create => self.store.create_patient(owner, patient).await,
            Target::Update(id) => self.store.update_patient(owner, id, patient).await,
        };
        match result {
            Ok(patient) => {
                progress.advance(SubmissionState::Persisted);
                info!(%owner, patient_id = patient.id, "Patient saved.");
                Ok(patient)
            }
            Err(PortError::Conflict(_)) => Err(progress.fail(
                SubmissionError::Validation(ValidationErrors::single(
                    "nome_completo",
                    DUPLICATE_PATIENT_MESSAGE,
                )),
                input,
            )),
            Err(PortError::NotFound(detail)) => {
                Err(progress.fail(SubmissionError::NotFound(detail), input))
            }
            Err(e) => Err(progress.fail(SubmissionError::Storage(e), input)),
        }
    }

    /// Validates the input and checks that every referenced patient belongs to `owner`.
    async fn validated(
        &self,
        owner: Uuid,
        spec: &TaskSpec,
        input: &RawFields,
    ) -> Result<ValidatedFields, SubmissionError> {
        let fields = validate(input, &spec.descriptor).map_err(SubmissionError::Validation)?;

        let mut errors = ValidationErrors::default();
        for rule in spec.descriptor.fields {
            if rule.shape != FieldShape::Reference {
                continue;
            }
            let Some(patient_id) = fields.reference(rule.name) else {
                continue;
            };
            match self.store.get_patient(owner, patient_id).await {
                Ok(_) => {}
                Err(PortError::NotFound(_)) => errors.add(rule.name, UNKNOWN_PATIENT_MESSAGE),
                Err(e) => return Err(SubmissionError::Storage(e)),
            }
        }
        if errors.is_empty() {
            Ok(fields)
        } else {
            Err(SubmissionError::Validation(errors))
        }
    }

    async fn load(&self, owner: Uuid, kind: TaskKind, id: RecordId) -> Result<Record, SubmissionError> {
        let result = match kind {
            TaskKind::PlanFeedback => self.store.get_treatment_plan(owner, id).await.map(Record::TreatmentPlan),
            TaskKind::SessionSummary => self.store.get_session_note(owner, id).await.map(Record::SessionNote),
            TaskKind::ExerciseGeneration => self.store.get_exercise(owner, id).await.map(Record::Exercise),
            TaskKind::EducationalContent => self
                .store
                .get_educational_content(owner, id)
                .await
                .map(Record::EducationalContent),
        };
        result.map_err(|e| match e {
            PortError::NotFound(detail) => SubmissionError::NotFound(detail),
            other => SubmissionError::Storage(other),
        })
    }

    async fn persist(&self, owner: Uuid, target: Target, record: NewRecord) -> Result<Record, PortError> {
        let store = &self.store;
        match (target, record) {
            (Target::Create, NewRecord::TreatmentPlan(plan)) => {
                store.create_treatment_plan(owner, plan).await.map(Record::TreatmentPlan)
            }
            (Target::Update(id), NewRecord::TreatmentPlan(plan)) => {
                store.update_treatment_plan(owner, id, plan).await.map(Record::TreatmentPlan)
            }
            (Target::Create, NewRecord::SessionNote(note)) => {
                store.create_session_note(owner, note).await.map(Record::SessionNote)
            }
            (Target::Update(id), NewRecord::SessionNote(note)) => {
                store.update_session_note(owner, id, note).await.map(Record::SessionNote)
            }
            (Target::Create, NewRecord::Exercise(exercise)) => {
                store.create_exercise(owner, exercise).await.map(Record::Exercise)
            }
            (Target::Update(id), NewRecord::Exercise(exercise)) => {
                store.update_exercise(owner, id, exercise).await.map(Record::Exercise)
            }
            (Target::Create, NewRecord::EducationalContent(content)) => store
                .create_educational_content(owner, content)
                .await
                .map(Record::EducationalContent),
            (Target::Update(id), NewRecord::EducationalContent(content)) => store
                .update_educational_content(owner, id, content)
                .await
                .map(Record::EducationalContent),
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// AI output already stored on a record, unless it is a fail-open placeholder.
fn existing_outputs(record: &Record) -> Option<GeneratedFields> {
    let outputs: GeneratedFields = match record {
        Record::TreatmentPlan(plan) => {
            GeneratedFields::from([("feedback_ia", plan.ai_feedback.clone()?)])
        }
        Record::SessionNote(note) => {
            let insights = note.insights.as_ref()?;
            GeneratedFields::from([
                ("resumo_ia", insights.summary.clone()),
                ("sugestao_diagnostico", insights.diagnosis_suggestion.clone()),
                ("padroes_linguagem", insights.language_patterns.clone()),
            ])
        }
        Record::Exercise(exercise) => {
            GeneratedFields::from([("exercicio_ia", exercise.exercise_text.clone()?)])
        }
        Record::EducationalContent(content) => {
            let generated = content.generated.as_ref()?;
            GeneratedFields::from([
                ("conteudo_gerado", generated.body.clone()),
                ("sugestoes_titulos", generated.title_suggestions.clone()),
                ("hashtags", generated.hashtags.clone()),
                ("sugestoes_imagens", generated.image_suggestions.clone()),
            ])
        }
    };
    let is_placeholder = outputs
        .values()
        .any(|text| text.starts_with(PLACEHOLDER_PREFIX));
    (!is_placeholder).then_some(outputs)
}

/// The placeholder goes into the primary output field; the others are left
/// empty so the output set is still written as a whole.
fn placeholder_outputs(spec: &TaskSpec, error: &GatewayError) -> GeneratedFields {
    spec.response
        .output_fields()
        .iter()
        .enumerate()
        .map(|(position, field)| {
            let text = if position == 0 {
                format!("{PLACEHOLDER_PREFIX}: {error}")
            } else {
                String::new()
            };
            (*field, text)
        })
        .collect()
}

fn text(fields: &ValidatedFields, name: &str) -> String {
    fields.text(name).unwrap_or_default().to_string()
}

fn optional_text(fields: &ValidatedFields, name: &str) -> Option<String> {
    fields.text(name).map(str::to_string)
}

fn output(generated: &GeneratedFields, name: &str) -> Option<String> {
    generated.get(name).cloned()
}

/// Builds the typed record from validated fields and drafted output.
fn assemble(
    kind: TaskKind,
    fields: &ValidatedFields,
    generated: &GeneratedFields,
    today: NaiveDate,
) -> NewRecord {
    match kind {
        TaskKind::PlanFeedback => NewRecord::TreatmentPlan(NewTreatmentPlan {
            patient_id: fields.reference("paciente").unwrap_or_default(),
            title: text(fields, "titulo"),
            base_diagnosis: text(fields, "diagnostico_base"),
            treatment_goals: text(fields, "metas_tratamento"),
            approach: optional_text(fields, "abordagem"),
            session_frequency: optional_text(fields, "frequencia_sessoes"),
            planned_start: fields.date("data_inicio_prevista").unwrap_or(today),
            ai_feedback: output(generated, "feedback_ia"),
        }),
        TaskKind::SessionSummary => {
            let insights = match (
                output(generated, "resumo_ia"),
                output(generated, "sugestao_diagnostico"),
                output(generated, "padroes_linguagem"),
            ) {
                (Some(summary), Some(diagnosis_suggestion), Some(language_patterns)) => {
                    Some(SessionInsights { summary, diagnosis_suggestion, language_patterns })
                }
                _ => None,
            };
            NewRecord::SessionNote(NewSessionNote {
                patient_id: fields.reference("paciente"),
                session_date: fields.date("data_sessao").unwrap_or(today),
                raw_notes: text(fields, "anotacoes_brutas"),
                insights,
            })
        }
        TaskKind::ExerciseGeneration => NewRecord::Exercise(NewExercise {
            patient_id: fields.reference("paciente"),
            approach: fields
                .text("abordagem_teorica")
                .and_then(TheoreticalApproach::from_code)
                .unwrap_or(TheoreticalApproach::Other),
            main_theme: text(fields, "tema_principal"),
            personalization: optional_text(fields, "detalhes_personalizacao"),
            exercise_text: output(generated, "exercicio_ia"),
        }),
        TaskKind::EducationalContent => {
            let generated_content = match (
                output(generated, "conteudo_gerado"),
                output(generated, "sugestoes_titulos"),
                output(generated, "hashtags"),
                output(generated, "sugestoes_imagens"),
            ) {
                (Some(body), Some(title_suggestions), Some(hashtags), Some(image_suggestions)) => {
                    Some(GeneratedContent { body, title_suggestions, hashtags, image_suggestions })
                }
                _ => None,
            };
            NewRecord::EducationalContent(NewEducationalContent {
                title: text(fields, "titulo"),
                content_type: fields
                    .text("tipo_conteudo")
                    .and_then(ContentType::from_code)
                    .unwrap_or(ContentType::ClinicText),
                theme: text(fields, "tema"),
                target_audience: optional_text(fields, "publico_alvo"),
                tone_of_voice: fields
                    .text("tom_voz")
                    .unwrap_or(DEFAULT_TONE_OF_VOICE)
                    .to_string(),
                keywords: optional_text(fields, "palavras_chave"),
                generated: generated_content,
            })
        }
    }
}
