//! End-to-end submission scenarios against the in-memory doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use uuid::Uuid;

use crate::domain::{
    ContentType, EducationalContent, NewPatient, Record, RecordId, SessionNote, TheoreticalApproach,
};
use crate::gateway::{AiGateway, DEFAULT_TIMEOUT};
use crate::orchestrator::{
    Orchestrator, OrchestratorConfig, SubmissionError, SubmissionState, Target, PLACEHOLDER_PREFIX,
};
use crate::ports::{ListFilter, PortError, RecordStore};
use crate::tasks::{FailurePolicy, TaskKind};
use crate::testing::{InMemoryStore, ScriptedGenerator};
use crate::validation::{RawFields, REQUIRED_MESSAGE};

struct Harness {
    store: Arc<InMemoryStore>,
    generator: Arc<ScriptedGenerator>,
    orchestrator: Orchestrator,
}

fn harness_with(generator: ScriptedGenerator, config: OrchestratorConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(generator);
    let gateway = AiGateway::new(generator.clone(), DEFAULT_TIMEOUT);
    let orchestrator = Orchestrator::new(store.clone(), gateway, config);
    Harness { store, generator, orchestrator }
}

fn harness(generator: ScriptedGenerator) -> Harness {
    harness_with(generator, OrchestratorConfig::default())
}

fn raw(value: Value) -> RawFields {
    value.as_object().cloned().expect("test input must be an object")
}

async fn register_patient(store: &InMemoryStore, owner: Uuid, name: &str) -> RecordId {
    store
        .create_patient(
            owner,
            NewPatient { full_name: name.into(), birth_date: None, emergency_contact: None },
        )
        .await
        .unwrap()
        .id
}

fn valid_input(kind: TaskKind, patient_id: RecordId) -> RawFields {
    match kind {
        TaskKind::PlanFeedback => raw(json!({
            "paciente": patient_id.to_string(),
            "titulo": "Plano para ansiedade",
            "diagnostico_base": "F41.1 - Ansiedade generalizada",
            "metas_tratamento": "Reduzir a preocupação excessiva",
            "data_inicio_prevista": "2024-03-01",
        })),
        TaskKind::SessionSummary => raw(json!({"anotacoes_brutas": "Paciente relatou insônia."})),
        TaskKind::ExerciseGeneration => {
            raw(json!({"abordagem_teorica": "TCC", "tema_principal": "Ansiedade"}))
        }
        TaskKind::EducationalContent => raw(json!({
            "titulo": "Cuidando da ansiedade",
            "tipo_conteudo": "POST_SOCIAL",
            "tema": "Ansiedade no trabalho",
        })),
    }
}

fn expected_required(kind: TaskKind) -> Vec<&'static str> {
    match kind {
        TaskKind::PlanFeedback => vec![
            "data_inicio_prevista",
            "diagnostico_base",
            "metas_tratamento",
            "paciente",
            "titulo",
        ],
        TaskKind::SessionSummary => vec!["anotacoes_brutas"],
        TaskKind::ExerciseGeneration => vec!["abordagem_teorica", "tema_principal"],
        TaskKind::EducationalContent => vec!["tema", "tipo_conteudo", "titulo"],
    }
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_required_fields_are_named_without_side_effects() {
    for kind in TaskKind::ALL {
        let h = harness(ScriptedGenerator::replying(["unused"]));
        let owner = Uuid::new_v4();

        let rejected = h
            .orchestrator
            .submit(owner, kind, Target::Create, raw(json!({"feedback_ia": "injected"})))
            .await
            .unwrap_err();

        match &rejected.error {
            SubmissionError::Validation(errors) => {
                assert_eq!(errors.fields(), expected_required(kind), "{kind}")
            }
            other => panic!("{kind}: unexpected error {other:?}"),
        }
        assert_eq!(rejected.failed_in, SubmissionState::Received);
        assert_eq!(rejected.input.get("feedback_ia"), Some(&json!("injected")));
        assert_eq!(h.generator.call_count(), 0, "{kind}");
        assert_eq!(h.store.write_count(), 0, "{kind}");
    }
}

#[tokio::test]
async fn non_numeric_patient_reference_is_cleared_then_rechecked() {
    let h = harness(ScriptedGenerator::replying(["Exercício", "unused"]));
    let owner = Uuid::new_v4();

    // Optional reference: cleared and accepted.
    let mut exercise = valid_input(TaskKind::ExerciseGeneration, 0);
    exercise.insert("paciente".into(), json!("abc"));
    let accepted = h
        .orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, exercise)
        .await
        .unwrap();
    match accepted.record {
        Record::Exercise(exercise) => assert_eq!(exercise.patient_id, None),
        other => panic!("unexpected record {other:?}"),
    }

    // Required reference: cleared, then reported as missing.
    let mut plan = valid_input(TaskKind::PlanFeedback, 0);
    plan.insert("paciente".into(), json!("abc"));
    let rejected = h
        .orchestrator
        .submit(owner, TaskKind::PlanFeedback, Target::Create, plan)
        .await
        .unwrap_err();
    match rejected.error {
        SubmissionError::Validation(errors) => {
            assert_eq!(errors.fields(), vec!["paciente"]);
            assert_eq!(errors.messages("paciente"), [REQUIRED_MESSAGE.to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(h.generator.call_count(), 1);
}

#[tokio::test]
async fn patient_of_another_practitioner_is_rejected_before_drafting() {
    let h = harness(ScriptedGenerator::replying(["unused"]));
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let foreign_patient = register_patient(&h.store, stranger, "Maria Souza").await;

    let rejected = h
        .orchestrator
        .submit(owner, TaskKind::PlanFeedback, Target::Create, valid_input(TaskKind::PlanFeedback, foreign_patient))
        .await
        .unwrap_err();

    match rejected.error {
        SubmissionError::Validation(errors) => assert_eq!(errors.fields(), vec!["paciente"]),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(h.generator.call_count(), 0);
}

// ─── Gateway failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn unconfigured_gateway_blocks_every_kind() {
    for kind in TaskKind::ALL {
        let store = Arc::new(InMemoryStore::new());
        let owner = Uuid::new_v4();
        let patient_id = register_patient(&store, owner, "Ana Lima").await;
        let writes_before = store.write_count();
        let orchestrator = Orchestrator::new(
            store.clone(),
            AiGateway::unconfigured(),
            OrchestratorConfig::default().with_policy(kind, FailurePolicy::FailOpen),
        );

        let rejected = orchestrator
            .submit(owner, kind, Target::Create, valid_input(kind, patient_id))
            .await
            .unwrap_err();

        assert!(
            matches!(rejected.error, SubmissionError::Configuration(_)),
            "{kind}: {:?}",
            rejected.error
        );
        assert_eq!(rejected.failed_in, SubmissionState::Validated);
        assert_eq!(store.write_count(), writes_before, "{kind}");
    }
}

#[tokio::test]
async fn structured_reply_missing_a_key_creates_nothing() {
    let h = harness(ScriptedGenerator::replying([
        r#"{"resumo_ia":"x","sugestao_diagnostico":"y"}"#,
    ]));
    let owner = Uuid::new_v4();

    let rejected = h
        .orchestrator
        .submit(owner, TaskKind::SessionSummary, Target::Create, valid_input(TaskKind::SessionSummary, 0))
        .await
        .unwrap_err();

    match rejected.error {
        SubmissionError::Gateway(detail) => assert!(detail.contains("padroes_linguagem")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(h.store.write_count(), 0);
    assert!(h
        .store
        .list_session_notes(owner, ListFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn scenario_c_unreachable_gateway_discards_exercise() {
    let h = harness(ScriptedGenerator::failing("connection refused"));
    let owner = Uuid::new_v4();
    let input = raw(json!({"abordagem_teorica": "TCC", "tema_principal": "Ansiedade"}));

    let rejected = h
        .orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, input.clone())
        .await
        .unwrap_err();

    match &rejected.error {
        SubmissionError::Gateway(detail) => assert!(detail.contains("connection refused")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(rejected.input, input);
    assert_eq!(h.generator.call_count(), 1);
    assert_eq!(h.store.write_count(), 0);
    assert!(h
        .store
        .list_exercises(owner, ListFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn fail_open_kind_persists_a_placeholder() {
    let h = harness_with(
        ScriptedGenerator::failing("rate limited"),
        OrchestratorConfig::default().with_policy(TaskKind::SessionSummary, FailurePolicy::FailOpen),
    );
    let owner = Uuid::new_v4();

    let accepted = h
        .orchestrator
        .submit(owner, TaskKind::SessionSummary, Target::Create, valid_input(TaskKind::SessionSummary, 0))
        .await
        .unwrap();

    assert!(accepted.degraded);
    match accepted.record {
        Record::SessionNote(note) => {
            let insights = note.insights.expect("placeholder insights");
            assert!(insights.summary.starts_with(PLACEHOLDER_PREFIX));
            assert!(insights.summary.contains("rate limited"));
            assert_eq!(insights.diagnosis_suggestion, "");
            assert_eq!(insights.language_patterns, "");
        }
        other => panic!("unexpected record {other:?}"),
    }
}

// ─── Storage failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn storage_failure_after_drafting_is_reported_as_storage_error() {
    let h = harness(ScriptedGenerator::replying(["Exercício pronto"]));
    let owner = Uuid::new_v4();
    h.store.fail_writes(true);

    let rejected = h
        .orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, valid_input(TaskKind::ExerciseGeneration, 0))
        .await
        .unwrap_err();

    assert!(matches!(rejected.error, SubmissionError::Storage(PortError::Unexpected(_))));
    assert_eq!(rejected.failed_in, SubmissionState::Drafted);
    assert_eq!(h.generator.call_count(), 1);
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_plan_feedback_is_stored_for_its_owner_only() {
    let h = harness(ScriptedGenerator::replying(["O plano é coerente com o diagnóstico."]));
    let owner = Uuid::new_v4();
    let patient_id = register_patient(&h.store, owner, "João Pereira").await;

    let mut input = valid_input(TaskKind::PlanFeedback, patient_id);
    input.insert("data_criacao".into(), json!("1999-01-01T00:00:00Z"));
    let accepted = h
        .orchestrator
        .submit(owner, TaskKind::PlanFeedback, Target::Create, input)
        .await
        .unwrap();

    let plan = match accepted.record {
        Record::TreatmentPlan(plan) => plan,
        other => panic!("unexpected record {other:?}"),
    };
    assert_eq!(plan.ai_feedback.as_deref(), Some("O plano é coerente com o diagnóstico."));
    assert_eq!(plan.patient_id, patient_id);
    assert!(plan.created_at > chrono::Utc::now() - chrono::Duration::minutes(1));
    assert!(!accepted.degraded);

    let fetched = h.store.get_treatment_plan(owner, plan.id).await.unwrap();
    assert_eq!(fetched, plan);
    let stranger = h.store.get_treatment_plan(Uuid::new_v4(), plan.id).await;
    assert!(matches!(stranger, Err(PortError::NotFound(_))));
}

#[tokio::test]
async fn scenario_b_session_insights_are_stored_exactly() {
    let h = harness(ScriptedGenerator::replying([
        r#"{"resumo_ia":"x","sugestao_diagnostico":"y","padroes_linguagem":"z"}"#,
    ]));
    let owner = Uuid::new_v4();

    let accepted = h
        .orchestrator
        .submit(owner, TaskKind::SessionSummary, Target::Create, valid_input(TaskKind::SessionSummary, 0))
        .await
        .unwrap();

    let note = match accepted.record {
        Record::SessionNote(note) => note,
        other => panic!("unexpected record {other:?}"),
    };
    let insights = note.insights.expect("insights stored");
    assert_eq!(insights.summary, "x");
    assert_eq!(insights.diagnosis_suggestion, "y");
    assert_eq!(insights.language_patterns, "z");
    assert_eq!(note.session_date, chrono::Utc::now().date_naive());
    assert_eq!(note.patient_id, None);
}

#[tokio::test]
async fn scenario_d_title_suggestions_are_comma_joined_in_order() {
    let h = harness(ScriptedGenerator::replying([json!({
        "conteudo_gerado": "Texto completo",
        "sugestoes_titulos": ["Primeiro", "Segundo", "Terceiro"],
        "hashtags": ["#ansiedade", "#saudemental"],
        "sugestoes_imagens": ["Pessoa respirando", "Natureza"],
    })
    .to_string()]));
    let owner = Uuid::new_v4();

    let accepted = h
        .orchestrator
        .submit(owner, TaskKind::EducationalContent, Target::Create, valid_input(TaskKind::EducationalContent, 0))
        .await
        .unwrap();

    let content = match accepted.record {
        Record::EducationalContent(content) => content,
        other => panic!("unexpected record {other:?}"),
    };
    assert_eq!(content.tone_of_voice, "profissional e acolhedor");
    let generated = content.generated.expect("generated content");
    assert_eq!(generated.title_suggestions, "Primeiro, Segundo, Terceiro");
    assert_eq!(generated.hashtags, "#ansiedade, #saudemental");
    assert_eq!(generated.body, "Texto completo");
}

#[tokio::test]
async fn corrected_resubmission_stores_exactly_one_record() {
    let h = harness(ScriptedGenerator::replying(["Exercício de respiração"]));
    let owner = Uuid::new_v4();

    let rejected = h
        .orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, raw(json!({"abordagem_teorica": "TCC"})))
        .await
        .unwrap_err();

    let mut corrected = rejected.input;
    corrected.insert("tema_principal".into(), json!("Ansiedade"));
    h.orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, corrected)
        .await
        .unwrap();

    let exercises = h.store.list_exercises(owner, ListFilter::default()).await.unwrap();
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0].approach, TheoreticalApproach::Cbt);
    assert_eq!(exercises[0].exercise_text.as_deref(), Some("Exercício de respiração"));
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn updating_a_plan_keeps_its_feedback_without_a_new_call() {
    let h = harness(ScriptedGenerator::replying(["Feedback original"]));
    let owner = Uuid::new_v4();
    let patient_id = register_patient(&h.store, owner, "Clara Dias").await;

    let created = h
        .orchestrator
        .submit(owner, TaskKind::PlanFeedback, Target::Create, valid_input(TaskKind::PlanFeedback, patient_id))
        .await
        .unwrap()
        .record;

    let mut edited = valid_input(TaskKind::PlanFeedback, patient_id);
    edited.insert("titulo".into(), json!("Plano revisado"));
    edited.insert("feedback_ia".into(), json!("forjado pelo cliente"));
    let updated = h
        .orchestrator
        .submit(owner, TaskKind::PlanFeedback, Target::Update(created.id()), edited)
        .await
        .unwrap()
        .record;

    match updated {
        Record::TreatmentPlan(plan) => {
            assert_eq!(plan.id, created.id());
            assert_eq!(plan.title, "Plano revisado");
            assert_eq!(plan.ai_feedback.as_deref(), Some("Feedback original"));
        }
        other => panic!("unexpected record {other:?}"),
    }
    assert_eq!(h.generator.call_count(), 1);
}

#[tokio::test]
async fn updating_a_missing_record_is_not_found() {
    let h = harness(ScriptedGenerator::replying(["unused"]));

    let rejected = h
        .orchestrator
        .submit(
            Uuid::new_v4(),
            TaskKind::EducationalContent,
            Target::Update(404),
            valid_input(TaskKind::EducationalContent, 0),
        )
        .await
        .unwrap_err();

    assert!(matches!(rejected.error, SubmissionError::NotFound(_)));
    assert_eq!(h.generator.call_count(), 0);
}

// ─── Patients ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn patient_names_are_unique_per_practitioner() {
    let h = harness(ScriptedGenerator::replying(Vec::<String>::new()));
    let owner = Uuid::new_v4();
    let input = raw(json!({"nome_completo": "Paula Ramos", "data_nascimento": "12/08/1990"}));

    let patient = h.orchestrator.save_patient(owner, Target::Create, input.clone()).await.unwrap();
    assert_eq!(patient.birth_date, chrono::NaiveDate::from_ymd_opt(1990, 8, 12));

    let duplicate = h.orchestrator.save_patient(owner, Target::Create, input.clone()).await.unwrap_err();
    match duplicate.error {
        SubmissionError::Validation(errors) => assert_eq!(errors.fields(), vec!["nome_completo"]),
        other => panic!("unexpected error {other:?}"),
    }

    // Another practitioner may register the same name.
    h.orchestrator.save_patient(Uuid::new_v4(), Target::Create, input).await.unwrap();
}

#[tokio::test]
async fn deleting_a_patient_cascades_to_its_records() {
    let h = harness(ScriptedGenerator::replying(["Feedback", "Exercício"]));
    let owner = Uuid::new_v4();
    let patient_id = register_patient(&h.store, owner, "Rui Alves").await;

    h.orchestrator
        .submit(owner, TaskKind::PlanFeedback, Target::Create, valid_input(TaskKind::PlanFeedback, patient_id))
        .await
        .unwrap();
    let mut exercise = valid_input(TaskKind::ExerciseGeneration, patient_id);
    exercise.insert("paciente".into(), json!(patient_id));
    h.orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, exercise)
        .await
        .unwrap();

    h.store.delete_patient(owner, patient_id).await.unwrap();

    assert!(h.store.list_treatment_plans(owner, ListFilter::default()).await.unwrap().is_empty());
    assert!(h.store.list_exercises(owner, ListFilter::default()).await.unwrap().is_empty());
}

// ─── Discarded drafts ────────────────────────────────────────────────────────

/// Counts events carrying a `draft_discarded` field.
#[derive(Clone, Default)]
struct DiscardedDrafts(Arc<AtomicUsize>);

impl DiscardedDrafts {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> Layer<S> for DiscardedDrafts {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().fields().field("draft_discarded").is_some() {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn capture_discarded_drafts() -> (DiscardedDrafts, tracing::subscriber::DefaultGuard) {
    let drafts = DiscardedDrafts::default();
    let subscriber = tracing_subscriber::registry().with(drafts.clone());
    (drafts, tracing::subscriber::set_default(subscriber))
}

#[tokio::test]
async fn lost_fresh_draft_is_logged_as_discarded() {
    let (drafts, _guard) = capture_discarded_drafts();
    let h = harness(ScriptedGenerator::replying(["Exercício pronto"]));
    h.store.fail_writes(true);

    let rejected = h
        .orchestrator
        .submit(Uuid::new_v4(), TaskKind::ExerciseGeneration, Target::Create, valid_input(TaskKind::ExerciseGeneration, 0))
        .await
        .unwrap_err();

    assert!(matches!(rejected.error, SubmissionError::Storage(_)));
    assert_eq!(drafts.count(), 1);
}

#[tokio::test]
async fn lost_placeholder_is_not_logged_as_discarded_draft() {
    let (drafts, _guard) = capture_discarded_drafts();
    let h = harness_with(
        ScriptedGenerator::failing("rate limited"),
        OrchestratorConfig::default().with_policy(TaskKind::ExerciseGeneration, FailurePolicy::FailOpen),
    );
    h.store.fail_writes(true);

    let rejected = h
        .orchestrator
        .submit(Uuid::new_v4(), TaskKind::ExerciseGeneration, Target::Create, valid_input(TaskKind::ExerciseGeneration, 0))
        .await
        .unwrap_err();

    assert!(matches!(rejected.error, SubmissionError::Storage(_)));
    assert_eq!(h.generator.call_count(), 1);
    assert_eq!(drafts.count(), 0);
}

#[tokio::test]
async fn lost_update_with_reused_output_is_not_logged_as_discarded_draft() {
    let (drafts, _guard) = capture_discarded_drafts();
    let h = harness(ScriptedGenerator::replying(["Exercício pronto"]));
    let owner = Uuid::new_v4();
    let created = h
        .orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, valid_input(TaskKind::ExerciseGeneration, 0))
        .await
        .unwrap()
        .record;

    h.store.fail_writes(true);
    let rejected = h
        .orchestrator
        .submit(
            owner,
            TaskKind::ExerciseGeneration,
            Target::Update(created.id()),
            valid_input(TaskKind::ExerciseGeneration, 0),
        )
        .await
        .unwrap_err();

    assert!(matches!(rejected.error, SubmissionError::Storage(_)));
    assert_eq!(h.generator.call_count(), 1);
    assert_eq!(drafts.count(), 0);
}

// ─── Resubmitting placeholders and AI-derived records ───────────────────────

#[tokio::test]
async fn stored_placeholder_is_drafted_again_on_resubmission() {
    let h = harness_with(
        ScriptedGenerator::failing("service overloaded"),
        OrchestratorConfig::default().with_policy(TaskKind::ExerciseGeneration, FailurePolicy::FailOpen),
    );
    let owner = Uuid::new_v4();
    let input = valid_input(TaskKind::ExerciseGeneration, 0);

    let created = h
        .orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Create, input.clone())
        .await
        .unwrap();
    assert!(created.degraded);
    let id = created.record.id();

    // Still failing: a second call is made and the placeholder stays.
    let retried = h
        .orchestrator
        .submit(owner, TaskKind::ExerciseGeneration, Target::Update(id), input.clone())
        .await
        .unwrap();
    assert!(retried.degraded);
    assert_eq!(h.generator.call_count(), 2);

    // Once the service answers, the draft replaces the placeholder.
    let recovered = Orchestrator::new(
        h.store.clone(),
        AiGateway::new(Arc::new(ScriptedGenerator::replying(["Exercício de respiração"])), DEFAULT_TIMEOUT),
        OrchestratorConfig::default(),
    );
    let accepted = recovered
        .submit(owner, TaskKind::ExerciseGeneration, Target::Update(id), input)
        .await
        .unwrap();
    assert!(!accepted.degraded);
    match accepted.record {
        Record::Exercise(exercise) => {
            assert_eq!(exercise.id, id);
            assert_eq!(exercise.exercise_text.as_deref(), Some("Exercício de respiração"));
        }
        other => panic!("unexpected record {other:?}"),
    }
    assert_eq!(h.store.list_exercises(owner, ListFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn updating_a_session_note_keeps_its_insights() {
    let h = harness(ScriptedGenerator::replying([
        r#"{"resumo_ia":"Resumo","sugestao_diagnostico":"Sugestão","padroes_linguagem":"Padrões"}"#,
    ]));
    let owner = Uuid::new_v4();
    let created = h
        .orchestrator
        .submit(owner, TaskKind::SessionSummary, Target::Create, valid_input(TaskKind::SessionSummary, 0))
        .await
        .unwrap()
        .record;

    let edited = raw(json!({"anotacoes_brutas": "Paciente relatou insônia e cansaço.", "data_sessao": "2024-04-10"}));
    let updated = h
        .orchestrator
        .submit(owner, TaskKind::SessionSummary, Target::Update(created.id()), edited)
        .await
        .unwrap();

    match updated.record {
        Record::SessionNote(note) => {
            assert_eq!(note.id, created.id());
            assert_eq!(note.raw_notes, "Paciente relatou insônia e cansaço.");
            assert_eq!(note.session_date, chrono::NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
            let insights = note.insights.expect("insights kept");
            assert_eq!(insights.summary, "Resumo");
            assert_eq!(insights.language_patterns, "Padrões");
        }
        other => panic!("unexpected record {other:?}"),
    }
    assert_eq!(h.generator.call_count(), 1);
}

// ─── Wire shape ──────────────────────────────────────────────────────────────

#[test]
fn undrafted_ai_fields_serialize_as_null() {
    let now = chrono::Utc::now();
    let note = SessionNote {
        id: 1,
        owner_id: Uuid::new_v4(),
        patient_id: None,
        session_date: now.date_naive(),
        raw_notes: "x".into(),
        insights: None,
        created_at: now,
    };
    let json = serde_json::to_value(&note).unwrap();
    for key in ["paciente", "resumo_ia", "sugestao_diagnostico", "padroes_linguagem"] {
        assert_eq!(json.get(key), Some(&Value::Null), "{key}");
    }
    assert!(json.get("owner_id").is_none());

    let content = EducationalContent {
        id: 2,
        owner_id: Uuid::new_v4(),
        title: "Título".into(),
        content_type: ContentType::BlogArticle,
        theme: "Tema".into(),
        target_audience: None,
        tone_of_voice: "profissional e acolhedor".into(),
        keywords: None,
        generated: None,
        created_at: now,
        updated_at: now,
    };
    let json = serde_json::to_value(&content).unwrap();
    assert_eq!(json["tipo_conteudo"], "ARTIGO_BLOG");
    for key in ["conteudo_gerado", "sugestoes_titulos", "hashtags", "sugestoes_imagens"] {
        assert_eq!(json.get(key), Some(&Value::Null), "{key}");
    }
}
