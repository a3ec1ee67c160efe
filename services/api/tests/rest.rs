//! Router-level tests: the full axum stack over the in-memory doubles.

use std::sync::Arc;

use api_lib::web::{router, rest::DEGRADED_HEADER, state::AppState};
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use psico_core::gateway::DEFAULT_TIMEOUT;
use psico_core::orchestrator::PLACEHOLDER_PREFIX;
use psico_core::testing::{InMemoryStore, ScriptedGenerator};
use psico_core::{AiGateway, FailurePolicy, Orchestrator, OrchestratorConfig, TaskKind};
use serde_json::{json, Value};
use tower::ServiceExt as _;
use uuid::Uuid;

struct TestApp {
    store: Arc<InMemoryStore>,
    generator: Arc<ScriptedGenerator>,
    state: Arc<AppState>,
}

fn app_with(generator: ScriptedGenerator, configured: bool, config: OrchestratorConfig) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(generator);
    let gateway = if configured {
        AiGateway::new(generator.clone(), DEFAULT_TIMEOUT)
    } else {
        AiGateway::unconfigured()
    };
    let orchestrator = Orchestrator::new(store.clone(), gateway, config);
    TestApp { store, generator, state: Arc::new(AppState::new(orchestrator)) }
}

fn app(generator: ScriptedGenerator) -> TestApp {
    app_with(generator, true, OrchestratorConfig::default())
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    owner: Option<Uuid>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header("x-practitioner-id", owner.to_string());
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router(app.state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, headers, body }
}

async fn create_patient(app: &TestApp, owner: Uuid, name: &str) -> i64 {
    let reply = send(
        app,
        "POST",
        "/patients",
        Some(owner),
        Some(json!({"nome_completo": name, "data_nascimento": "12/08/1990"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["id"].as_i64().unwrap()
}

fn plan_input(patient_id: i64) -> Value {
    json!({
        "paciente": patient_id,
        "titulo": "Plano para ansiedade",
        "diagnostico_base": "F41.1",
        "metas_tratamento": "Reduzir a preocupação excessiva",
        "data_inicio_prevista": "2024-03-01",
    })
}

// ─── Identity and docs ───────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_practitioner_id_are_unauthorized() {
    let app = app(ScriptedGenerator::replying(Vec::<String>::new()));

    let missing = send(&app, "GET", "/patients", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert!(missing.body["error"].is_string());

    let mut builder = Request::builder().method("GET").uri("/plans");
    builder = builder.header("x-practitioner-id", "not-a-uuid");
    let resp = router(app.state.clone())
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn openapi_document_is_served_without_identity() {
    let app = app(ScriptedGenerator::replying(Vec::<String>::new()));

    let reply = send(&app, "GET", "/api-docs/openapi.json", None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["paths"]["/plans"].is_object());
    assert!(reply.body["paths"]["/educational-contents/{id}"].is_object());
}

// ─── Patients ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn patient_crud_round() {
    let app = app(ScriptedGenerator::replying(Vec::<String>::new()));
    let owner = Uuid::new_v4();
    let id = create_patient(&app, owner, "Maria Souza").await;

    let detail = send(&app, "GET", &format!("/patients/{id}"), Some(owner), None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["nome_completo"], "Maria Souza");
    assert_eq!(detail.body["data_nascimento"], "1990-08-12");
    assert!(detail.body.get("owner_id").is_none());

    let updated = send(
        &app,
        "PUT",
        &format!("/patients/{id}"),
        Some(owner),
        Some(json!({"nome_completo": "Maria S. Souza", "contato_emergencia": "Ana"})),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["contato_emergencia"], "Ana");

    let deleted = send(&app, "DELETE", &format!("/patients/{id}"), Some(owner), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let list = send(&app, "GET", "/patients", Some(owner), None).await;
    assert_eq!(list.body, json!([]));
}

#[tokio::test]
async fn duplicate_patient_name_is_a_field_error() {
    let app = app(ScriptedGenerator::replying(Vec::<String>::new()));
    let owner = Uuid::new_v4();
    create_patient(&app, owner, "João Lima").await;

    let reply = send(
        &app,
        "POST",
        "/patients",
        Some(owner),
        Some(json!({"nome_completo": "João Lima"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body["fields"]["nome_completo"].is_array());
    assert_eq!(reply.body["input"]["nome_completo"], "João Lima");

    // The same name under another practitioner is fine.
    create_patient(&app, Uuid::new_v4(), "João Lima").await;
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn plan_is_stored_with_feedback_and_listed_by_patient() {
    let app = app(ScriptedGenerator::replying(["Metas claras e mensuráveis."]));
    let owner = Uuid::new_v4();
    let patient = create_patient(&app, owner, "Carla Dias").await;
    let other = create_patient(&app, owner, "Pedro Alves").await;

    let created = send(&app, "POST", "/plans", Some(owner), Some(plan_input(patient))).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["feedback_ia"], "Metas claras e mensuráveis.");
    assert_eq!(created.body["paciente"], patient);
    assert!(created.headers.get(DEGRADED_HEADER).is_none());

    let mine = send(&app, "GET", &format!("/plans?paciente={patient}"), Some(owner), None).await;
    assert_eq!(mine.body.as_array().map(Vec::len), Some(1));

    let theirs = send(&app, "GET", &format!("/plans?paciente={other}"), Some(owner), None).await;
    assert_eq!(theirs.body, json!([]));

    // A non-numeric filter is ignored.
    let all = send(&app, "GET", "/plans?paciente=abc", Some(owner), None).await;
    assert_eq!(all.body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn invalid_submission_echoes_input_and_names_fields() {
    let app = app(ScriptedGenerator::replying(["unused"]));
    let owner = Uuid::new_v4();

    let reply = send(
        &app,
        "POST",
        "/plans",
        Some(owner),
        Some(json!({"titulo": "Sem paciente", "paciente": "abc"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["stage"], "received");
    assert!(reply.body["fields"]["paciente"].is_array());
    assert!(reply.body["fields"]["data_inicio_prevista"].is_array());
    assert!(reply.body["fields"].get("titulo").is_none());
    assert_eq!(reply.body["input"]["titulo"], "Sem paciente");
    assert_eq!(app.generator.call_count(), 0);
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn unconfigured_assistant_is_service_unavailable() {
    let app = app_with(
        ScriptedGenerator::replying(Vec::<String>::new()),
        false,
        OrchestratorConfig::default().with_policy(TaskKind::ExerciseGeneration, FailurePolicy::FailOpen),
    );
    let owner = Uuid::new_v4();

    let reply = send(
        &app,
        "POST",
        "/exercises",
        Some(owner),
        Some(json!({"abordagem_teorica": "TCC", "tema_principal": "Ansiedade"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.body["input"]["tema_principal"], "Ansiedade");
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn failed_ai_call_is_bad_gateway_when_fail_closed() {
    let app = app(ScriptedGenerator::failing("connection refused"));
    let owner = Uuid::new_v4();

    let reply = send(
        &app,
        "POST",
        "/session-notes",
        Some(owner),
        Some(json!({"anotacoes_brutas": "Relato de insônia."})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert_eq!(reply.body["stage"], "validated");
    assert_eq!(reply.body["input"]["anotacoes_brutas"], "Relato de insônia.");
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn fail_open_kind_stores_placeholder_and_flags_response() {
    let app = app_with(
        ScriptedGenerator::failing("connection refused"),
        true,
        OrchestratorConfig::default().with_policy(TaskKind::ExerciseGeneration, FailurePolicy::FailOpen),
    );
    let owner = Uuid::new_v4();

    let reply = send(
        &app,
        "POST",
        "/exercises",
        Some(owner),
        Some(json!({"abordagem_teorica": "HUMANISTA", "tema_principal": "Luto"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(
        reply.headers.get(DEGRADED_HEADER).and_then(|v| v.to_str().ok()),
        Some("true")
    );
    let text = reply.body["exercicio_ia"].as_str().unwrap();
    assert!(text.starts_with(PLACEHOLDER_PREFIX), "{text}");
}

#[tokio::test]
async fn session_note_carries_all_three_insights() {
    let reply_json = json!({
        "resumo_ia": "Paciente relata insônia.",
        "sugestao_diagnostico": "Investigar ansiedade.",
        "padroes_linguagem": ["autocrítica", "catastrofização"],
    });
    let app = app(ScriptedGenerator::replying([reply_json.to_string()]));
    let owner = Uuid::new_v4();

    let reply = send(
        &app,
        "POST",
        "/session-notes",
        Some(owner),
        Some(json!({"anotacoes_brutas": "Relato de insônia.", "data_sessao": "2024-05-02"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["resumo_ia"], "Paciente relata insônia.");
    assert_eq!(reply.body["padroes_linguagem"], "autocrítica, catastrofização");
    assert_eq!(reply.body["data_sessao"], "2024-05-02");
    assert!(app.generator.requests()[0].structured);
}

#[tokio::test]
async fn educational_content_resubmission_keeps_the_draft() {
    let reply_json = json!({
        "conteudo_gerado": "Texto do post.",
        "sugestoes_titulos": ["Respire", "Pausa"],
        "hashtags": "#ansiedade",
        "sugestoes_imagens": "Pessoa respirando ao ar livre",
    });
    let app = app(ScriptedGenerator::replying([reply_json.to_string()]));
    let owner = Uuid::new_v4();
    let input = json!({"titulo": "Respirar", "tipo_conteudo": "POST_SOCIAL", "tema": "Ansiedade"});

    let created = send(&app, "POST", "/educational-contents", Some(owner), Some(input)).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["tom_voz"], "profissional e acolhedor");
    assert_eq!(created.body["sugestoes_titulos"], "Respire, Pausa");
    let id = created.body["id"].as_i64().unwrap();

    let updated = send(
        &app,
        "PUT",
        &format!("/educational-contents/{id}"),
        Some(owner),
        Some(json!({"titulo": "Respirar melhor", "tipo_conteudo": "POST_SOCIAL", "tema": "Ansiedade"})),
    )
    .await;

    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["titulo"], "Respirar melhor");
    assert_eq!(updated.body["conteudo_gerado"], "Texto do post.");
    assert_eq!(app.generator.call_count(), 1);
}

#[tokio::test]
async fn storage_failure_is_internal_error_with_input() {
    let app = app(ScriptedGenerator::replying(["Exercício de respiração."]));
    app.store.fail_writes(true);
    let owner = Uuid::new_v4();

    let reply = send(
        &app,
        "POST",
        "/exercises",
        Some(owner),
        Some(json!({"abordagem_teorica": "TCC", "tema_principal": "Ansiedade"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["stage"], "drafted");
    assert_eq!(reply.body["input"]["tema_principal"], "Ansiedade");
    assert_eq!(app.generator.call_count(), 1);
}

// ─── Ownership ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn records_of_other_practitioners_are_not_found() {
    let app = app(ScriptedGenerator::replying(["Feedback."]));
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let patient = create_patient(&app, owner, "Lia Rocha").await;
    let created = send(&app, "POST", "/plans", Some(owner), Some(plan_input(patient))).await;
    let plan_id = created.body["id"].as_i64().unwrap();

    let peek = send(&app, "GET", &format!("/plans/{plan_id}"), Some(stranger), None).await;
    assert_eq!(peek.status, StatusCode::NOT_FOUND);

    let delete = send(&app, "DELETE", &format!("/plans/{plan_id}"), Some(stranger), None).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    // Using someone else's patient is a field error, and nothing is drafted.
    let misuse = send(&app, "POST", "/plans", Some(stranger), Some(plan_input(patient))).await;
    assert_eq!(misuse.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(misuse.body["fields"]["paciente"].is_array());
    assert_eq!(app.generator.call_count(), 1);
}

#[tokio::test]
async fn deleting_a_patient_removes_its_plans() {
    let app = app(ScriptedGenerator::replying(["Feedback."]));
    let owner = Uuid::new_v4();
    let patient = create_patient(&app, owner, "Rui Melo").await;
    let created = send(&app, "POST", "/plans", Some(owner), Some(plan_input(patient))).await;
    let plan_id = created.body["id"].as_i64().unwrap();

    let deleted = send(&app, "DELETE", &format!("/patients/{patient}"), Some(owner), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let plan = send(&app, "GET", &format!("/plans/{plan_id}"), Some(owner), None).await;
    assert_eq!(plan.status, StatusCode::NOT_FOUND);
}
