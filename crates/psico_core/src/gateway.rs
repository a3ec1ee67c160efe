//! crates/psico_core/src/gateway.rs
//!
//! The AI drafting gateway: builds the prompt of a task, issues exactly one call
//! to the text-generation service and turns the reply into named output fields.
//! There is no retry and no caching.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::ports::{GenerationRequest, TextGenerationService};
use crate::tasks::{ResponseShape, TaskSpec};
use crate::validation::ValidatedFields;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Output field name → generated text.
pub type GeneratedFields = BTreeMap<&'static str, String>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No credential was configured, so no backend exists.
    #[error("text generation is not configured")]
    NotConfigured,
    #[error("text generation call failed: {0}")]
    Unavailable(String),
    #[error("text generation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("malformed text generation response: {0}")]
    Malformed(String),
}

#[derive(Clone)]
pub struct AiGateway {
    backend: Option<Arc<dyn TextGenerationService>>,
    timeout: Duration,
}

impl AiGateway {
    pub fn new(backend: Arc<dyn TextGenerationService>, timeout: Duration) -> Self {
        Self { backend: Some(backend), timeout }
    }

    /// A gateway with no backend. Every draft fails with `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self { backend: None, timeout: DEFAULT_TIMEOUT }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Builds the request for `spec` without sending it.
    pub fn build_request(spec: &TaskSpec, fields: &ValidatedFields) -> GenerationRequest {
        let mut user = spec.prompt.render_user(&spec.descriptor, fields);
        let structured = match spec.response {
            ResponseShape::FreeText { .. } => false,
            ResponseShape::Structured { keys } => {
                user.push_str(&format!(
                    "\n\nResponda com um objeto JSON válido contendo exatamente as chaves: {}.",
                    keys.join(", ")
                ));
                true
            }
        };
        GenerationRequest { system: spec.prompt.system.to_string(), user, structured }
    }

    /// Drafts the AI output of one submission.
    pub async fn draft(
        &self,
        spec: &TaskSpec,
        fields: &ValidatedFields,
    ) -> Result<GeneratedFields, GatewayError> {
        let backend = self.backend.as_ref().ok_or(GatewayError::NotConfigured)?;
        let request = Self::build_request(spec, fields);

        debug!(task = %spec.kind, structured = request.structured, "Requesting AI draft.");
        let reply = tokio::time::timeout(self.timeout, backend.generate(&request))
            .await
            .map_err(|_| GatewayError::TimedOut(self.timeout))?
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        parse_reply(spec.response, &reply).inspect_err(|e| {
            warn!(task = %spec.kind, error = %e, "AI reply rejected.");
        })
    }
}

/// Checks a raw reply against the declared response shape.
pub fn parse_reply(shape: ResponseShape, reply: &str) -> Result<GeneratedFields, GatewayError> {
    match shape {
        ResponseShape::FreeText { field } => {
            let text = reply.trim();
            if text.is_empty() {
                return Err(GatewayError::Malformed("empty reply".to_string()));
            }
            Ok(GeneratedFields::from([(field, text.to_string())]))
        }
        ResponseShape::Structured { keys } => {
            let payload: Value = serde_json::from_str(strip_code_fence(reply))
                .map_err(|e| GatewayError::Malformed(format!("reply is not JSON: {e}")))?;
            let object = payload
                .as_object()
                .ok_or_else(|| GatewayError::Malformed("reply is not a JSON object".to_string()))?;

            let missing: Vec<&str> = keys
                .iter()
                .copied()
                .filter(|key| object.get(*key).map_or(true, Value::is_null))
                .collect();
            if !missing.is_empty() {
                return Err(GatewayError::Malformed(format!(
                    "missing keys: {}",
                    missing.join(", ")
                )));
            }

            Ok(keys
                .iter()
                .map(|key| (*key, flatten_value(&object[*key])))
                .collect())
        }
    }
}

/// Strings are kept verbatim; lists are joined with ", " in their original order.
fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(flatten_value).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskKind;
    use crate::testing::ScriptedGenerator;
    use crate::validation::validate;
    use serde_json::json;

    fn fields(kind: TaskKind, raw: serde_json::Value) -> ValidatedFields {
        validate(raw.as_object().unwrap(), &kind.spec().descriptor).unwrap()
    }

    #[tokio::test]
    async fn unconfigured_gateway_fails_without_io() {
        let gateway = AiGateway::unconfigured();
        let spec = TaskKind::SessionSummary.spec();
        let result = gateway
            .draft(spec, &fields(TaskKind::SessionSummary, json!({"anotacoes_brutas": "x"})))
            .await;
        assert!(matches!(result, Err(GatewayError::NotConfigured)));
        assert!(!gateway.is_configured());
    }

    #[tokio::test]
    async fn free_text_reply_fills_the_single_field() {
        let generator = Arc::new(ScriptedGenerator::replying(["  Plano coerente.  "]));
        let gateway = AiGateway::new(generator.clone(), DEFAULT_TIMEOUT);
        let spec = TaskKind::ExerciseGeneration.spec();

        let generated = gateway
            .draft(
                spec,
                &fields(
                    TaskKind::ExerciseGeneration,
                    json!({"abordagem_teorica": "TCC", "tema_principal": "Ansiedade"}),
                ),
            )
            .await
            .unwrap();

        assert_eq!(generated.get("exercicio_ia").map(String::as_str), Some("Plano coerente."));
        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].structured);
        assert!(requests[0].user.contains("Tema Principal da Tarefa: Ansiedade"));
    }

    #[tokio::test]
    async fn structured_request_names_the_required_keys() {
        let generator = Arc::new(ScriptedGenerator::replying([
            r#"{"resumo_ia":"x","sugestao_diagnostico":"y","padroes_linguagem":"z"}"#,
        ]));
        let gateway = AiGateway::new(generator.clone(), DEFAULT_TIMEOUT);
        let spec = TaskKind::SessionSummary.spec();

        gateway
            .draft(spec, &fields(TaskKind::SessionSummary, json!({"anotacoes_brutas": "x"})))
            .await
            .unwrap();

        let request = &generator.requests()[0];
        assert!(request.structured);
        assert!(request
            .user
            .ends_with("chaves: resumo_ia, sugestao_diagnostico, padroes_linguagem."));
    }

    #[tokio::test]
    async fn backend_failure_is_surfaced_once() {
        let generator = Arc::new(ScriptedGenerator::failing("rate limited"));
        let gateway = AiGateway::new(generator.clone(), DEFAULT_TIMEOUT);
        let spec = TaskKind::PlanFeedback.spec();

        let result = gateway.draft(spec, &ValidatedFields::default()).await;
        match result {
            Err(GatewayError::Unavailable(detail)) => assert!(detail.contains("rate limited")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let generator =
            Arc::new(ScriptedGenerator::replying(["tarde demais"]).with_delay(Duration::from_millis(200)));
        let gateway = AiGateway::new(generator, Duration::from_millis(20));
        let spec = TaskKind::PlanFeedback.spec();

        let result = gateway.draft(spec, &ValidatedFields::default()).await;
        assert!(matches!(result, Err(GatewayError::TimedOut(_))));
    }

    #[test]
    fn structured_reply_missing_a_key_is_rejected() {
        let shape = TaskKind::SessionSummary.spec().response;
        let err = parse_reply(shape, r#"{"resumo_ia":"x","sugestao_diagnostico":null}"#).unwrap_err();
        match err {
            GatewayError::Malformed(detail) => {
                assert_eq!(detail, "missing keys: sugestao_diagnostico, padroes_linguagem")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn structured_reply_lists_are_comma_joined_in_order() {
        let shape = TaskKind::EducationalContent.spec().response;
        let generated = parse_reply(
            shape,
            "```json\n{\"conteudo_gerado\":\"Texto\",\"sugestoes_titulos\":[\"A\",\"B\",\"C\"],\"hashtags\":[\"#a\",\"#b\"],\"sugestoes_imagens\":\"foto\"}\n```",
        )
        .unwrap();
        assert_eq!(generated["sugestoes_titulos"], "A, B, C");
        assert_eq!(generated["hashtags"], "#a, #b");
        assert_eq!(generated["sugestoes_imagens"], "foto");
    }

    #[test]
    fn non_object_and_empty_replies_are_rejected() {
        let structured = TaskKind::SessionSummary.spec().response;
        assert!(matches!(parse_reply(structured, "[1,2]"), Err(GatewayError::Malformed(_))));
        assert!(matches!(parse_reply(structured, "resumo"), Err(GatewayError::Malformed(_))));

        let free = TaskKind::PlanFeedback.spec().response;
        assert!(matches!(parse_reply(free, "   "), Err(GatewayError::Malformed(_))));
    }
}
