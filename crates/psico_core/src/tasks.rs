//! crates/psico_core/src/tasks.rs
//!
//! Declarative configuration of every AI-assisted task kind: which fields it
//! accepts, the prompt it sends, the reply it expects and what happens when
//! the AI call fails. The submission workflow itself knows nothing about the
//! individual entities beyond this table.

use serde::{Deserialize, Serialize};

use crate::domain::{ContentType, TheoreticalApproach, DEFAULT_TONE_OF_VOICE};
use crate::validation::{EntityDescriptor, FieldRule, FieldShape, ValidatedFields};

/// Text interpolated in place of an optional field that was not provided.
pub const MISSING_VALUE: &str = "Não informado";

//=========================================================================================
// Task kinds
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    PlanFeedback,
    SessionSummary,
    ExerciseGeneration,
    EducationalContent,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::PlanFeedback,
        TaskKind::SessionSummary,
        TaskKind::ExerciseGeneration,
        TaskKind::EducationalContent,
    ];

    pub fn spec(self) -> &'static TaskSpec {
        match self {
            TaskKind::PlanFeedback => &PLAN_FEEDBACK,
            TaskKind::SessionSummary => &SESSION_SUMMARY,
            TaskKind::ExerciseGeneration => &EXERCISE_GENERATION,
            TaskKind::EducationalContent => &EDUCATIONAL_CONTENT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::PlanFeedback => "plan_feedback",
            TaskKind::SessionSummary => "session_summary",
            TaskKind::ExerciseGeneration => "exercise_generation",
            TaskKind::EducationalContent => "educational_content",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown task kind '{s}'"))
    }
}

/// What happens to a submission when the AI call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Discard the submission; nothing is written.
    FailClosed,
    /// Persist anyway, with a placeholder in the primary AI field.
    FailOpen,
}

/// The reply a task expects from the text-generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// One block of prose, stored in `field`.
    FreeText { field: &'static str },
    /// A JSON object that must carry exactly these keys.
    Structured { keys: &'static [&'static str] },
}

impl ResponseShape {
    /// The output fields this shape fills, primary field first.
    pub fn output_fields(&self) -> &[&'static str] {
        match self {
            ResponseShape::FreeText { field } => std::slice::from_ref(field),
            ResponseShape::Structured { keys } => keys,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub system: &'static str,
    /// Placeholders of the form `{field}` are replaced by validated values.
    pub user: &'static str,
}

impl PromptTemplate {
    /// Interpolates every descriptor field into the user template verbatim.
    pub fn render_user(&self, descriptor: &EntityDescriptor, fields: &ValidatedFields) -> String {
        descriptor.fields.iter().fold(self.user.to_string(), |prompt, rule| {
            let placeholder = format!("{{{}}}", rule.name);
            let value = fields
                .get(rule.name)
                .map(ToString::to_string)
                .unwrap_or_else(|| MISSING_VALUE.to_string());
            prompt.replace(&placeholder, &value)
        })
    }
}

/// Everything that varies between task kinds.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub descriptor: EntityDescriptor,
    pub prompt: PromptTemplate,
    pub response: ResponseShape,
    pub default_policy: FailurePolicy,
}

//=========================================================================================
// Field descriptors
//=========================================================================================

pub const PATIENT_FIELDS: EntityDescriptor = EntityDescriptor {
    entity: "paciente",
    fields: &[
        FieldRule::required("nome_completo", FieldShape::ShortText),
        FieldRule::optional("data_nascimento", FieldShape::Date),
        FieldRule::optional("contato_emergencia", FieldShape::ShortText),
    ],
};

const TREATMENT_PLAN_FIELDS: EntityDescriptor = EntityDescriptor {
    entity: "plano_tratamento",
    fields: &[
        FieldRule::required("paciente", FieldShape::Reference),
        FieldRule::required("titulo", FieldShape::ShortText),
        FieldRule::required("diagnostico_base", FieldShape::Text),
        FieldRule::required("metas_tratamento", FieldShape::Text),
        FieldRule::optional("abordagem", FieldShape::ShortText),
        FieldRule::optional("frequencia_sessoes", FieldShape::ShortText),
        FieldRule::required("data_inicio_prevista", FieldShape::Date),
    ],
};

const SESSION_NOTE_FIELDS: EntityDescriptor = EntityDescriptor {
    entity: "documentacao_sessao",
    fields: &[
        FieldRule::optional("paciente", FieldShape::Reference),
        FieldRule::optional("data_sessao", FieldShape::Date),
        FieldRule::required("anotacoes_brutas", FieldShape::Text),
    ],
};

const EXERCISE_FIELDS: EntityDescriptor = EntityDescriptor {
    entity: "tarefa_exercicio",
    fields: &[
        FieldRule::optional("paciente", FieldShape::Reference),
        FieldRule::required(
            "abordagem_teorica",
            FieldShape::Choice(TheoreticalApproach::CODES),
        ),
        FieldRule::required("tema_principal", FieldShape::ShortText),
        FieldRule::optional("detalhes_personalizacao", FieldShape::Text),
    ],
};

const EDUCATIONAL_CONTENT_FIELDS: EntityDescriptor = EntityDescriptor {
    entity: "conteudo_educacional",
    fields: &[
        FieldRule::required("titulo", FieldShape::ShortText),
        FieldRule::required("tipo_conteudo", FieldShape::Choice(ContentType::CODES)),
        FieldRule::required("tema", FieldShape::ShortText),
        FieldRule::optional("publico_alvo", FieldShape::ShortText),
        FieldRule::optional("tom_voz", FieldShape::ShortText).with_default(DEFAULT_TONE_OF_VOICE),
        FieldRule::optional("palavras_chave", FieldShape::Text),
    ],
};

//=========================================================================================
// Task table
//=========================================================================================

pub const PLAN_FEEDBACK_FIELD: &str = "feedback_ia";
pub const SESSION_SUMMARY_KEYS: &[&str] = &["resumo_ia", "sugestao_diagnostico", "padroes_linguagem"];
pub const EXERCISE_FIELD: &str = "exercicio_ia";
pub const EDUCATIONAL_CONTENT_KEYS: &[&str] =
    &["conteudo_gerado", "sugestoes_titulos", "hashtags", "sugestoes_imagens"];

static PLAN_FEEDBACK: TaskSpec = TaskSpec {
    kind: TaskKind::PlanFeedback,
    descriptor: TREATMENT_PLAN_FIELDS,
    prompt: PromptTemplate {
        system: "Você é um assistente de supervisão clínica que revisa planos de tratamento psicológico.",
        user: r#"Analise o seguinte plano de tratamento e forneça um feedback construtivo e conciso (máximo 150 palavras).
Foque em sugerir aprimoramentos, validar a coerência entre diagnóstico e metas e propor estratégias adicionais (ex: mindfulness, psicoeducação).

Título: {titulo}
Diagnóstico Base: {diagnostico_base}
Metas de Tratamento: {metas_tratamento}
Abordagem: {abordagem}
Frequência das Sessões: {frequencia_sessoes}
Início Previsto: {data_inicio_prevista}"#,
    },
    response: ResponseShape::FreeText { field: PLAN_FEEDBACK_FIELD },
    default_policy: FailurePolicy::FailClosed,
};

static SESSION_SUMMARY: TaskSpec = TaskSpec {
    kind: TaskKind::SessionSummary,
    descriptor: SESSION_NOTE_FIELDS,
    prompt: PromptTemplate {
        system: "Você é um assistente de documentação psicológica. Responda apenas com um objeto JSON válido.",
        user: r#"Analise as anotações da sessão e gere três saídas: um resumo conciso, uma sugestão de diagnóstico (CID-10 ou DSM-5) e os padrões de linguagem observados.

Data da Sessão: {data_sessao}
Anotações da Sessão: {anotacoes_brutas}"#,
    },
    response: ResponseShape::Structured { keys: SESSION_SUMMARY_KEYS },
    default_policy: FailurePolicy::FailClosed,
};

static EXERCISE_GENERATION: TaskSpec = TaskSpec {
    kind: TaskKind::ExerciseGeneration,
    descriptor: EXERCISE_FIELDS,
    prompt: PromptTemplate {
        system: "Você é um gerador de tarefas terapêuticas. Responda apenas com o texto do exercício pronto.",
        user: r#"Crie um exercício prático e personalizado para um paciente.

Abordagem Teórica: {abordagem_teorica}
Tema Principal da Tarefa: {tema_principal}
Detalhes de Personalização do Paciente: {detalhes_personalizacao}

Formate o exercício com cabeçalhos e listas, contendo: Título, Objetivo, Passos para a execução (numerados) e O que o paciente deve observar ou anotar."#,
    },
    response: ResponseShape::FreeText { field: EXERCISE_FIELD },
    default_policy: FailurePolicy::FailClosed,
};

static EDUCATIONAL_CONTENT: TaskSpec = TaskSpec {
    kind: TaskKind::EducationalContent,
    descriptor: EDUCATIONAL_CONTENT_FIELDS,
    prompt: PromptTemplate {
        system: "Você é um redator especializado em psicologia que escreve conteúdo educativo ético e acessível. Responda apenas com um objeto JSON válido.",
        user: r#"Escreva um conteúdo educativo em português do Brasil.

Título de Trabalho: {titulo}
Tipo de Conteúdo: {tipo_conteudo}
Tema: {tema}
Público-Alvo: {publico_alvo}
Tom de Voz: {tom_voz}
Palavras-Chave: {palavras_chave}

Em "conteudo_gerado" coloque o texto completo. Em "sugestoes_titulos" uma lista com 3 títulos alternativos. Em "hashtags" uma lista de hashtags relevantes. Em "sugestoes_imagens" uma lista de ideias de imagens para acompanhar o texto."#,
    },
    response: ResponseShape::Structured { keys: EDUCATIONAL_CONTENT_KEYS },
    default_policy: FailurePolicy::FailClosed,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn task_kind_round_trips_through_its_name() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
            assert_eq!(kind.spec().kind, kind);
        }
        assert!("unknown".parse::<TaskKind>().is_err());
    }

    #[test]
    fn every_template_placeholder_names_a_descriptor_field() {
        for kind in TaskKind::ALL {
            let spec = kind.spec();
            let rendered = spec
                .prompt
                .render_user(&spec.descriptor, &ValidatedFields::default());
            assert!(!rendered.contains('{'), "{kind}: unresolved placeholder in {rendered}");
        }
    }

    #[test]
    fn renders_values_verbatim_and_marks_missing_ones() {
        let spec = TaskKind::ExerciseGeneration.spec();
        let raw = json!({"abordagem_teorica": "TCC", "tema_principal": "Ansiedade <b>"});
        let fields = validate(raw.as_object().unwrap(), &spec.descriptor).unwrap();

        let prompt = spec.prompt.render_user(&spec.descriptor, &fields);
        assert!(prompt.contains("Abordagem Teórica: TCC"));
        assert!(prompt.contains("Tema Principal da Tarefa: Ansiedade <b>"));
        assert!(prompt.contains("Detalhes de Personalização do Paciente: Não informado"));
    }

    #[test]
    fn primary_output_field_comes_first() {
        assert_eq!(
            TaskKind::PlanFeedback.spec().response.output_fields(),
            &["feedback_ia"]
        );
        assert_eq!(
            TaskKind::SessionSummary.spec().response.output_fields()[0],
            "resumo_ia"
        );
    }
}
