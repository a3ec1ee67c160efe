//! crates/psico_core/src/domain.rs
//!
//! Defines the core records of the practice: patients and the four kinds of
//! AI-assisted clinical content. Every record is owned by exactly one
//! practitioner (`owner_id`) and every timestamp is assigned by the server.
//!
//! Serialized field names follow the Portuguese vocabulary the clinic uses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Integer identifier of a stored record.
pub type RecordId = i64;

//=========================================================================================
// Enumerations
//=========================================================================================

/// Theoretical approach an exercise is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TheoreticalApproach {
    #[serde(rename = "TCC")]
    Cbt,
    #[serde(rename = "PSICANALISE")]
    Psychoanalysis,
    #[serde(rename = "HUMANISTA")]
    Humanistic,
    #[serde(rename = "OUTRA")]
    Other,
}

impl TheoreticalApproach {
    pub const CODES: &'static [&'static str] = &["TCC", "PSICANALISE", "HUMANISTA", "OUTRA"];

    pub fn code(self) -> &'static str {
        match self {
            Self::Cbt => "TCC",
            Self::Psychoanalysis => "PSICANALISE",
            Self::Humanistic => "HUMANISTA",
            Self::Other => "OUTRA",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "TCC" => Some(Self::Cbt),
            "PSICANALISE" => Some(Self::Psychoanalysis),
            "HUMANISTA" => Some(Self::Humanistic),
            "OUTRA" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Format of a piece of educational content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "POST_SOCIAL")]
    SocialPost,
    #[serde(rename = "TEXTO_CLINICA")]
    ClinicText,
    #[serde(rename = "ARTIGO_BLOG")]
    BlogArticle,
    #[serde(rename = "MATERIAL_PACIENTE")]
    PatientMaterial,
}

impl ContentType {
    pub const CODES: &'static [&'static str] =
        &["POST_SOCIAL", "TEXTO_CLINICA", "ARTIGO_BLOG", "MATERIAL_PACIENTE"];

    pub fn code(self) -> &'static str {
        match self {
            Self::SocialPost => "POST_SOCIAL",
            Self::ClinicText => "TEXTO_CLINICA",
            Self::BlogArticle => "ARTIGO_BLOG",
            Self::PatientMaterial => "MATERIAL_PACIENTE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "POST_SOCIAL" => Some(Self::SocialPost),
            "TEXTO_CLINICA" => Some(Self::ClinicText),
            "ARTIGO_BLOG" => Some(Self::BlogArticle),
            "MATERIAL_PACIENTE" => Some(Self::PatientMaterial),
            _ => None,
        }
    }
}

/// Tone used when the practitioner does not pick one.
pub const DEFAULT_TONE_OF_VOICE: &str = "profissional e acolhedor";

//=========================================================================================
// Patient
//=========================================================================================

/// A patient registered by a practitioner. `(owner_id, full_name)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    pub id: RecordId,
    #[serde(skip)]
    pub owner_id: Uuid,
    #[serde(rename = "nome_completo")]
    pub full_name: String,
    #[serde(rename = "data_nascimento")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "contato_emergencia")]
    pub emergency_contact: Option<String>,
    #[serde(rename = "data_cadastro")]
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub emergency_contact: Option<String>,
}

//=========================================================================================
// Treatment plan
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentPlan {
    pub id: RecordId,
    #[serde(skip)]
    pub owner_id: Uuid,
    #[serde(rename = "paciente")]
    pub patient_id: RecordId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "diagnostico_base")]
    pub base_diagnosis: String,
    #[serde(rename = "metas_tratamento")]
    pub treatment_goals: String,
    #[serde(rename = "abordagem")]
    pub approach: Option<String>,
    #[serde(rename = "frequencia_sessoes")]
    pub session_frequency: Option<String>,
    #[serde(rename = "data_inicio_prevista")]
    pub planned_start: NaiveDate,
    /// Written once by the AI gateway, never by the client.
    #[serde(rename = "feedback_ia")]
    pub ai_feedback: Option<String>,
    #[serde(rename = "data_criacao")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTreatmentPlan {
    pub patient_id: RecordId,
    pub title: String,
    pub base_diagnosis: String,
    pub treatment_goals: String,
    pub approach: Option<String>,
    pub session_frequency: Option<String>,
    pub planned_start: NaiveDate,
    pub ai_feedback: Option<String>,
}

//=========================================================================================
// Session note
//=========================================================================================

/// The AI-derived fields of a session note. They are stored together or not at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInsights {
    #[serde(rename = "resumo_ia")]
    pub summary: String,
    #[serde(rename = "sugestao_diagnostico")]
    pub diagnosis_suggestion: String,
    #[serde(rename = "padroes_linguagem")]
    pub language_patterns: String,
}

/// Serialized flat; the three AI fields are `null` until drafted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionNote {
    pub id: RecordId,
    pub owner_id: Uuid,
    pub patient_id: Option<RecordId>,
    pub session_date: NaiveDate,
    pub raw_notes: String,
    pub insights: Option<SessionInsights>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SessionNoteWire<'a> {
    id: RecordId,
    paciente: Option<RecordId>,
    data_sessao: NaiveDate,
    anotacoes_brutas: &'a str,
    resumo_ia: Option<&'a str>,
    sugestao_diagnostico: Option<&'a str>,
    padroes_linguagem: Option<&'a str>,
    data_criacao: DateTime<Utc>,
}

impl Serialize for SessionNote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let insights = self.insights.as_ref();
        SessionNoteWire {
            id: self.id,
            paciente: self.patient_id,
            data_sessao: self.session_date,
            anotacoes_brutas: &self.raw_notes,
            resumo_ia: insights.map(|i| i.summary.as_str()),
            sugestao_diagnostico: insights.map(|i| i.diagnosis_suggestion.as_str()),
            padroes_linguagem: insights.map(|i| i.language_patterns.as_str()),
            data_criacao: self.created_at,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSessionNote {
    pub patient_id: Option<RecordId>,
    pub session_date: NaiveDate,
    pub raw_notes: String,
    pub insights: Option<SessionInsights>,
}

//=========================================================================================
// Exercise
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exercise {
    pub id: RecordId,
    #[serde(skip)]
    pub owner_id: Uuid,
    #[serde(rename = "paciente")]
    pub patient_id: Option<RecordId>,
    #[serde(rename = "abordagem_teorica")]
    pub approach: TheoreticalApproach,
    #[serde(rename = "tema_principal")]
    pub main_theme: String,
    #[serde(rename = "detalhes_personalizacao")]
    pub personalization: Option<String>,
    #[serde(rename = "exercicio_ia")]
    pub exercise_text: Option<String>,
    #[serde(rename = "data_criacao")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExercise {
    pub patient_id: Option<RecordId>,
    pub approach: TheoreticalApproach,
    pub main_theme: String,
    pub personalization: Option<String>,
    pub exercise_text: Option<String>,
}

//=========================================================================================
// Educational content
//=========================================================================================

/// The generated parts of a piece of educational content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedContent {
    #[serde(rename = "conteudo_gerado")]
    pub body: String,
    /// Comma-joined title suggestions, in the order the model returned them.
    #[serde(rename = "sugestoes_titulos")]
    pub title_suggestions: String,
    pub hashtags: String,
    #[serde(rename = "sugestoes_imagens")]
    pub image_suggestions: String,
}

/// Serialized flat; the four generated fields are `null` until drafted.
#[derive(Debug, Clone, PartialEq)]
pub struct EducationalContent {
    pub id: RecordId,
    pub owner_id: Uuid,
    pub title: String,
    pub content_type: ContentType,
    pub theme: String,
    pub target_audience: Option<String>,
    pub tone_of_voice: String,
    pub keywords: Option<String>,
    pub generated: Option<GeneratedContent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct EducationalContentWire<'a> {
    id: RecordId,
    titulo: &'a str,
    tipo_conteudo: ContentType,
    tema: &'a str,
    publico_alvo: Option<&'a str>,
    tom_voz: &'a str,
    palavras_chave: Option<&'a str>,
    conteudo_gerado: Option<&'a str>,
    sugestoes_titulos: Option<&'a str>,
    hashtags: Option<&'a str>,
    sugestoes_imagens: Option<&'a str>,
    data_criacao: DateTime<Utc>,
    data_atualizacao: DateTime<Utc>,
}

impl Serialize for EducationalContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let generated = self.generated.as_ref();
        EducationalContentWire {
            id: self.id,
            titulo: &self.title,
            tipo_conteudo: self.content_type,
            tema: &self.theme,
            publico_alvo: self.target_audience.as_deref(),
            tom_voz: &self.tone_of_voice,
            palavras_chave: self.keywords.as_deref(),
            conteudo_gerado: generated.map(|g| g.body.as_str()),
            sugestoes_titulos: generated.map(|g| g.title_suggestions.as_str()),
            hashtags: generated.map(|g| g.hashtags.as_str()),
            sugestoes_imagens: generated.map(|g| g.image_suggestions.as_str()),
            data_criacao: self.created_at,
            data_atualizacao: self.updated_at,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEducationalContent {
    pub title: String,
    pub content_type: ContentType,
    pub theme: String,
    pub target_audience: Option<String>,
    pub tone_of_voice: String,
    pub keywords: Option<String>,
    pub generated: Option<GeneratedContent>,
}

//=========================================================================================
// Record sum types
//=========================================================================================

/// A record ready to be written by the submission workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum NewRecord {
    TreatmentPlan(NewTreatmentPlan),
    SessionNote(NewSessionNote),
    Exercise(NewExercise),
    EducationalContent(NewEducationalContent),
}

/// A stored AI-assisted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    TreatmentPlan(TreatmentPlan),
    SessionNote(SessionNote),
    Exercise(Exercise),
    EducationalContent(EducationalContent),
}

impl Record {
    pub fn id(&self) -> RecordId {
        match self {
            Record::TreatmentPlan(r) => r.id,
            Record::SessionNote(r) => r.id,
            Record::Exercise(r) => r.id,
            Record::EducationalContent(r) => r.id,
        }
    }
}
