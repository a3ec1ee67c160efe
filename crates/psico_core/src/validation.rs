//! crates/psico_core/src/validation.rs
//!
//! The content request validator. Turns the raw field mapping submitted by the
//! presentation layer into typed, trimmed values, or into a field-by-field list
//! of violations. It performs no I/O.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::RecordId;

/// The raw mapping submitted by a form or a JSON client.
pub type RawFields = serde_json::Map<String, Value>;

pub const REQUIRED_MESSAGE: &str = "Este campo é obrigatório.";
const INVALID_FORMAT_MESSAGE: &str = "Formato inválido.";
const INVALID_DATE_MESSAGE: &str = "Informe uma data válida (AAAA-MM-DD ou DD/MM/AAAA).";
const SHORT_TEXT_LIMIT: usize = 255;

static INTEGER_LIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

//=========================================================================================
// Descriptors
//=========================================================================================

/// The shape a single field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Text,
    /// Text of at most 255 characters.
    ShortText,
    /// An identifier of another record. Anything that is not integer-like is
    /// cleared and treated as omitted.
    Reference,
    Date,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub shape: FieldShape,
    pub required: bool,
    /// Value used when the field is absent or blank.
    pub default: Option<&'static str>,
}

impl FieldRule {
    pub const fn required(name: &'static str, shape: FieldShape) -> Self {
        Self { name, shape, required: true, default: None }
    }

    pub const fn optional(name: &'static str, shape: FieldShape) -> Self {
        Self { name, shape, required: false, default: None }
    }

    pub const fn with_default(self, default: &'static str) -> Self {
        Self { default: Some(default), ..self }
    }
}

/// The accepted fields of one entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub entity: &'static str,
    pub fields: &'static [FieldRule],
}

//=========================================================================================
// Output types
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Reference(RecordId),
    Date(NaiveDate),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Reference(id) => write!(f, "{id}"),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Normalized fields. Only fields that ended up with a value are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedFields {
    values: BTreeMap<&'static str, FieldValue>,
}

impl ValidatedFields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn reference(&self, name: &str) -> Option<RecordId> {
        match self.values.get(name) {
            Some(FieldValue::Reference(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.values.get(name) {
            Some(FieldValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}

/// Field name → human-readable violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the offending fields, in alphabetical order.
    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

//=========================================================================================
// Validation
//=========================================================================================

/// Checks `raw` against `descriptor`.
///
/// Keys not named by the descriptor are ignored, which is how AI-output fields
/// sent by a client are dropped. Every violation is collected before returning.
pub fn validate(
    raw: &RawFields,
    descriptor: &EntityDescriptor,
) -> Result<ValidatedFields, ValidationErrors> {
    let mut values = BTreeMap::new();
    let mut errors = ValidationErrors::default();

    for rule in descriptor.fields {
        let mut text = match raw.get(rule.name).map(scalar_text) {
            Some(Ok(text)) => text.trim().to_string(),
            Some(Err(message)) => {
                errors.add(rule.name, message);
                continue;
            }
            None => String::new(),
        };

        if rule.shape == FieldShape::Reference && normalize_reference(&text).is_none() {
            text.clear();
        }
        if text.is_empty() {
            if let Some(default) = rule.default {
                text = default.to_string();
            }
        }
        if text.is_empty() {
            if rule.required {
                errors.add(rule.name, REQUIRED_MESSAGE);
            }
            continue;
        }

        match parse_shape(rule.shape, text) {
            Ok(value) => {
                values.insert(rule.name, value);
            }
            Err(message) => errors.add(rule.name, message),
        }
    }

    if errors.is_empty() {
        Ok(ValidatedFields { values })
    } else {
        Err(errors)
    }
}

/// Returns the identifier when `text` is integer-like.
pub fn normalize_reference(text: &str) -> Option<RecordId> {
    let text = text.trim();
    if !INTEGER_LIKE.is_match(text) {
        return None;
    }
    text.parse().ok()
}

fn scalar_text(value: &Value) -> Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Array(_) | Value::Object(_) => Err(INVALID_FORMAT_MESSAGE.to_string()),
    }
}

fn parse_shape(shape: FieldShape, text: String) -> Result<FieldValue, String> {
    match shape {
        FieldShape::Text => Ok(FieldValue::Text(text)),
        FieldShape::ShortText => {
            if text.chars().count() > SHORT_TEXT_LIMIT {
                Err(format!(
                    "Certifique-se de que este campo não tenha mais de {SHORT_TEXT_LIMIT} caracteres."
                ))
            } else {
                Ok(FieldValue::Text(text))
            }
        }
        FieldShape::Reference => normalize_reference(&text)
            .map(FieldValue::Reference)
            .ok_or_else(|| REQUIRED_MESSAGE.to_string()),
        FieldShape::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&text, "%d/%m/%Y"))
            .map(FieldValue::Date)
            .map_err(|_| INVALID_DATE_MESSAGE.to_string()),
        FieldShape::Choice(options) => {
            if options.contains(&text.as_str()) {
                Ok(FieldValue::Text(text))
            } else {
                Err(format!("Escolha uma opção válida: {}.", options.join(", ")))
            }
        }
    }
}
