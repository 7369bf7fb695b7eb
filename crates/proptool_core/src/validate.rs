use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::{self, FieldKind, PropertyType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding tied to a field. `Error` blocks the remote
/// round trip and import; `Warning` never does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub field: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

impl Diagnostic {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
            expected: None,
            received: None,
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
            expected: None,
            received: None,
        }
    }

    pub fn expected(mut self, value: impl Into<String>) -> Self {
        self.expected = Some(value.into());
        self
    }

    pub fn received(mut self, value: impl Into<String>) -> Self {
        self.received = Some(value.into());
        self
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|diagnostic| diagnostic.severity == Severity::Error)
}

/// Evaluate every rule against a normalized record. The effective property
/// type is the operator's category selection, which outranks whatever
/// `property_type` string the record carries. Pure and deterministic:
/// identical inputs yield identically ordered diagnostics.
pub fn validate(record: &Map<String, Value>, property_type: PropertyType) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    unknown_keys(record, &mut diagnostics);
    required_fields(record, &mut diagnostics);
    enum_membership(record, &mut diagnostics);
    category_shape(record, property_type, &mut diagnostics);
    conditional_nullability(record, property_type, &mut diagnostics);
    type_checks(record, &mut diagnostics);
    string_lengths(record, &mut diagnostics);
    tag_validity(record, &mut diagnostics);
    content_richness(record, &mut diagnostics);
    advisories(record, &mut diagnostics);
    casing_rules(record, &mut diagnostics);
    diagnostics
}

fn unknown_keys(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    for key in record.keys() {
        if !schema::is_known_key(key) {
            diagnostics.push(Diagnostic::warning(
                key,
                "unknown field; it will be ignored on import",
            ));
        }
    }
}

fn required_fields(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    for spec in schema::FIELDS.iter().filter(|spec| spec.required) {
        let blank = match record.get(spec.name) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(_) => false,
        };
        if blank {
            diagnostics.push(Diagnostic::error(
                spec.name,
                "required field is missing or blank",
            ));
        }
    }
}

fn enum_membership(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    for spec in schema::FIELDS {
        let Some(allowed) = spec.kind.allowed_values() else {
            continue;
        };
        // Category entries are checked here too; array shape is rule 4.
        if spec.kind == FieldKind::Categories {
            let Some(entries) = record.get(spec.name).and_then(Value::as_array) else {
                continue;
            };
            for entry in entries {
                if entry.as_str().is_none_or(|text| !allowed.contains(&text)) {
                    diagnostics.push(
                        Diagnostic::error(spec.name, "is not a valid category")
                            .expected(allowed.join(", "))
                            .received(render_value(entry)),
                    );
                }
            }
            continue;
        }
        let Some(value) = record.get(spec.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        match value.as_str() {
            Some(text) if allowed.contains(&text) => {}
            _ => diagnostics.push(
                Diagnostic::error(spec.name, format!("is not a valid {}", spec.name))
                    .expected(allowed.join(", "))
                    .received(render_value(value)),
            ),
        }
    }
}

fn category_shape(
    record: &Map<String, Value>,
    property_type: PropertyType,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let entries = match record.get(schema::CATEGORIES_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::Array(entries)) => Some(entries),
        Some(other) => {
            diagnostics.push(
                Diagnostic::error(schema::CATEGORIES_FIELD, "must be an array of categories")
                    .received(render_value(other)),
            );
            return;
        }
    };
    let Some(entries) = entries.filter(|entries| !entries.is_empty()) else {
        diagnostics.push(Diagnostic::error(
            schema::CATEGORIES_FIELD,
            "must contain at least one category",
        ));
        return;
    };

    if property_type.is_active_like() && entries.len() != 1 {
        diagnostics.push(
            Diagnostic::error(
                schema::CATEGORIES_FIELD,
                format!("exactly 1 category, got {}", entries.len()),
            )
            .expected("1")
            .received(entries.len().to_string()),
        );
    }
    if property_type == PropertyType::Land
        && !entries.iter().any(|entry| entry.as_str() == Some("land"))
    {
        diagnostics.push(Diagnostic::error(
            schema::CATEGORIES_FIELD,
            "land listings must include the \"land\" category",
        ));
    }
}

fn conditional_nullability(
    record: &Map<String, Value>,
    property_type: PropertyType,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for spec in schema::FIELDS {
        if spec.applies.allows(property_type) {
            continue;
        }
        let present = record
            .get(spec.name)
            .is_some_and(|value| !value.is_null());
        if !present {
            continue;
        }
        let message = if property_type.is_active_like() {
            format!(
                "must be null for {} listings; use the single-value fields",
                property_type.as_str()
            )
        } else {
            "must be null for development listings; use the min/max range fields".to_string()
        };
        diagnostics.push(Diagnostic::error(spec.name, message));
    }
}

fn type_checks(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    for spec in schema::FIELDS {
        let Some(value) = record.get(spec.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        match spec.kind {
            FieldKind::Number if !value.is_number() => diagnostics.push(
                Diagnostic::error(spec.name, "must be a number or null")
                    .expected("number")
                    .received(render_typed_value(value)),
            ),
            FieldKind::Boolean if !value.is_boolean() => diagnostics.push(
                Diagnostic::error(spec.name, "must be a boolean")
                    .expected("boolean")
                    .received(render_typed_value(value)),
            ),
            _ => {}
        }
    }
}

fn string_lengths(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    for spec in schema::FIELDS {
        let Some(max_len) = spec.max_len else {
            continue;
        };
        let Some(text) = record.get(spec.name).and_then(Value::as_str) else {
            continue;
        };
        let length = text.chars().count();
        if length > max_len {
            diagnostics.push(
                Diagnostic::error(spec.name, "exceeds the maximum length")
                    .expected(format!("at most {max_len} characters"))
                    .received(format!("{length} characters")),
            );
        }
    }
}

fn tag_validity(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    let Some(value) = record.get(schema::TAGS_FIELD) else {
        return;
    };
    if value.is_null() {
        return;
    }
    let Some(entries) = value.as_array() else {
        diagnostics.push(
            Diagnostic::error(schema::TAGS_FIELD, "must be an array of tags")
                .received(render_value(value)),
        );
        return;
    };
    for entry in entries {
        let Some(text) = entry.as_str() else {
            diagnostics.push(
                Diagnostic::error(schema::TAGS_FIELD, "tags must be strings")
                    .received(render_value(entry)),
            );
            continue;
        };
        if schema::TAGS.contains(&text) {
            continue;
        }
        let diagnostic = match schema::canonical_tag(text) {
            Some(suggestion) => {
                Diagnostic::error(schema::TAGS_FIELD, format!("unknown tag; did you mean \"{suggestion}\"?"))
                    .expected(suggestion)
                    .received(text)
            }
            None => Diagnostic::error(schema::TAGS_FIELD, "is not in the tag vocabulary")
                .received(text),
        };
        diagnostics.push(diagnostic);
    }
}

fn content_richness(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    let words = record
        .get(schema::CONTENT_FIELD)
        .and_then(Value::as_str)
        .map(|content| word_count(&strip_markup(content)))
        .unwrap_or(0);
    if words < schema::CONTENT_MIN_WORDS {
        diagnostics.push(
            Diagnostic::error(
                schema::CONTENT_FIELD,
                format!(
                    "content must be at least {} words after markup is stripped",
                    schema::CONTENT_MIN_WORDS
                ),
            )
            .expected(format!("at least {} words", schema::CONTENT_MIN_WORDS))
            .received(format!("{words} words")),
        );
    }
}

fn advisories(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    let blank_description = match record.get(schema::SHORT_DESCRIPTION_FIELD) {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    };
    if blank_description {
        diagnostics.push(Diagnostic::warning(
            schema::SHORT_DESCRIPTION_FIELD,
            "short description is empty",
        ));
    }

    if let Some(url) = record.get(schema::MAP_URL_FIELD).and_then(Value::as_str)
        && !url.trim().is_empty()
        && !schema::MAP_URL_HOSTS.iter().any(|host| url.contains(host))
    {
        diagnostics.push(
            Diagnostic::warning(
                schema::MAP_URL_FIELD,
                "does not look like a recognized map-provider link",
            )
            .received(url),
        );
    }
}

fn casing_rules(record: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    for spec in schema::FIELDS.iter().filter(|spec| spec.lowercase) {
        let Some(text) = record.get(spec.name).and_then(Value::as_str) else {
            continue;
        };
        let lowered = text.to_lowercase();
        if text != lowered {
            diagnostics.push(
                Diagnostic::error(spec.name, "must be lower-case")
                    .expected(lowered)
                    .received(text),
            );
        }
    }
}

/// Strip HTML-style tags so markup never counts toward the word minimum.
/// A `<` with no matching `>` is literal text, not a tag opener.
pub fn strip_markup(content: &str) -> String {
    let mut output = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(open) = rest.find('<') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('>') {
            Some(close) => {
                output.push(' ');
                rest = &after_open[close + 1..];
            }
            None => {
                output.push('<');
                rest = after_open;
            }
        }
    }
    output.push_str(rest);
    output
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .count()
}

fn render_value(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() > 60 {
        let mut truncated = rendered.chars().take(57).collect::<String>();
        truncated.push_str("...");
        truncated
    } else {
        rendered
    }
}

fn render_typed_value(value: &Value) -> String {
    format!("{} ({})", render_value(value), json_type_name(value))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
