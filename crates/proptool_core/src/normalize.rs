use serde_json::{Map, Value};

use crate::schema::{self, FieldKind, FieldSpec};

/// Produce a normalized record from a loosely-typed draft. Total and
/// idempotent: fields the normalizer cannot interpret are returned
/// unchanged for the validator to flag, and a non-object draft yields an
/// empty record. No validity judgment happens here.
pub fn normalize(draft: &Value) -> Map<String, Value> {
    let Some(object) = draft.as_object() else {
        return Map::new();
    };

    let mut record = Map::new();
    for (key, value) in object {
        if schema::SERVER_OWNED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        record.insert(key.clone(), value.clone());
    }

    migrate_legacy_category(&mut record);

    for spec in schema::FIELDS {
        let Some(value) = record.get(spec.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let normalized = normalize_field(spec, value);
        record.insert(spec.name.to_string(), normalized);
    }

    record
}

fn normalize_field(spec: &FieldSpec, value: &Value) -> Value {
    match spec.kind {
        FieldKind::Enum(_) => match value {
            Value::String(text) => Value::String(normalize_enum(text)),
            _ => value.clone(),
        },
        FieldKind::Bedrooms => normalize_bedrooms(value),
        FieldKind::Bathrooms => normalize_bathrooms(value),
        FieldKind::Number => coerce_number(value),
        FieldKind::Boolean => coerce_boolean(value),
        FieldKind::Categories => normalize_categories(value),
        FieldKind::Tags => normalize_tags(value),
        FieldKind::Text | FieldKind::RichText => value.clone(),
    }
}

/// Trim, lowercase, and collapse whitespace/hyphen/underscore runs into a
/// single underscore, then map legacy synonyms onto the canonical token.
/// Unrecognized tokens survive tokenization unchanged in meaning and are
/// rejected later by enum membership.
pub fn normalize_enum(value: &str) -> String {
    let token = enum_token(value);
    match schema::synonym(&token) {
        Some(canonical) => canonical.to_string(),
        None => token,
    }
}

pub fn enum_token(value: &str) -> String {
    let mut token = String::new();
    let mut pending_separator = false;
    for ch in value.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = !token.is_empty();
            continue;
        }
        if pending_separator {
            token.push('_');
            pending_separator = false;
        }
        for lower in ch.to_lowercase() {
            token.push(lower);
        }
    }
    token
}

fn migrate_legacy_category(record: &mut Map<String, Value>) {
    let Some(legacy) = record.remove(schema::LEGACY_CATEGORY_FIELD) else {
        return;
    };
    let plural_is_empty = match record.get(schema::CATEGORIES_FIELD) {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    if !plural_is_empty {
        return;
    }
    if let Value::String(text) = &legacy {
        record.insert(
            schema::CATEGORIES_FIELD.to_string(),
            Value::Array(vec![Value::String(normalize_enum(text))]),
        );
    }
}

fn normalize_categories(value: &Value) -> Value {
    let Some(items) = value.as_array() else {
        return value.clone();
    };
    Value::Array(
        items
            .iter()
            .map(|item| match item {
                Value::String(text) => Value::String(normalize_enum(text)),
                other => other.clone(),
            })
            .collect(),
    )
}

fn normalize_tags(value: &Value) -> Value {
    let Some(items) = value.as_array() else {
        return value.clone();
    };
    Value::Array(
        items
            .iter()
            .map(|item| match item {
                Value::String(text) => {
                    let trimmed = text.trim();
                    match schema::canonical_tag(trimmed) {
                        Some(canonical) => Value::String(canonical.to_string()),
                        None => Value::String(trimmed.to_string()),
                    }
                }
                other => other.clone(),
            })
            .collect(),
    )
}

fn normalize_bedrooms(value: &Value) -> Value {
    if let Some(member) = enumeration_member(value, schema::BEDROOMS) {
        return member;
    }
    let Some(count) = numeric_value(value) else {
        return value.clone();
    };
    if count <= 0.0 {
        return Value::String("studio".to_string());
    }
    if count >= 5.0 {
        return Value::String("5+".to_string());
    }
    if count.fract() == 0.0 {
        return Value::String(format!("{}", count as i64));
    }
    value.clone()
}

fn normalize_bathrooms(value: &Value) -> Value {
    if let Some(member) = enumeration_member(value, schema::BATHROOMS) {
        return member;
    }
    let Some(count) = numeric_value(value) else {
        return value.clone();
    };
    if count >= 5.0 {
        return Value::String("5+".to_string());
    }
    // Half steps are preserved; anything finer than .5 stays as-is and
    // fails enum membership.
    if count < 1.0 || (count * 2.0).fract() != 0.0 {
        return value.clone();
    }
    if count.fract() == 0.0 {
        Value::String(format!("{}", count as i64))
    } else {
        Value::String(format!("{count:.1}"))
    }
}

fn enumeration_member(value: &Value, allowed: &[&str]) -> Option<Value> {
    let text = value.as_str()?;
    let lowered = text.trim().to_ascii_lowercase();
    allowed
        .iter()
        .find(|member| **member == lowered)
        .map(|member| Value::String((*member).to_string()))
}

fn coerce_number(value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    let Some(parsed) = parse_loose_number(text) else {
        return value.clone();
    };
    if parsed.fract() == 0.0 && parsed.abs() < 9.0e15 {
        Value::Number(serde_json::Number::from(parsed as i64))
    } else {
        match serde_json::Number::from_f64(parsed) {
            Some(number) => Value::Number(number),
            None => value.clone(),
        }
    }
}

fn coerce_boolean(value: &Value) -> Value {
    match value {
        Value::Bool(_) => value.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(parsed) => Value::Bool(parsed != 0.0),
            None => value.clone(),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_loose_number(text),
        _ => None,
    }
}

/// Parse a numeric-looking string: one optional currency prefix, thousands
/// separators, underscores, and interior whitespace are tolerated.
fn parse_loose_number(raw: &str) -> Option<f64> {
    let mut text = raw.trim();
    let lowered = text.to_lowercase();
    for prefix in ["us$", "mx$", "usd", "mxn", "eur", "$", "€", "£"] {
        if lowered.starts_with(prefix) {
            text = text[prefix.len()..].trim_start();
            break;
        }
    }
    let cleaned = text
        .chars()
        .filter(|ch| !matches!(ch, ',' | '_') && !ch.is_whitespace())
        .collect::<String>();
    if cleaned.is_empty() || !cleaned.chars().any(|ch| ch.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}
