//! Tolerant parsing of model output into fixed-shape records.
//!
//! Resolution order:
//! 1. Structured: the span from the first `{` to the last `}` as JSON.
//! 2. Labeled sections: `[MARKER]` headings, each running to the next
//!    recognized marker or the end of the text.
//! 3. Fallback: the schema's last-resort record, if it has one.
//!
//! Whatever path wins, every schema field is backfilled with its default,
//! so callers never see a missing key. Parsing never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// A parsed record keyed by field name.
pub type Record = Map<String, Value>;

static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•+]|\d+[.)])\s+").expect("static pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text. Blank values are replaced by the field default.
    Text,
    /// Ordered list of strings. Defaults to empty.
    List,
    /// Boolean. Defaults to `false`.
    Flag,
}

/// One expected field of a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Section heading used when the model ignores the JSON format.
    pub marker: &'static str,
    pub kind: FieldKind,
    /// Placeholder for `Text` fields.
    pub default: &'static str,
}

impl FieldSpec {
    pub const fn text(name: &'static str, marker: &'static str, default: &'static str) -> Self {
        Self {
            name,
            marker,
            kind: FieldKind::Text,
            default,
        }
    }

    pub const fn list(name: &'static str, marker: &'static str) -> Self {
        Self {
            name,
            marker,
            kind: FieldKind::List,
            default: "",
        }
    }

    pub const fn flag(name: &'static str, marker: &'static str) -> Self {
        Self {
            name,
            marker,
            kind: FieldKind::Flag,
            default: "",
        }
    }

    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Text => Value::String(self.default.to_string()),
            FieldKind::List => Value::Array(Vec::new()),
            FieldKind::Flag => Value::Bool(false),
        }
    }

    /// Coerce a JSON value into this field's shape. `None` if unusable.
    fn coerce(&self, value: &Value) -> Option<Value> {
        match (self.kind, value) {
            (_, Value::Null) => None,
            (FieldKind::Text, Value::String(s)) => Some(Value::String(s.trim().to_string())),
            (FieldKind::Text, Value::Array(items)) => {
                let lines: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
                Some(Value::String(lines.join("\n")))
            }
            (FieldKind::Text, other) => scalar_to_string(other).map(Value::String),
            (FieldKind::List, Value::Array(items)) => Some(Value::Array(
                items
                    .iter()
                    .filter_map(scalar_to_string)
                    .map(Value::String)
                    .collect(),
            )),
            (FieldKind::List, Value::String(s)) => Some(Value::Array(
                split_items(s).into_iter().map(Value::String).collect(),
            )),
            (FieldKind::List, _) => None,
            (FieldKind::Flag, Value::Bool(b)) => Some(Value::Bool(*b)),
            (FieldKind::Flag, Value::String(s)) => parse_flag(s).map(Value::Bool),
            (FieldKind::Flag, _) => None,
        }
    }

    /// Convert the body of a labeled section into this field's shape.
    fn from_section(&self, body: &str) -> Option<Value> {
        match self.kind {
            FieldKind::Text => Some(Value::String(body.to_string())),
            FieldKind::List => Some(Value::Array(
                split_items(body).into_iter().map(Value::String).collect(),
            )),
            FieldKind::Flag => parse_flag(body).map(Value::Bool),
        }
    }
}

/// The expected shape of one stage's output.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    /// Builds a record from raw text when neither JSON nor markers are found.
    pub fallback: Option<fn(&str) -> Record>,
}

/// Which resolution step produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Structured,
    Sections,
    Fallback,
}

/// Parsing could not find everything it expected. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseDegradation {
    pub schema: &'static str,
    pub strategy: Strategy,
    /// Fields that fell back to their default value.
    pub defaulted: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub record: Record,
    pub strategy: Strategy,
    pub defaulted: Vec<&'static str>,
    schema: &'static str,
}

impl ParseOutcome {
    pub fn degradation(&self) -> Option<ParseDegradation> {
        if self.strategy == Strategy::Structured && self.defaulted.is_empty() {
            return None;
        }
        Some(ParseDegradation {
            schema: self.schema,
            strategy: self.strategy,
            defaulted: self.defaulted.clone(),
        })
    }

    pub fn text(&self, field: &str) -> String {
        self.record
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn list(&self, field: &str) -> Vec<String> {
        self.record
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn flag(&self, field: &str) -> bool {
        self.record
            .get(field)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Parse `raw` against `schema`. Always returns a fully populated record.
pub fn parse(raw: &str, schema: &Schema) -> ParseOutcome {
    let (mut record, strategy) = if let Some(rec) = structured(raw, schema) {
        (rec, Strategy::Structured)
    } else if let Some(rec) = sections(raw, schema) {
        (rec, Strategy::Sections)
    } else {
        let rec = schema.fallback.map(|f| f(raw)).unwrap_or_default();
        (rec, Strategy::Fallback)
    };

    let mut defaulted = Vec::new();
    for field in schema.fields {
        let usable = record.get(field.name).is_some_and(|v| !is_blank(v));
        if !usable {
            record.insert(field.name.to_string(), field.default_value());
            defaulted.push(field.name);
        }
    }
    // Keys outside the schema are dropped so the record shape is fixed.
    record.retain(|k, _| schema.fields.iter().any(|f| f.name == k));

    let outcome = ParseOutcome {
        record,
        strategy,
        defaulted,
        schema: schema.name,
    };
    if let Some(d) = outcome.degradation() {
        if d.strategy == Strategy::Structured {
            tracing::debug!(schema = d.schema, defaulted = ?d.defaulted, "Fields defaulted");
        } else {
            tracing::warn!(
                schema = d.schema,
                strategy = ?d.strategy,
                defaulted = ?d.defaulted,
                "Model output was not structured, degraded parse"
            );
        }
    }
    outcome
}

/// Outermost `{ ... }` span parsed as a JSON object.
fn structured(raw: &str, schema: &Schema) -> Option<Record> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let parsed: Value = match serde_json::from_str(&raw[start..=end]) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(schema = schema.name, error = %e, "Embedded JSON did not parse");
            return None;
        }
    };
    let Value::Object(map) = parsed else {
        return None;
    };
    // A quoted snippet that shares no key with the schema is not the answer.
    if !schema.fields.iter().any(|f| map.contains_key(f.name)) {
        tracing::debug!(schema = schema.name, "Embedded JSON has no schema keys");
        return None;
    }

    let mut record = Record::new();
    for field in schema.fields {
        if let Some(v) = map.get(field.name).and_then(|v| field.coerce(v)) {
            record.insert(field.name.to_string(), v);
        }
    }
    Some(record)
}

/// Split text on the schema's `[MARKER]` headings. `None` if no marker appears.
fn sections(raw: &str, schema: &Schema) -> Option<Record> {
    let mut boundaries: Vec<usize> = schema
        .fields
        .iter()
        .flat_map(|f| raw.match_indices(f.marker).map(|(i, _)| i))
        .collect();
    if boundaries.is_empty() {
        return None;
    }
    boundaries.sort_unstable();

    let mut record = Record::new();
    for field in schema.fields {
        let Some(start) = raw.find(field.marker) else {
            continue;
        };
        let body_start = start + field.marker.len();
        let body_end = boundaries
            .iter()
            .copied()
            .find(|&b| b >= body_start)
            .unwrap_or(raw.len());
        let body = clean_section(&raw[body_start..body_end]);
        if let Some(v) = field.from_section(body) {
            record.insert(field.name.to_string(), v);
        }
    }
    Some(record)
}

/// Drop whitespace and markdown emphasis left around a heading.
fn clean_section(body: &str) -> &str {
    body.trim()
        .trim_start_matches([':', '*'])
        .trim_end_matches(['*', '#'])
        .trim()
}

fn split_items(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| BULLET.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn parse_flag(text: &str) -> Option<bool> {
    let word = text
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_lowercase();
    match word.as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        other => Some(other.to_string()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
