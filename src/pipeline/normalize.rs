//! Turn raw completion text into typed results, tolerating malformed output.
//!
//! JSON recovery is an ordered list of parsing strategies; the first one that
//! yields a JSON object wins. When every strategy fails the normalizer
//! degrades to a best-effort result instead of failing: classification
//! becomes `Uncertain`, extraction keeps the raw text. Nothing in this module
//! returns an error to the pipeline.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::classification::ClassificationResult;
use crate::models::enums::{Confidence, PrimaryCategory, SecondaryCategory};
use crate::models::extraction::{DocumentMetadata, ExtractionResult, KeyValuePair};

use super::dates::canonicalize_extraction_dates;
use super::taxonomy::taxonomy;

pub type JsonObject = Map<String, Value>;

/// No parsing strategy recovered a JSON object. Never leaves this module's
/// callers: it is converted into a degraded result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed model response: {0}")]
pub(crate) struct MalformedResponse(String);

/// Upper bound on `{` positions tried by the balanced-object strategy.
const MAX_OBJECT_CANDIDATES: usize = 64;

const FENCE: &str = "```";

const PARSE_FAILURE_EXPLANATION: &str =
    "The classification response could not be parsed, so the document was not classified.";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("valid regex")
});

static FENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid regex"));

// ──────────────────────────────────────────────
// Fallback chain
// ──────────────────────────────────────────────

type ParseStrategy = fn(&str) -> Option<JsonObject>;

/// Ordered recovery strategies. Each one runs only if all earlier ones failed.
const PARSE_STRATEGIES: &[(&str, ParseStrategy)] = &[
    ("direct", parse_direct),
    ("fenced_block", parse_fenced_block),
    ("stripped_fences", parse_stripped_fences),
    ("balanced_object", parse_balanced_object),
];

fn parse_object(text: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_direct(raw: &str) -> Option<JsonObject> {
    parse_object(raw)
}

/// Contents of the first fenced block.
fn parse_fenced_block(raw: &str) -> Option<JsonObject> {
    if !raw.contains(FENCE) {
        return None;
    }
    let block = FENCED_BLOCK.captures(raw)?.get(1)?.as_str();
    parse_object(block)
}

/// Remove every fence marker and parse what remains.
fn parse_stripped_fences(raw: &str) -> Option<JsonObject> {
    if !raw.contains(FENCE) {
        return None;
    }
    parse_object(&FENCE_MARKER.replace_all(raw, ""))
}

/// First balanced `{...}` substring that parses as an object.
fn parse_balanced_object(raw: &str) -> Option<JsonObject> {
    raw.match_indices('{')
        .take(MAX_OBJECT_CANDIDATES)
        .filter_map(|(start, _)| {
            let len = balanced_object_len(&raw[start..])?;
            Some(&raw[start..start + len])
        })
        .find_map(parse_object)
}

/// Byte length of the balanced object starting at `text[0] == '{'`, skipping
/// braces inside JSON strings.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Run the fallback chain over a raw completion.
pub(crate) fn parse_json_object(raw: &str) -> Result<JsonObject, MalformedResponse> {
    for (name, strategy) in PARSE_STRATEGIES {
        if let Some(object) = strategy(raw) {
            tracing::debug!(strategy = name, "Model response parsed");
            return Ok(object);
        }
    }
    Err(MalformedResponse(format!(
        "no JSON object found in {} characters of output",
        raw.chars().count()
    )))
}

// ──────────────────────────────────────────────
// Lenient field access
// ──────────────────────────────────────────────

fn field<'a>(object: &'a JsonObject, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| object.get(*name).filter(|v| !v.is_null()))
}

/// Scalar as text; blanks and placeholder values read as absent.
fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let placeholder = matches!(
        text.to_ascii_lowercase().as_str(),
        "" | "null" | "none" | "n/a" | "not found" | "unknown"
    );
    (!placeholder).then_some(text)
}

fn text_field(object: &JsonObject, names: &[&str]) -> Option<String> {
    field(object, names).and_then(value_as_text)
}

// ──────────────────────────────────────────────
// Classification
// ──────────────────────────────────────────────

/// Normalize a classification completion. Never fails.
pub fn normalize_classification(raw: &str) -> ClassificationResult {
    match parse_json_object(raw) {
        Ok(object) => classification_from_object(&object),
        Err(e) => {
            tracing::warn!(error = %e, "Classification response unparsable, returning Uncertain");
            ClassificationResult::uncertain(PARSE_FAILURE_EXPLANATION)
        }
    }
}

fn classification_from_object(object: &JsonObject) -> ClassificationResult {
    let registry = taxonomy();

    let specific_label = text_field(
        object,
        &["specificDocumentType", "specific_document_type", "documentType", "document_type"],
    );
    let known_type = specific_label.as_deref().and_then(|s| registry.get(s));
    let filed_under = specific_label.as_deref().and_then(|s| registry.category_for(s));
    let specific_document_type = known_type
        .map(|entry| entry.name.to_string())
        .or(specific_label);

    let primary_label = text_field(object, &["primaryCategory", "primary_category", "category"]);
    let primary_category = match primary_label.as_deref() {
        Some(label) if registry.is_known_primary_category(label) => {
            PrimaryCategory::from_str(label).unwrap_or(PrimaryCategory::Uncertain)
        }
        _ => {
            let inferred = filed_under.map(|(primary, _)| primary);
            tracing::warn!(
                label = ?primary_label,
                inferred = ?inferred,
                "Primary category not in taxonomy"
            );
            inferred.unwrap_or(PrimaryCategory::Uncertain)
        }
    };

    let secondary_label =
        text_field(object, &["secondaryCategory", "secondary_category", "subCategory"]);
    let secondary_category = match secondary_label.as_deref() {
        Some(label) if registry.is_valid_secondary(primary_category.as_str(), label) => {
            SecondaryCategory::from_str(label).ok()
        }
        Some(_) if !primary_category.accepts_secondary() => {
            tracing::warn!(
                primary = %primary_category,
                "Dropping secondary category reported under a non-certificate primary"
            );
            None
        }
        _ => filed_under
            .filter(|(primary, _)| *primary == primary_category)
            .and_then(|(_, secondary)| secondary),
    };

    let confidence = text_field(object, &["confidence"])
        .and_then(|c| Confidence::from_str(&c).ok())
        .unwrap_or(Confidence::Low);

    let explanation = text_field(object, &["explanation", "reasoning", "reason"]).unwrap_or_default();

    ClassificationResult {
        primary_category,
        secondary_category,
        specific_document_type,
        confidence,
        explanation,
    }
}

// ──────────────────────────────────────────────
// Extraction
// ──────────────────────────────────────────────

/// Normalize an extraction completion and canonicalize its dates. Never fails.
pub fn normalize_extraction(raw: &str) -> ExtractionResult {
    match parse_json_object(raw) {
        Ok(object) => {
            let mut result = extraction_from_object(&object);
            canonicalize_extraction_dates(&mut result);
            result
        }
        Err(e) => {
            tracing::warn!(error = %e, "Extraction response unparsable, keeping raw text");
            ExtractionResult::raw_text_only(raw)
        }
    }
}

fn extraction_from_object(object: &JsonObject) -> ExtractionResult {
    let full_text = match field(object, &["fullText", "full_text", "text"]) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => value_as_text(other).unwrap_or_default(),
        None => String::new(),
    };

    let metadata = match field(object, &["metadata"]) {
        Some(Value::Object(inner)) => metadata_from_object(inner),
        _ => metadata_from_object(object),
    };

    let key_value_pairs = field(object, &["keyValuePairs", "key_value_pairs", "fields"])
        .map(key_value_pairs_from_value)
        .unwrap_or_default();

    ExtractionResult {
        full_text,
        metadata,
        key_value_pairs,
    }
}

fn metadata_from_object(object: &JsonObject) -> DocumentMetadata {
    DocumentMetadata {
        document_title: text_field(object, &["documentTitle", "document_title", "title"]),
        document_type: text_field(object, &["documentType", "document_type"]),
        document_number: text_field(
            object,
            &["documentNumber", "document_number", "certificateNumber", "certificate_number"],
        ),
        vessel_name: text_field(object, &["vesselName", "vessel_name", "shipName", "ship_name"]),
        imo_number: text_field(object, &["imoNumber", "imo_number", "imo"]).map(strip_imo_prefix),
        issuer: text_field(object, &["issuer", "issuedBy", "issued_by"]),
        issue_date: text_field(object, &["issueDate", "issue_date", "dateOfIssue"]),
        expiry_date: text_field(object, &["expiryDate", "expiry_date", "validUntil", "valid_until"]),
    }
}

/// "IMO 9321483" → "9321483".
fn strip_imo_prefix(imo: String) -> String {
    let has_prefix = imo
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("imo"));
    if has_prefix {
        imo[3..].trim_start_matches([' ', ':', '.', '-']).trim().to_string()
    } else {
        imo
    }
}

/// Accepts `[{"key": .., "value": ..}, ..]` or a plain `{"key": "value"}` object.
fn key_value_pairs_from_value(value: &Value) -> Vec<KeyValuePair> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let pair = item.as_object()?;
                let key = text_field(pair, &["key", "label", "name", "field"])?;
                let value = text_field(pair, &["value", "text"]).unwrap_or_default();
                Some(KeyValuePair { key, value })
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| KeyValuePair {
                key: key.trim().to_string(),
                value: value_as_text(value).unwrap_or_default(),
            })
            .collect(),
        _ => Vec::new(),
    }
}
