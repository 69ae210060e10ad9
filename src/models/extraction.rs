use serde::{Deserialize, Serialize};

/// Document-level fields pulled out of an extracted page. Dates are canonical
/// `DD/MM/YYYY` whenever the source value could be understood.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub document_title: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub vessel_name: Option<String>,
    pub imo_number: Option<String>,
    pub issuer: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of OCR-style extraction from a document image.
///
/// `key_value_pairs` keeps the order in which the model reported the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub full_text: String,
    pub metadata: DocumentMetadata,
    pub key_value_pairs: Vec<KeyValuePair>,
}

impl ExtractionResult {
    /// Terminal fallback: keep the raw model output as the text, nothing structured.
    pub fn raw_text_only(raw: impl Into<String>) -> Self {
        Self {
            full_text: raw.into(),
            ..Self::default()
        }
    }

    /// Value of the first pair whose key matches case-insensitively.
    pub fn value_for(&self, key: &str) -> Option<&str> {
        self.key_value_pairs
            .iter()
            .find(|kv| kv.key.eq_ignore_ascii_case(key))
            .map(|kv| kv.value.as_str())
    }
}
