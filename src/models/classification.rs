use serde::{Deserialize, Serialize};

use super::enums::{Confidence, PrimaryCategory, SecondaryCategory};
use super::extraction::ExtractionResult;

/// What the caller hands to classification: extracted text or the page image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
    Text(String),
    Image(Vec<u8>),
}

impl DocumentContent {
    /// True when there is nothing to classify (whitespace-only text counts as empty).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Image(bytes) => bytes.is_empty(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }
}

/// Normalized classification of a single document.
///
/// `secondary_category` is only ever populated when `primary_category` is
/// `VesselCertificate`; the normalizer enforces this before a result is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub primary_category: PrimaryCategory,
    pub secondary_category: Option<SecondaryCategory>,
    pub specific_document_type: Option<String>,
    pub confidence: Confidence,
    pub explanation: String,
}

impl ClassificationResult {
    /// Terminal fallback used when the model's answer cannot be parsed.
    pub fn uncertain(explanation: impl Into<String>) -> Self {
        Self {
            primary_category: PrimaryCategory::Uncertain,
            secondary_category: None,
            specific_document_type: None,
            confidence: Confidence::Low,
            explanation: explanation.into(),
        }
    }

    pub fn is_uncertain(&self) -> bool {
        self.primary_category == PrimaryCategory::Uncertain
    }
}

/// Envelope returned by the combined classify-then-extract flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub classification: ClassificationResult,
    pub extraction: ExtractionResult,
}
