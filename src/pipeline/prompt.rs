//! System/user prompt construction for classification and extraction.
//!
//! Both prompts pin the response schema (field names and nesting) so the
//! normalizer can rely on a known shape on the happy path. Building a prompt
//! never fails.

use std::fmt::Write as _;
use std::sync::LazyLock;

use crate::models::classification::DocumentContent;
use crate::models::enums::{PrimaryCategory, SecondaryCategory};

use super::sanitize::{escape_xml_tags, sanitize_document_text};
use super::taxonomy::{lookup_extraction_hint, taxonomy};

/// A system instruction and the text of the user turn. Any image travels
/// separately as the request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

// ──────────────────────────────────────────────
// Classification
// ──────────────────────────────────────────────

const CLASSIFICATION_PREAMBLE: &str = "\
You are a maritime document classification assistant. You classify ship, crew, \
commercial and operational documents into a fixed taxonomy. Choose ONLY from the \
vocabulary listed below; never invent a category or document type.";

const CLASSIFICATION_RULES: &str = r#"RULES:
1. primaryCategory MUST be exactly one of the primary categories listed above.
2. secondaryCategory MUST be one of the secondary categories listed above when
   primaryCategory is "Vessel Certificate", and MUST be null otherwise.
3. specificDocumentType MUST be one of the specific document types listed above,
   or null when none fits.
4. confidence MUST be "High", "Medium" or "Low".
5. explanation is one or two sentences citing the evidence in the document.

OUTPUT FORMAT:
Return ONLY a raw JSON object with exactly these fields. Do NOT wrap it in
markdown code fences and do NOT add any text before or after it.
{
  "primaryCategory": "string",
  "secondaryCategory": "string or null",
  "specificDocumentType": "string or null",
  "confidence": "High | Medium | Low",
  "explanation": "string"
}"#;

/// Render the full taxonomy as the fixed vocabulary block of the prompt.
fn render_taxonomy() -> String {
    let registry = taxonomy();
    let mut out = String::from("PRIMARY CATEGORIES:\n");

    for primary in PrimaryCategory::taxonomy() {
        let _ = writeln!(out, "- {primary}");
    }

    let _ = writeln!(
        out,
        "\nSECONDARY CATEGORIES (only under \"{}\"):",
        PrimaryCategory::VesselCertificate
    );
    for secondary in SecondaryCategory::all() {
        let _ = writeln!(out, "- {secondary}");
    }

    out.push_str("\nSPECIFIC DOCUMENT TYPES:\n");
    for primary in PrimaryCategory::taxonomy() {
        if primary.accepts_secondary() {
            for secondary in SecondaryCategory::all() {
                let names: Vec<_> = registry
                    .document_types_under(primary, Some(*secondary))
                    .map(|e| e.name)
                    .collect();
                let _ = writeln!(out, "{primary} / {secondary}: {}", names.join("; "));
            }
        } else {
            let names: Vec<_> = registry
                .document_types_under(primary, None)
                .map(|e| e.name)
                .collect();
            let _ = writeln!(out, "{primary}: {}", names.join("; "));
        }
    }

    out
}

static CLASSIFICATION_SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{CLASSIFICATION_PREAMBLE}\n\n{}\n{CLASSIFICATION_RULES}",
        render_taxonomy()
    )
});

/// The classification system prompt, with the taxonomy embedded verbatim.
pub fn classification_system_prompt() -> &'static str {
    &CLASSIFICATION_SYSTEM_PROMPT
}

fn hint_line(file_type_hint: Option<&str>) -> String {
    file_type_hint
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| format!("File type: {h}\n"))
        .unwrap_or_default()
}

/// Build the classification prompt.
///
/// Text content is sanitized and enclosed in `<document>` tags; image content
/// gets an instruction-only user turn (the image is attached by the caller).
pub fn build_classification_prompt(
    content: &DocumentContent,
    file_type_hint: Option<&str>,
) -> PromptPair {
    match content {
        DocumentContent::Text(text) => {
            build_sanitized_text_prompt(&sanitize_document_text(text), file_type_hint)
        }
        DocumentContent::Image(_) => PromptPair {
            system: classification_system_prompt().to_string(),
            user: format!(
                "{}Classify the attached document image. Respond with the JSON object only.",
                hint_line(file_type_hint)
            ),
        },
    }
}

/// Classification prompt for text already passed through
/// [`sanitize_document_text`].
pub fn build_sanitized_text_prompt(sanitized: &str, file_type_hint: Option<&str>) -> PromptPair {
    PromptPair {
        system: classification_system_prompt().to_string(),
        user: format!(
            "{}<document>\n{}\n</document>\n\n\
             Classify the document above. Respond with the JSON object only.",
            hint_line(file_type_hint),
            escape_xml_tags(sanitized)
        ),
    }
}

// ──────────────────────────────────────────────
// Extraction
// ──────────────────────────────────────────────

const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a maritime document OCR and data extraction assistant. You read images of
ship certificates, crew documents, survey reports, commercial papers and logs.

RULES:
1. Extract ALL visible text, top to bottom, including stamps, endorsements,
   handwritten entries and footnotes.
2. Preserve tables as Markdown tables, keeping every row and column.
3. When a character or word cannot be read with confidence, write your best
   reading as [unclear: reading]. Never silently guess.
4. Write every date in metadata and keyValuePairs as DD/MM/YYYY.
5. IMO numbers are seven digits; copy them without the "IMO" prefix.
6. Use null for any metadata field that is not present in the document.
7. keyValuePairs lists every labelled field in the order it appears.

OUTPUT FORMAT:
Return ONLY a raw JSON object with exactly these fields. Do NOT wrap it in
markdown code fences.
{
  "fullText": "all extracted text",
  "metadata": {
    "documentTitle": "string or null",
    "documentType": "string or null",
    "documentNumber": "string or null",
    "vesselName": "string or null",
    "imoNumber": "string or null",
    "issuer": "string or null",
    "issueDate": "DD/MM/YYYY or null",
    "expiryDate": "DD/MM/YYYY or null"
  },
  "keyValuePairs": [
    {"key": "field label", "value": "field value"}
  ]
}
"#;

const EXTRACTION_USER_PROMPT: &str =
    "Extract the text and fields from the attached document image. Respond with the JSON object only.";

/// Build the extraction prompt. A known document-type hint appends that type's
/// instructions to the base rules; an unknown hint adds nothing.
pub fn build_extraction_prompt(document_type_hint: Option<&str>) -> PromptPair {
    let mut system = EXTRACTION_SYSTEM_PROMPT.trim().to_string();

    if let Some(document_type) = document_type_hint.map(str::trim) {
        let hint = lookup_extraction_hint(document_type);
        if !hint.is_empty() {
            let _ = write!(
                system,
                "\n\nDOCUMENT-SPECIFIC INSTRUCTIONS ({document_type}):\n{hint}"
            );
        }
    }

    PromptPair {
        system,
        user: EXTRACTION_USER_PROMPT.to_string(),
    }
}
