use std::fmt;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::inference::image::MAX_IMAGE_BYTES;
use super::inference::{ImagePayload, InferenceClient, InferenceOptions, InferenceRequest};
use super::normalize::{normalize_classification, normalize_extraction};
use super::prompt::{
    build_classification_prompt, build_extraction_prompt, build_sanitized_text_prompt,
};
use super::sanitize::sanitize_document_text;
use super::PipelineError;
use crate::models::classification::{ClassificationResult, DocumentAnalysis, DocumentContent};
use crate::models::extraction::ExtractionResult;

/// Per-request lifecycle: `Building → Invoking → Normalizing → Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Building,
    Invoking,
    Normalizing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Invoking => "invoking",
            Self::Normalizing => "normalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: PipelineStage) {
    tracing::debug!(stage = %stage, "pipeline stage");
}

/// Classification and extraction over a single injected inference client.
///
/// Every operation issues exactly one inference call (two for [`analyze`]);
/// nothing is cached or retried between calls.
///
/// [`analyze`]: DocumentPipeline::analyze
#[derive(Clone)]
pub struct DocumentPipeline {
    client: Arc<dyn InferenceClient>,
}

impl DocumentPipeline {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Classify extracted document text.
    pub async fn classify(
        &self,
        text: &str,
        file_type_hint: Option<&str>,
    ) -> Result<ClassificationResult, PipelineError> {
        self.classify_document(DocumentContent::Text(text.to_string()), file_type_hint)
            .await
    }

    /// Classify text or a page image.
    pub async fn classify_document(
        &self,
        content: DocumentContent,
        file_type_hint: Option<&str>,
    ) -> Result<ClassificationResult, PipelineError> {
        let span = tracing::info_span!(
            "classify",
            request_id = %Uuid::new_v4(),
            content = content.kind(),
        );
        self.run_classification(content, file_type_hint)
            .instrument(span)
            .await
    }

    async fn run_classification(
        &self,
        content: DocumentContent,
        file_type_hint: Option<&str>,
    ) -> Result<ClassificationResult, PipelineError> {
        enter(PipelineStage::Building);
        let request = match &content {
            DocumentContent::Text(text) => {
                let sanitized = sanitize_document_text(text);
                if sanitized.trim().is_empty() {
                    return Err(fail(PipelineError::InvalidInput(
                        "document text is empty after sanitization".into(),
                    )));
                }
                InferenceRequest {
                    prompt: build_sanitized_text_prompt(&sanitized, file_type_hint),
                    image: None,
                    options: InferenceOptions::classification(),
                }
            }
            DocumentContent::Image(bytes) => InferenceRequest {
                prompt: build_classification_prompt(&content, file_type_hint),
                image: Some(image_payload(bytes)?),
                options: InferenceOptions::classification(),
            },
        };

        let raw = self.invoke(&request).await?;

        enter(PipelineStage::Normalizing);
        let result = normalize_classification(&raw);

        enter(PipelineStage::Done);
        tracing::info!(
            primary = %result.primary_category,
            secondary = ?result.secondary_category.map(|s| s.as_str()),
            confidence = %result.confidence,
            "Document classified"
        );
        Ok(result)
    }

    /// OCR and field extraction from a page image. Dates in the result are
    /// canonical `DD/MM/YYYY` where they could be interpreted.
    pub async fn extract(
        &self,
        image: &[u8],
        document_type_hint: Option<&str>,
    ) -> Result<ExtractionResult, PipelineError> {
        let span = tracing::info_span!(
            "extract",
            request_id = %Uuid::new_v4(),
            image_bytes = image.len(),
        );
        self.run_extraction(image, document_type_hint)
            .instrument(span)
            .await
    }

    async fn run_extraction(
        &self,
        image: &[u8],
        document_type_hint: Option<&str>,
    ) -> Result<ExtractionResult, PipelineError> {
        enter(PipelineStage::Building);
        let payload = image_payload(image)?;

        let request = InferenceRequest {
            prompt: build_extraction_prompt(document_type_hint),
            image: Some(payload),
            options: InferenceOptions::extraction(),
        };

        let raw = self.invoke(&request).await?;

        enter(PipelineStage::Normalizing);
        let result = normalize_extraction(&raw);

        enter(PipelineStage::Done);
        tracing::info!(
            text_chars = result.full_text.chars().count(),
            pairs = result.key_value_pairs.len(),
            "Document extracted"
        );
        Ok(result)
    }

    /// Classify an image, then extract it using the classified document type as
    /// the extraction hint.
    pub async fn analyze(
        &self,
        image: &[u8],
        file_type_hint: Option<&str>,
    ) -> Result<DocumentAnalysis, PipelineError> {
        validate_image(image)?;

        let classification = self
            .classify_document(DocumentContent::Image(image.to_vec()), file_type_hint)
            .await?;
        let extraction = self
            .extract(image, classification.specific_document_type.as_deref())
            .await?;

        Ok(DocumentAnalysis {
            classification,
            extraction,
        })
    }

    async fn invoke(&self, request: &InferenceRequest) -> Result<String, PipelineError> {
        enter(PipelineStage::Invoking);
        match self.client.infer(request).await {
            Ok(raw) => {
                tracing::debug!(response_chars = raw.len(), "Inference response received");
                Ok(raw)
            }
            Err(e) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "Inference failed");
                Err(fail(e.into()))
            }
        }
    }
}

fn validate_image(bytes: &[u8]) -> Result<(), PipelineError> {
    if bytes.is_empty() {
        return Err(fail(PipelineError::InvalidInput(
            "image data is empty".into(),
        )));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(fail(PipelineError::InvalidInput(format!(
            "image is {} bytes, limit is {MAX_IMAGE_BYTES}",
            bytes.len()
        ))));
    }
    Ok(())
}

fn image_payload(bytes: &[u8]) -> Result<ImagePayload, PipelineError> {
    validate_image(bytes)?;
    Ok(ImagePayload::from_bytes(bytes))
}

fn fail(error: PipelineError) -> PipelineError {
    enter(PipelineStage::Failed);
    error
}
