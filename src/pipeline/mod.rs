pub mod dates;
pub mod inference;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod sanitize;
pub mod taxonomy;

#[cfg(test)]
mod scenario_tests;

pub use dates::{canonicalize_date, canonicalize_extraction_dates};
pub use inference::{
    HttpInferenceClient, InferenceClient, InferenceError, InferenceOptions, InferenceRequest,
    MockInferenceClient,
};
pub use normalize::{normalize_classification, normalize_extraction};
pub use orchestrator::{DocumentPipeline, PipelineStage};
pub use prompt::{
    build_classification_prompt, build_extraction_prompt, build_sanitized_text_prompt, PromptPair,
};
pub use taxonomy::{is_known_primary_category, is_valid_secondary, lookup_extraction_hint, taxonomy};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidInput(_) => false,
            Self::Inference(e) => e.is_retryable(),
        }
    }
}
