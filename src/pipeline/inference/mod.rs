//! Boundary to the external multimodal completion service.
//!
//! The pipeline talks to the service only through [`InferenceClient`], so
//! tests inject [`MockInferenceClient`] and production code injects
//! [`HttpInferenceClient`].

pub mod client;
pub mod image;
pub mod mock;

pub use client::HttpInferenceClient;
pub use image::ImagePayload;
pub use mock::MockInferenceClient;

use async_trait::async_trait;

use super::prompt::PromptPair;

/// Sampling temperature for every pipeline call. Low to bias the model
/// toward deterministic structured output.
pub const PIPELINE_TEMPERATURE: f32 = 0.1;

/// Per-request generation options.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOptions {
    pub temperature: f32,
    /// Ask the service for JSON-formatted output where it supports it.
    pub json_output: bool,
    pub max_tokens: Option<u32>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            temperature: PIPELINE_TEMPERATURE,
            json_output: true,
            max_tokens: None,
        }
    }
}

impl InferenceOptions {
    pub fn classification() -> Self {
        Self {
            max_tokens: Some(512),
            ..Self::default()
        }
    }

    pub fn extraction() -> Self {
        Self {
            max_tokens: Some(4096),
            ..Self::default()
        }
    }
}

/// One chat-style completion request: system instruction, user turn, and an
/// optional inline image attached to the user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub prompt: PromptPair,
    pub image: Option<ImagePayload>,
    pub options: InferenceOptions,
}

/// Transport-level failures. Malformed model output is never an
/// `InferenceError`; the normalizer absorbs it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("Inference service rejected the credential (HTTP 401): {0}")]
    Authentication(String),

    #[error("Inference service rate limit reached (HTTP 429){}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Inference service returned an error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Inference request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from inference service: {0}")]
    ResponseParsing(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|s| format!(", retry after {s}s"))
        .unwrap_or_default()
}

impl InferenceError {
    /// Upstream HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication(_) => Some(401),
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller-side retry could plausibly succeed. The pipeline
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Authentication(_) | Self::ResponseParsing(_) => false,
        }
    }
}

/// Completion service abstraction (allows mocking).
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Submit one request and return the raw completion text.
    async fn infer(&self, request: &InferenceRequest) -> Result<String, InferenceError>;
}
