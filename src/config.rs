use std::fmt;

/// Application-level constants
pub const APP_NAME: &str = "vesseldoc";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variables read by [`InferenceConfig::from_env`].
pub const API_KEY_VAR: &str = "VESSELDOC_API_KEY";
pub const FALLBACK_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "VESSELDOC_BASE_URL";
pub const MODEL_VAR: &str = "VESSELDOC_MODEL";
pub const TIMEOUT_VAR: &str = "VESSELDOC_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "vesseldoc=info,warn"
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("No inference API key configured: set VESSELDOC_API_KEY (or OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("Invalid VESSELDOC_TIMEOUT_SECS value '{0}': expected a whole number of seconds")]
    InvalidTimeout(String),
}

/// Connection settings for the inference service.
#[derive(Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl InferenceConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(API_KEY_VAR)
            .or_else(|| get(FALLBACK_API_KEY_VAR))
            .ok_or(ConfigError::MissingApiKey)?;

        let timeout_secs = match get(TIMEOUT_VAR) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs,
        })
    }
}
