pub mod config;
pub mod models;
pub mod pipeline;

pub use models::{ClassificationResult, DocumentAnalysis, DocumentContent, ExtractionResult};
pub use pipeline::{DocumentPipeline, PipelineError};

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber. `RUST_LOG` overrides the default filter.
/// Logs go to stderr so stdout stays clean for JSON output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
