use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use vesseldoc::config::{InferenceConfig, APP_VERSION};
use vesseldoc::pipeline::HttpInferenceClient;
use vesseldoc::{DocumentContent, DocumentPipeline};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Parser, Debug)]
#[command(name = "vesseldoc", version, about = "Classify and extract maritime documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a text file, or an image file by extension
    Classify {
        file: PathBuf,
        /// File type hint passed to the classifier (defaults to the file extension)
        #[arg(long)]
        hint: Option<String>,
    },
    /// Extract text, metadata and labelled fields from a document image
    Extract {
        image: PathBuf,
        /// Known document type, e.g. "Safety Management Certificate"
        #[arg(long)]
        hint: Option<String>,
    },
    /// Classify an image, then extract it using the classified type
    Analyze { image: PathBuf },
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn is_image(path: &Path) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing result")?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    vesseldoc::init_tracing();
    let cli = Cli::parse();

    let config = InferenceConfig::from_env()?;
    tracing::info!(version = APP_VERSION, model = %config.model, "vesseldoc starting");

    let client = HttpInferenceClient::new(&config)?;
    let pipeline = DocumentPipeline::new(Arc::new(client));

    match cli.command {
        Command::Classify { file, hint } => {
            let bytes = read(&file)?;
            let content = if is_image(&file) {
                DocumentContent::Image(bytes)
            } else {
                DocumentContent::Text(
                    String::from_utf8(bytes)
                        .with_context(|| format!("{} is not UTF-8 text", file.display()))?,
                )
            };
            let hint = hint.or_else(|| extension(&file));
            let result = pipeline.classify_document(content, hint.as_deref()).await?;
            print_json(&result)
        }
        Command::Extract { image, hint } => {
            let bytes = read(&image)?;
            let result = pipeline.extract(&bytes, hint.as_deref()).await?;
            print_json(&result)
        }
        Command::Analyze { image } => {
            let bytes = read(&image)?;
            let result = pipeline.analyze(&bytes, extension(&image).as_deref()).await?;
            print_json(&result)
        }
    }
}
