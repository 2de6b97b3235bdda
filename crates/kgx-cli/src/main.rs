//! KGX CLI - Command-line interface
//!
//! Usage:
//!   kgx extract "Apple Inc. CEO Tim Cook announced the iPhone 15." --config kgx.toml
//!   kgx extract --file segment.txt
//!   kgx check-config --config kgx.toml

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use kgx_core::config::AppConfig;
use kgx_extractor::{ExtractionPipeline, ExtractorRegistry};

#[derive(Parser)]
#[command(name = "kgx")]
#[command(about = "Segment-level entity and relation mention extraction")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "kgx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entity and relation mentions from a text segment
    Extract {
        /// Segment text (or use --file)
        text: Option<String>,

        /// Read the segment from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Print compact JSON instead of pretty-printing
        #[arg(long)]
        compact: bool,
    },
    /// Validate the configuration and report the selected backends
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .with_env_override()?;
    init_tracing(&config);

    match cli.command {
        Commands::Extract {
            text,
            file,
            compact,
        } => {
            let segment = read_segment(text, file)?;

            let registry = ExtractorRegistry::builtin();
            let pipeline = ExtractionPipeline::from_config(&registry, &config)?;

            let result = pipeline.extract(&segment).await?;
            info!(
                entities = result.entity_mentions.len(),
                relations = result.relation_mentions.len(),
                "segment extracted"
            );

            let rendered = if compact {
                serde_json::to_string(&result)?
            } else {
                serde_json::to_string_pretty(&result)?
            };
            println!("{rendered}");
        }
        Commands::CheckConfig => {
            let registry = ExtractorRegistry::builtin();
            // Constructing the pipeline surfaces unknown backends and
            // missing model ids without touching the inference server.
            ExtractionPipeline::from_config(&registry, &config)?;

            println!("config ok");
            println!("  ner backend: {}", config.extraction.ner.backend);
            let re = &config.extraction.re;
            if re.is_disabled() || config.extraction.relation_types.is_empty() {
                println!("  re backend: disabled");
            } else {
                println!("  re backend: {}", re.backend);
            }
        }
    }

    Ok(())
}

fn read_segment(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    match (text, file) {
        (Some(text), None) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading segment from {}", path.display())),
        _ => anyhow::bail!("provide segment text as an argument or via --file"),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.logging.include_location)
        .with_line_number(config.logging.include_location);

    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
