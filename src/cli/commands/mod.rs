//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod process;
mod replay;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::insights::InsightOptions;
use crate::models::FeatureSet;

#[derive(Parser)]
#[command(name = "docinsight")]
#[command(about = "Document layout analysis and text insight extraction")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Layout features to extract.
#[derive(Args, Debug, Clone)]
pub struct FeatureArgs {
    /// Extract text
    #[arg(long)]
    text: bool,
    /// Extract form key/value pairs
    #[arg(long)]
    forms: bool,
    /// Extract tables
    #[arg(long)]
    tables: bool,
}

impl FeatureArgs {
    fn feature_set(&self) -> FeatureSet {
        FeatureSet::new(self.text, self.forms, self.tables)
    }
}

/// Insight categories to extract from page text.
#[derive(Args, Debug, Clone)]
pub struct InsightArgs {
    /// Sentiment, syntax, entities and key phrases
    #[arg(long)]
    insights: bool,
    /// Medical entities and protected health information
    #[arg(long)]
    medical_insights: bool,
    /// Translate page text into this language code
    #[arg(long, value_name = "LANG")]
    translate: Option<String>,
}

impl InsightArgs {
    /// An empty `--translate` value requests no translation.
    fn options(&self, language: &str) -> InsightOptions {
        InsightOptions {
            general: self.insights,
            medical: self.medical_insights,
            translate_to: self.translate.clone().filter(|t| !t.is_empty()),
            language: language.to_string(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze documents and write layout and insight reports
    Process {
        /// Document, folder of images, or s3://bucket/key
        #[arg(short, long)]
        documents: String,
        /// Service region (overrides config)
        #[arg(long)]
        region: Option<String>,
        #[command(flatten)]
        features: FeatureArgs,
        #[command(flatten)]
        insights: InsightArgs,
        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pause between documents in seconds (overrides config)
        #[arg(long)]
        pause: Option<u64>,
    },

    /// Rebuild reports from a saved analysis response without a new analysis job
    Replay {
        /// Saved `-response.json` (array of payloads or a single payload)
        response: PathBuf,
        /// Document name used for artifact names (default: response file stem)
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        features: FeatureArgs,
        #[command(flatten)]
        insights: InsightArgs,
        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Check that a config file parses
    Check {
        /// Config file (default: discovered file)
        file: Option<PathBuf>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))?,
        None => Config::load().await,
    };
    let mut settings = config.to_settings();

    match cli.command {
        Commands::Process {
            documents,
            region,
            features,
            insights,
            output,
            pause,
        } => {
            if let Some(region) = region {
                settings.region = region;
            }
            if let Some(dir) = output {
                settings.output_dir = dir;
            }
            if let Some(secs) = pause {
                settings.document_pause = std::time::Duration::from_secs(secs);
            }
            let options = insights.options(&settings.language);
            process::cmd_process(&settings, &documents, features.feature_set(), &options).await
        }
        Commands::Replay {
            response,
            name,
            features,
            insights,
            output,
        } => {
            if let Some(dir) = output {
                settings.output_dir = dir;
            }
            let options = insights.options(&settings.language);
            replay::cmd_replay(
                &settings,
                &response,
                name.as_deref(),
                features.feature_set(),
                &options,
            )
            .await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&config, &settings),
            ConfigCommands::Check { file } => config_cmd::cmd_config_check(file.as_deref()).await,
        },
    }
}
