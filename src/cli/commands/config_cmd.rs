//! Configuration management commands.

use std::path::Path;

use console::style;

use crate::cli::icons::{dim_arrow, error, success};
use crate::config::{Config, Settings};

/// Print the effective settings and where they came from.
pub fn cmd_config_show(config: &Config, settings: &Settings) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults (no config file)".to_string());
    println!("{} {}", style("Config:").bold(), source);

    for (name, value) in settings.summary() {
        println!("  {} {:<18} {}", dim_arrow(), name, value);
    }
    Ok(())
}

/// Parse a config file and report the result.
pub async fn cmd_config_check(file: Option<&Path>) -> anyhow::Result<()> {
    let config = match file {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            match Config::load_from_path(path).await {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{} {}", error(), e);
                    anyhow::bail!("Invalid config file: {}", path.display());
                }
            }
        }
        None => {
            let loaded = Config::load().await;
            if loaded.source_path.is_none() {
                anyhow::bail!("No config file found. Pass a path to check.");
            }
            loaded
        }
    };

    let path = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    eprintln!("{} {} is valid", success(), path);
    Ok(())
}
