//! Configuration management for docinsight using the prefer crate.
//!
//! A config file (TOML, YAML or JSON) is either given explicitly or
//! discovered by prefer. Its values are layered over [`Settings`] defaults,
//! and a few connection settings can be overridden from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::{ProcessorOptions, RetryPolicy};
use crate::insights::DEFAULT_SEGMENT_LENGTH;
use crate::services::GatewayConfig;

/// Environment variable overriding the gateway endpoint.
pub const ENDPOINT_ENV: &str = "DOCINSIGHT_ENDPOINT";
/// Environment variable holding the gateway API key.
pub const API_KEY_ENV: &str = "DOCINSIGHT_API_KEY";
/// Environment variable overriding the service region.
pub const REGION_ENV: &str = "DOCINSIGHT_REGION";

/// Effective application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Gateway base URL.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub region: String,
    /// Directory that receives all report artifacts.
    pub output_dir: PathBuf,
    /// Pause before each job status query.
    pub poll_interval: Duration,
    /// Budget for polling and pagination of one job (None = unbounded).
    pub poll_timeout: Option<Duration>,
    /// Pause between documents of a batch, measured from completion.
    pub document_pause: Duration,
    /// Minimum spacing of calls to the same service.
    pub service_delay: Duration,
    /// Maximum insight segment length in characters.
    pub segment_length: usize,
    /// Language code of document text.
    pub language: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_result_pages: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            api_key: None,
            region: "us-east-1".to_string(),
            output_dir: PathBuf::from("."),
            poll_interval: Duration::from_secs(5),
            poll_timeout: Some(Duration::from_secs(1800)),
            document_pause: Duration::from_secs(20),
            service_delay: Duration::from_millis(100),
            segment_length: DEFAULT_SEGMENT_LENGTH,
            language: "en".to_string(),
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            max_result_pages: None,
        }
    }
}

impl Settings {
    /// Apply `DOCINSIGHT_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.is_empty() {
                self.endpoint = endpoint;
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(region) = std::env::var(REGION_ENV) {
            if !region.is_empty() {
                self.region = region;
            }
        }
        self
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            region: self.region.clone(),
            request_timeout: self.request_timeout,
        }
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            poll_interval: self.poll_interval,
            poll_timeout: self.poll_timeout,
            retry: self.retry.clone(),
            max_result_pages: self.max_result_pages,
        }
    }

    /// Name/value pairs for display, with the API key masked.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let secs = |d: Duration| format!("{}s", d.as_secs_f64());
        vec![
            ("endpoint", self.endpoint.clone()),
            (
                "api_key",
                if self.api_key.is_some() {
                    "(set)".to_string()
                } else {
                    "(not set)".to_string()
                },
            ),
            ("region", self.region.clone()),
            ("output_dir", self.output_dir.display().to_string()),
            ("poll_interval", secs(self.poll_interval)),
            (
                "poll_timeout",
                self.poll_timeout
                    .map(secs)
                    .unwrap_or_else(|| "unbounded".to_string()),
            ),
            ("document_pause", secs(self.document_pause)),
            ("service_delay", secs(self.service_delay)),
            ("segment_length", self.segment_length.to_string()),
            ("language", self.language.clone()),
            ("request_timeout", secs(self.request_timeout)),
            (
                "retry",
                format!(
                    "{} attempts, {}..{}",
                    self.retry.max_attempts,
                    secs(self.retry.base_delay),
                    secs(self.retry.max_delay)
                ),
            ),
            (
                "max_result_pages",
                self.max_result_pages
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unbounded".to_string()),
            ),
        ]
    }
}

/// Retry section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct RetryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl RetryConfig {
    pub fn is_default(&self) -> bool {
        self.max_attempts.is_none() && self.base_delay_ms.is_none() && self.max_delay_ms.is_none()
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Gateway base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Gateway API key. Prefer the environment for secrets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Output directory, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    /// 0 disables the timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_pause_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_result_pages: Option<u64>,
    #[serde(default, skip_serializing_if = "RetryConfig::is_default")]
    #[prefer(default)]
    pub retry: RetryConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no config file is found.
    pub async fn load() -> Self {
        match prefer::load("docinsight").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// The format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the config file, if it was loaded from one.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// `~` is expanded; relative paths are joined onto `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Layer this config over `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref endpoint) = self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(ref key) = self.api_key {
            settings.api_key = Some(key.clone());
        }
        if let Some(ref region) = self.region {
            settings.region = region.clone();
        }
        if let Some(ref dir) = self.output_dir {
            settings.output_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(secs) = self.poll_interval_secs {
            settings.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_timeout_secs {
            settings.poll_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = self.document_pause_secs {
            settings.document_pause = Duration::from_secs(secs);
        }
        if let Some(ms) = self.service_delay_ms {
            settings.service_delay = Duration::from_millis(ms);
        }
        if let Some(len) = self.segment_length {
            settings.segment_length = len as usize;
        }
        if let Some(ref language) = self.language {
            settings.language = language.clone();
        }
        if let Some(secs) = self.request_timeout {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_result_pages {
            settings.max_result_pages = Some(max as usize);
        }
        if let Some(attempts) = self.retry.max_attempts {
            settings.retry.max_attempts = attempts.min(u32::MAX as u64) as u32;
        }
        if let Some(ms) = self.retry.base_delay_ms {
            settings.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry.max_delay_ms {
            settings.retry.max_delay = Duration::from_millis(ms);
        }
    }

    /// Defaults, then this config, then environment overrides.
    pub fn to_settings(&self) -> Settings {
        let mut settings = Settings::default();
        let base_dir = self
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        self.apply_to_settings(&mut settings, &base_dir);
        settings.with_env_overrides()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_toml_and_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docinsight.toml");
        std::fs::write(
            &path,
            r#"
endpoint = "https://gateway.internal"
region = "eu-west-1"
output_dir = "reports"
poll_timeout_secs = 0
segment_length = 500

[retry]
max_attempts = 2
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());

        assert_eq!(settings.endpoint, "https://gateway.internal");
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.output_dir, dir.path().join("reports"));
        assert_eq!(settings.poll_timeout, None);
        assert_eq!(settings.segment_length, 500);
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.base_delay, Duration::from_millis(500));
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docinsight.yaml");
        std::fs::write(&path, "language: es\ndocument_pause_secs: 3\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();

        assert_eq!(config.language.as_deref(), Some("es"));
        assert_eq!(config.document_pause_secs, Some(3));
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docinsight.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(err.contains("JSON"));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.document_pause, Duration::from_secs(20));
        assert_eq!(settings.segment_length, 2000);
        assert_eq!(settings.poll_timeout, Some(Duration::from_secs(1800)));
    }
}
