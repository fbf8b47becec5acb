//! Shared helpers for CLI commands: document discovery and pipeline wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use url::Url;

use crate::config::Settings;
use crate::insights::{Extractor, InsightAggregator, InsightChunker, InsightOptions, InsightServices};
use crate::models::{DocumentKind, DocumentSource, FeatureSet};
use crate::output::FileReportEmitter;
use crate::rate_limit::{InMemoryRateLimitBackend, RateLimitConfig, RateLimiter};
use crate::report::Reporter;
use crate::services::{GatewayClient, LanguageService, MedicalService, TranslationService};

/// Resolve the `--documents` argument into document sources.
///
/// Accepts a single file, a local folder (its jpg/jpeg/png files, sorted by
/// name) or an `s3://bucket/key` object reference.
pub fn collect_sources(arg: &str) -> anyhow::Result<Vec<DocumentSource>> {
    if arg.starts_with("s3://") {
        return parse_object_url(arg).map(|source| vec![source]);
    }

    let path = Path::new(arg);
    if path.is_dir() {
        let files = list_images(path)?;
        if files.is_empty() {
            anyhow::bail!("No jpg/jpeg/png documents found in {}", path.display());
        }
        return Ok(files.into_iter().map(DocumentSource::LocalFile).collect());
    }

    if !path.exists() {
        anyhow::bail!("Document not found: {}", path.display());
    }
    Ok(vec![DocumentSource::LocalFile(path.to_path_buf())])
}

/// Parse `s3://bucket/key`. Bare buckets and prefixes are rejected.
pub fn parse_object_url(arg: &str) -> anyhow::Result<DocumentSource> {
    let url = Url::parse(arg).with_context(|| format!("Invalid object URL: {}", arg))?;
    let bucket = url.host_str().unwrap_or_default().to_string();
    let key = url.path().trim_start_matches('/').to_string();

    if bucket.is_empty() {
        anyhow::bail!("Object URL has no bucket: {}", arg);
    }
    if key.is_empty() || key.ends_with('/') {
        anyhow::bail!(
            "Processing every document under {} is not supported, name a single object",
            arg
        );
    }
    Ok(DocumentSource::ObjectRef { bucket, key })
}

fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentKind::from_extension)
            .map_or(false, |kind| kind == DocumentKind::Image);
        if is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Gateway client with per-service pacing from the settings.
pub fn gateway_client(settings: &Settings) -> anyhow::Result<Arc<GatewayClient>> {
    let limiter = RateLimiter::with_config(
        Arc::new(InMemoryRateLimitBackend::new()),
        RateLimitConfig {
            base_delay: settings.service_delay,
            min_delay: settings.service_delay,
            ..Default::default()
        },
    );
    let client = GatewayClient::new(settings.gateway_config())?.with_rate_limiter(limiter);
    Ok(Arc::new(client))
}

/// Reporter writing to `output_dir`, with the requested insight categories.
pub fn build_reporter(
    settings: &Settings,
    client: &Arc<GatewayClient>,
    features: FeatureSet,
    options: &InsightOptions,
    output_dir: &Path,
) -> anyhow::Result<Reporter> {
    let language: Arc<dyn LanguageService> = client.clone();
    let medical: Arc<dyn MedicalService> = client.clone();
    let translation: Arc<dyn TranslationService> = client.clone();
    let services = InsightServices {
        language: Some(language),
        medical: Some(medical),
        translation: Some(translation),
    };

    let aggregator = InsightAggregator::new(
        InsightChunker::new(settings.segment_length)?,
        Extractor::resolve(options, &services)?,
    )
    .with_retry(settings.retry.clone());
    let emitter = Arc::new(FileReportEmitter::new(output_dir));
    Ok(Reporter::new(aggregator, emitter, features))
}
