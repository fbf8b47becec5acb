//! Document processing command.

use std::sync::Arc;

use console::style;
use tokio_util::sync::CancellationToken;

use crate::analysis::DocumentProcessor;
use crate::batch::{BatchRunner, BatchSummary};
use crate::cli::helpers::{build_reporter, collect_sources, gateway_client};
use crate::cli::icons::{dim_arrow, error, info, success, warn};
use crate::config::Settings;
use crate::insights::InsightOptions;
use crate::models::{FeatureSet, RequestError};
use crate::rate_limit::{InMemoryRateLimitBackend, RateLimitConfig, RateLimiter};
use crate::services::AnalysisService;

/// Analyze one or more documents and write their reports.
pub async fn cmd_process(
    settings: &Settings,
    documents: &str,
    features: FeatureSet,
    options: &InsightOptions,
) -> anyhow::Result<()> {
    if features.is_empty() {
        return Err(RequestError::NoFeatureSelected.into());
    }
    let sources = collect_sources(documents)?;

    let client = gateway_client(settings)?;
    let reporter = build_reporter(settings, &client, features, options, &settings.output_dir)?;
    let service: Arc<dyn AnalysisService> = client;
    let processor = DocumentProcessor::new(service, settings.processor_options());
    let pacing = RateLimiter::with_config(
        Arc::new(InMemoryRateLimitBackend::new()),
        RateLimitConfig::fixed(settings.document_pause),
    );
    let runner = BatchRunner::new(processor, reporter, pacing, features);

    eprintln!(
        "{} Processing {} document(s) into {}",
        info(),
        sources.len(),
        settings.output_dir.display()
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{} Interrupted, stopping after cleanup", warn());
            on_signal.cancel();
        }
    });

    let summary = runner.run(sources, &cancel).await;
    print_summary(&summary);

    if summary.is_success() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} documents did not complete",
            summary.failed.len() + summary.skipped,
            summary.total()
        )
    }
}

fn print_summary(summary: &BatchSummary) {
    for (name, report) in &summary.succeeded {
        eprintln!(
            "{} {} ({} pages)",
            success(),
            style(name).bold(),
            report.pages
        );
        for page in &report.insights {
            for failure in &page.failures {
                eprintln!(
                    "  {} page {}: {} unavailable: {}",
                    warn(),
                    page.page_number,
                    failure.category,
                    failure.message
                );
            }
        }
    }
    for (name, err) in &summary.failed {
        eprintln!("{} {}: {}", error(), style(name).bold(), err);
    }
    if summary.skipped > 0 {
        eprintln!("{} {} documents skipped", dim_arrow(), summary.skipped);
    }
    eprintln!(
        "{} {} succeeded, {} failed",
        dim_arrow(),
        style(summary.succeeded.len()).green(),
        style(summary.failed.len()).red()
    );
}
