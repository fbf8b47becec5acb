//! Rebuild reports from a saved analysis response.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::cli::helpers::{build_reporter, gateway_client};
use crate::cli::icons::{success, warn};
use crate::config::Settings;
use crate::insights::InsightOptions;
use crate::models::{AnalysisPayload, FeatureSet, ResultSet};

/// Read a saved response: either the array written as `-response.json`
/// or a single payload.
pub async fn load_results(path: &Path) -> anyhow::Result<ResultSet> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let payloads: Vec<AnalysisPayload> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(payloads.into_iter().collect())
}

/// Default document name for a saved response: `scan-png-response.json`
/// becomes `scan-png`.
fn default_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    stem.strip_suffix("-response")
        .map(str::to_string)
        .unwrap_or(stem)
}

pub async fn cmd_replay(
    settings: &Settings,
    response: &Path,
    name: Option<&str>,
    features: FeatureSet,
    options: &InsightOptions,
) -> anyhow::Result<()> {
    let features = if features.is_empty() {
        FeatureSet::new(true, false, false)
    } else {
        features
    };
    let results = load_results(response).await?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| default_name(response));

    let client = gateway_client(settings)?;
    let reporter = build_reporter(settings, &client, features, options, &settings.output_dir)?;
    let report = reporter.report(&name, &results).await?;

    eprintln!(
        "{} {}: {} pages from {} result pages into {}",
        success(),
        style(&name).bold(),
        report.pages,
        results.len(),
        settings.output_dir.display()
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
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_array_and_single() {
        let dir = tempfile::tempdir().unwrap();
        let array = dir.path().join("scan-png-response.json");
        std::fs::write(
            &array,
            r#"[{"Blocks": [{"Id": "p1", "BlockType": "PAGE"}], "NextToken": "t1"},
                {"Blocks": [{"Id": "p2", "BlockType": "PAGE"}]}]"#,
        )
        .unwrap();
        let single = dir.path().join("one.json");
        std::fs::write(&single, r#"{"Blocks": []}"#).unwrap();

        let results = load_results(&array).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.is_complete());
        assert_eq!(load_results(&single).await.unwrap().len(), 1);
        assert_eq!(default_name(&array), "scan-png");
    }
}
