//! Report emission: CSV tables, text and JSON artifacts.

mod generator;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

pub use generator::OutputGenerator;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sink for report artifacts, addressed by file name.
#[async_trait]
pub trait ReportEmitter: Send + Sync {
    /// Write rows as CSV. An empty `columns` slice writes no header row.
    async fn write_table(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), OutputError>;

    async fn write_text(&self, name: &str, content: &str) -> Result<(), OutputError>;

    async fn write_json(&self, name: &str, value: &serde_json::Value) -> Result<(), OutputError>;
}

/// Writes artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct FileReportEmitter {
    dir: PathBuf,
}

impl FileReportEmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, name: &str, content: &str) -> Result<(), OutputError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, content).await?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl ReportEmitter for FileReportEmitter {
    async fn write_table(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), OutputError> {
        let mut csv = String::new();
        if !columns.is_empty() {
            csv.push_str(&csv_line(columns));
        }
        for row in rows {
            csv.push_str(&csv_line(row.as_slice()));
        }
        self.write(name, &csv).await
    }

    async fn write_text(&self, name: &str, content: &str) -> Result<(), OutputError> {
        self.write(name, content).await
    }

    async fn write_json(&self, name: &str, value: &serde_json::Value) -> Result<(), OutputError> {
        self.write(name, &serde_json::to_string(value)?).await
    }
}

/// Escape a CSV field value.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape_csv(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// Base name for a document's artifacts: `scan.png` becomes `scan-png`.
pub fn artifact_base_name(document: &str) -> String {
    let path = Path::new(document);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| document.to_string());
    match path.extension() {
        Some(ext) => format!("{}-{}", stem, ext.to_string_lossy()),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_artifact_base_name() {
        assert_eq!(artifact_base_name("scans/intake form.png"), "intake form-png");
        assert_eq!(artifact_base_name("claims/2019/report.pdf"), "report-pdf");
        assert_eq!(artifact_base_name("notes"), "notes");
    }

    #[tokio::test]
    async fn test_file_emitter_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = FileReportEmitter::new(dir.path().join("out"));

        emitter
            .write_table(
                "words.csv",
                &["Word-Id", "Word-Text"],
                &[vec!["w1".to_string(), "Hello, world".to_string()]],
            )
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("out/words.csv"))
            .await
            .unwrap();
        assert_eq!(content, "Word-Id,Word-Text\r\nw1,\"Hello, world\"\r\n");
    }

    #[tokio::test]
    async fn test_table_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = FileReportEmitter::new(dir.path());

        emitter
            .write_table("t.csv", &[], &[vec!["Table".to_string()], Vec::new()])
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("t.csv"))
            .await
            .unwrap();
        assert_eq!(content, "Table\r\n\r\n");
    }
}
