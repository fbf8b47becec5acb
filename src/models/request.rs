//! Analysis requests: where a document lives and what to extract from it.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Input validation failures. All of these are raised before any remote call.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Document or path to a folder or bucket containing documents is required")]
    MissingSource,

    #[error("Unsupported document type '{0}': document should be jpg/jpeg, png or pdf")]
    UnsupportedDocumentType(String),

    #[error("Select at least one option to extract text, forms or tables")]
    NoFeatureSelected,

    #[error("Multi-page documents must be in object storage for asynchronous analysis")]
    ObjectStoreRequired,

    #[error("Local file {0} must be read with AnalysisRequest::load")]
    NotLoaded(String),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// Layout feature that can be requested from the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Text,
    Forms,
    Tables,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Text => "TEXT",
            Feature::Forms => "FORMS",
            Feature::Tables => "TABLES",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of requested layout features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub text: bool,
    pub forms: bool,
    pub tables: bool,
}

impl FeatureSet {
    pub fn new(text: bool, forms: bool, tables: bool) -> Self {
        Self {
            text,
            forms,
            tables,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.text && !self.forms && !self.tables
    }

    /// Whether the feature-aware analysis operation is needed (forms and/or tables).
    pub fn needs_analysis(&self) -> bool {
        self.forms || self.tables
    }

    /// Feature flags for the analysis operation, tables before forms.
    pub fn analysis_features(&self) -> Vec<Feature> {
        let mut features = Vec::new();
        if self.tables {
            features.push(Feature::Tables);
        }
        if self.forms {
            features.push(Feature::Forms);
        }
        features
    }
}

/// Where the document bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Bytes already in memory, with the name they were read under.
    InlineBytes { name: String, bytes: Vec<u8> },
    /// A file on the local filesystem, read by [`AnalysisRequest::load`].
    LocalFile(PathBuf),
    /// An object in remote object storage.
    ObjectRef { bucket: String, key: String },
}

impl DocumentSource {
    /// Name used for logging and output file naming.
    pub fn name(&self) -> String {
        match self {
            DocumentSource::InlineBytes { name, .. } => name.clone(),
            DocumentSource::LocalFile(path) => path.display().to_string(),
            DocumentSource::ObjectRef { key, .. } => key.clone(),
        }
    }

    pub fn is_object_ref(&self) -> bool {
        matches!(self, DocumentSource::ObjectRef { .. })
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::ObjectRef { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// How a document must be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Single image, analyzed synchronously.
    Image,
    /// Paginated document, analyzed through an asynchronous job.
    Pdf,
}

impl DocumentKind {
    /// Classify by file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "jpg" | "jpeg" | "png" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    /// Classify by content using magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let kind = infer::get(bytes)?;
        match kind.mime_type() {
            "application/pdf" => Some(DocumentKind::Pdf),
            "image/jpeg" | "image/png" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, DocumentKind::Pdf)
    }
}

/// A validated request for document analysis.
///
/// Only constructed through [`AnalysisRequest::new`] or
/// [`AnalysisRequest::load`], so every instance has a source, a supported
/// document kind and at least one feature.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    source: DocumentSource,
    kind: DocumentKind,
    features: FeatureSet,
}

impl AnalysisRequest {
    /// Read a local file into memory, then validate as [`AnalysisRequest::new`]
    /// does. Later stages never touch the filesystem.
    pub async fn load(
        source: Option<DocumentSource>,
        features: FeatureSet,
    ) -> Result<Self, RequestError> {
        match source {
            Some(DocumentSource::LocalFile(path)) => {
                let kind = kind_from_path(&path)?;
                if kind.is_async() {
                    return Err(RequestError::ObjectStoreRequired);
                }
                let bytes = tokio::fs::read(&path).await?;
                let name = path.display().to_string();
                Self::new(Some(DocumentSource::InlineBytes { name, bytes }), features)
            }
            other => Self::new(other, features),
        }
    }

    /// Validate an in-memory or object-storage source and a feature set.
    pub fn new(source: Option<DocumentSource>, features: FeatureSet) -> Result<Self, RequestError> {
        let source = source.ok_or(RequestError::MissingSource)?;

        let (source, kind) = match source {
            DocumentSource::LocalFile(path) => {
                return Err(RequestError::NotLoaded(path.display().to_string()));
            }
            DocumentSource::InlineBytes { name, bytes } => {
                if bytes.is_empty() {
                    return Err(RequestError::MissingSource);
                }
                let kind = match kind_from_path(Path::new(&name)) {
                    Ok(kind) => kind,
                    Err(_) => DocumentKind::from_bytes(&bytes)
                        .ok_or_else(|| RequestError::UnsupportedDocumentType(name.clone()))?,
                };
                (DocumentSource::InlineBytes { name, bytes }, kind)
            }
            DocumentSource::ObjectRef { bucket, key } => {
                if bucket.is_empty() || key.is_empty() {
                    return Err(RequestError::MissingSource);
                }
                let kind = kind_from_path(Path::new(&key))?;
                (DocumentSource::ObjectRef { bucket, key }, kind)
            }
        };

        if kind.is_async() && !source.is_object_ref() {
            return Err(RequestError::ObjectStoreRequired);
        }

        if features.is_empty() {
            return Err(RequestError::NoFeatureSelected);
        }

        Ok(Self {
            source,
            kind,
            features,
        })
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }
}

fn kind_from_path(path: &Path) -> Result<DocumentKind, RequestError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    DocumentKind::from_extension(ext)
        .ok_or_else(|| RequestError::UnsupportedDocumentType(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn text_only() -> FeatureSet {
        FeatureSet::new(true, false, false)
    }

    fn object(key: &str) -> Option<DocumentSource> {
        Some(DocumentSource::ObjectRef {
            bucket: "bucket".to_string(),
            key: key.to_string(),
        })
    }

    #[test]
    fn test_missing_source() {
        let err = AnalysisRequest::new(None, text_only()).unwrap_err();
        assert!(matches!(err, RequestError::MissingSource));
    }

    #[test]
    fn test_empty_bucket_is_missing_source() {
        let source = Some(DocumentSource::ObjectRef {
            bucket: String::new(),
            key: "doc.pdf".to_string(),
        });
        let err = AnalysisRequest::new(source, text_only()).unwrap_err();
        assert!(matches!(err, RequestError::MissingSource));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = AnalysisRequest::new(object("notes.docx"), text_only()).unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedDocumentType(_)));
    }

    #[test]
    fn test_no_feature_selected() {
        let err = AnalysisRequest::new(object("scan.png"), FeatureSet::default()).unwrap_err();
        assert!(matches!(err, RequestError::NoFeatureSelected));
    }

    #[test]
    fn test_inline_pdf_requires_object_store() {
        let source = Some(DocumentSource::InlineBytes {
            name: "report.pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
        });
        let err = AnalysisRequest::new(source, text_only()).unwrap_err();
        assert!(matches!(err, RequestError::ObjectStoreRequired));
    }

    #[test]
    fn test_inline_bytes_detected_by_magic() {
        let source = Some(DocumentSource::InlineBytes {
            name: "upload".to_string(),
            bytes: PNG_MAGIC.to_vec(),
        });
        let request = AnalysisRequest::new(source, text_only()).unwrap();
        assert_eq!(request.kind(), DocumentKind::Image);
    }

    #[test]
    fn test_object_pdf_is_async() {
        let request =
            AnalysisRequest::new(object("a/b/Report.PDF"), FeatureSet::new(false, true, true))
                .unwrap();
        assert_eq!(request.kind(), DocumentKind::Pdf);
        assert!(request.kind().is_async());
    }

    #[tokio::test]
    async fn test_local_file_is_read_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        tokio::fs::write(&path, PNG_MAGIC).await.unwrap();

        let request = AnalysisRequest::load(Some(DocumentSource::LocalFile(path)), text_only())
            .await
            .unwrap();
        match request.source() {
            DocumentSource::InlineBytes { bytes, .. } => assert_eq!(bytes.as_slice(), PNG_MAGIC),
            other => panic!("expected inline bytes, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_pdf_rejected_before_read() {
        let source = Some(DocumentSource::LocalFile("missing/report.pdf".into()));
        let err = AnalysisRequest::load(source, text_only()).await.unwrap_err();
        assert!(matches!(err, RequestError::ObjectStoreRequired));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let source = Some(DocumentSource::LocalFile("missing/scan.png".into()));
        let err = AnalysisRequest::load(source, text_only()).await.unwrap_err();
        assert!(matches!(err, RequestError::Io(_)));
    }

    #[test]
    fn test_new_does_not_read_local_files() {
        let source = Some(DocumentSource::LocalFile("scans/page.png".into()));
        let err = AnalysisRequest::new(source, text_only()).unwrap_err();
        assert!(matches!(err, RequestError::NotLoaded(_)));
    }

    #[test]
    fn test_analysis_features_order() {
        let features = FeatureSet::new(true, true, true);
        assert!(features.needs_analysis());
        assert_eq!(
            features.analysis_features(),
            vec![Feature::Tables, Feature::Forms]
        );
        assert!(!text_only().needs_analysis());
    }
}
