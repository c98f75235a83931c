//! Capability interface for office-document text extraction.
//!
//! The actual parsing libraries live outside this crate. The agent only needs
//! an opaque function from bytes plus a declared kind to structured text, with
//! failures surfaced as a typed error the normalizer can degrade gracefully.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    WordDocument,
    Spreadsheet,
    Presentation,
}

/// One sheet of a spreadsheet rendered as delimited text.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub csv: String,
}

/// What an extractor hands back, shaped per document kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedDocument {
    /// Plain text of a word-processor document
    Text(String),
    /// Every sheet of a workbook, in workbook order
    Sheets(Vec<Sheet>),
    /// Per-slide text, in slide order
    Slides(Vec<String>),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("no extractor available for {0:?}")]
    Unsupported(DocumentKind),

    #[error("invalid base64 payload: {0}")]
    Decode(String),

    #[error("{0}")]
    Parse(String),
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<ExtractedDocument, ExtractionError>;
}

/// Extractor used when no document-parsing collaborator is wired in. Every
/// kind fails with `Unsupported`, which the normalizer renders as a diagnostic
/// text block instead of aborting the request.
pub struct UnsupportedExtractor;

#[async_trait]
impl DocumentExtractor for UnsupportedExtractor {
    async fn extract(
        &self,
        _bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<ExtractedDocument, ExtractionError> {
        Err(ExtractionError::Unsupported(kind))
    }
}
