//! Attachment normalization: one provider-agnostic content block per uploaded
//! file, keyed purely off the declared media type.
//!
//! This function is total: every input yields exactly one output variant, in
//! input order. Document extraction failures degrade into diagnostic text
//! blocks rather than propagating.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::extract::{DocumentExtractor, DocumentKind, ExtractedDocument, ExtractionError};
use crate::models::attachment::FileAttachment;
use crate::models::content::Content;

const WORD_OOXML: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const WORD_LEGACY: &str = "application/msword";

/// Strip a leading data-URL prefix, i.e. everything up to and including the
/// first comma. Content without a prefix passes through unchanged.
fn strip_data_url(content: &str) -> &str {
    if content.starts_with("data:") {
        match content.find(',') {
            Some(idx) => &content[idx + 1..],
            None => content,
        }
    } else {
        content
    }
}

fn is_word_document(media_type: &str) -> bool {
    media_type == WORD_OOXML || media_type == WORD_LEGACY
}

fn is_spreadsheet(media_type: &str) -> bool {
    media_type.starts_with("application/vnd.ms-excel")
        || media_type.starts_with("application/vnd.openxmlformats-officedocument.spreadsheetml")
}

fn is_presentation(media_type: &str) -> bool {
    media_type.starts_with("application/vnd.ms-powerpoint")
        || media_type.starts_with("application/vnd.openxmlformats-officedocument.presentationml")
}

async fn extract_document(
    payload: &str,
    kind: DocumentKind,
    extractor: &dyn DocumentExtractor,
) -> Result<ExtractedDocument, ExtractionError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| ExtractionError::Decode(e.to_string()))?;
    extractor.extract(&bytes, kind).await
}

async fn word_to_text(payload: &str, extractor: &dyn DocumentExtractor) -> Content {
    match extract_document(payload, DocumentKind::WordDocument, extractor).await {
        Ok(ExtractedDocument::Text(text)) => Content::text(text),
        Ok(other) => Content::text(format!(
            "Error extracting text from DOCX: unexpected extractor output {other:?}"
        )),
        Err(e) => Content::text(format!("Error extracting text from DOCX: {e}")),
    }
}

async fn spreadsheet_to_text(payload: &str, extractor: &dyn DocumentExtractor) -> Content {
    match extract_document(payload, DocumentKind::Spreadsheet, extractor).await {
        Ok(ExtractedDocument::Sheets(sheets)) => {
            let mut text = String::new();
            for sheet in sheets {
                text.push_str(&format!("\n--- Sheet: {} ---\n{}", sheet.name, sheet.csv));
            }
            Content::text(text)
        }
        Ok(other) => Content::text(format!(
            "Error extracting Excel file: unexpected extractor output {other:?}"
        )),
        Err(e) => Content::text(format!("Error extracting Excel file: {e}")),
    }
}

async fn presentation_to_text(payload: &str, extractor: &dyn DocumentExtractor) -> Content {
    match extract_document(payload, DocumentKind::Presentation, extractor).await {
        Ok(ExtractedDocument::Slides(slides)) => {
            let text = slides
                .iter()
                .enumerate()
                .map(|(i, slide)| format!("--- Slide {} ---\n{}", i + 1, slide))
                .collect::<Vec<_>>()
                .join("\n\n");
            Content::text(text)
        }
        Ok(other) => Content::text(format!(
            "Error extracting PowerPoint file: unexpected extractor output {other:?}"
        )),
        Err(e) => Content::text(format!("Error extracting PowerPoint file: {e}")),
    }
}

/// Convert raw attachments into provider-agnostic content blocks,
/// order-preserving and one-to-one.
pub async fn normalize(
    attachments: &[FileAttachment],
    extractor: &dyn DocumentExtractor,
) -> Vec<Content> {
    let mut blocks = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        blocks.push(normalize_one(attachment, extractor).await);
    }
    blocks
}

async fn normalize_one(attachment: &FileAttachment, extractor: &dyn DocumentExtractor) -> Content {
    let payload = strip_data_url(&attachment.content);
    let media_type = attachment.media_type.as_str();

    if media_type.starts_with("image/") {
        return Content::image(payload, media_type);
    }

    if media_type == "application/pdf" {
        return Content::file_named(payload, media_type, attachment.name.clone());
    }

    // Textual attachments arrive as plain text from the caller, not base64
    if media_type.starts_with("text/") || media_type == "application/json" {
        return Content::text(&attachment.content);
    }

    if is_word_document(media_type) {
        return word_to_text(payload, extractor).await;
    }

    if is_spreadsheet(media_type) {
        return spreadsheet_to_text(payload, extractor).await;
    }

    if is_presentation(media_type) {
        return presentation_to_text(payload, extractor).await;
    }

    Content::file_named(payload, media_type, attachment.name.clone())
}
