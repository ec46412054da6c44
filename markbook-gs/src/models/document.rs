//! Uploaded exam document
//!
//! Exam papers and answer key sources arrive as base64 payloads with a
//! declared MIME type. Validation happens at construction so handlers can
//! reject malformed uploads before any grading work starts.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Validation failure for an uploaded document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// Declared MIME type is not an image or PDF
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Payload is empty after trimming
    #[error("Document payload is empty")]
    EmptyDocument,

    /// Payload is not decodable base64
    #[error("Document payload is not valid base64: {0}")]
    InvalidEncoding(String),
}

/// A validated exam document ready for grading
///
/// Holds the base64 payload as received. Decoding is deferred until the
/// pipeline needs the raw bytes for content verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDocument {
    /// Base64-encoded document bytes (no data-URL prefix)
    pub data: String,

    /// Declared MIME type, e.g. `image/png` or `application/pdf`
    pub mime_type: String,

    /// Original filename, when the uploader provided one
    pub file_name: Option<String>,
}

impl ExamDocument {
    /// Construct a document, validating payload and MIME type.
    ///
    /// Accepts any `image/*` type plus `application/pdf`. The payload must
    /// be non-empty and decodable base64 (standard alphabet, as produced
    /// by browser uploads).
    pub fn new(
        data: String,
        mime_type: String,
        file_name: Option<String>,
    ) -> Result<Self, IntakeError> {
        if !Self::is_supported_mime(&mime_type) {
            return Err(IntakeError::UnsupportedMediaType(mime_type));
        }

        let data = data.trim().to_string();
        if data.is_empty() {
            return Err(IntakeError::EmptyDocument);
        }

        // Fail fast on garbage payloads rather than at model-call time
        general_purpose::STANDARD
            .decode(&data)
            .map_err(|e| IntakeError::InvalidEncoding(e.to_string()))?;

        Ok(Self {
            data,
            mime_type,
            file_name,
        })
    }

    /// Whether a declared MIME type is acceptable for grading input.
    pub fn is_supported_mime(mime_type: &str) -> bool {
        mime_type == "application/pdf" || mime_type.starts_with("image/")
    }

    /// Decode the payload to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, IntakeError> {
        general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| IntakeError::InvalidEncoding(e.to_string()))
    }

    /// Decode and sniff the payload's actual content type.
    ///
    /// A mismatch between the declared MIME type and the sniffed one is
    /// logged but does not fail the document; the model backend is tolerant
    /// of mislabeled images and PDFs.
    pub fn verify_content(&self) -> Result<Vec<u8>, IntakeError> {
        let bytes = self.decode()?;
        if let Some(kind) = infer::get(&bytes) {
            if kind.mime_type() != self.mime_type {
                warn!(
                    "Document declared as {} but content sniffed as {}",
                    self.mime_type,
                    kind.mime_type()
                );
            }
        }
        Ok(bytes)
    }

    /// Approximate decoded size in bytes, for log lines.
    pub fn approx_size(&self) -> usize {
        self.data.len() * 3 / 4
    }
}
