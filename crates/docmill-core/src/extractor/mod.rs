//! Extraction adapter trait and implementations.

pub mod diffbot;
pub mod docintel;
pub mod mock;
pub mod webpage;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;

use crate::ExtractedDocument;

/// The input handed to an extractor.
#[derive(Debug, Clone)]
pub enum Source {
    /// A PDF spilled to a temp file, plus the name it was uploaded under.
    File { path: PathBuf, filename: String },
    /// A live webpage.
    Url(String),
}

impl Source {
    /// Human-readable label: the original filename or the URL.
    pub fn label(&self) -> &str {
        match self {
            Source::File { filename, .. } => filename,
            Source::Url(url) => url,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("failed to extract content: {0}")]
    Extraction(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("service error: {0}")]
    Service(String),
    #[error("service not configured: {0}")]
    NotConfigured(String),
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Errors the caller caused (bad input), as opposed to adapter failures.
    pub fn is_client(&self) -> bool {
        matches!(self, ExtractError::UnsupportedInput(_))
    }
}

/// An extraction adapter that can turn a source into an [`ExtractedDocument`].
pub trait Extractor: Send + Sync {
    /// The tool slug this adapter implements (e.g. "mupdf", "diffbot").
    fn name(&self) -> &'static str;

    /// Whether the adapter has everything it needs (credentials etc.).
    fn available(&self) -> bool {
        true
    }

    /// Extract the document. Remote adapters use the shared `client`.
    fn extract<'a>(
        &'a self,
        source: &'a Source,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ExtractedDocument, ExtractError>> + Send + 'a>>;
}
