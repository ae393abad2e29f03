//! Mock extraction adapter for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ExtractError, Extractor, Source};
use crate::ExtractedDocument;

/// A configurable mock response for [`MockExtractor`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this document.
    Document(ExtractedDocument),
    /// Simulate an adapter failure.
    Error(String),
    /// Simulate missing credentials.
    NotConfigured(String),
}

/// A hand-rolled mock implementing [`Extractor`] for tests: a fixed
/// response, an availability flag, and call counting.
pub struct MockExtractor {
    name: &'static str,
    response: MockResponse,
    available: bool,
    call_count: AtomicUsize,
}

impl MockExtractor {
    /// Create a mock that always returns `response`.
    pub fn new(name: &'static str, response: MockResponse) -> Self {
        Self {
            name,
            response,
            available: true,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Report the adapter as unconfigured in health checks.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// How many times `extract()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Extractor for MockExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn available(&self) -> bool {
        self.available
    }

    fn extract<'a>(
        &'a self,
        _source: &'a Source,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ExtractedDocument, ExtractError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.response.clone();

        Box::pin(async move {
            match response {
                MockResponse::Document(doc) => Ok(doc),
                MockResponse::Error(msg) => Err(ExtractError::Service(msg)),
                MockResponse::NotConfigured(msg) => Err(ExtractError::NotConfigured(msg)),
            }
        })
    }
}

/// A small document useful as a canned mock payload.
pub fn sample_document() -> ExtractedDocument {
    ExtractedDocument {
        text: vec!["A sample block of text.".to_string()],
        ..Default::default()
    }
}
