//! The request pipeline: validate, extract, convert, upload.
//!
//! One call runs one document through one tool. There is no fallback to a
//! different tool and no retry; the caller's selection is final.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::convert::{MarkdownArtifact, embedded_images, image_key, to_markdown};
use crate::extractor::{ExtractError, Extractor, Source};
use crate::storage::{ObjectStore, StorageError, StorageRefs};
use crate::{ContentType, ExtractedDocument, Tool};

/// One extraction job as the API layer hands it over.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub content_type: ContentType,
    pub tool: Tool,
    pub source: Source,
}

/// Everything a finished request produces.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub document_id: String,
    pub tool: Tool,
    pub content_type: ContentType,
    /// Original filename or URL.
    pub source: String,
    /// RFC 3339 processing time.
    pub timestamp: String,
    pub document: ExtractedDocument,
    pub artifact: MarkdownArtifact,
    /// `None` when the pipeline runs without a configured store.
    pub storage: Option<StorageRefs>,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("tool '{tool}' does not support {content_type} input")]
    UnsupportedPair { tool: Tool, content_type: ContentType },
    #[error("no extractor registered for tool '{0}'")]
    UnknownTool(Tool),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// How a failure should be reported at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was bad (400).
    Client,
    /// A required service is not configured (503).
    Unavailable,
    /// The adapter, network, or store failed (500).
    Server,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::UnsupportedPair { .. } => ErrorKind::Client,
            PipelineError::Extract(e) if e.is_client() => ErrorKind::Client,
            PipelineError::Extract(ExtractError::NotConfigured(_)) => ErrorKind::Unavailable,
            PipelineError::UnknownTool(_)
            | PipelineError::Extract(_)
            | PipelineError::Storage(_) => ErrorKind::Server,
        }
    }
}

/// Shared, read-only processing state: registered extractors, the HTTP
/// client they borrow, and (optionally) the object store.
pub struct Pipeline {
    extractors: HashMap<Tool, Arc<dyn Extractor>>,
    store: Option<Arc<dyn ObjectStore>>,
    client: reqwest::Client,
}

impl Pipeline {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            extractors: HashMap::new(),
            store: None,
            client,
        }
    }

    pub fn with_extractor(mut self, tool: Tool, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.insert(tool, extractor);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn storage_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Whether a tool is registered and has what it needs to run.
    pub fn tool_available(&self, tool: Tool) -> bool {
        self.extractors
            .get(&tool)
            .map(|e| e.available())
            .unwrap_or(false)
    }

    /// Run one request through extract, convert and (when a store is
    /// configured) upload. The unsupported-pair check runs before any
    /// adapter is touched.
    pub async fn process(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ProcessedDocument, PipelineError> {
        if !request.tool.supports(request.content_type) {
            return Err(PipelineError::UnsupportedPair {
                tool: request.tool,
                content_type: request.content_type,
            });
        }
        let extractor = self
            .extractors
            .get(&request.tool)
            .ok_or(PipelineError::UnknownTool(request.tool))?;

        tracing::info!(
            tool = %request.tool,
            source = request.source.label(),
            "extracting document"
        );
        let document = extractor.extract(&request.source, &self.client).await?;

        let now = Utc::now();
        let document_id = document_id(request, &now);
        let prefix = format!(
            "{}/{}/{}",
            request.content_type.as_str(),
            request.tool.tier().as_str(),
            document_id
        );
        let artifact = to_markdown(&document, &prefix);
        let timestamp = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        tracing::info!(
            document_id,
            blocks = document.text.len(),
            tables = document.tables.len(),
            images = document.images.len(),
            "extraction complete"
        );

        let storage = match &self.store {
            Some(store) => Some(
                upload_artifact(
                    store.as_ref(),
                    request,
                    &document,
                    &artifact,
                    &prefix,
                    &document_id,
                    &timestamp,
                )
                .await?,
            ),
            None => None,
        };

        Ok(ProcessedDocument {
            document_id,
            tool: request.tool,
            content_type: request.content_type,
            source: request.source.label().to_string(),
            timestamp,
            document,
            artifact,
            storage,
        })
    }
}

/// On-disk shape of the metadata.json side file.
#[derive(Serialize)]
struct MetadataFile<'a> {
    document_id: &'a str,
    tool: &'a str,
    content_type: &'a str,
    source: &'a str,
    timestamp: &'a str,
    info: &'a crate::DocumentInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    links: &'a Vec<crate::Link>,
}

/// Upload images, then metadata.json, then the markdown document itself.
/// The markdown goes last so a reference to it implies the side files made
/// it; any failure aborts the request.
async fn upload_artifact(
    store: &dyn ObjectStore,
    request: &ExtractionRequest,
    document: &ExtractedDocument,
    artifact: &MarkdownArtifact,
    prefix: &str,
    document_id: &str,
    timestamp: &str,
) -> Result<StorageRefs, PipelineError> {
    let mut tags = BTreeMap::new();
    tags.insert("tool".to_string(), request.tool.to_string());
    tags.insert(
        "content-type".to_string(),
        request.content_type.to_string(),
    );
    tags.insert("source".to_string(), request.source.label().to_string());
    tags.insert("timestamp".to_string(), timestamp.to_string());

    for (n, data, format) in embedded_images(document) {
        let key = image_key(prefix, n, format);
        store
            .put(&key, data.to_vec(), format.content_type(), &tags)
            .await?;
    }

    let metadata = MetadataFile {
        document_id,
        tool: request.tool.as_str(),
        content_type: request.content_type.as_str(),
        source: request.source.label(),
        timestamp,
        info: &document.info,
        links: &document.links,
    };
    let metadata_bytes = serde_json::to_vec_pretty(&metadata)
        .map_err(|e| StorageError::Upload(format!("failed to encode metadata.json: {e}")))?;
    let metadata_key = format!("{prefix}/metadata.json");
    store
        .put(&metadata_key, metadata_bytes, "application/json", &tags)
        .await?;

    let markdown_key = format!("{prefix}/document.md");
    store
        .put(
            &markdown_key,
            artifact.content.clone().into_bytes(),
            "text/markdown",
            &tags,
        )
        .await?;
    tracing::info!(key = markdown_key, "uploaded artifact");

    Ok(StorageRefs {
        markdown: markdown_key,
        metadata: metadata_key,
        images: artifact.image_references.clone(),
    })
}

/// `pdf_{tool}_{sanitized filename}_{stamp}` or `web_{tool}_{url hash}_{stamp}`.
fn document_id(request: &ExtractionRequest, now: &DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let middle = match &request.source {
        Source::File { filename, .. } => sanitize_filename(filename),
        Source::Url(url) => url_fingerprint(url),
    };
    format!(
        "{}_{}_{middle}_{stamp}",
        request.content_type.id_prefix(),
        request.tool
    )
}

/// Filename stem reduced to `[A-Za-z0-9._-]`; everything else becomes `_`.
fn sanitize_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// First 8 hex chars of the URL's SHA-256.
fn url_fingerprint(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
