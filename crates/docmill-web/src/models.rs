use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use docmill_core::{
    ContentType, DocumentInfo, ExtractedImage, ImageContent, Link, ProcessedDocument, StorageRefs,
    Table,
};

// ── Process request/response DTOs ───────────────────────────────────────

/// JSON body for the process-webpage routes.
#[derive(Debug, Deserialize)]
pub struct WebpageRequest {
    pub url: String,
    /// Optional explicit tool name; the tier default applies when absent.
    #[serde(default)]
    pub tool: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: &'static str,
    pub message: String,
    pub document_id: String,
    pub timestamp: String,
    pub markdown: String,
    pub content: ContentJson,
    pub metadata: MetadataJson,
}

#[derive(Debug, Serialize)]
pub struct ContentJson {
    pub text: Vec<String>,
    pub tables: Vec<Table>,
    pub images: Vec<ImageJson>,
    pub links: Vec<Link>,
    pub key_values: BTreeMap<String, String>,
}

/// Image descriptor: embedded payloads are summarized, not inlined.
#[derive(Debug, Serialize)]
pub struct ImageJson {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

impl From<&ExtractedImage> for ImageJson {
    fn from(image: &ExtractedImage) -> Self {
        match &image.content {
            ImageContent::Embedded { data, format } => ImageJson {
                kind: "embedded",
                format: Some(format.extension()),
                bytes: Some(data.len()),
                url: None,
                alt: None,
                page: image.page,
            },
            ImageContent::Remote { url, alt } => ImageJson {
                kind: "remote",
                format: None,
                bytes: None,
                url: Some(url.clone()),
                alt: Some(alt.clone()),
                page: image.page,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetadataJson {
    pub tool: &'static str,
    pub content_type: &'static str,
    pub source: String,
    #[serde(flatten)]
    pub info: DocumentInfo,
    /// Absent when the server runs without configured storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageRefs>,
}

impl From<ProcessedDocument> for ProcessResponse {
    fn from(done: ProcessedDocument) -> Self {
        let message = match done.content_type {
            ContentType::Pdf => format!("PDF processed with the {} tool", done.tool),
            ContentType::Webpage => format!("webpage processed with the {} tool", done.tool),
        };
        let images: Vec<ImageJson> = done.document.images.iter().map(ImageJson::from).collect();

        ProcessResponse {
            status: "success",
            message,
            document_id: done.document_id,
            timestamp: done.timestamp,
            markdown: done.artifact.content,
            content: ContentJson {
                text: done.document.text,
                tables: done.document.tables,
                images,
                links: done.document.links,
                key_values: done.document.key_values,
            },
            metadata: MetadataJson {
                tool: done.tool.as_str(),
                content_type: done.content_type.as_str(),
                source: done.source,
                info: done.document.info,
                storage: done.storage,
            },
        }
    }
}

// ── Health DTOs ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub services: ServicesJson,
    pub storage: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServicesJson {
    pub opensource: TierServicesJson,
    pub enterprise: TierServicesJson,
}

#[derive(Debug, Serialize)]
pub struct TierServicesJson {
    pub pdf: &'static str,
    pub webpage: &'static str,
}
