use std::collections::BTreeMap;

use serde::Serialize;

pub mod config;
pub mod convert;
pub mod extractor;
pub mod pdf;
pub mod pipeline;
pub mod storage;

// Re-export for convenience
pub use config::{AppConfig, AzureConfig, StorageConfig};
pub use convert::{MarkdownArtifact, to_markdown};
pub use extractor::{ExtractError, Extractor, Source};
pub use pipeline::{ErrorKind, ExtractionRequest, Pipeline, PipelineError, ProcessedDocument};
pub use storage::{MemoryStore, ObjectStore, S3Store, StorageError, StorageRefs};

/// The kind of input a request operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Pdf,
    Webpage,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Pdf => "pdf",
            ContentType::Webpage => "webpage",
        }
    }

    /// Prefix used in document ids ("pdf_..." / "web_...").
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ContentType::Pdf => "pdf",
            ContentType::Webpage => "web",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service tier a tool is offered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    OpenSource,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::OpenSource => "opensource",
            Tier::Enterprise => "enterprise",
        }
    }

    /// The tool used for a content type when the request names none.
    pub fn default_tool(&self, content_type: ContentType) -> Tool {
        match (self, content_type) {
            (Tier::OpenSource, ContentType::Pdf) => Tool::Mupdf,
            (Tier::OpenSource, ContentType::Webpage) => Tool::Scraper,
            (Tier::Enterprise, ContentType::Pdf) => Tool::DocIntel,
            (Tier::Enterprise, ContentType::Webpage) => Tool::Diffbot,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = UnknownTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opensource" => Ok(Tier::OpenSource),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(UnknownTierError(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized tier name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTierError(pub String);

impl std::fmt::Display for UnknownTierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown tier '{}'", self.0)
    }
}

impl std::error::Error for UnknownTierError {}

/// An extraction tool. Each tool handles exactly one content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// MuPDF text extraction (opensource PDF).
    Mupdf,
    /// Azure Document Intelligence (enterprise PDF).
    DocIntel,
    /// DOM scraping of a fetched page (opensource webpage).
    Scraper,
    /// Diffbot article API (enterprise webpage).
    Diffbot,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Mupdf, Tool::DocIntel, Tool::Scraper, Tool::Diffbot];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Mupdf => "mupdf",
            Tool::DocIntel => "docintel",
            Tool::Scraper => "scraper",
            Tool::Diffbot => "diffbot",
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Tool::Mupdf | Tool::Scraper => Tier::OpenSource,
            Tool::DocIntel | Tool::Diffbot => Tier::Enterprise,
        }
    }

    /// Whether this tool can process the given content type.
    pub fn supports(&self, content_type: ContentType) -> bool {
        match self {
            Tool::Mupdf | Tool::DocIntel => content_type == ContentType::Pdf,
            Tool::Scraper | Tool::Diffbot => content_type == ContentType::Webpage,
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tool {
    type Err = UnknownToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mupdf" => Ok(Tool::Mupdf),
            "docintel" => Ok(Tool::DocIntel),
            "scraper" => Ok(Tool::Scraper),
            "diffbot" => Ok(Tool::Diffbot),
            other => Err(UnknownToolError(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToolError(pub String);

impl std::fmt::Display for UnknownToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown tool '{}'", self.0)
    }
}

impl std::error::Error for UnknownToolError {}

/// A table as extracted: rows of cell text, first row treated as header.
pub type Table = Vec<Vec<String>>;

/// Encoded image format for embedded PDF images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// DCT-encoded stream, stored verbatim as a JPEG file.
    Jpeg,
    /// Anything else: decoded sample bytes, stored as-is.
    Raw,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Raw => "bin",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Raw => "application/octet-stream",
        }
    }
}

/// Image payload: either bytes pulled out of a PDF, or a URL found in a page.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageContent {
    Embedded { data: Vec<u8>, format: ImageFormat },
    Remote { url: String, alt: String },
}

/// An image attached to an extracted document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    pub content: ImageContent,
    /// 1-based page number for PDF images; `None` for webpage images.
    pub page: Option<usize>,
}

/// A hyperlink found in a webpage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}

/// Document-level metadata. All fields are optional; PDF fields come from
/// the /Info dictionary, webpage fields from `<title>` and meta tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw /CreationDate string for PDFs, article date for Diffbot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl DocumentInfo {
    pub fn is_empty(&self) -> bool {
        self == &DocumentInfo::default()
    }
}

/// Everything an adapter pulled out of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    /// Page texts for PDFs, block texts (paragraphs/headings) for webpages.
    pub text: Vec<String>,
    pub tables: Vec<Table>,
    pub images: Vec<ExtractedImage>,
    pub links: Vec<Link>,
    /// Form-style key/value pairs (Azure Document Intelligence only).
    pub key_values: BTreeMap<String, String>,
    pub info: DocumentInfo,
}

impl ExtractedDocument {
    pub fn is_empty(&self) -> bool {
        self.text.iter().all(|t| t.trim().is_empty())
            && self.tables.is_empty()
            && self.images.is_empty()
            && self.key_values.is_empty()
    }
}

#[cfg(test)]
mod tool_tests {
    use super::*;

    #[test]
    fn pdf_tools_reject_webpages() {
        assert!(Tool::Mupdf.supports(ContentType::Pdf));
        assert!(Tool::DocIntel.supports(ContentType::Pdf));
        assert!(!Tool::Mupdf.supports(ContentType::Webpage));
        assert!(!Tool::DocIntel.supports(ContentType::Webpage));
    }

    #[test]
    fn webpage_tools_reject_pdfs() {
        assert!(Tool::Scraper.supports(ContentType::Webpage));
        assert!(Tool::Diffbot.supports(ContentType::Webpage));
        assert!(!Tool::Scraper.supports(ContentType::Pdf));
        assert!(!Tool::Diffbot.supports(ContentType::Pdf));
    }

    #[test]
    fn every_tier_and_content_type_has_a_default() {
        assert_eq!(Tier::OpenSource.default_tool(ContentType::Pdf), Tool::Mupdf);
        assert_eq!(
            Tier::OpenSource.default_tool(ContentType::Webpage),
            Tool::Scraper
        );
        assert_eq!(
            Tier::Enterprise.default_tool(ContentType::Pdf),
            Tool::DocIntel
        );
        assert_eq!(
            Tier::Enterprise.default_tool(ContentType::Webpage),
            Tool::Diffbot
        );
    }

    #[test]
    fn defaults_support_their_content_type() {
        for tier in [Tier::OpenSource, Tier::Enterprise] {
            for ct in [ContentType::Pdf, ContentType::Webpage] {
                let tool = tier.default_tool(ct);
                assert!(tool.supports(ct));
                assert_eq!(tool.tier(), tier);
            }
        }
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(tool.as_str().parse::<Tool>().unwrap(), tool);
        }
        assert!("pymupdf".parse::<Tool>().is_err());
        assert!("".parse::<Tool>().is_err());
    }

    #[test]
    fn tier_names_round_trip() {
        for tier in [Tier::OpenSource, Tier::Enterprise] {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
        }
        assert!("premium".parse::<Tier>().is_err());
    }
}
