use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use mupdf::{Document, TextPageFlags};

use docmill_core::extractor::{ExtractError, Extractor, Source};
use docmill_core::pdf::PdfFile;
use docmill_core::{ExtractedDocument, ExtractedImage, ImageContent};

/// MuPDF-backed PDF extractor (the opensource PDF tool).
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that non-PDF code paths do not transitively
/// depend on it.
///
/// Page text comes from MuPDF's structured-text API; embedded images and
/// /Info metadata come from raw object access on the same bytes. The C
/// library is synchronous, so all of it runs under `spawn_blocking`.
#[derive(Default)]
pub struct MupdfExtractor;

impl MupdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for MupdfExtractor {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    fn extract<'a>(
        &'a self,
        source: &'a Source,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ExtractedDocument, ExtractError>> + Send + 'a>> {
        Box::pin(async move {
            let path = match source {
                Source::File { path, .. } => path.clone(),
                Source::Url(_) => {
                    return Err(ExtractError::UnsupportedInput(
                        "the mupdf tool takes a file upload, not a URL".into(),
                    ));
                }
            };

            tokio::task::spawn_blocking(move || extract_file(&path))
                .await
                .map_err(|e| ExtractError::Extraction(e.to_string()))?
        })
    }
}

fn extract_file(path: &Path) -> Result<ExtractedDocument, ExtractError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ExtractError::Open("invalid path encoding".into()))?;

    let document = Document::open(path_str).map_err(|e| ExtractError::Open(e.to_string()))?;

    let mut text = Vec::new();
    let mut pages_seen = 0usize;

    for page_result in document
        .pages()
        .map_err(|e| ExtractError::Extraction(e.to_string()))?
    {
        let page = page_result.map_err(|e| ExtractError::Extraction(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| ExtractError::Extraction(e.to_string()))?;

        // Block/line iteration keeps reading order within the page
        let mut page_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                page_text.push_str(&line_text);
                page_text.push('\n');
            }
        }

        pages_seen += 1;
        let trimmed = page_text.trim();
        if !trimmed.is_empty() {
            text.push(trimmed.to_string());
        }
    }

    let bytes = std::fs::read(path)?;

    let mut doc = ExtractedDocument {
        text,
        ..Default::default()
    };

    // Embedded images and /Info come from raw object access; if that
    // fails on a file MuPDF could still read, keep the text
    match PdfFile::load(&bytes) {
        Ok(pdf) => {
            doc.images = pdf
                .images()
                .into_iter()
                .map(|im| ExtractedImage {
                    page: Some(im.page),
                    content: ImageContent::Embedded {
                        data: im.data,
                        format: im.format,
                    },
                })
                .collect();
            let mut info = pdf.info();
            info.page_count = info.page_count.or(Some(pages_seen));
            info.file_size = Some(bytes.len() as u64);
            doc.info = info;
        }
        Err(_) => {
            doc.info.page_count = Some(pages_seen);
            doc.info.file_size = Some(bytes.len() as u64);
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    use docmill_core::ImageFormat;
    use lopdf::{Dictionary, Object, Stream, StringFormat, dictionary};

    /// Minimal JFIF payload. Markers only, enough to be stored verbatim.
    const JPEG_BYTES: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
    ];

    struct TestPdf {
        doc: lopdf::Document,
        pages_id: lopdf::ObjectId,
        font_id: lopdf::ObjectId,
        kids: Vec<Object>,
    }

    impl TestPdf {
        fn new() -> Self {
            let mut doc = lopdf::Document::with_version("1.5");
            let pages_id = doc.new_object_id();
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
            });
            Self {
                doc,
                pages_id,
                font_id,
                kids: Vec::new(),
            }
        }

        /// Add a page showing `text`, with optional extra resource entries.
        fn add_page(&mut self, text: &str, extra_resources: Dictionary) {
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            let content_id = self
                .doc
                .add_object(Object::Stream(Stream::new(dictionary! {}, content.into_bytes())));
            let mut resources = dictionary! {
                "Font" => dictionary! { "F1" => self.font_id },
            };
            for (key, value) in extra_resources.iter() {
                resources.set(key.clone(), value.clone());
            }
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources,
            });
            self.kids.push(page_id.into());
        }

        fn add_blank_page(&mut self) {
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            self.kids.push(page_id.into());
        }

        fn jpeg_xobject(&mut self) -> Dictionary {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 1i64,
                    "Height" => 1i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8i64,
                    "Filter" => "DCTDecode",
                },
                JPEG_BYTES.to_vec(),
            );
            let image_id = self.doc.add_object(Object::Stream(stream));
            dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            }
        }

        fn finish(mut self, info: Option<Dictionary>) -> Vec<u8> {
            let count = self.kids.len() as i64;
            self.doc.objects.insert(
                self.pages_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Pages",
                    "Kids" => self.kids,
                    "Count" => count,
                }),
            );
            let catalog_id = self.doc.add_object(dictionary! {
                "Type" => "Catalog",
                "Pages" => self.pages_id,
            });
            self.doc.trailer.set("Root", catalog_id);
            if let Some(info) = info {
                let info_id = self.doc.add_object(info);
                self.doc.trailer.set("Info", info_id);
            }
            let mut buf = Vec::new();
            self.doc.save_to(&mut buf).expect("failed to save test PDF");
            buf
        }
    }

    fn write_pdf(dir: &tempfile::TempDir, bytes: &[u8]) -> Source {
        let path = dir.path().join("input.pdf");
        std::fs::write(&path, bytes).unwrap();
        Source::File {
            path,
            filename: "input.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn extracts_page_text_in_order() {
        let mut pdf = TestPdf::new();
        pdf.add_page("Hello from page one", Dictionary::new());
        pdf.add_page("Second page text", Dictionary::new());
        let bytes = pdf.finish(None);

        let dir = tempfile::tempdir().unwrap();
        let source = write_pdf(&dir, &bytes);
        let client = reqwest::Client::new();

        let doc = MupdfExtractor::new()
            .extract(&source, &client)
            .await
            .unwrap();

        assert_eq!(
            doc.text,
            vec![
                "Hello from page one".to_string(),
                "Second page text".to_string()
            ]
        );
        assert_eq!(doc.info.page_count, Some(2));
        assert_eq!(doc.info.file_size, Some(bytes.len() as u64));
    }

    #[tokio::test]
    async fn blank_pages_are_counted_but_not_emitted() {
        let mut pdf = TestPdf::new();
        pdf.add_page("Only page with text", Dictionary::new());
        pdf.add_blank_page();
        let bytes = pdf.finish(None);

        let dir = tempfile::tempdir().unwrap();
        let source = write_pdf(&dir, &bytes);
        let client = reqwest::Client::new();

        let doc = MupdfExtractor::new()
            .extract(&source, &client)
            .await
            .unwrap();

        assert_eq!(doc.text, vec!["Only page with text".to_string()]);
        assert_eq!(doc.info.page_count, Some(2));
    }

    #[tokio::test]
    async fn reads_embedded_images_and_info() {
        let mut pdf = TestPdf::new();
        let resources = pdf.jpeg_xobject();
        pdf.add_page("Page with a figure", resources);
        let bytes = pdf.finish(Some(dictionary! {
            "Title" => Object::String(b"Quarterly Report".to_vec(), StringFormat::Literal),
            "Author" => Object::String(b"Ada".to_vec(), StringFormat::Literal),
        }));

        let dir = tempfile::tempdir().unwrap();
        let source = write_pdf(&dir, &bytes);
        let client = reqwest::Client::new();

        let doc = MupdfExtractor::new()
            .extract(&source, &client)
            .await
            .unwrap();

        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.images[0].page, Some(1));
        match &doc.images[0].content {
            ImageContent::Embedded { data, format } => {
                assert_eq!(format, &ImageFormat::Jpeg);
                assert_eq!(data.as_slice(), JPEG_BYTES);
            }
            other => panic!("expected an embedded image, got {other:?}"),
        }
        assert_eq!(doc.info.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(doc.info.author.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn rejects_url_sources() {
        let client = reqwest::Client::new();
        let err = MupdfExtractor::new()
            .extract(&Source::Url("https://example.com".into()), &client)
            .await
            .unwrap_err();
        assert!(err.is_client());
    }

    #[tokio::test]
    async fn garbage_input_is_a_server_side_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_pdf(&dir, b"this is not a pdf at all");
        let client = reqwest::Client::new();

        let err = MupdfExtractor::new()
            .extract(&source, &client)
            .await
            .unwrap_err();

        assert!(!err.is_client());
    }
}
