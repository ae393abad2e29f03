//! DOM-scraping webpage extractor (the opensource webpage tool).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{ExtractError, Extractor, Source};
use crate::{DocumentInfo, ExtractedDocument, ExtractedImage, ImageContent, Link, Table};

/// Browser-style User-Agent; some sites refuse the default reqwest UA.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WebpageExtractor {
    user_agent: String,
    timeout: Duration,
}

impl Default for WebpageExtractor {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: FETCH_TIMEOUT,
        }
    }
}

impl WebpageExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extractor for WebpageExtractor {
    fn name(&self) -> &'static str {
        "scraper"
    }

    fn extract<'a>(
        &'a self,
        source: &'a Source,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ExtractedDocument, ExtractError>> + Send + 'a>> {
        Box::pin(async move {
            let url = match source {
                Source::Url(url) => url,
                Source::File { .. } => {
                    return Err(ExtractError::UnsupportedInput(
                        "the scraper tool takes a URL, not a file upload".into(),
                    ));
                }
            };

            let page_url = reqwest::Url::parse(url)
                .map_err(|e| ExtractError::UnsupportedInput(format!("invalid URL: {e}")))?;
            if page_url.scheme() != "http" && page_url.scheme() != "https" {
                return Err(ExtractError::UnsupportedInput(format!(
                    "unsupported URL scheme '{}'",
                    page_url.scheme()
                )));
            }

            let resp = client
                .get(page_url.clone())
                .header("User-Agent", &self.user_agent)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| {
                    tracing::debug!(url, error = %e, "page fetch failed");
                    ExtractError::Http(e.to_string())
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ExtractError::Service(format!(
                    "page returned HTTP {status}"
                )));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| ExtractError::Http(e.to_string()))?;

            // Parse in spawn_blocking to avoid !Send scraper types
            tokio::task::spawn_blocking(move || parse_page(&body, &page_url))
                .await
                .map_err(|e| ExtractError::Extraction(e.to_string()))
        })
    }
}

fn parse_page(html: &str, base: &reqwest::Url) -> ExtractedDocument {
    let document = scraper::Html::parse_document(html);

    let text_sel = scraper::Selector::parse("p, h1, h2, h3, h4, h5, h6").unwrap();
    let table_sel = scraper::Selector::parse("table").unwrap();
    let row_sel = scraper::Selector::parse("tr").unwrap();
    let cell_sel = scraper::Selector::parse("td, th").unwrap();
    let img_sel = scraper::Selector::parse("img").unwrap();
    let link_sel = scraper::Selector::parse("a").unwrap();
    let title_sel = scraper::Selector::parse("title").unwrap();
    let description_sel = scraper::Selector::parse("meta[name='description']").unwrap();
    let keywords_sel = scraper::Selector::parse("meta[name='keywords']").unwrap();

    let mut text = Vec::new();
    for el in document.select(&text_sel) {
        let block = collapse_whitespace(&el.text().collect::<String>());
        if !block.is_empty() {
            text.push(block);
        }
    }

    let mut tables: Vec<Table> = Vec::new();
    for table_el in document.select(&table_sel) {
        let mut rows: Table = Vec::new();
        for row_el in table_el.select(&row_sel) {
            let cells: Vec<String> = row_el
                .select(&cell_sel)
                .map(|c| collapse_whitespace(&c.text().collect::<String>()))
                .collect();
            if !cells.is_empty() {
                rows.push(cells);
            }
        }
        if !rows.is_empty() {
            tables.push(rows);
        }
    }

    let mut images = Vec::new();
    for img_el in document.select(&img_sel) {
        let Some(src) = img_el.value().attr("src") else {
            continue;
        };
        let Ok(resolved) = base.join(src) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        let alt = img_el.value().attr("alt").unwrap_or("").trim().to_string();
        images.push(ExtractedImage {
            content: ImageContent::Remote {
                url: resolved.to_string(),
                alt,
            },
            page: None,
        });
    }

    let mut links = Vec::new();
    for a_el in document.select(&link_sel) {
        let Some(href) = a_el.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        links.push(Link {
            url: resolved.to_string(),
            text: collapse_whitespace(&a_el.text().collect::<String>()),
        });
    }

    let title = document
        .select(&title_sel)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());
    let description = meta_content(&document, &description_sel);
    let keywords = meta_content(&document, &keywords_sel);

    ExtractedDocument {
        text,
        tables,
        images,
        links,
        key_values: Default::default(),
        info: DocumentInfo {
            title,
            description,
            keywords,
            source_url: Some(base.to_string()),
            ..Default::default()
        },
    }
}

fn meta_content(document: &scraper::Html, sel: &scraper::Selector) -> Option<String> {
    document
        .select(sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> ExtractedDocument {
        let base = reqwest::Url::parse("https://example.com/articles/page").unwrap();
        parse_page(html, &base)
    }

    #[test]
    fn collects_paragraphs_and_headings_in_document_order() {
        let doc = parse(
            "<html><body>\
             <h1>Top</h1><p>First   paragraph.</p><h2>Sub</h2><p>Second.</p>\
             </body></html>",
        );
        assert_eq!(doc.text, vec!["Top", "First paragraph.", "Sub", "Second."]);
    }

    #[test]
    fn skips_empty_blocks() {
        let doc = parse("<p>   </p><p>real</p>");
        assert_eq!(doc.text, vec!["real"]);
    }

    #[test]
    fn extracts_table_rows_and_cells() {
        let doc = parse(
            "<table>\
             <tr><th>Name</th><th>Age</th></tr>\
             <tr><td>Alice</td><td>30</td></tr>\
             </table>",
        );
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0][0], vec!["Name", "Age"]);
        assert_eq!(doc.tables[0][1], vec!["Alice", "30"]);
    }

    #[test]
    fn resolves_relative_image_urls_against_the_page() {
        let doc = parse(r#"<img src="/logo.png" alt="Logo"><img src="img/photo.jpg">"#);
        assert_eq!(doc.images.len(), 2);
        assert_eq!(
            doc.images[0].content,
            ImageContent::Remote {
                url: "https://example.com/logo.png".into(),
                alt: "Logo".into(),
            }
        );
        assert_eq!(
            doc.images[1].content,
            ImageContent::Remote {
                url: "https://example.com/articles/img/photo.jpg".into(),
                alt: String::new(),
            }
        );
    }

    #[test]
    fn drops_images_without_src_or_with_odd_schemes() {
        let doc = parse(r#"<img alt="no src"><img src="data:image/png;base64,AAAA">"#);
        assert!(doc.images.is_empty());
    }

    #[test]
    fn extracts_links_with_anchor_text() {
        let doc = parse(r#"<a href="/about">About  us</a><a href="mailto:x@y.z">mail</a>"#);
        assert_eq!(
            doc.links,
            vec![Link {
                url: "https://example.com/about".into(),
                text: "About us".into(),
            }]
        );
    }

    #[test]
    fn reads_title_and_meta_tags() {
        let doc = parse(
            r#"<head><title> Page  Title </title>
               <meta name="description" content="A description.">
               <meta name="keywords" content="one, two"></head>"#,
        );
        assert_eq!(doc.info.title.as_deref(), Some("Page Title"));
        assert_eq!(doc.info.description.as_deref(), Some("A description."));
        assert_eq!(doc.info.keywords.as_deref(), Some("one, two"));
        assert_eq!(
            doc.info.source_url.as_deref(),
            Some("https://example.com/articles/page")
        );
    }

    #[tokio::test]
    async fn rejects_file_sources() {
        let extractor = WebpageExtractor::new();
        let client = reqwest::Client::new();
        let source = Source::File {
            path: "/tmp/x.pdf".into(),
            filename: "x.pdf".into(),
        };
        let err = extractor.extract(&source, &client).await.unwrap_err();
        assert!(err.is_client());
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let extractor = WebpageExtractor::new();
        let client = reqwest::Client::new();
        let source = Source::Url("ftp://example.com/file".into());
        let err = extractor.extract(&source, &client).await.unwrap_err();
        assert!(err.is_client());
    }
}
