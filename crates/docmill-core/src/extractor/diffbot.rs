//! Diffbot article API adapter (the enterprise webpage tool).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{ExtractError, Extractor, Source};
use crate::{DocumentInfo, ExtractedDocument, ExtractedImage, ImageContent, Link};

const DIFFBOT_API_URL: &str = "https://api.diffbot.com/v3/article";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct DiffbotExtractor {
    token: Option<String>,
    api_url: String,
    timeout: Duration,
}

impl DiffbotExtractor {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            api_url: DIFFBOT_API_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Point the adapter at a different endpoint (tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

impl Extractor for DiffbotExtractor {
    fn name(&self) -> &'static str {
        "diffbot"
    }

    fn available(&self) -> bool {
        self.token.is_some()
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
                        "the diffbot tool takes a URL, not a file upload".into(),
                    ));
                }
            };
            let token = self.token.as_deref().ok_or_else(|| {
                ExtractError::NotConfigured("DIFFBOT_TOKEN is not set".into())
            })?;

            let resp = client
                .get(&self.api_url)
                .query(&[("token", token), ("url", url), ("discussion", "false")])
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| {
                    tracing::debug!(url, error = %e, "Diffbot request failed");
                    ExtractError::Http(e.to_string())
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ExtractError::Service(format!(
                    "Diffbot returned HTTP {status}"
                )));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| ExtractError::Extraction(e.to_string()))?;

            // API errors come back as 200 with an "error" field
            if let Some(message) = data["error"].as_str() {
                return Err(ExtractError::Service(format!("Diffbot error: {message}")));
            }

            parse_article(&data, url)
        })
    }
}

fn parse_article(data: &serde_json::Value, url: &str) -> Result<ExtractedDocument, ExtractError> {
    let article = data["objects"]
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| {
            ExtractError::Extraction("Diffbot response contained no objects".into())
        })?;

    let text: Vec<String> = article["text"]
        .as_str()
        .unwrap_or("")
        .split('\n')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    let images: Vec<ExtractedImage> = article["images"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|img| {
                    img["url"].as_str().map(|u| ExtractedImage {
                        content: ImageContent::Remote {
                            url: u.to_string(),
                            alt: img["title"].as_str().unwrap_or("").to_string(),
                        },
                        page: None,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let links: Vec<Link> = article["links"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|l| {
                    l.as_str().map(|u| Link {
                        url: u.to_string(),
                        text: String::new(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let non_empty = |v: &serde_json::Value| {
        v.as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    Ok(ExtractedDocument {
        text,
        tables: Vec::new(),
        images,
        links,
        key_values: Default::default(),
        info: DocumentInfo {
            title: non_empty(&article["title"]),
            author: non_empty(&article["author"]),
            subject: non_empty(&article["siteName"]),
            creation_date: non_empty(&article["date"]),
            source_url: Some(url.to_string()),
            ..Default::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_typical_article_object() {
        let data = serde_json::json!({
            "objects": [{
                "title": "An Article",
                "author": "A. Writer",
                "siteName": "Example News",
                "date": "Fri, 22 Aug 2026 00:00:00 GMT",
                "text": "First paragraph.\nSecond paragraph.\n",
                "images": [
                    {"url": "https://cdn.example.com/a.jpg", "title": "Figure"},
                    {"notaurl": true}
                ],
                "links": ["https://example.com/next", 42]
            }]
        });

        let doc = parse_article(&data, "https://example.com/article").unwrap();
        assert_eq!(doc.text, vec!["First paragraph.", "Second paragraph."]);
        assert_eq!(doc.images.len(), 1);
        assert_eq!(
            doc.images[0].content,
            ImageContent::Remote {
                url: "https://cdn.example.com/a.jpg".into(),
                alt: "Figure".into(),
            }
        );
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].url, "https://example.com/next");
        assert_eq!(doc.info.title.as_deref(), Some("An Article"));
        assert_eq!(doc.info.author.as_deref(), Some("A. Writer"));
        assert_eq!(
            doc.info.source_url.as_deref(),
            Some("https://example.com/article")
        );
    }

    #[test]
    fn empty_objects_array_is_an_extraction_error() {
        let data = serde_json::json!({"objects": []});
        let err = parse_article(&data, "https://example.com").unwrap_err();
        assert!(matches!(err, ExtractError::Extraction(_)));
    }

    #[tokio::test]
    async fn missing_token_is_not_configured() {
        let extractor = DiffbotExtractor::new(None);
        let client = reqwest::Client::new();
        let source = Source::Url("https://example.com".into());
        let err = extractor.extract(&source, &client).await.unwrap_err();
        assert!(matches!(err, ExtractError::NotConfigured(_)));
    }
}
