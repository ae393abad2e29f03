//! Azure Document Intelligence adapter (the enterprise PDF tool).
//!
//! Talks to the Form Recognizer v3 REST API: submit the PDF to the
//! `prebuilt-document` model, then poll the returned operation until it
//! settles. The service does not hand back image bytes, so embedded images
//! and /Info metadata still come from local raw object access.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{ExtractError, Extractor, Source};
use crate::pdf::PdfFile;
use crate::{AzureConfig, ExtractedDocument, ExtractedImage, ImageContent, Table};

const API_VERSION: &str = "2023-07-31";

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const POLL_TIMEOUT: Duration = Duration::from_secs(120);

pub struct DocIntelExtractor {
    config: Option<AzureConfig>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl DocIntelExtractor {
    pub fn new(config: Option<AzureConfig>) -> Self {
        Self {
            config,
            poll_interval: POLL_INTERVAL,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    /// Shorten the polling cadence (tests).
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }
}

impl Extractor for DocIntelExtractor {
    fn name(&self) -> &'static str {
        "docintel"
    }

    fn available(&self) -> bool {
        self.config.is_some()
    }

    fn extract<'a>(
        &'a self,
        source: &'a Source,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ExtractedDocument, ExtractError>> + Send + 'a>> {
        Box::pin(async move {
            let path = match source {
                Source::File { path, .. } => path.clone(),
                Source::Url(_) => {
                    return Err(ExtractError::UnsupportedInput(
                        "the docintel tool takes a file upload, not a URL".into(),
                    ));
                }
            };
            let config = self.config.as_ref().ok_or_else(|| {
                ExtractError::NotConfigured(
                    "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT / AZURE_DOCUMENT_INTELLIGENCE_KEY \
                     are not set"
                        .into(),
                )
            })?;

            let bytes = tokio::task::spawn_blocking(move || std::fs::read(&path))
                .await
                .map_err(|e| ExtractError::Extraction(e.to_string()))??;

            let submit_url = format!(
                "{}/formrecognizer/documentModels/prebuilt-document:analyze?api-version={}",
                config.endpoint.trim_end_matches('/'),
                API_VERSION
            );

            let resp = client
                .post(&submit_url)
                .header("Ocp-Apim-Subscription-Key", &config.key)
                .header("Content-Type", "application/pdf")
                .body(bytes.clone())
                .timeout(SUBMIT_TIMEOUT)
                .send()
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "analyze submit failed");
                    ExtractError::Http(e.to_string())
                })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ExtractError::Service(format!(
                    "analyze request returned HTTP {status}: {body}"
                )));
            }

            let operation_url = resp
                .headers()
                .get("operation-location")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    ExtractError::Extraction("missing Operation-Location header".into())
                })?;

            let result = self.poll(client, &operation_url, &config.key).await?;
            let mut doc = parse_analyze_result(&result);

            // Embedded images and /Info come from the bytes we already hold
            if let Ok(pdf) = tokio::task::spawn_blocking(move || PdfFile::load(&bytes))
                .await
                .map_err(|e| ExtractError::Extraction(e.to_string()))?
            {
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
                info.page_count = doc.info.page_count.or(info.page_count);
                info.file_size = Some(pdf.byte_len() as u64);
                doc.info = info;
            }

            Ok(doc)
        })
    }
}

impl DocIntelExtractor {
    async fn poll(
        &self,
        client: &reqwest::Client,
        operation_url: &str,
        key: &str,
    ) -> Result<serde_json::Value, ExtractError> {
        let deadline = tokio::time::Instant::now() + self.poll_timeout;

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let resp = client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", key)
                .timeout(SUBMIT_TIMEOUT)
                .send()
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "poll request failed");
                    ExtractError::Http(e.to_string())
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ExtractError::Service(format!(
                    "poll request returned HTTP {status}"
                )));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| ExtractError::Extraction(e.to_string()))?;

            match data["status"].as_str() {
                Some("succeeded") => return Ok(data["analyzeResult"].clone()),
                Some("failed") => {
                    let message = data["error"]["message"].as_str().unwrap_or("unknown error");
                    return Err(ExtractError::Service(format!("analysis failed: {message}")));
                }
                // "running" / "notStarted": keep polling until the deadline
                _ => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(ExtractError::Service(
                            "timed out waiting for the analysis result".into(),
                        ));
                    }
                }
            }
        }
    }
}

fn parse_analyze_result(result: &serde_json::Value) -> ExtractedDocument {
    let mut text = Vec::new();
    if let Some(pages) = result["pages"].as_array() {
        for page in pages {
            let page_text: Vec<&str> = page["lines"]
                .as_array()
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(|l| l["content"].as_str())
                        .collect()
                })
                .unwrap_or_default();
            text.push(page_text.join("\n"));
        }
    }

    let mut tables: Vec<Table> = Vec::new();
    if let Some(raw_tables) = result["tables"].as_array() {
        for t in raw_tables {
            let rows = t["rowCount"].as_u64().unwrap_or(0) as usize;
            let cols = t["columnCount"].as_u64().unwrap_or(0) as usize;
            if rows == 0 || cols == 0 {
                continue;
            }
            let mut grid: Table = vec![vec![String::new(); cols]; rows];
            if let Some(cells) = t["cells"].as_array() {
                for cell in cells {
                    let r = cell["rowIndex"].as_u64().unwrap_or(0) as usize;
                    let c = cell["columnIndex"].as_u64().unwrap_or(0) as usize;
                    if r < rows && c < cols {
                        grid[r][c] = cell["content"].as_str().unwrap_or("").to_string();
                    }
                }
            }
            tables.push(grid);
        }
    }

    let mut key_values = BTreeMap::new();
    if let Some(pairs) = result["keyValuePairs"].as_array() {
        for pair in pairs {
            let Some(key) = pair["key"]["content"].as_str() else {
                continue;
            };
            let value = pair["value"]["content"].as_str().unwrap_or("");
            key_values.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let mut doc = ExtractedDocument {
        text,
        tables,
        key_values,
        ..Default::default()
    };
    doc.info.page_count = result["pages"].as_array().map(|p| p.len());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pages_tables_and_key_values() {
        let result = serde_json::json!({
            "pages": [
                {"pageNumber": 1, "lines": [{"content": "Title line"}, {"content": "Body line"}]},
                {"pageNumber": 2, "lines": [{"content": "Second page"}]}
            ],
            "tables": [{
                "rowCount": 2,
                "columnCount": 2,
                "cells": [
                    {"rowIndex": 0, "columnIndex": 0, "content": "H1"},
                    {"rowIndex": 0, "columnIndex": 1, "content": "H2"},
                    {"rowIndex": 1, "columnIndex": 0, "content": "a"},
                    {"rowIndex": 1, "columnIndex": 1, "content": "b"}
                ]
            }],
            "keyValuePairs": [
                {"key": {"content": "Invoice No"}, "value": {"content": "42"}},
                {"key": {"content": "Signed"}, "value": null}
            ]
        });

        let doc = parse_analyze_result(&result);
        assert_eq!(doc.text, vec!["Title line\nBody line", "Second page"]);
        assert_eq!(doc.tables, vec![vec![
            vec!["H1".to_string(), "H2".to_string()],
            vec!["a".to_string(), "b".to_string()],
        ]]);
        assert_eq!(doc.key_values.get("Invoice No").map(String::as_str), Some("42"));
        assert_eq!(doc.key_values.get("Signed").map(String::as_str), Some(""));
        assert_eq!(doc.info.page_count, Some(2));
    }

    #[test]
    fn out_of_range_cells_are_dropped() {
        let result = serde_json::json!({
            "tables": [{
                "rowCount": 1,
                "columnCount": 1,
                "cells": [
                    {"rowIndex": 0, "columnIndex": 0, "content": "ok"},
                    {"rowIndex": 5, "columnIndex": 9, "content": "stray"}
                ]
            }]
        });
        let doc = parse_analyze_result(&result);
        assert_eq!(doc.tables, vec![vec![vec!["ok".to_string()]]]);
    }

    #[test]
    fn empty_result_parses_to_an_empty_document() {
        let doc = parse_analyze_result(&serde_json::json!({}));
        assert!(doc.text.is_empty());
        assert!(doc.tables.is_empty());
        assert!(doc.key_values.is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_is_not_configured() {
        let extractor = DocIntelExtractor::new(None);
        let client = reqwest::Client::new();
        let source = Source::File {
            path: "/tmp/x.pdf".into(),
            filename: "x.pdf".into(),
        };
        let err = extractor.extract(&source, &client).await.unwrap_err();
        assert!(matches!(err, ExtractError::NotConfigured(_)));
    }
}
