use std::sync::Arc;

use docmill_core::extractor::diffbot::DiffbotExtractor;
use docmill_core::extractor::docintel::DocIntelExtractor;
use docmill_core::extractor::webpage::WebpageExtractor;
use docmill_core::{AppConfig, Pipeline, S3Store, Tool};
use docmill_pdf_mupdf::MupdfExtractor;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub pipeline: Pipeline,
    /// Shown on the index page so users know where artifacts go.
    pub storage_display: String,
}

impl AppState {
    /// Wire all four adapters and, when configured, the S3 store.
    pub async fn build(config: &AppConfig) -> Self {
        let client = reqwest::Client::new();

        let mut pipeline = Pipeline::new(client)
            .with_extractor(Tool::Mupdf, Arc::new(MupdfExtractor::new()))
            .with_extractor(Tool::Scraper, Arc::new(WebpageExtractor::new()))
            .with_extractor(
                Tool::DocIntel,
                Arc::new(DocIntelExtractor::new(config.azure.clone())),
            )
            .with_extractor(
                Tool::Diffbot,
                Arc::new(DiffbotExtractor::new(config.diffbot_token.clone())),
            );

        let storage_display = match &config.storage {
            Some(storage) => {
                pipeline = pipeline.with_store(Arc::new(S3Store::connect(storage).await));
                format!("uploads go to bucket '{}'", storage.bucket)
            }
            None => "storage not configured; markdown is returned inline only".to_string(),
        };

        Self {
            pipeline,
            storage_display,
        }
    }
}
