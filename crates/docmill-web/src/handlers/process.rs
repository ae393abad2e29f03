use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};

use docmill_core::{ContentType, ExtractionRequest, Source};

use crate::error::ApiError;
use crate::models::{ProcessResponse, WebpageRequest};
use crate::state::AppState;
use crate::upload;

pub async fn process_pdf(
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let tier = super::parse_tier(&tier)?;
    let form = upload::parse_upload(multipart).await?;
    let tool = super::resolve_tool(tier, ContentType::Pdf, form.tool.as_deref())?;

    // The upload lives on disk only for the duration of the request
    let temp_dir = tempfile::tempdir()
        .map_err(|e| ApiError::server(format!("failed to create temp directory: {e}")))?;
    let pdf_path = temp_dir.path().join("upload.pdf");
    std::fs::write(&pdf_path, &form.data)
        .map_err(|e| ApiError::server(format!("failed to write temp file: {e}")))?;

    let request = ExtractionRequest {
        content_type: ContentType::Pdf,
        tool,
        source: Source::File {
            path: pdf_path,
            filename: form.filename,
        },
    };

    let done = state.pipeline.process(&request).await?;
    drop(temp_dir);

    Ok(Json(done.into()))
}

pub async fn process_webpage(
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
    Json(req): Json<WebpageRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let tier = super::parse_tier(&tier)?;

    let url = req.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("url must not be empty"));
    }
    let parsed =
        reqwest::Url::parse(url).map_err(|e| ApiError::bad_request(format!("invalid URL: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ApiError::bad_request(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let tool = super::resolve_tool(tier, ContentType::Webpage, req.tool.as_deref())?;

    let request = ExtractionRequest {
        content_type: ContentType::Webpage,
        tool,
        source: Source::Url(url.to_string()),
    };

    let done = state.pipeline.process(&request).await?;

    Ok(Json(done.into()))
}
