use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;

use docmill_core::Tool;

use crate::error::ApiError;
use crate::models::{HealthResponse, ServicesJson, TierServicesJson};
use crate::state::AppState;

fn service_status(state: &AppState, tool: Tool) -> &'static str {
    if state.pipeline.tool_available(tool) {
        "available"
    } else {
        "not configured"
    }
}

/// Health report. Both tier endpoints return the full per-service view.
pub async fn health(
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
) -> Result<Json<HealthResponse>, ApiError> {
    super::parse_tier(&tier)?;

    Ok(Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        services: ServicesJson {
            opensource: TierServicesJson {
                pdf: service_status(&state, Tool::Mupdf),
                webpage: service_status(&state, Tool::Scraper),
            },
            enterprise: TierServicesJson {
                pdf: service_status(&state, Tool::DocIntel),
                webpage: service_status(&state, Tool::Diffbot),
            },
        },
        storage: if state.pipeline.storage_configured() {
            "configured"
        } else {
            "not configured"
        },
    }))
}
