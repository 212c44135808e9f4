use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Archive counters since start-up. Only `enabled` is present without an archive backend.
#[derive(Debug, Serialize, ToSchema)]
pub struct ArchiveStatsResponse {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_flight: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/archive/stats",
    tag = "archive",
    responses(
        (status = 200, description = "Archive queue counters", body = ArchiveStatsResponse)
    )
)]
pub async fn archive_stats(State(state): State<Arc<AppState>>) -> Json<ArchiveStatsResponse> {
    let Some(queue) = &state.archive else {
        return Json(ArchiveStatsResponse {
            enabled: false,
            backend: None,
            submitted: None,
            rejected: None,
            stored: None,
            failed: None,
            in_flight: None,
        });
    };

    let stats = queue.stats();
    Json(ArchiveStatsResponse {
        enabled: true,
        backend: Some(queue.backend().to_string()),
        submitted: Some(stats.submitted),
        rejected: Some(stats.rejected),
        stored: Some(stats.stored),
        failed: Some(stats.failed),
        in_flight: Some(stats.in_flight),
    })
}
