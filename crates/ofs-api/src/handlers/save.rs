use crate::error::{ErrorResponse, HttpAppError, ValidatedForm};
use crate::state::AppState;
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SaveRequest {
    /// `data:<media type>;base64,<payload>` or an http(s) URL to fetch
    #[serde(default)]
    pub data: Option<String>,
}

/// Persist an image and return the URL it is served from.
#[utoipa::path(
    method(get, post),
    path = "/save",
    tag = "files",
    params(SaveRequest),
    request_body(content = SaveRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Stored; body is the primary URL", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or undecodable data", body = ErrorResponse),
        (status = 415, description = "Media type is not png, jpg, jpeg or gif", body = ErrorResponse),
        (status = 502, description = "Remote URL could not be fetched", body = ErrorResponse),
        (status = 503, description = "Primary storage write failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "save"))]
pub async fn save(
    State(state): State<Arc<AppState>>,
    ValidatedForm(request): ValidatedForm<SaveRequest>,
) -> Result<String, HttpAppError> {
    let data = request.data.unwrap_or_default();
    let persisted = state
        .uploads
        .save(&data)
        .await
        .map_err(|e| HttpAppError::for_state(e, &state))?;

    tracing::info!(
        storage_key = %persisted.storage_key,
        archive = ?persisted.archive,
        "Save completed"
    );

    Ok(persisted.url)
}
