//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. An `AppError` is wrapped
//! together with the configured environment and renders as an [`ErrorResponse`] with the
//! status its metadata declares.

use axum::{
    extract::rejection::FormRejection,
    extract::{FromRef, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use ofs_core::{AppError, ErrorMetadata, LogLevel};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from ofs-core)
#[derive(Debug)]
pub struct HttpAppError {
    pub error: AppError,
    /// Production responses never carry `details` or `error_type`.
    pub production: bool,
}

impl HttpAppError {
    pub fn new(error: AppError, production: bool) -> Self {
        Self { error, production }
    }

    /// Wrap `error` for the environment `state` was configured with.
    pub fn for_state(error: AppError, state: &AppState) -> Self {
        Self::new(error, state.config.is_production())
    }

    /// Form bodies that fail to deserialize (wrong content type, malformed encoding) are a
    /// client error with our ErrorResponse format.
    fn from_form_rejection(rejection: FormRejection, state: &AppState) -> Self {
        Self::for_state(
            AppError::InvalidInput(format!("Invalid request: {}", rejection.body_text())),
            state,
        )
    }
}

/// Form extractor that returns our ErrorResponse format (400 + JSON) on rejection.
/// Reads the query string for GET and the urlencoded body otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedForm<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
    Form<T>: FromRequest<S, Rejection = FormRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(Form(inner)) => Ok(ValidatedForm(inner)),
            Err(rejection) => {
                let app_state = Arc::<AppState>::from_ref(state);
                Err(HttpAppError::from_form_rejection(rejection, &app_state))
            }
        }
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.error;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details only outside production, and never for sensitive errors.
        let (details, error_type) = if self.production || app_error.is_sensitive() {
            (None, None)
        } else {
            (
                Some(app_error.detailed_message()),
                Some(app_error.error_type().to_string()),
            )
        };

        let body = Json(ErrorResponse {
            error: app_error.client_message(),
            details,
            error_type,
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render_in(err: AppError, production: bool) -> (StatusCode, serde_json::Value) {
        let response = HttpAppError::new(err, production).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        render_in(err, false).await
    }

    #[tokio::test]
    async fn status_codes_follow_error_metadata() {
        let cases = [
            (AppError::InvalidInput("No data received.".into()), 400),
            (AppError::Decode("missing media type".into()), 400),
            (AppError::UnsupportedMediaType("text/plain".into()), 415),
            (AppError::RemoteFetch("URL returned status code: 404".into()), 502),
            (AppError::PrimaryPersist("timeout".into()), 503),
            (AppError::Internal("boom".into()), 500),
        ];

        for (err, expected) in cases {
            let (status, body) = render(err).await;
            assert_eq!(status.as_u16(), expected);
            assert!(body["code"].is_string());
            assert!(body.get("url").is_none());
        }
    }

    #[tokio::test]
    async fn sensitive_errors_hide_details() {
        let (_, body) = render(AppError::PrimaryPersist("bucket policy denied".into())).await;
        assert_eq!(body["error"], "Failed to store file");
        assert!(body.get("details").is_none());
        assert!(body.get("error_type").is_none());
    }

    #[tokio::test]
    async fn production_hides_details_of_client_errors() {
        let err = || AppError::Decode("missing media type".into());

        let (_, body) = render_in(err(), false).await;
        assert!(body["details"].is_string());
        assert_eq!(body["error_type"], "Decode");

        let (status, body) = render_in(err(), true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "DECODE_ERROR");
        assert!(body.get("details").is_none());
        assert!(body.get("error_type").is_none());
    }
}
