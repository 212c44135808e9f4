//! Dropbox storage, used as the archive store.
//!
//! Talks to the Dropbox HTTP API v2 directly: uploads go to `/2/files/upload` in `add`
//! mode (an existing file is never overwritten), reads to `/2/files/download`, and
//! existence checks to `/2/files/get_metadata`.

use crate::traits::{validate_key, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

pub const DROPBOX_CONTENT_URL: &str = "https://content.dropboxapi.com";
pub const DROPBOX_API_URL: &str = "https://api.dropboxapi.com";
const USER_AGENT: &str = concat!("ofs/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

#[derive(Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Clone)]
pub struct DropboxStorage {
    http_client: Client,
    access_token: String,
    content_url: String,
    api_url: String,
}

impl Debug for DropboxStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DropboxStorage")
            .field("content_url", &self.content_url)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl DropboxStorage {
    pub fn new(access_token: String) -> StorageResult<Self> {
        Self::with_endpoints(
            access_token,
            DROPBOX_CONTENT_URL.to_string(),
            DROPBOX_API_URL.to_string(),
        )
    }

    /// Point the client at different API hosts (used by tests).
    pub fn with_endpoints(
        access_token: String,
        content_url: String,
        api_url: String,
    ) -> StorageResult<Self> {
        if access_token.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "Dropbox access token is empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            access_token,
            content_url: content_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn dropbox_path(storage_key: &str) -> String {
        format!("/{}", storage_key)
    }

    fn api_arg<T: Serialize>(arg: &T) -> StorageResult<String> {
        serde_json::to_string(arg)
            .map_err(|e| StorageError::BackendError(format!("Failed to encode Dropbox-API-Arg: {}", e)))
    }

    /// Map a non-success response to a storage error. 409 bodies carry a tagged
    /// error summary such as `path/conflict/file/..` or `path/not_found/..`.
    async fn error_from_response(
        response: reqwest::Response,
        storage_key: &str,
        operation: &str,
    ) -> StorageError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::CONFLICT if body.contains("not_found") => {
                StorageError::NotFound(storage_key.to_string())
            }
            StatusCode::CONFLICT if body.contains("conflict") => {
                StorageError::AlreadyExists(storage_key.to_string())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                StorageError::ConfigError(format!("Dropbox {} rejected: {} - {}", operation, status, body))
            }
            _ => StorageError::BackendError(format!(
                "Dropbox {} failed: {} - {}",
                operation, status, body
            )),
        }
    }
}

#[async_trait]
impl Storage for DropboxStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let path = Self::dropbox_path(storage_key);
        let size = data.len();
        let start = std::time::Instant::now();

        let arg = Self::api_arg(&UploadArg {
            path: &path,
            mode: "add",
            autorename: false,
            mute: true,
        })?;

        let response = self
            .http_client
            .post(format!("{}/2/files/upload", self.content_url))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Dropbox upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response, storage_key, "upload").await;
            tracing::error!(
                error = %err,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Dropbox upload failed"
            );
            return Err(err);
        }

        tracing::info!(
            path = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Dropbox upload successful"
        );

        Ok(self.public_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<StoredObject> {
        validate_key(storage_key)?;
        let path = Self::dropbox_path(storage_key);
        let arg = Self::api_arg(&PathArg { path: &path })?;

        let response = self
            .http_client
            .post(format!("{}/2/files/download", self.content_url))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await
            .map_err(|e| {
                StorageError::DownloadFailed(format!("Dropbox download request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, storage_key, "download").await);
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("Failed to read Dropbox body: {}", e)))?;

        Ok(StoredObject {
            data,
            content_type: None,
        })
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        let path = Self::dropbox_path(storage_key);

        let response = self
            .http_client
            .post(format!("{}/2/files/get_metadata", self.api_url))
            .bearer_auth(&self.access_token)
            .json(&PathArg { path: &path })
            .send()
            .await
            .map_err(|e| StorageError::BackendError(format!("Dropbox metadata request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(true);
        }

        match Self::error_from_response(response, storage_key, "get_metadata").await {
            StorageError::NotFound(_) => Ok(false),
            other => Err(other),
        }
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("dropbox://{}", Self::dropbox_path(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Dropbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn storage_for(server: &mockito::ServerGuard) -> DropboxStorage {
        DropboxStorage::with_endpoints("sl.test-token".to_string(), server.url(), server.url())
            .unwrap()
    }

    #[test]
    fn empty_token_is_a_config_error() {
        assert!(matches!(
            DropboxStorage::new("  ".to_string()),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn upload_sends_add_mode_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2/files/upload")
            .match_header("authorization", "Bearer sl.test-token")
            .match_header(
                "dropbox-api-arg",
                Matcher::PartialJsonString(
                    r#"{"path":"/ofs/2024-05-06_kaybe4zu.png","mode":"add"}"#.to_string(),
                ),
            )
            .match_body(Matcher::Exact("png-bytes".to_string()))
            .with_status(200)
            .with_body(r#"{"name":"2024-05-06_kaybe4zu.png"}"#)
            .create_async()
            .await;

        let storage = storage_for(&server);
        let url = storage
            .upload_with_key(
                "ofs/2024-05-06_kaybe4zu.png",
                Bytes::from_static(b"png-bytes"),
                "image/png",
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(url, "dropbox:///ofs/2024-05-06_kaybe4zu.png");
    }

    #[tokio::test]
    async fn upload_conflict_is_not_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/files/upload")
            .with_status(409)
            .with_body(r#"{"error_summary":"path/conflict/file/.."}"#)
            .create_async()
            .await;

        let err = storage_for(&server)
            .upload_with_key("ofs/a.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/files/upload")
            .with_status(503)
            .create_async()
            .await;

        let err = storage_for(&server)
            .upload_with_key("ofs/a.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn exists_maps_not_found_to_false() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/files/get_metadata")
            .match_body(Matcher::Json(serde_json::json!({"path": "/ofs/missing.png"})))
            .with_status(409)
            .with_body(r#"{"error_summary":"path/not_found/.."}"#)
            .create_async()
            .await;

        assert!(!storage_for(&server).exists("ofs/missing.png").await.unwrap());
    }

    #[tokio::test]
    async fn download_returns_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/files/download")
            .with_status(200)
            .with_body("gif-bytes")
            .create_async()
            .await;

        let object = storage_for(&server).download("ofs/a.gif").await.unwrap();
        assert_eq!(object.data, Bytes::from_static(b"gif-bytes"));
    }
}
