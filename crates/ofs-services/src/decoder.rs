//! Payload decoding.
//!
//! Turns a `save` input into bytes plus a declared media type. Inline inputs are
//! data URIs (`data:image/png;base64,...`); remote inputs are fetched with a bounded
//! HTTP GET. Every failure is returned as an explicit `AppError`.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ofs_core::{AppError, DecodedAsset, RawInput};
use reqwest::Client;
use std::time::Duration;

const BASE64_PREFIX: &str = "base64,";
const DATA_KEY: &str = "data";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const USER_AGENT: &str = concat!("ofs/", env!("CARGO_PKG_VERSION"));

/// Parse an inline data URI.
///
/// The input is split on `;` and each segment inspected on its own, so segment order
/// does not matter and unknown segments are skipped. A `base64,` segment (no `:`)
/// carries the payload; a `data:` segment carries the media type. Spaces in the
/// payload are turned back into `+`, undoing form-encoding damage in transit.
pub fn parse_inline(data: &str) -> Result<DecodedAsset, AppError> {
    let mut payload: Option<String> = None;
    let mut media_type: Option<&str> = None;

    for segment in data.split(';') {
        match segment.split_once(':') {
            None => {
                let is_payload = segment
                    .get(..BASE64_PREFIX.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BASE64_PREFIX));
                if is_payload {
                    payload = Some(segment[BASE64_PREFIX.len()..].replace(' ', "+"));
                }
            }
            Some((key, value)) => {
                if key.eq_ignore_ascii_case(DATA_KEY) {
                    media_type = Some(value);
                }
            }
        }
    }

    let payload = payload
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Decode("missing base64 payload".to_string()))?;
    let media_type = media_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::Decode("missing media type".to_string()))?;

    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| AppError::Decode(format!("invalid base64 payload: {}", e)))?;

    Ok(DecodedAsset::new(bytes, media_type))
}

/// Media type from a `Content-Type` header value, without parameters.
fn media_type_from_header(value: Option<&str>) -> String {
    value
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

/// Decodes both input shapes. Holds the HTTP client used for remote references.
#[derive(Clone)]
pub struct PayloadDecoder {
    http_client: Client,
}

impl PayloadDecoder {
    /// `fetch_timeout` bounds the whole remote GET, body included.
    pub fn new(fetch_timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(fetch_timeout)
            .build()
            .context("Failed to create HTTP client for remote fetches")?;

        Ok(Self { http_client })
    }

    pub async fn decode(&self, input: RawInput<'_>) -> Result<DecodedAsset, AppError> {
        match input {
            RawInput::InlineEncoded(data) => parse_inline(data),
            RawInput::RemoteReference(url) => self.fetch_remote(url).await,
        }
    }

    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch_remote(&self, url: &str) -> Result<DecodedAsset, AppError> {
        let start = std::time::Instant::now();

        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::warn!(error = %e, timeout = e.is_timeout(), "Failed to download from URL");
            AppError::RemoteFetch(format!("Failed to download from URL: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Remote URL returned non-success status");
            return Err(AppError::RemoteFetch(format!(
                "URL returned status code: {}",
                status
            )));
        }

        let media_type = media_type_from_header(
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|h| h.to_str().ok()),
        );

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to read response body");
            AppError::RemoteFetch(format!("Failed to read response body: {}", e))
        })?;

        tracing::info!(
            media_type = %media_type,
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Downloaded remote content"
        );

        Ok(DecodedAsset::new(body, media_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    fn decoder() -> PayloadDecoder {
        PayloadDecoder::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn parses_standard_data_uri() {
        let asset = parse_inline(&format!("data:image/png;base64,{}", PNG_BASE64)).unwrap();
        assert_eq!(asset.media_type(), "image/png");
        assert_eq!(asset.data().as_ref(), STANDARD.decode(PNG_BASE64).unwrap().as_slice());
        assert!(asset.data().starts_with(b"\x89PNG"));
    }

    #[test]
    fn segment_order_and_extra_segments_do_not_matter() {
        let asset = parse_inline("base64,R0lGODlh;charset=binary;foo:bar;data:image/gif").unwrap();
        assert_eq!(asset.media_type(), "image/gif");
        assert_eq!(asset.data().as_ref(), b"GIF89a");
    }

    #[test]
    fn prefix_and_key_match_case_insensitively() {
        let asset = parse_inline("DATA:image/jpeg;BASE64,/9j/").unwrap();
        assert_eq!(asset.media_type(), "image/jpeg");
        assert_eq!(asset.data().as_ref(), &[0xff, 0xd8, 0xff]);
    }

    #[test]
    fn spaces_in_payload_become_plus() {
        let asset = parse_inline("data:image/gif;base64,  8=").unwrap();
        assert_eq!(asset.data().as_ref(), &[0xfb, 0xef]);
    }

    #[test]
    fn missing_payload_is_a_decode_error() {
        for input in ["data:image/png", "data:image/png;base64,", "data:image/png;utf8,abc"] {
            assert!(matches!(parse_inline(input), Err(AppError::Decode(_))), "{input}");
        }
    }

    #[test]
    fn missing_media_type_is_a_decode_error() {
        for input in ["base64,AAAA", "data:;base64,AAAA", "mime:image/png;base64,AAAA"] {
            assert!(matches!(parse_inline(input), Err(AppError::Decode(_))), "{input}");
        }
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let err = parse_inline("data:image/png;base64,not*base64").unwrap_err();
        assert!(matches!(err, AppError::Decode(ref msg) if msg.contains("invalid base64")));
    }

    #[test]
    fn decoding_does_not_classify() {
        // Unsupported media types are rejected later, by the coordinator.
        let asset = parse_inline("data:text/plain;base64,aGk=").unwrap();
        assert_eq!(asset.media_type(), "text/plain");
    }

    #[test]
    fn header_parameters_are_stripped() {
        assert_eq!(media_type_from_header(Some("image/png; charset=binary")), "image/png");
        assert_eq!(media_type_from_header(Some("  ")), FALLBACK_CONTENT_TYPE);
        assert_eq!(media_type_from_header(None), FALLBACK_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn remote_reference_yields_body_and_declared_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cat.gif")
            .with_status(200)
            .with_header("content-type", "image/gif; qs=0.8")
            .with_body("GIF89a")
            .create_async()
            .await;

        let url = format!("{}/cat.gif", server.url());
        let asset = decoder()
            .decode(RawInput::classify(&url).unwrap())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(asset.media_type(), "image/gif");
        assert_eq!(asset.data().as_ref(), b"GIF89a");
    }

    #[tokio::test]
    async fn non_success_status_is_a_remote_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing.png", server.url());
        let err = decoder()
            .decode(RawInput::RemoteReference(&url))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RemoteFetch(ref msg) if msg.contains("404")));
    }

    #[tokio::test]
    async fn unparseable_url_is_a_remote_fetch_error() {
        let err = decoder()
            .decode(RawInput::RemoteReference("httpfoo"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RemoteFetch(_)));
    }

    #[tokio::test]
    async fn slow_remote_is_cut_off_by_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let decoder = PayloadDecoder::new(Duration::from_millis(200)).unwrap();
        let url = format!("http://{}/slow.png", addr);
        let err = decoder
            .decode(RawInput::RemoteReference(&url))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RemoteFetch(_)));
        server.abort();
    }
}
