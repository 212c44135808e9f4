use bytes::Bytes;
use serde::Serialize;

use crate::error::AppError;

/// Prefix that routes a `data` value to the remote fetch path.
pub const REMOTE_REFERENCE_PREFIX: &str = "http";

/// A `save` input, tagged by shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput<'a> {
    /// `data:<media type>;base64,<payload>` (segments in any order)
    InlineEncoded(&'a str),
    /// URL whose response body is stored
    RemoteReference(&'a str),
}

impl<'a> RawInput<'a> {
    /// Tag the input by prefix. Blank input is rejected before any decoding happens.
    pub fn classify(data: &'a str) -> Result<Self, AppError> {
        if data.trim().is_empty() {
            return Err(AppError::InvalidInput("No data received.".to_string()));
        }

        if data.starts_with(REMOTE_REFERENCE_PREFIX) {
            Ok(RawInput::RemoteReference(data))
        } else {
            Ok(RawInput::InlineEncoded(data))
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RawInput::InlineEncoded(_) => "inline",
            RawInput::RemoteReference(_) => "remote",
        }
    }
}

/// Decoded bytes plus the media type they were declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAsset {
    data: Bytes,
    media_type: String,
}

impl DecodedAsset {
    pub fn new(data: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What happened to the archive copy at the moment the request returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    /// No archive backend is configured.
    NotAttempted,
    /// The archive queue accepted the job.
    InFlight,
    /// The archive queue refused the job; only logs and counters record it.
    Unknown,
}

/// Result of a successful `save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedAsset {
    pub storage_key: String,
    pub url: String,
    pub archive: ArchiveStatus,
}
