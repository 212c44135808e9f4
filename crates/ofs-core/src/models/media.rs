use std::fmt;

/// Media types accepted for storage.
///
/// The set is closed: anything outside it is rejected before a storage key is
/// generated or any backend is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
}

/// Returned when a media type is outside the supported set. Carries the rejected value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported media type: {0}")]
pub struct UnsupportedMediaType(pub String);

impl MediaType {
    /// Classify a media type string (`image/png`, `image/jpg`, `image/jpeg`, `image/gif`).
    pub fn from_mime(mime: &str) -> Result<Self, UnsupportedMediaType> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Ok(MediaType::Png),
            "image/jpg" | "image/jpeg" => Ok(MediaType::Jpeg),
            "image/gif" => Ok(MediaType::Gif),
            _ => Err(UnsupportedMediaType(mime.to_string())),
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Png => ".png",
            MediaType::Jpeg => ".jpg",
            MediaType::Gif => ".gif",
        }
    }

    /// Canonical media type string.
    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Gif => "image/gif",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}
