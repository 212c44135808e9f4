//! OFS Core Library
//!
//! This crate provides the domain models, error types, configuration, media
//! classification and storage key generation shared by every OFS component.

pub mod config;
pub mod error;
pub mod keygen;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{ArchiveConfig, BackendConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use keygen::{KeyGenError, KeyGenerator, DEFAULT_KEY_LENGTH};
pub use models::{
    ArchiveStatus, DecodedAsset, MediaType, PersistedAsset, RawInput, UnsupportedMediaType,
};
pub use storage_types::StorageBackend;
