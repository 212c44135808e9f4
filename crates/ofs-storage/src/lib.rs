//! OFS Storage Library
//!
//! This crate provides the `Storage` trait and its backends: S3-compatible object
//! stores, the local filesystem, an in-memory store and Dropbox.
//!
//! # Storage key format
//!
//! Keys are flat object names (`kaybe4zu.png`) for the primary store and
//! `{folder}/{yyyy-MM-dd}_{name}` for archive copies. Keys must not contain `..` or a
//! leading `/`; every backend rejects them with `StorageError::InvalidKey`.

#[cfg(feature = "storage-dropbox")]
pub mod dropbox;
pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
mod object;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-dropbox")]
pub use dropbox::DropboxStorage;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use ofs_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{validate_key, Storage, StorageError, StorageResult, StoredObject};
