//! OFS Services Layer
//!
//! This crate is the business service layer: payload decoding, the archive worker
//! pool and the persistence coordinator that ties key generation and both storage
//! backends together. The API crate depends on this facade and keeps HTTP handling
//! thin.

pub mod archive;
pub mod coordinator;
pub mod decoder;
pub mod retry;
pub mod upload;

pub use archive::{
    ArchiveJob, ArchiveOutcome, ArchiveQueue, ArchiveQueueConfig, ArchiveStatsSnapshot,
    ArchiveSubmitError,
};
pub use coordinator::{archive_key, PersistenceCoordinator};
pub use decoder::{parse_inline, PayloadDecoder};
pub use ofs_storage::{create_storage, Storage, StorageBackend, StorageError, StorageResult};
pub use retry::RetryPolicy;
pub use upload::UploadService;
