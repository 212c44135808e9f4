//! Persistence coordination: one decoded asset in, one primary URL out.

use chrono::{NaiveDate, Utc};
use ofs_core::{
    AppError, ArchiveStatus, DecodedAsset, KeyGenerator, MediaType, PersistedAsset,
};
use ofs_storage::Storage;
use std::sync::Arc;

use crate::archive::{ArchiveJob, ArchiveQueue};
use crate::retry::RetryPolicy;

/// Path of the archive copy: `{folder}/{yyyy-MM-dd}_{key}`.
pub fn archive_key(folder: &str, date: NaiveDate, storage_key: &str) -> String {
    format!(
        "{}/{}_{}",
        folder.trim_matches('/'),
        date.format("%Y-%m-%d"),
        storage_key
    )
}

/// Drives key assignment, the awaited primary write and the queued archive copy.
#[derive(Clone)]
pub struct PersistenceCoordinator {
    primary: Arc<dyn Storage>,
    archive: Option<ArchiveQueue>,
    keygen: Arc<KeyGenerator>,
    key_length: i32,
    archive_folder: String,
    retry: RetryPolicy,
}

impl PersistenceCoordinator {
    pub fn new(
        primary: Arc<dyn Storage>,
        archive: Option<ArchiveQueue>,
        keygen: Arc<KeyGenerator>,
        key_length: i32,
        archive_folder: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            primary,
            archive,
            keygen,
            key_length,
            archive_folder: archive_folder.into(),
            retry,
        }
    }

    /// Store `asset` in the primary backend and queue its archive copy.
    ///
    /// The media type is classified before anything is written, so an unsupported
    /// type never reaches a backend. Only the primary write is awaited.
    #[tracing::instrument(
        skip(self, asset),
        fields(
            media_type = %asset.media_type(),
            size_bytes = asset.len(),
            storage_key = tracing::field::Empty
        )
    )]
    pub async fn persist(&self, asset: DecodedAsset) -> Result<PersistedAsset, AppError> {
        let media_type = MediaType::from_mime(asset.media_type())?;

        let token = self.keygen.generate(self.key_length)?;
        let storage_key = format!("{}{}", token, media_type.extension());
        tracing::Span::current().record("storage_key", storage_key.as_str());

        let start = std::time::Instant::now();
        let (result, attempts) = self
            .retry
            .run("primary_upload", || {
                self.primary
                    .upload_with_key(&storage_key, asset.data().clone(), asset.media_type())
            })
            .await;

        let url = result.map_err(|e| {
            tracing::error!(
                error = %e,
                attempts = attempts,
                backend = %self.primary.backend_type(),
                "Primary storage write failed"
            );
            AppError::PrimaryPersist(e.to_string())
        })?;

        tracing::info!(
            attempts = attempts,
            duration_ms = start.elapsed().as_millis(),
            media_type = %media_type,
            url = %url,
            "Stored in primary storage"
        );

        let archive = self.queue_archive_copy(&storage_key, &asset);

        Ok(PersistedAsset {
            storage_key,
            url,
            archive,
        })
    }

    fn queue_archive_copy(&self, storage_key: &str, asset: &DecodedAsset) -> ArchiveStatus {
        let Some(queue) = &self.archive else {
            return ArchiveStatus::NotAttempted;
        };

        let key = archive_key(&self.archive_folder, Utc::now().date_naive(), storage_key);
        let job = ArchiveJob::new(key, asset.data().clone(), asset.media_type());

        match queue.submit(job) {
            Ok(()) => ArchiveStatus::InFlight,
            Err(e) => {
                tracing::warn!(error = %e, "Archive copy not queued");
                ArchiveStatus::Unknown
            }
        }
    }
}
