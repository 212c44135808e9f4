//! Service wiring: decoder, key generator, archive queue and coordinator.

use anyhow::Result;
use ofs_core::{Config, KeyGenerator};
use ofs_services::{
    ArchiveQueue, ArchiveQueueConfig, PayloadDecoder, PersistenceCoordinator, RetryPolicy,
    Storage, UploadService,
};
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Assemble the application state around already-built backends. Spawns the archive
/// dispatcher, so it must run inside a Tokio runtime.
pub fn initialize_services(
    config: &Config,
    primary: Arc<dyn Storage>,
    archive_storage: Option<Arc<dyn Storage>>,
) -> Result<Arc<AppState>> {
    let decoder = PayloadDecoder::new(Duration::from_secs(config.remote_fetch_timeout_secs))?;

    let (archive, archive_folder) = match (&config.archive, archive_storage) {
        (Some(archive_config), Some(storage)) => (
            Some(ArchiveQueue::new(
                storage,
                ArchiveQueueConfig::from(archive_config),
            )),
            archive_config.folder.clone(),
        ),
        (None, None) => (None, String::new()),
        (Some(_), None) => {
            return Err(anyhow::anyhow!(
                "Archive is configured but no archive storage was provided"
            ))
        }
        (None, Some(_)) => {
            return Err(anyhow::anyhow!(
                "Archive storage was provided without archive configuration"
            ))
        }
    };

    let coordinator = PersistenceCoordinator::new(
        primary.clone(),
        archive.clone(),
        Arc::new(KeyGenerator::new()),
        config.key_length,
        archive_folder,
        RetryPolicy::primary(config.primary_max_retries),
    );

    tracing::info!(
        key_length = config.key_length,
        primary_max_retries = config.primary_max_retries,
        remote_fetch_timeout_secs = config.remote_fetch_timeout_secs,
        archive_enabled = archive.is_some(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        uploads: UploadService::new(decoder, coordinator),
        primary,
        archive,
    }))
}
