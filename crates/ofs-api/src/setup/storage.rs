//! Storage setup and initialization

use anyhow::{Context, Result};
use ofs_core::Config;
use ofs_storage::{create_storage, Storage};
use std::sync::Arc;

/// Build the primary backend and, when configured, the archive backend.
pub async fn setup_storage(
    config: &Config,
) -> Result<(Arc<dyn Storage>, Option<Arc<dyn Storage>>)> {
    tracing::info!("Initializing storage backends...");

    let primary = create_storage(&config.primary)
        .await
        .context("Failed to initialize primary storage")?;
    tracing::info!(
        backend = %primary.backend_type(),
        "Primary storage initialized"
    );

    let archive = match &config.archive {
        Some(archive) => {
            let storage = create_storage(&archive.storage)
                .await
                .context("Failed to initialize archive storage")?;
            tracing::info!(
                backend = %storage.backend_type(),
                folder = %archive.folder,
                "Archive storage initialized"
            );
            Some(storage)
        }
        None => {
            tracing::info!("No archive storage configured, archive copies disabled");
            None
        }
    };

    Ok((primary, archive))
}
