#[cfg(feature = "storage-dropbox")]
use crate::DropboxStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{MemoryStorage, Storage, StorageBackend, StorageError, StorageResult};
use ofs_core::BackendConfig;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &BackendConfig) -> StorageResult<Arc<dyn Storage>> {
    let role = config.role;

    match config.backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config.s3_bucket.clone().ok_or_else(|| {
                StorageError::ConfigError(format!("{}_S3_BUCKET not configured", role))
            })?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "{}_S3_REGION or AWS_REGION not configured",
                    role
                ))
            })?;

            let storage = S3Storage::new(bucket, region, config.s3_endpoint.clone()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError(format!("{}_LOCAL_STORAGE_PATH not configured", role))
            })?;
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "{}_LOCAL_STORAGE_BASE_URL not configured",
                    role
                ))
            })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-dropbox")]
        StorageBackend::Dropbox => {
            let token = config.dropbox_access_token.clone().ok_or_else(|| {
                StorageError::ConfigError("DROPBOX_ACCESS_TOKEN not configured".to_string())
            })?;
            Ok(Arc::new(DropboxStorage::new(token)?))
        }

        #[cfg(not(feature = "storage-dropbox"))]
        StorageBackend::Dropbox => Err(StorageError::ConfigError(
            "Dropbox storage backend not available (storage-dropbox feature not enabled)"
                .to_string(),
        )),

        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new(config.memory_base_url.clone()))),
    }
}
