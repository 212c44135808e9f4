use crate::object::{get_object, object_exists, put_object};
use crate::traits::{validate_key, Storage, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::memory::InMemory;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-process storage backed by `object_store`'s in-memory store.
///
/// Keeps content types like S3 does, which makes it the backend of choice for tests
/// and for running the service without cloud credentials. Cloning shares the store.
#[derive(Clone)]
pub struct MemoryStorage {
    store: Arc<InMemory>,
    base_url: String,
    uploads: Arc<AtomicU64>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            base_url: base_url.into(),
            uploads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of successful uploads since creation.
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let size = data.len();

        put_object(self.store.as_ref(), storage_key, data, content_type).await?;
        self.uploads.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            key = %storage_key,
            content_type = %content_type,
            size_bytes = size,
            "Memory storage upload successful"
        );

        Ok(self.public_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<StoredObject> {
        validate_key(storage_key)?;
        get_object(self.store.as_ref(), storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        object_exists(self.store.as_ref(), storage_key).await
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
