//! Shared `object_store` plumbing for the S3 and in-memory backends.

use crate::traits::{StorageError, StorageResult, StoredObject};
use bytes::Bytes;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};

/// Put `data` under `storage_key` with the content type stored as an object attribute.
pub(crate) async fn put_object<S>(
    store: &S,
    storage_key: &str,
    data: Bytes,
    content_type: &str,
) -> StorageResult<()>
where
    S: ObjectStore,
{
    let location = Path::from(storage_key.to_string());

    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, content_type.to_string().into());
    let options = PutOptions {
        attributes,
        ..Default::default()
    };

    store
        .put_opts(&location, PutPayload::from(data), options)
        .await
        .map(|_| ())
        .map_err(|e| StorageError::UploadFailed(e.to_string()))
}

pub(crate) async fn get_object<S>(store: &S, storage_key: &str) -> StorageResult<StoredObject>
where
    S: ObjectStore,
{
    let location = Path::from(storage_key.to_string());

    let result = store.get(&location).await.map_err(|e| match e {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
        other => StorageError::DownloadFailed(other.to_string()),
    })?;

    let content_type = result
        .attributes
        .get(&Attribute::ContentType)
        .map(|value| AsRef::<str>::as_ref(value).to_string());

    let data = result
        .bytes()
        .await
        .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

    Ok(StoredObject { data, content_type })
}

pub(crate) async fn object_exists<S>(store: &S, storage_key: &str) -> StorageResult<bool>
where
    S: ObjectStore,
{
    let location = Path::from(storage_key.to_string());

    match store.head(&location).await {
        Ok(_) => Ok(true),
        Err(ObjectStoreError::NotFound { .. }) => Ok(false),
        Err(e) => Err(StorageError::BackendError(e.to_string())),
    }
}
