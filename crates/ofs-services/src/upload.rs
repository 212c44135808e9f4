use ofs_core::{AppError, PersistedAsset, RawInput};

use crate::coordinator::PersistenceCoordinator;
use crate::decoder::PayloadDecoder;

/// The `save` operation: classify, decode, persist.
#[derive(Clone)]
pub struct UploadService {
    decoder: PayloadDecoder,
    coordinator: PersistenceCoordinator,
}

impl UploadService {
    pub fn new(decoder: PayloadDecoder, coordinator: PersistenceCoordinator) -> Self {
        Self {
            decoder,
            coordinator,
        }
    }

    #[tracing::instrument(skip(self, data), fields(input.kind = tracing::field::Empty, input.len = data.len()))]
    pub async fn save(&self, data: &str) -> Result<PersistedAsset, AppError> {
        let input = RawInput::classify(data)?;
        tracing::Span::current().record("input.kind", input.kind());

        let asset = self.decoder.decode(input).await?;
        self.coordinator.persist(asset).await
    }
}
