pub mod asset;
pub mod media;

pub use asset::{ArchiveStatus, DecodedAsset, PersistedAsset, RawInput};
pub use media::{MediaType, UnsupportedMediaType};
