//! Application state shared by all handlers.

use ofs_core::Config;
use ofs_services::{ArchiveQueue, Storage, UploadService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub uploads: UploadService,
    /// Primary backend, also probed by the readiness check.
    pub primary: Arc<dyn Storage>,
    pub archive: Option<ArchiveQueue>,
}
