pub mod archive_stats;
pub mod save;
