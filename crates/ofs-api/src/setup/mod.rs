//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! so tests can assemble the same router around in-memory backends.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use ofs_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let (primary, archive) = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, primary, archive)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
