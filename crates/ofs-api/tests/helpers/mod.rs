//! Test helpers: build AppState and router for integration tests around in-memory
//! backends.
//!
//! Run from workspace root: `cargo test -p ofs-api`.

#![allow(dead_code)]

use axum_test::TestServer;
use ofs_api::setup::{routes, services};
use ofs_api::AppState;
use ofs_core::Config;
use ofs_storage::{MemoryStorage, Storage};
use std::collections::HashMap;
use std::sync::Arc;

pub const PRIMARY_BASE_URL: &str = "https://files.example.com";

/// 1x1 transparent PNG.
pub const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

pub fn png_data_uri() -> String {
    format!("data:image/png;base64,{}", PNG_BASE64)
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub primary: MemoryStorage,
    pub archive: Option<MemoryStorage>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn config_from(pairs: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

fn app_with(config: Config, primary: MemoryStorage, archive: Option<MemoryStorage>) -> TestApp {
    let archive_storage = archive
        .clone()
        .map(|storage| Arc::new(storage) as Arc<dyn Storage>);
    let state = services::initialize_services(&config, Arc::new(primary.clone()), archive_storage)
        .expect("services");
    let router = routes::setup_routes(&config, state.clone()).expect("routes");

    TestApp {
        server: TestServer::new(router).expect("test server"),
        state,
        primary,
        archive,
    }
}

/// Memory primary plus memory archive under the default `ofs` folder.
pub fn setup_test_app() -> TestApp {
    let config = config_from(&[
        ("PRIMARY_STORAGE_BACKEND", "memory"),
        ("PRIMARY_MEMORY_BASE_URL", PRIMARY_BASE_URL),
        ("ARCHIVE_STORAGE_BACKEND", "memory"),
        ("ARCHIVE_MAX_RETRIES", "0"),
    ]);
    app_with(
        config,
        MemoryStorage::new(PRIMARY_BASE_URL),
        Some(MemoryStorage::new("memory://archive")),
    )
}

/// Memory primary only, configured as a production deployment.
pub fn setup_production_test_app() -> TestApp {
    let config = config_from(&[
        ("ENVIRONMENT", "production"),
        ("CORS_ORIGINS", "https://app.example.com"),
        ("PRIMARY_STORAGE_BACKEND", "memory"),
        ("PRIMARY_MEMORY_BASE_URL", PRIMARY_BASE_URL),
    ]);
    config.validate().expect("production config");
    app_with(config, MemoryStorage::new(PRIMARY_BASE_URL), None)
}

/// Memory primary only; archive copies disabled.
pub fn setup_test_app_without_archive() -> TestApp {
    let config = config_from(&[
        ("PRIMARY_STORAGE_BACKEND", "memory"),
        ("PRIMARY_MEMORY_BASE_URL", PRIMARY_BASE_URL),
    ]);
    app_with(config, MemoryStorage::new(PRIMARY_BASE_URL), None)
}
