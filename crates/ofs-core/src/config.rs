//! Configuration module
//!
//! Configuration is read from environment variables (a `.env` file is honoured) once at
//! process start and passed down explicitly. The primary and archive backends share one
//! set of keys, distinguished by a `PRIMARY_` or `ARCHIVE_` prefix.

use std::env;

use crate::keygen::DEFAULT_KEY_LENGTH;
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const REMOTE_FETCH_TIMEOUT_SECS: u64 = 30;
const PRIMARY_MAX_RETRIES: u32 = 3;
const ARCHIVE_FOLDER: &str = "ofs";
const ARCHIVE_QUEUE_SIZE: usize = 1000;
const ARCHIVE_MAX_CONCURRENT: usize = 4;
const ARCHIVE_MAX_RETRIES: u32 = 3;

/// Settings for one storage backend (primary or archive).
#[derive(Clone, Debug, PartialEq)]
pub struct BackendConfig {
    /// `PRIMARY` or `ARCHIVE`; used in error messages and logs.
    pub role: &'static str,
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    // Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub memory_base_url: String,
    pub dropbox_access_token: Option<String>,
}

impl BackendConfig {
    /// In-memory backend, used by tests and local development.
    pub fn memory(role: &'static str) -> Self {
        Self {
            role,
            backend: StorageBackend::Memory,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            memory_base_url: format!("memory://{}", role.to_lowercase()),
            dropbox_access_token: None,
        }
    }

    fn from_lookup<F>(role: &'static str, backend: StorageBackend, get: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |name: &str| get(&format!("{}_{}", role, name));

        Self {
            role,
            backend,
            s3_bucket: key("S3_BUCKET"),
            s3_region: key("S3_REGION").or_else(|| get("AWS_REGION")),
            s3_endpoint: key("S3_ENDPOINT"),
            local_storage_path: key("LOCAL_STORAGE_PATH"),
            local_storage_base_url: key("LOCAL_STORAGE_BASE_URL"),
            memory_base_url: key("MEMORY_BASE_URL")
                .unwrap_or_else(|| format!("memory://{}", role.to_lowercase())),
            dropbox_access_token: key("DROPBOX_ACCESS_TOKEN")
                .or_else(|| get("DROPBOX_ACCESS_TOKEN")),
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "{}_S3_BUCKET must be set when using S3 storage backend",
                        self.role
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "{}_S3_REGION or AWS_REGION must be set when using S3 storage backend",
                        self.role
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "{}_LOCAL_STORAGE_PATH must be set when using local storage backend",
                        self.role
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "{}_LOCAL_STORAGE_BASE_URL must be set when using local storage backend",
                        self.role
                    ));
                }
            }
            StorageBackend::Dropbox => {
                if self.dropbox_access_token.is_none() {
                    return Err(anyhow::anyhow!(
                        "DROPBOX_ACCESS_TOKEN must be set when using Dropbox storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }
}

/// Archive copy settings. Absent when `ARCHIVE_STORAGE_BACKEND` is not set.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveConfig {
    pub storage: BackendConfig,
    /// Logical folder the dated copies are written under.
    pub folder: String,
    pub queue_size: usize,
    pub max_concurrent: usize,
    pub max_retries: u32,
}

impl ArchiveConfig {
    pub fn new(storage: BackendConfig) -> Self {
        Self {
            storage,
            folder: ARCHIVE_FOLDER.to_string(),
            queue_size: ARCHIVE_QUEUE_SIZE,
            max_concurrent: ARCHIVE_MAX_CONCURRENT,
            max_retries: ARCHIVE_MAX_RETRIES,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub primary: BackendConfig,
    pub archive: Option<ArchiveConfig>,
    pub key_length: i32,
    pub remote_fetch_timeout_secs: u64,
    pub primary_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(get: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = get("ENVIRONMENT")
            .or_else(|| get("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins: Vec<String> = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let primary_backend = match get("PRIMARY_STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };
        let primary = BackendConfig::from_lookup("PRIMARY", primary_backend, &get);

        let archive = match get("ARCHIVE_STORAGE_BACKEND").filter(|s| !s.trim().is_empty()) {
            Some(value) => {
                let backend = value.parse::<StorageBackend>()?;
                Some(ArchiveConfig {
                    storage: BackendConfig::from_lookup("ARCHIVE", backend, &get),
                    folder: get("ARCHIVE_FOLDER")
                        .map(|s| s.trim_matches('/').to_string())
                        .unwrap_or_else(|| ARCHIVE_FOLDER.to_string()),
                    queue_size: parse_or(&get, "ARCHIVE_QUEUE_SIZE", ARCHIVE_QUEUE_SIZE)?.max(1),
                    max_concurrent: parse_or(&get, "ARCHIVE_MAX_CONCURRENT", ARCHIVE_MAX_CONCURRENT)?
                        .max(1),
                    max_retries: parse_or(&get, "ARCHIVE_MAX_RETRIES", ARCHIVE_MAX_RETRIES)?,
                })
            }
            None => None,
        };

        Ok(Config {
            server_port: get("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            primary,
            archive,
            key_length: get("KEY_LENGTH")
                .unwrap_or_else(|| DEFAULT_KEY_LENGTH.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("KEY_LENGTH must be a valid number"))?,
            remote_fetch_timeout_secs: parse_or(
                &get,
                "REMOTE_FETCH_TIMEOUT_SECS",
                REMOTE_FETCH_TIMEOUT_SECS,
            )?,
            primary_max_retries: parse_or(&get, "PRIMARY_MAX_RETRIES", PRIMARY_MAX_RETRIES)?,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.key_length <= 0 {
            return Err(anyhow::anyhow!("KEY_LENGTH must be greater than zero"));
        }

        if self.remote_fetch_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "REMOTE_FETCH_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        self.primary.validate()?;
        if let Some(archive) = &self.archive {
            archive.storage.validate()?;
            if archive.folder.is_empty() {
                return Err(anyhow::anyhow!("ARCHIVE_FOLDER cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Unset keys fall back to `default`; a set but unparsable value is an error.
fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[
            ("PRIMARY_S3_BUCKET", "ofs"),
            ("AWS_REGION", "eu-west-1"),
        ])
        .unwrap();

        assert_eq!(config.server_port, 4000);
        assert_eq!(config.primary.backend, StorageBackend::S3);
        assert_eq!(config.primary.s3_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.key_length, 8);
        assert_eq!(config.remote_fetch_timeout_secs, 30);
        assert_eq!(config.primary_max_retries, 3);
        assert!(config.archive.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn archive_section_uses_its_own_prefix() {
        let config = config_from(&[
            ("PRIMARY_STORAGE_BACKEND", "memory"),
            ("ARCHIVE_STORAGE_BACKEND", "local"),
            ("ARCHIVE_LOCAL_STORAGE_PATH", "/var/lib/ofs/archive"),
            ("ARCHIVE_LOCAL_STORAGE_BASE_URL", "http://localhost:4000/archive"),
            ("ARCHIVE_FOLDER", "/backups/"),
            ("ARCHIVE_MAX_CONCURRENT", "0"),
        ])
        .unwrap();

        let archive = config.archive.as_ref().unwrap();
        assert_eq!(archive.storage.role, "ARCHIVE");
        assert_eq!(archive.storage.backend, StorageBackend::Local);
        assert_eq!(archive.folder, "backups");
        assert_eq!(archive.max_concurrent, 1);
        assert_eq!(archive.queue_size, 1000);
        config.validate().unwrap();
    }

    #[test]
    fn dropbox_token_is_shared_between_roles() {
        let config = config_from(&[
            ("PRIMARY_STORAGE_BACKEND", "memory"),
            ("ARCHIVE_STORAGE_BACKEND", "dropbox"),
            ("DROPBOX_ACCESS_TOKEN", "sl.token"),
        ])
        .unwrap();

        let archive = config.archive.unwrap();
        assert_eq!(archive.storage.dropbox_access_token.as_deref(), Some("sl.token"));
        archive.storage.validate().unwrap();
    }

    #[test]
    fn validate_rejects_incomplete_backends() {
        let config = config_from(&[("PRIMARY_STORAGE_BACKEND", "s3")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PRIMARY_S3_BUCKET"));

        let config = config_from(&[
            ("PRIMARY_STORAGE_BACKEND", "memory"),
            ("ARCHIVE_STORAGE_BACKEND", "dropbox"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_key_length() {
        let config = config_from(&[("PRIMARY_STORAGE_BACKEND", "memory"), ("KEY_LENGTH", "0")])
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_numbers_are_errors() {
        for (key, value) in [
            ("ARCHIVE_QUEUE_SIZE", "abc"),
            ("ARCHIVE_MAX_CONCURRENT", "-1"),
            ("PRIMARY_MAX_RETRIES", "x"),
            ("REMOTE_FETCH_TIMEOUT_SECS", "30s"),
        ] {
            let err = config_from(&[
                ("PRIMARY_STORAGE_BACKEND", "memory"),
                ("ARCHIVE_STORAGE_BACKEND", "memory"),
                (key, value),
            ])
            .unwrap_err();
            assert_eq!(err.to_string(), format!("{} must be a valid number", key));
        }
    }

    #[test]
    fn unknown_backend_is_an_error() {
        assert!(config_from(&[("PRIMARY_STORAGE_BACKEND", "nfs")]).is_err());
    }

    #[test]
    fn wildcard_cors_rejected_in_production() {
        let config = config_from(&[
            ("PRIMARY_STORAGE_BACKEND", "memory"),
            ("ENVIRONMENT", "production"),
        ])
        .unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }
}
