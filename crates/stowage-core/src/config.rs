//! Configuration module
//!
//! Storage connection settings and uploader settings, loaded from the
//! environment (and a `.env` file when present).

use std::env;
use std::time::Duration;

use crate::acl::Acl;
use crate::options::{parse_option_map, OptionMap};
use crate::storage_types::StorageBackend;
use crate::uploader::{UploaderConfig, DEFAULT_AUTHENTICATED_URL_EXPIRATION};

const S3_MAX_ATTEMPTS: u32 = 3;
const S3_TIMEOUT_SECS: u64 = 30;
/// Presigned URLs cannot outlive one week.
const MAX_AUTHENTICATED_URL_EXPIRATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Connection settings for the storage service.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageConfig {
    pub storage_backend: Option<StorageBackend>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub aws_region: Option<String>,
    pub s3_max_attempts: u32,
    pub s3_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_backend: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            s3_max_attempts: S3_MAX_ATTEMPTS,
            s3_timeout_seconds: S3_TIMEOUT_SECS,
        }
    }
}

/// Application configuration: one storage connection and the uploader using it.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub storage: StorageConfig,
    pub uploader: UploaderConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let storage_backend = var("STORAGE_BACKEND")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?;

        let storage = StorageConfig {
            storage_backend,
            s3_region: var("S3_REGION"),
            s3_endpoint: var("S3_ENDPOINT"),
            aws_region: var("AWS_REGION"),
            s3_max_attempts: var("S3_MAX_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(S3_MAX_ATTEMPTS),
            s3_timeout_seconds: var("S3_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(S3_TIMEOUT_SECS),
        };

        let acl = var("AWS_ACL")
            .map(|s| s.parse::<Acl>())
            .transpose()?
            .unwrap_or_default();

        let option_map = |key: &str| -> Result<Option<OptionMap>, anyhow::Error> {
            var(key)
                .map(|raw| {
                    parse_option_map(&raw).map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e))
                })
                .transpose()
        };

        let authenticated_url_expiration = match var("AWS_AUTHENTICATED_URL_EXPIRATION") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("AWS_AUTHENTICATED_URL_EXPIRATION must be a number of seconds")
            })?),
            None => DEFAULT_AUTHENTICATED_URL_EXPIRATION,
        };

        let uploader = UploaderConfig {
            acl,
            bucket: var("S3_BUCKET").unwrap_or_default(),
            asset_host: var("ASSET_HOST"),
            read_options: option_map("AWS_READ_OPTIONS")?,
            write_options: option_map("AWS_WRITE_OPTIONS")?,
            attributes: option_map("AWS_ATTRIBUTES")?,
            authenticated_url_expiration,
        };

        let config = Config { storage, uploader };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.uploader.bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("S3_BUCKET must be set"));
        }

        let expiration = self.uploader.authenticated_url_expiration.as_secs();
        if expiration == 0 || expiration > MAX_AUTHENTICATED_URL_EXPIRATION_SECS {
            return Err(anyhow::anyhow!(
                "AWS_AUTHENTICATED_URL_EXPIRATION must be between 1 and {} seconds",
                MAX_AUTHENTICATED_URL_EXPIRATION_SECS
            ));
        }

        if self.storage_backend() == StorageBackend::S3 && self.s3_region().is_none() {
            return Err(anyhow::anyhow!(
                "S3_REGION or AWS_REGION must be set when using S3 storage backend"
            ));
        }

        Ok(())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage.storage_backend.unwrap_or(StorageBackend::S3)
    }

    pub fn s3_bucket(&self) -> &str {
        &self.uploader.bucket
    }

    /// `S3_REGION`, falling back to `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.storage
            .s3_region
            .as_deref()
            .or(self.storage.aws_region.as_deref())
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.storage.s3_endpoint.as_deref()
    }

    pub fn s3_max_attempts(&self) -> u32 {
        self.storage.s3_max_attempts
    }

    pub fn s3_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.s3_timeout_seconds)
    }

    pub fn uploader(&self) -> &UploaderConfig {
        &self.uploader
    }
}
