#[cfg(feature = "storage-memory")]
use crate::InMemoryStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{ObjectStorage, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use stowage_core::Config;

/// Create a storage connection based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn ObjectStorage>> {
    let backend = config.storage_backend();

    let storage: Arc<dyn ObjectStorage> = match backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let region = config.s3_region().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let storage =
                S3Storage::new(region, endpoint, config.s3_max_attempts(), config.s3_timeout())
                    .await?;
            Arc::new(storage)
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => {
            return Err(StorageError::ConfigError(
                "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => Arc::new(InMemoryStorage::new()),

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => {
            return Err(StorageError::ConfigError(
                "Memory storage backend not available (storage-memory feature not enabled)"
                    .to_string(),
            ))
        }
    };

    tracing::info!(backend = %backend, "Storage connection initialized");
    Ok(storage)
}
