//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends must implement.
//! It is deliberately narrow: existence check, read, upload, delete, head, presign,
//! public URL and server-side copy. Signing, retries and transport stay inside the
//! backend's SDK.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime};
use stowage_core::OptionMap;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid request option: {0}")]
    InvalidOption(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object metadata returned by a HEAD request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectAttributes {
    pub content_length: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<SystemTime>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub storage_class: Option<String>,
    pub server_side_encryption: Option<String>,
    pub version_id: Option<String>,
    /// User-defined metadata (x-amz-meta-* headers).
    pub metadata: HashMap<String, String>,
}

/// Per-call options for URL generation.
///
/// Anything left as `None` falls back to the uploader's configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOptions {
    pub expires_in: Option<Duration>,
    /// Content-Type the service should answer the presigned GET with.
    pub response_content_type: Option<String>,
    /// Content-Disposition the service should answer the presigned GET with.
    pub response_content_disposition: Option<String>,
}

impl UrlOptions {
    pub fn expires_in(expires_in: Duration) -> Self {
        Self {
            expires_in: Some(expires_in),
            ..Self::default()
        }
    }
}

/// Storage abstraction trait
///
/// All storage connections (S3, in-memory) implement this trait so the stored-file
/// adapter can run against any of them. Every call addresses an object by
/// `(bucket, key)`; option maps use the SDK's parameter names as keys.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Check if an object exists
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Read an object's bytes. Absent objects yield `StorageError::NotFound`.
    async fn get(&self, bucket: &str, key: &str, options: &OptionMap) -> StorageResult<Bytes>;

    /// Upload the file at `path` to the object.
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        options: &OptionMap,
    ) -> StorageResult<()>;

    /// Delete an object
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Fetch object metadata
    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectAttributes>;

    /// Generate a presigned URL for GET access valid for `expires_in`.
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        options: &UrlOptions,
    ) -> StorageResult<String>;

    /// Unsigned URL of the object as served by the storage service.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Server-side copy of `source_bucket/source_key` onto `bucket/key`.
    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        bucket: &str,
        key: &str,
        options: &OptionMap,
    ) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
