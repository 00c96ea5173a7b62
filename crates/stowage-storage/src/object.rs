//! Bucket and object handles over a storage connection.
//!
//! A handle is only an address plus the connection; creating one performs no
//! request. Each method maps to exactly one backend call.

use crate::traits::{ObjectAttributes, ObjectStorage, StorageResult, UrlOptions};
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stowage_core::OptionMap;

/// A named bucket on a storage connection.
#[derive(Clone)]
pub struct Bucket {
    storage: Arc<dyn ObjectStorage>,
    name: String,
}

impl Bucket {
    pub fn new(storage: Arc<dyn ObjectStorage>, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for `key` inside this bucket.
    pub fn object(&self, key: impl Into<String>) -> ObjectHandle {
        ObjectHandle {
            storage: Arc::clone(&self.storage),
            bucket: self.name.clone(),
            key: key.into(),
        }
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("backend", &self.storage.backend_type())
            .finish()
    }
}

/// A single object address on a storage connection.
#[derive(Clone)]
pub struct ObjectHandle {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    key: String,
}

impl ObjectHandle {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub async fn exists(&self) -> StorageResult<bool> {
        self.storage.exists(&self.bucket, &self.key).await
    }

    pub async fn read(&self, options: &OptionMap) -> StorageResult<Bytes> {
        self.storage.get(&self.bucket, &self.key, options).await
    }

    pub async fn upload_file(&self, path: &Path, options: &OptionMap) -> StorageResult<()> {
        self.storage
            .put_file(&self.bucket, &self.key, path, options)
            .await
    }

    pub async fn delete(&self) -> StorageResult<()> {
        self.storage.delete(&self.bucket, &self.key).await
    }

    pub async fn head(&self) -> StorageResult<ObjectAttributes> {
        self.storage.head(&self.bucket, &self.key).await
    }

    pub async fn content_length(&self) -> StorageResult<u64> {
        Ok(self.head().await?.content_length)
    }

    pub async fn content_type(&self) -> StorageResult<Option<String>> {
        Ok(self.head().await?.content_type)
    }

    pub async fn presigned_url(
        &self,
        expires_in: Duration,
        options: &UrlOptions,
    ) -> StorageResult<String> {
        self.storage
            .presigned_get_url(&self.bucket, &self.key, expires_in, options)
            .await
    }

    pub fn public_url(&self) -> String {
        self.storage.public_url(&self.bucket, &self.key)
    }

    /// Server-side copy of `source` onto this object.
    pub async fn copy_from(&self, source: &ObjectHandle, options: &OptionMap) -> StorageResult<()> {
        self.storage
            .copy(&source.bucket, &source.key, &self.bucket, &self.key, options)
            .await
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .finish()
    }
}
