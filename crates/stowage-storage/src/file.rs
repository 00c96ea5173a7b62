//! Stored-file adapter
//!
//! `StoredFile` gives an uploader file-like operations on one object key. The
//! bucket and object handles are resolved from the connection on first use and
//! kept for the lifetime of the value. Every operation is a single call on the
//! connection with options merged from the uploader; errors from the connection
//! are returned unchanged.

use crate::object::{Bucket, ObjectHandle};
use crate::traits::{ObjectAttributes, ObjectStorage, StorageError, StorageResult, UrlOptions};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::fmt;
use std::sync::{Arc, OnceLock};
use stowage_core::options;
use stowage_core::{LocalFile, UploaderOptions};

/// A file stored under `path` in the uploader's bucket.
pub struct StoredFile {
    uploader: Arc<dyn UploaderOptions>,
    connection: Arc<dyn ObjectStorage>,
    path: String,
    content_type: Option<String>,
    bucket: OnceLock<Bucket>,
    file: OnceLock<ObjectHandle>,
}

impl StoredFile {
    /// Fails when `path` is empty or the uploader names no bucket.
    pub fn new(
        uploader: Arc<dyn UploaderOptions>,
        connection: Arc<dyn ObjectStorage>,
        path: impl Into<String>,
    ) -> StorageResult<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(StorageError::InvalidKey("path is empty".to_string()));
        }
        if uploader.aws_bucket().trim().is_empty() {
            return Err(StorageError::ConfigError(
                "uploader has no bucket configured".to_string(),
            ));
        }

        Ok(Self {
            uploader,
            connection,
            path,
            content_type: None,
            bucket: OnceLock::new(),
            file: OnceLock::new(),
        })
    }

    pub fn uploader(&self) -> &Arc<dyn UploaderOptions> {
        &self.uploader
    }

    pub fn connection(&self) -> &Arc<dyn ObjectStorage> {
        &self.connection
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Content type reported by `content_type` instead of the stored metadata.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    fn bucket(&self) -> &Bucket {
        self.bucket.get_or_init(|| {
            Bucket::new(Arc::clone(&self.connection), self.uploader.aws_bucket())
        })
    }

    fn file(&self) -> &ObjectHandle {
        self.file
            .get_or_init(|| self.bucket().object(self.path.clone()))
    }

    /// Full metadata record of the object.
    pub async fn attributes(&self) -> StorageResult<ObjectAttributes> {
        self.file().head().await
    }

    pub async fn content_type(&self) -> StorageResult<Option<String>> {
        match self.content_type {
            Some(ref content_type) => Ok(Some(content_type.clone())),
            None => self.file().content_type().await,
        }
    }

    pub async fn delete(&self) -> StorageResult<()> {
        self.file().delete().await
    }

    /// Text after the last `.` of the path.
    ///
    /// A path without a dot is returned whole (`"a/b/c"` gives `"a/b/c"`), and
    /// trailing dots are ignored (`"a.b."` gives `"b"`).
    pub fn extension(&self) -> Option<&str> {
        self.path.split('.').rev().find(|part| !part.is_empty())
    }

    pub async fn exists(&self) -> StorageResult<bool> {
        self.file().exists().await
    }

    /// Last path segment of the resolved URL, query stripped and
    /// percent-decoded.
    pub async fn filename(&self, options: &UrlOptions) -> StorageResult<Option<String>> {
        let url = self.url(options).await?;
        Ok(filename_from_url(&url))
    }

    /// Object bytes, read with the uploader's read options.
    pub async fn read(&self) -> StorageResult<Bytes> {
        let read_options = options::read_options(self.uploader.as_ref());
        self.file().read(&read_options).await
    }

    pub async fn size(&self) -> StorageResult<u64> {
        self.file().content_length().await
    }

    /// Upload `file` to this object.
    pub async fn store(&self, file: &LocalFile) -> StorageResult<()> {
        let write_options = options::write_options(self.uploader.as_ref(), file.content_type());

        tracing::debug!(
            key = %self.path,
            source = %file.path().display(),
            options = ?write_options.keys().collect::<Vec<_>>(),
            "Storing file"
        );

        self.file().upload_file(file.path(), &write_options).await
    }

    /// The raw object handle, for operations this type does not wrap.
    pub fn to_file(&self) -> &ObjectHandle {
        self.file()
    }

    /// Public URL for `public-read` uploads, an authenticated URL otherwise.
    pub async fn url(&self, options: &UrlOptions) -> StorageResult<String> {
        if self.uploader.aws_acl().is_public_read() {
            Ok(self.public_url())
        } else {
            self.authenticated_url(options).await
        }
    }

    /// Presigned GET URL. `options.expires_in` overrides the uploader's default
    /// expiration.
    pub async fn authenticated_url(&self, options: &UrlOptions) -> StorageResult<String> {
        let expires_in = options
            .expires_in
            .unwrap_or_else(|| self.uploader.aws_authenticated_url_expiration());
        self.file().presigned_url(expires_in, options).await
    }

    /// `{asset_host}/{path}` when an asset host is configured. The path is not
    /// escaped in that case.
    pub fn public_url(&self) -> String {
        match self.uploader.asset_host() {
            Some(asset_host) => format!("{}/{}", asset_host, self.path),
            None => self.file().public_url(),
        }
    }

    /// Server-side copy to `new_path` in the same bucket. Only the ACL and the
    /// storage-related write options are applied to the copy.
    pub async fn copy_to(&self, new_path: impl Into<String>) -> StorageResult<ObjectHandle> {
        let target = self.bucket().object(new_path);
        let copy_options = options::copy_options(self.uploader.as_ref());

        tracing::debug!(
            from_key = %self.path,
            to_key = %target.key(),
            options = ?copy_options.keys().collect::<Vec<_>>(),
            "Copying file"
        );

        target.copy_from(self.file(), &copy_options).await?;
        Ok(target)
    }
}

impl fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredFile")
            .field("bucket", &self.uploader.aws_bucket())
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .finish()
    }
}

fn filename_from_url(url: &str) -> Option<String> {
    let without_query = url.split('?').next().unwrap_or_default();
    if without_query.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(without_query).decode_utf8_lossy();
    let name = match decoded.rfind('/') {
        Some(idx) => &decoded[idx + 1..],
        None => &decoded[..],
    };
    Some(name.to_string())
}
