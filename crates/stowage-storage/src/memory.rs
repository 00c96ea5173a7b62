//! In-memory storage connection.
//!
//! Objects live in a process-local map. The backend accepts and validates the same
//! request options as the S3 backend and records the options of the request that
//! last wrote each object, which makes it the fake connection for tests.

use crate::keys::{encode_key_path, validate_key};
use crate::params::{self, COPY_PARAMS, READ_PARAMS, WRITE_PARAMS};
use crate::traits::{ObjectAttributes, ObjectStorage, StorageError, StorageResult, UrlOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use stowage_core::OptionMap;

const DEFAULT_BASE_URL: &str = "https://memory.invalid";

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    attributes: ObjectAttributes,
    request_options: OptionMap,
}

/// Storage connection that keeps objects in memory
#[derive(Clone)]
pub struct InMemoryStorage {
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
    base_url: String,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Public URLs are generated as `{base_url}/{bucket}/{key}`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<(String, String), StoredObject>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert an object directly, bypassing request options.
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let attributes = ObjectAttributes {
            content_length: data.len() as u64,
            etag: Some(etag_for(&data)),
            last_modified: Some(SystemTime::now()),
            ..ObjectAttributes::default()
        };
        self.objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                attributes,
                request_options: OptionMap::new(),
            },
        );
    }

    /// Options of the request that last wrote the object.
    pub fn request_options(&self, bucket: &str, key: &str) -> Option<OptionMap> {
        self.objects()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.request_options.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects().len()
    }

    fn not_found(bucket: &str, key: &str) -> StorageError {
        StorageError::NotFound(format!("{}/{}", bucket, key))
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn etag_for(data: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

/// Resolve an HTTP `Range: bytes=...` header against an object of `len` bytes.
fn resolve_range(range: &str, len: usize) -> StorageResult<std::ops::Range<usize>> {
    let invalid = || StorageError::InvalidOption(format!("unsatisfiable range `{}`", range));

    let bounds = range.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
    let (start, end) = bounds.split_once('-').ok_or_else(invalid)?;

    let (start, end) = match (start.trim(), end.trim()) {
        ("", suffix) => {
            let suffix: usize = suffix.parse().map_err(|_| invalid())?;
            (len.saturating_sub(suffix), len)
        }
        (start, "") => (start.parse::<usize>().map_err(|_| invalid())?, len),
        (start, end) => {
            let start: usize = start.parse().map_err(|_| invalid())?;
            let end: usize = end.parse().map_err(|_| invalid())?;
            (start, end.saturating_add(1).min(len))
        }
    };

    if start >= len || start >= end {
        return Err(invalid());
    }
    Ok(start..end)
}

fn attributes_from_options(data: &Bytes, options: &OptionMap) -> StorageResult<ObjectAttributes> {
    Ok(ObjectAttributes {
        content_length: data.len() as u64,
        content_type: params::string_param(options, "content_type")?,
        etag: Some(etag_for(data)),
        last_modified: Some(SystemTime::now()),
        cache_control: params::string_param(options, "cache_control")?,
        content_disposition: params::string_param(options, "content_disposition")?,
        content_encoding: params::string_param(options, "content_encoding")?,
        storage_class: params::storage_class_param(options)?,
        server_side_encryption: params::string_param(options, "server_side_encryption")?,
        version_id: None,
        metadata: params::metadata_param(options)?.unwrap_or_default(),
    })
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self
            .objects()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn get(&self, bucket: &str, key: &str, options: &OptionMap) -> StorageResult<Bytes> {
        validate_key(key)?;
        params::ensure_known(options, READ_PARAMS, "read")?;

        let data = self
            .objects()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.data.clone())
            .ok_or_else(|| Self::not_found(bucket, key))?;

        match params::string_param(options, "range")? {
            Some(range) => Ok(data.slice(resolve_range(&range, data.len())?)),
            None => Ok(data),
        }
    }

    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        options: &OptionMap,
    ) -> StorageResult<()> {
        validate_key(key)?;
        params::ensure_known(options, WRITE_PARAMS, "write")?;

        let data = Bytes::from(tokio::fs::read(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?);
        let attributes = attributes_from_options(&data, options)?;
        let size = data.len();

        self.objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                attributes,
                request_options: options.clone(),
            },
        );

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            "In-memory upload successful"
        );

        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.objects()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectAttributes> {
        validate_key(key)?;
        self.objects()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.attributes.clone())
            .ok_or_else(|| Self::not_found(bucket, key))
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        options: &UrlOptions,
    ) -> StorageResult<String> {
        validate_key(key)?;

        let mut hasher = DefaultHasher::new();
        (bucket, key, expires_in.as_secs()).hash(&mut hasher);

        let mut url = format!(
            "{}?X-Amz-Expires={}&X-Amz-Signature={:016x}",
            self.public_url(bucket, key),
            expires_in.as_secs(),
            hasher.finish()
        );
        if let Some(ref content_type) = options.response_content_type {
            url.push_str("&response-content-type=");
            url.push_str(&urlencoding::encode(content_type));
        }
        if let Some(ref disposition) = options.response_content_disposition {
            url.push_str("&response-content-disposition=");
            url.push_str(&urlencoding::encode(disposition));
        }
        Ok(url)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, encode_key_path(key))
    }

    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        bucket: &str,
        key: &str,
        options: &OptionMap,
    ) -> StorageResult<()> {
        validate_key(source_key)?;
        validate_key(key)?;
        params::ensure_known(options, COPY_PARAMS, "copy")?;

        let mut objects = self.objects();
        let source = objects
            .get(&(source_bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| Self::not_found(source_bucket, source_key))?;

        // Content headers and metadata travel with the object; storage settings
        // come from the copy request.
        let mut attributes = source.attributes;
        attributes.storage_class = params::storage_class_param(options)?;
        attributes.server_side_encryption = params::string_param(options, "server_side_encryption")?;
        attributes.last_modified = Some(SystemTime::now());

        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: source.data,
                attributes,
                request_options: options.clone(),
            },
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn map(value: serde_json::Value) -> OptionMap {
        match value {
            serde_json::Value::Object(m) => m.into_iter().collect(),
            _ => panic!("not an object"),
        }
    }

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range("bytes=0-3", 10).unwrap(), 0..4);
        assert_eq!(resolve_range("bytes=6-", 10).unwrap(), 6..10);
        assert_eq!(resolve_range("bytes=-3", 10).unwrap(), 7..10);
        assert_eq!(resolve_range("bytes=8-100", 10).unwrap(), 8..10);
        assert!(resolve_range("bytes=10-", 10).is_err());
        assert!(resolve_range("items=0-1", 10).is_err());
        assert!(resolve_range("bytes=a-b", 10).is_err());
    }

    #[tokio::test]
    async fn test_put_get_head() {
        let storage = InMemoryStorage::new();
        let file = temp_file(b"hello memory");
        let opts = map(json!({
            "acl": "private",
            "content_type": "text/plain",
            "metadata": {"owner": "tests"},
        }));

        storage
            .put_file("bucket", "docs/hello.txt", file.path(), &opts)
            .await
            .unwrap();

        let data = storage
            .get("bucket", "docs/hello.txt", &OptionMap::new())
            .await
            .unwrap();
        assert_eq!(&data[..], b"hello memory");

        let head = storage.head("bucket", "docs/hello.txt").await.unwrap();
        assert_eq!(head.content_length, 12);
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
        assert_eq!(head.metadata["owner"], "tests");
        assert_eq!(storage.request_options("bucket", "docs/hello.txt"), Some(opts));
    }

    #[tokio::test]
    async fn test_ranged_read() {
        let storage = InMemoryStorage::new();
        storage.insert("bucket", "k", &b"0123456789"[..]);

        let opts = map(json!({"range": "bytes=2-4"}));
        let data = storage.get("bucket", "k", &opts).await.unwrap();
        assert_eq!(&data[..], b"234");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let storage = InMemoryStorage::new();
        let result = storage.get("bucket", "nope", &OptionMap::new()).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        let result = storage.head("bucket", "nope").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = InMemoryStorage::new();
        storage.insert("bucket", "k", &b"x"[..]);

        storage.delete("bucket", "k").await.unwrap();
        storage.delete("bucket", "k").await.unwrap();
        assert!(!storage.exists("bucket", "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_write_option_rejected() {
        let storage = InMemoryStorage::new();
        let file = temp_file(b"x");
        let opts = map(json!({"acl": "private", "colour": "blue"}));

        let result = storage.put_file("bucket", "k", file.path(), &opts).await;
        assert!(matches!(result, Err(StorageError::InvalidOption(_))));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_copy_keeps_content_headers() {
        let storage = InMemoryStorage::new();
        let file = temp_file(b"copy me");
        let opts = map(json!({"content_type": "text/plain", "storage_class": "STANDARD_IA"}));
        storage
            .put_file("bucket", "src", file.path(), &opts)
            .await
            .unwrap();

        let copy_opts = map(json!({"acl": "private"}));
        storage
            .copy("bucket", "src", "other", "dst", &copy_opts)
            .await
            .unwrap();

        let head = storage.head("other", "dst").await.unwrap();
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
        assert_eq!(head.storage_class, None);
        assert_eq!(storage.request_options("other", "dst"), Some(copy_opts));

        let result = storage
            .copy("bucket", "missing", "bucket", "dst2", &OptionMap::new())
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_urls() {
        let storage = InMemoryStorage::with_base_url("https://objects.test/");
        assert_eq!(
            storage.public_url("bucket", "a b/c.png"),
            "https://objects.test/bucket/a%20b/c.png"
        );

        let options = UrlOptions {
            response_content_type: Some("image/png".to_string()),
            ..UrlOptions::default()
        };
        let url = storage
            .presigned_get_url("bucket", "c.png", Duration::from_secs(90), &options)
            .await
            .unwrap();
        assert!(url.starts_with("https://objects.test/bucket/c.png?"));
        assert!(url.contains("X-Amz-Expires=90"));
        assert!(url.contains("response-content-type=image%2Fpng"));
    }
}
