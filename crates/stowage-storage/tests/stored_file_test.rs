//! StoredFile against the in-memory connection.
//!
//! Run with `cargo test -p stowage-storage --test stored_file_test`.

use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use stowage_core::{Acl, LocalFile, OptionMap, UploaderConfig};
use stowage_storage::{InMemoryStorage, ObjectStorage, StorageError, StoredFile, UrlOptions};
use tempfile::TempDir;

const BUCKET: &str = "uploads";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn options(value: Value) -> OptionMap {
    match value {
        Value::Object(m) => m.into_iter().collect(),
        _ => panic!("not an object"),
    }
}

/// Temp directory holding one source file; dropped with the test.
struct Fixture {
    _dir: TempDir,
    file: LocalFile,
}

fn local_file(name: &str, contents: &[u8]) -> Fixture {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents).unwrap();
    Fixture {
        _dir: dir,
        file: LocalFile::new(path),
    }
}

fn stored(
    uploader: UploaderConfig,
    storage: &Arc<InMemoryStorage>,
    path: &str,
) -> StoredFile {
    let connection: Arc<dyn ObjectStorage> = storage.clone();
    StoredFile::new(Arc::new(uploader), connection, path).unwrap()
}

#[tokio::test]
async fn test_store_then_read_returns_original_bytes() {
    init_tracing();
    let storage = Arc::new(InMemoryStorage::new());
    let file = stored(UploaderConfig::new(BUCKET), &storage, "docs/report.txt");
    let fixture = local_file("report.txt", b"quarterly numbers");

    file.store(&fixture.file).await.unwrap();

    assert_eq!(&file.read().await.unwrap()[..], b"quarterly numbers");
    assert_eq!(file.size().await.unwrap(), 17);
}

#[tokio::test]
async fn test_exists_follows_store_and_delete() {
    let storage = Arc::new(InMemoryStorage::new());
    let file = stored(UploaderConfig::new(BUCKET), &storage, "a/b.txt");
    let fixture = local_file("b.txt", b"x");

    assert!(!file.exists().await.unwrap());
    file.store(&fixture.file).await.unwrap();
    assert!(file.exists().await.unwrap());

    file.delete().await.unwrap();
    assert!(!file.exists().await.unwrap());

    // deleting again is not an error
    file.delete().await.unwrap();
}

#[tokio::test]
async fn test_read_missing_object_is_not_found() {
    let storage = Arc::new(InMemoryStorage::new());
    let file = stored(UploaderConfig::new(BUCKET), &storage, "missing.txt");

    assert!(matches!(file.read().await, Err(StorageError::NotFound(_))));
    assert!(matches!(file.size().await, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn test_read_applies_uploader_read_options() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.insert(BUCKET, "digits.txt", &b"0123456789"[..]);

    let uploader =
        UploaderConfig::new(BUCKET).with_read_options(options(json!({"range": "bytes=0-3"})));
    let file = stored(uploader, &storage, "digits.txt");

    assert_eq!(&file.read().await.unwrap()[..], b"0123");
}

#[tokio::test]
async fn test_url_is_public_for_public_read() {
    let storage = Arc::new(InMemoryStorage::new());
    let uploader = UploaderConfig::new(BUCKET).with_acl(Acl::PublicRead);
    let file = stored(uploader, &storage, "images/cat.png");

    let url = file.url(&UrlOptions::default()).await.unwrap();
    assert_eq!(url, file.public_url());
    assert!(!url.contains("X-Amz-Expires"));
}

#[tokio::test]
async fn test_url_is_signed_otherwise() {
    let storage = Arc::new(InMemoryStorage::new());
    let uploader = UploaderConfig::new(BUCKET).with_acl(Acl::AuthenticatedRead);
    let file = stored(uploader, &storage, "images/cat.png");

    let url = file.url(&UrlOptions::default()).await.unwrap();
    assert!(url.contains("X-Amz-Expires=600"));
    assert!(url.contains("X-Amz-Signature="));
}

#[tokio::test]
async fn test_authenticated_url_expiration_precedence() {
    let storage = Arc::new(InMemoryStorage::new());
    let uploader = UploaderConfig::new(BUCKET)
        .with_authenticated_url_expiration(Duration::from_secs(120));
    let file = stored(uploader, &storage, "private/key.pem");

    let default = file.authenticated_url(&UrlOptions::default()).await.unwrap();
    assert!(default.contains("X-Amz-Expires=120"));

    let explicit = file
        .authenticated_url(&UrlOptions::expires_in(Duration::from_secs(30)))
        .await
        .unwrap();
    assert!(explicit.contains("X-Amz-Expires=30"));
}

#[tokio::test]
async fn test_public_url_prefers_asset_host() {
    let storage = Arc::new(InMemoryStorage::new());
    let uploader = UploaderConfig::new(BUCKET)
        .with_acl(Acl::PublicRead)
        .with_asset_host("https://cdn.example.com");
    let file = stored(uploader, &storage, "images/cat photo.png");

    assert_eq!(
        file.url(&UrlOptions::default()).await.unwrap(),
        "https://cdn.example.com/images/cat photo.png"
    );
}

#[tokio::test]
async fn test_filename_strips_query_and_decodes() {
    let storage = Arc::new(InMemoryStorage::new());
    let file = stored(UploaderConfig::new(BUCKET), &storage, "docs/annual report.pdf");

    let name = file.filename(&UrlOptions::default()).await.unwrap();
    assert_eq!(name.as_deref(), Some("annual report.pdf"));
}

#[tokio::test]
async fn test_content_type_override_wins() {
    let storage = Arc::new(InMemoryStorage::new());
    let mut file = stored(UploaderConfig::new(BUCKET), &storage, "a/photo.png");
    let fixture = local_file("photo.png", b"\x89PNG");

    file.store(&fixture.file).await.unwrap();
    assert_eq!(file.content_type().await.unwrap().as_deref(), Some("image/png"));

    file.set_content_type("image/webp");
    assert_eq!(file.content_type().await.unwrap().as_deref(), Some("image/webp"));
    // the stored metadata is untouched
    assert_eq!(
        file.attributes().await.unwrap().content_type.as_deref(),
        Some("image/png")
    );
}

#[tokio::test]
async fn test_content_type_override_without_object() {
    let storage = Arc::new(InMemoryStorage::new());
    let mut file = stored(UploaderConfig::new(BUCKET), &storage, "never/stored.bin");
    file.set_content_type("application/octet-stream");

    assert_eq!(
        file.content_type().await.unwrap().as_deref(),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn test_extension_quirk() {
    let storage = Arc::new(InMemoryStorage::new());
    assert_eq!(
        stored(UploaderConfig::new(BUCKET), &storage, "a/b/c.png").extension(),
        Some("png")
    );
    assert_eq!(
        stored(UploaderConfig::new(BUCKET), &storage, "a/b/c").extension(),
        Some("a/b/c")
    );
}

#[tokio::test]
async fn test_store_merges_options_with_precedence() {
    let storage = Arc::new(InMemoryStorage::new());
    let uploader = UploaderConfig::new(BUCKET)
        .with_acl(Acl::PublicRead)
        .with_attributes(options(json!({
            "cache_control": "max-age=60",
            "content_disposition": "inline",
        })))
        .with_write_options(options(json!({
            "cache_control": "max-age=3600",
            "storage_class": "STANDARD_IA",
        })));
    let file = stored(uploader, &storage, "assets/app.css");
    let fixture = local_file("app.css", b"body{margin:0}");

    file.store(&fixture.file).await.unwrap();

    let sent = storage.request_options(BUCKET, "assets/app.css").unwrap();
    assert_eq!(sent["acl"], json!("public-read"));
    assert_eq!(sent["cache_control"], json!("max-age=3600"));
    assert_eq!(sent["content_disposition"], json!("inline"));
    assert_eq!(sent["storage_class"], json!("STANDARD_IA"));
    assert_eq!(sent["content_type"], json!("text/css"));

    let attributes = file.attributes().await.unwrap();
    assert_eq!(attributes.cache_control.as_deref(), Some("max-age=3600"));
    assert_eq!(attributes.storage_class.as_deref(), Some("STANDARD_IA"));
    assert_eq!(attributes.content_length, 14);
}

#[tokio::test]
async fn test_store_rejects_unknown_option() {
    let storage = Arc::new(InMemoryStorage::new());
    let uploader =
        UploaderConfig::new(BUCKET).with_write_options(options(json!({"unrelated_key": "Y"})));
    let file = stored(uploader, &storage, "k.txt");
    let fixture = local_file("k.txt", b"x");

    let result = file.store(&fixture.file).await;
    assert!(matches!(result, Err(StorageError::InvalidOption(_))));
    assert!(!file.exists().await.unwrap());
}

#[tokio::test]
async fn test_copy_to_propagates_only_storage_options() {
    init_tracing();
    let storage = Arc::new(InMemoryStorage::new());
    storage.insert(BUCKET, "original.txt", &b"payload"[..]);

    // unrelated_key would be rejected by an upload, but the copy never sees it
    let uploader = UploaderConfig::new(BUCKET).with_write_options(options(json!({
        "storage_class": "X",
        "unrelated_key": "Y",
    })));
    let file = stored(uploader, &storage, "original.txt");

    let copy = file.copy_to("copies/original.txt").await.unwrap();
    assert_eq!(copy.bucket(), BUCKET);
    assert_eq!(copy.key(), "copies/original.txt");

    let sent = storage.request_options(BUCKET, "copies/original.txt").unwrap();
    assert_eq!(sent, options(json!({"acl": "private", "storage_class": "X"})));

    assert_eq!(&copy.read(&OptionMap::new()).await.unwrap()[..], b"payload");
    assert!(file.exists().await.unwrap());
}

#[tokio::test]
async fn test_to_file_exposes_object_handle() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.insert(BUCKET, "raw.bin", &b"abc"[..]);
    let file = stored(UploaderConfig::new(BUCKET), &storage, "raw.bin");

    let handle = file.to_file();
    assert_eq!(handle.key(), "raw.bin");
    assert_eq!(handle.content_length().await.unwrap(), 3);
}
