//! Stowage Storage Library
//!
//! This crate maps uploader-facing file operations onto an object storage service.
//! It includes the ObjectStorage trait, bucket/object handles, the `StoredFile`
//! adapter, and connections for S3 and for an in-memory store.
//!
//! # Options
//!
//! Requests carry option maps whose keys are the SDK's parameter names
//! (`acl`, `content_type`, `storage_class`, `range`, ...). Merging them from the
//! uploader configuration happens in `stowage_core::options`; each connection
//! rejects keys the request does not accept.

pub mod factory;
pub mod file;
pub(crate) mod keys;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod object;
pub(crate) mod params;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use file::StoredFile;
#[cfg(feature = "storage-memory")]
pub use memory::InMemoryStorage;
pub use object::{Bucket, ObjectHandle};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use stowage_core::StorageBackend;
pub use traits::{ObjectAttributes, ObjectStorage, StorageError, StorageResult, UrlOptions};
