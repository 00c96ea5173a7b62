//! Stowage Core Library
//!
//! Configuration and option handling shared by the storage crate: uploader
//! settings, canned ACLs, request option maps and their merge rules, and the
//! local file type handed to uploads.

pub mod acl;
pub mod config;
pub mod local_file;
pub mod options;
pub mod storage_types;
pub mod uploader;

// Re-export commonly used types
pub use acl::Acl;
pub use config::{Config, StorageConfig};
pub use local_file::LocalFile;
pub use options::OptionMap;
pub use storage_types::StorageBackend;
pub use uploader::{UploaderConfig, UploaderOptions};
