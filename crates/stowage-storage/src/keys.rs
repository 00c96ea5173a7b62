//! Shared key handling for storage backends.
//!
//! Keys are used verbatim as object names. In URLs each `/`-separated segment is
//! percent-encoded on its own so the separators survive.

use crate::{StorageError, StorageResult};

/// Reject keys no backend can address.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("object key is empty".to_string()));
    }
    Ok(())
}

/// Percent-encode a key for use as a URL path, keeping `/` separators.
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
