//! Request parameter lookup shared by the backends.
//!
//! Option maps are untyped; these helpers pull typed values out of them and
//! reject keys a request does not accept, the way the SDK rejects unknown
//! parameters.

use crate::{StorageError, StorageResult};
use serde_json::Value;
use std::collections::HashMap;
use stowage_core::OptionMap;

pub const WRITE_PARAMS: &[&str] = &[
    "acl",
    "cache_control",
    "content_disposition",
    "content_encoding",
    "content_language",
    "content_type",
    "metadata",
    "reduced_redundancy",
    "server_side_encryption",
    "ssekms_key_id",
    "storage_class",
    "tagging",
    "website_redirect_location",
];

pub const READ_PARAMS: &[&str] = &[
    "if_match",
    "if_none_match",
    "part_number",
    "range",
    "response_cache_control",
    "response_content_disposition",
    "response_content_encoding",
    "response_content_language",
    "response_content_type",
    "version_id",
];

pub const COPY_PARAMS: &[&str] = &[
    "acl",
    "metadata_directive",
    "reduced_redundancy",
    "server_side_encryption",
    "ssekms_key_id",
    "storage_class",
];

/// Fail on the first key of `options` that `operation` does not accept.
pub fn ensure_known(options: &OptionMap, accepted: &[&str], operation: &str) -> StorageResult<()> {
    match options.keys().find(|key| !accepted.contains(&key.as_str())) {
        Some(key) => Err(StorageError::InvalidOption(format!(
            "unknown {} option `{}`",
            operation, key
        ))),
        None => Ok(()),
    }
}

/// Scalar option as a string. `null` counts as absent.
pub fn string_param(options: &OptionMap, key: &str) -> StorageResult<Option<String>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(StorageError::InvalidOption(format!(
            "`{}` must be a scalar, got {}",
            key, other
        ))),
    }
}

pub fn bool_param(options: &OptionMap, key: &str) -> StorageResult<Option<bool>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => s.parse().map(Some).map_err(|_| {
            StorageError::InvalidOption(format!("`{}` must be a boolean, got {:?}", key, s))
        }),
        Some(other) => Err(StorageError::InvalidOption(format!(
            "`{}` must be a boolean, got {}",
            key, other
        ))),
    }
}

pub fn int_param(options: &OptionMap, key: &str) -> StorageResult<Option<i64>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
            StorageError::InvalidOption(format!("`{}` must be an integer, got {}", key, n))
        }),
        Some(Value::String(s)) => s.parse().map(Some).map_err(|_| {
            StorageError::InvalidOption(format!("`{}` must be an integer, got {:?}", key, s))
        }),
        Some(other) => Err(StorageError::InvalidOption(format!(
            "`{}` must be an integer, got {}",
            key, other
        ))),
    }
}

/// User metadata given as a JSON object of scalars.
pub fn metadata_param(options: &OptionMap) -> StorageResult<Option<HashMap<String, String>>> {
    match options.get("metadata") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => {
            let mut metadata = HashMap::with_capacity(map.len());
            for (key, value) in map {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(_) | Value::Bool(_) => value.to_string(),
                    other => {
                        return Err(StorageError::InvalidOption(format!(
                            "metadata `{}` must be a scalar, got {}",
                            key, other
                        )))
                    }
                };
                metadata.insert(key.clone(), value);
            }
            Ok(Some(metadata))
        }
        Some(other) => Err(StorageError::InvalidOption(format!(
            "`metadata` must be an object, got {}",
            other
        ))),
    }
}

/// Storage class requested by `storage_class`, or by the legacy
/// `reduced_redundancy: true` flag when no explicit class is given.
pub fn storage_class_param(options: &OptionMap) -> StorageResult<Option<String>> {
    if let Some(class) = string_param(options, "storage_class")? {
        return Ok(Some(class));
    }
    match bool_param(options, "reduced_redundancy")? {
        Some(true) => Ok(Some("REDUCED_REDUNDANCY".to_string())),
        _ => Ok(None),
    }
}
