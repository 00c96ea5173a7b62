//! Request option maps and the layered merge that builds them.
//!
//! Options are loose `key => value` maps because their keys mirror the storage
//! SDK's request parameters (`acl`, `content_type`, `storage_class`, ...). The
//! backend translating them decides which keys it understands.
//!
//! Precedence for uploads, lowest first:
//!
//! 1. `acl` and the local file's content type
//! 2. uploader-level extra attributes
//! 3. uploader-level write options

use std::collections::BTreeMap;

use serde_json::Value;

use crate::uploader::UploaderOptions;

/// Request options keyed by SDK parameter name.
pub type OptionMap = BTreeMap<String, Value>;

/// Write options that survive a server-side copy. Everything else in the
/// uploader's write options only applies to uploads.
pub const COPY_OPTION_KEYS: [&str; 3] = [
    "reduced_redundancy",
    "storage_class",
    "server_side_encryption",
];

/// Merge option layers left to right. A key present in a later layer replaces
/// the value from any earlier layer.
pub fn merge_layers<'a, I>(layers: I) -> OptionMap
where
    I: IntoIterator<Item = &'a OptionMap>,
{
    let mut merged = OptionMap::new();
    for layer in layers {
        merged.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// Options applied to every read.
pub fn read_options(uploader: &dyn UploaderOptions) -> OptionMap {
    uploader.aws_read_options().cloned().unwrap_or_default()
}

/// Options for uploading a file whose detected content type is `content_type`.
pub fn write_options(uploader: &dyn UploaderOptions, content_type: Option<&str>) -> OptionMap {
    let mut base = OptionMap::new();
    base.insert("acl".to_string(), Value::from(uploader.aws_acl().as_str()));
    if let Some(content_type) = content_type {
        base.insert("content_type".to_string(), Value::from(content_type));
    }

    let empty = OptionMap::new();
    merge_layers([
        &base,
        uploader.aws_attributes().unwrap_or(&empty),
        uploader.aws_write_options().unwrap_or(&empty),
    ])
}

/// Options for a server-side copy: the ACL plus the storage-related subset of
/// the write options.
pub fn copy_options(uploader: &dyn UploaderOptions) -> OptionMap {
    let mut base = OptionMap::new();
    base.insert("acl".to_string(), Value::from(uploader.aws_acl().as_str()));

    let storage: OptionMap = uploader
        .aws_write_options()
        .map(|opts| {
            opts.iter()
                .filter(|(key, _)| COPY_OPTION_KEYS.contains(&key.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    merge_layers([&base, &storage])
}

/// Parse a JSON object into an option map.
pub fn parse_option_map(raw: &str) -> Result<OptionMap, anyhow::Error> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(anyhow::anyhow!(
            "expected a JSON object of options, got {}",
            other
        )),
    }
}
