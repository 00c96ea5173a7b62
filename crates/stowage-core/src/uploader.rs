//! Uploader-level settings consumed by the stored-file adapter.

use std::time::Duration;

use crate::acl::Acl;
use crate::options::OptionMap;

/// Default lifetime of authenticated (presigned) URLs.
pub const DEFAULT_AUTHENTICATED_URL_EXPIRATION: Duration = Duration::from_secs(600);

/// Read-only settings an uploader exposes to the storage layer.
///
/// Implement this for any type that owns upload configuration; `UploaderConfig`
/// is the plain-data implementation.
pub trait UploaderOptions: Send + Sync {
    /// ACL applied to uploads and copies.
    fn aws_acl(&self) -> Acl;

    /// Bucket every object of this uploader lives in.
    fn aws_bucket(&self) -> &str;

    /// Host prefixed to the object path for public URLs, e.g. a CDN.
    fn asset_host(&self) -> Option<&str> {
        None
    }

    fn aws_read_options(&self) -> Option<&OptionMap> {
        None
    }

    fn aws_write_options(&self) -> Option<&OptionMap> {
        None
    }

    /// Extra object attributes (cache control, metadata, ...) sent on upload.
    fn aws_attributes(&self) -> Option<&OptionMap> {
        None
    }

    fn aws_authenticated_url_expiration(&self) -> Duration {
        DEFAULT_AUTHENTICATED_URL_EXPIRATION
    }
}

/// Uploader settings as plain data.
#[derive(Clone, Debug, PartialEq)]
pub struct UploaderConfig {
    pub acl: Acl,
    pub bucket: String,
    pub asset_host: Option<String>,
    pub read_options: Option<OptionMap>,
    pub write_options: Option<OptionMap>,
    pub attributes: Option<OptionMap>,
    pub authenticated_url_expiration: Duration,
}

impl UploaderConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            acl: Acl::default(),
            bucket: bucket.into(),
            asset_host: None,
            read_options: None,
            write_options: None,
            attributes: None,
            authenticated_url_expiration: DEFAULT_AUTHENTICATED_URL_EXPIRATION,
        }
    }

    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = acl;
        self
    }

    pub fn with_asset_host(mut self, asset_host: impl Into<String>) -> Self {
        self.asset_host = Some(asset_host.into());
        self
    }

    pub fn with_read_options(mut self, options: OptionMap) -> Self {
        self.read_options = Some(options);
        self
    }

    pub fn with_write_options(mut self, options: OptionMap) -> Self {
        self.write_options = Some(options);
        self
    }

    pub fn with_attributes(mut self, attributes: OptionMap) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_authenticated_url_expiration(mut self, expiration: Duration) -> Self {
        self.authenticated_url_expiration = expiration;
        self
    }
}

impl UploaderOptions for UploaderConfig {
    fn aws_acl(&self) -> Acl {
        self.acl
    }

    fn aws_bucket(&self) -> &str {
        &self.bucket
    }

    fn asset_host(&self) -> Option<&str> {
        self.asset_host.as_deref()
    }

    fn aws_read_options(&self) -> Option<&OptionMap> {
        self.read_options.as_ref()
    }

    fn aws_write_options(&self) -> Option<&OptionMap> {
        self.write_options.as_ref()
    }

    fn aws_attributes(&self) -> Option<&OptionMap> {
        self.attributes.as_ref()
    }

    fn aws_authenticated_url_expiration(&self) -> Duration {
        self.authenticated_url_expiration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MinimalUploader;

    impl UploaderOptions for MinimalUploader {
        fn aws_acl(&self) -> Acl {
            Acl::PublicRead
        }

        fn aws_bucket(&self) -> &str {
            "minimal"
        }
    }

    #[test]
    fn test_trait_defaults() {
        let uploader = MinimalUploader;
        assert!(uploader.asset_host().is_none());
        assert!(uploader.aws_write_options().is_none());
        assert_eq!(
            uploader.aws_authenticated_url_expiration(),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = UploaderConfig::new("uploads")
            .with_acl(Acl::PublicRead)
            .with_asset_host("https://cdn.example.com")
            .with_authenticated_url_expiration(Duration::from_secs(60));

        assert_eq!(config.aws_bucket(), "uploads");
        assert_eq!(config.aws_acl(), Acl::PublicRead);
        assert_eq!(config.asset_host(), Some("https://cdn.example.com"));
        assert_eq!(
            config.aws_authenticated_url_expiration(),
            Duration::from_secs(60)
        );
    }
}
