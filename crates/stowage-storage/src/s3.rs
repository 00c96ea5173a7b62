use crate::keys::{encode_key_path, validate_key};
use crate::params::{self, COPY_PARAMS, READ_PARAMS, WRITE_PARAMS};
use crate::traits::{ObjectAttributes, ObjectStorage, StorageError, StorageResult, UrlOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::copy_object::builders::CopyObjectFluentBuilder;
use aws_sdk_s3::operation::get_object::builders::GetObjectFluentBuilder;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::operation::put_object::builders::PutObjectFluentBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{MetadataDirective, ObjectCannedAcl, ServerSideEncryption, StorageClass};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::path::Path;
use std::time::{Duration, SystemTime};
use stowage_core::OptionMap;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO, "https://nyc3.digitaloceanspaces.com" for DigitalOcean Spaces)
    /// * `max_attempts` - Attempts per request, retries included
    /// * `timeout` - Upper bound for a whole operation, retries included
    pub async fn new(
        region: String,
        endpoint_url: Option<String>,
        max_attempts: u32,
        timeout: Duration,
    ) -> StorageResult<Self> {
        if max_attempts == 0 {
            return Err(StorageError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(RetryConfig::standard().with_max_attempts(max_attempts))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .load()
            .await;

        // S3-compatible providers (MinIO, etc.) need path-style addressing
        let client = match endpoint_url {
            Some(ref endpoint) => {
                let s3_config = aws_sdk_s3::config::Builder::from(&config)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(s3_config)
            }
            None => Client::new(&config),
        };

        Ok(Self::from_client(client, region, endpoint_url))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, region: String, endpoint_url: Option<String>) -> Self {
        S3Storage {
            client,
            region,
            endpoint_url,
        }
    }

    /// The underlying SDK client, for calls this crate does not wrap.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses the endpoint URL if provided
    fn generate_url(&self, bucket: &str, key: &str) -> String {
        let key = encode_key_path(key);
        if let Some(ref endpoint) = self.endpoint_url {
            // Path-style to match the client's addressing: {endpoint}/{bucket}/{key}
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, bucket, key)
        } else {
            format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key)
        }
    }
}

fn apply_write_options(
    mut req: PutObjectFluentBuilder,
    options: &OptionMap,
) -> StorageResult<PutObjectFluentBuilder> {
    params::ensure_known(options, WRITE_PARAMS, "write")?;

    if let Some(acl) = params::string_param(options, "acl")? {
        req = req.acl(ObjectCannedAcl::from(acl.as_str()));
    }
    if let Some(class) = params::storage_class_param(options)? {
        req = req.storage_class(StorageClass::from(class.as_str()));
    }
    if let Some(sse) = params::string_param(options, "server_side_encryption")? {
        req = req.server_side_encryption(ServerSideEncryption::from(sse.as_str()));
    }
    if let Some(metadata) = params::metadata_param(options)? {
        req = req.set_metadata(Some(metadata));
    }

    Ok(req
        .set_content_type(params::string_param(options, "content_type")?)
        .set_cache_control(params::string_param(options, "cache_control")?)
        .set_content_disposition(params::string_param(options, "content_disposition")?)
        .set_content_encoding(params::string_param(options, "content_encoding")?)
        .set_content_language(params::string_param(options, "content_language")?)
        .set_ssekms_key_id(params::string_param(options, "ssekms_key_id")?)
        .set_tagging(params::string_param(options, "tagging")?)
        .set_website_redirect_location(params::string_param(
            options,
            "website_redirect_location",
        )?))
}

fn apply_read_options(
    req: GetObjectFluentBuilder,
    options: &OptionMap,
) -> StorageResult<GetObjectFluentBuilder> {
    params::ensure_known(options, READ_PARAMS, "read")?;

    let part_number = params::int_param(options, "part_number")?
        .map(|n| {
            i32::try_from(n).map_err(|_| {
                StorageError::InvalidOption(format!("part_number {} is out of range", n))
            })
        })
        .transpose()?;

    Ok(req
        .set_range(params::string_param(options, "range")?)
        .set_if_match(params::string_param(options, "if_match")?)
        .set_if_none_match(params::string_param(options, "if_none_match")?)
        .set_version_id(params::string_param(options, "version_id")?)
        .set_part_number(part_number)
        .set_response_cache_control(params::string_param(options, "response_cache_control")?)
        .set_response_content_disposition(params::string_param(
            options,
            "response_content_disposition",
        )?)
        .set_response_content_encoding(params::string_param(
            options,
            "response_content_encoding",
        )?)
        .set_response_content_language(params::string_param(
            options,
            "response_content_language",
        )?)
        .set_response_content_type(params::string_param(options, "response_content_type")?))
}

fn apply_copy_options(
    mut req: CopyObjectFluentBuilder,
    options: &OptionMap,
) -> StorageResult<CopyObjectFluentBuilder> {
    params::ensure_known(options, COPY_PARAMS, "copy")?;

    if let Some(acl) = params::string_param(options, "acl")? {
        req = req.acl(ObjectCannedAcl::from(acl.as_str()));
    }
    if let Some(class) = params::storage_class_param(options)? {
        req = req.storage_class(StorageClass::from(class.as_str()));
    }
    if let Some(sse) = params::string_param(options, "server_side_encryption")? {
        req = req.server_side_encryption(ServerSideEncryption::from(sse.as_str()));
    }
    if let Some(directive) = params::string_param(options, "metadata_directive")? {
        req = req.metadata_directive(MetadataDirective::from(directive.as_str()));
    }

    Ok(req.set_ssekms_key_id(params::string_param(options, "ssekms_key_id")?))
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    HeadObjectError::NotFound(_) => Ok(false),
                    _ => Err(StorageError::BackendError(e.to_string())),
                },
                _ => Err(StorageError::BackendError(e.to_string())),
            },
        }
    }

    async fn get(&self, bucket: &str, key: &str, options: &OptionMap) -> StorageResult<Bytes> {
        validate_key(key)?;
        let start = std::time::Instant::now();

        let response = apply_read_options(self.client.get_object().bucket(bucket).key(key), options)?
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) =>
                {
                    StorageError::NotFound(format!("{}/{}", bucket, key))
                }
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 download failed"
                    );
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data)
    }

    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        options: &OptionMap,
    ) -> StorageResult<()> {
        validate_key(key)?;
        let request = apply_write_options(self.client.put_object().bucket(bucket).key(key), options)?;

        let body = ByteStream::from_path(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        let size = body.size_hint().0;
        let start = std::time::Instant::now();

        request.body(body).send().await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectAttributes> {
        validate_key(key)?;
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
                {
                    StorageError::NotFound(format!("{}/{}", bucket, key))
                }
                _ => StorageError::BackendError(e.to_string()),
            })?;

        Ok(ObjectAttributes {
            content_length: response.content_length().unwrap_or(0).max(0) as u64,
            content_type: response.content_type().map(String::from),
            etag: response.e_tag().map(String::from),
            last_modified: response
                .last_modified()
                .and_then(|dt| SystemTime::try_from(*dt).ok()),
            cache_control: response.cache_control().map(String::from),
            content_disposition: response.content_disposition().map(String::from),
            content_encoding: response.content_encoding().map(String::from),
            storage_class: response.storage_class().map(|c| c.as_str().to_string()),
            server_side_encryption: response
                .server_side_encryption()
                .map(|s| s.as_str().to_string()),
            version_id: response.version_id().map(String::from),
            metadata: response.metadata().cloned().unwrap_or_default(),
        })
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        options: &UrlOptions,
    ) -> StorageResult<String> {
        validate_key(key)?;
        let presigning_config = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_response_content_type(options.response_content_type.clone())
            .set_response_content_disposition(options.response_content_disposition.clone())
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        Ok(presigned_request.uri().to_string())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.generate_url(bucket, key)
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
        let start = std::time::Instant::now();

        // URL-encode the copy source per AWS S3 API requirements
        let copy_source = format!("{}/{}", source_bucket, encode_key_path(source_key));

        apply_copy_options(
            self.client
                .copy_object()
                .bucket(bucket)
                .copy_source(&copy_source)
                .key(key),
            options,
        )?
        .send()
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                copy_source = %copy_source,
                bucket = %bucket,
                key = %key,
                "S3 copy failed"
            );
            StorageError::BackendError(e.to_string())
        })?;

        tracing::info!(
            copy_source = %copy_source,
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
