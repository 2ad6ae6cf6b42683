use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, ObjectCannedAcl};
use aws_sdk_s3::Client;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::check_url_ttl;
use crate::{
    BlobError, BlobLocator, BlobResult, CompletedPart, MultipartBackend, PresignedUrlProvider,
    UploadId,
};

/// Static access key pair for an S3-compatible endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"*****")
            .finish()
    }
}

/// Connection settings for an S3-compatible bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for MinIO, RustFS and friends
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Falls back to the default AWS credential chain when absent
    #[serde(default)]
    pub credentials: Option<StaticCredentials>,
    #[serde(default)]
    pub force_path_style: bool,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            credentials: None,
            force_path_style: false,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some(StaticCredentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        });
        self
    }

    pub fn with_path_style(mut self) -> Self {
        self.force_path_style = true;
        self
    }

    /// Read `{prefix}BUCKET`, `{prefix}REGION` and the optional
    /// `{prefix}ENDPOINT`, `{prefix}ACCESS_KEY_ID`, `{prefix}SECRET_ACCESS_KEY`
    /// and `{prefix}PATH_STYLE` variables
    pub fn from_env(prefix: &str) -> BlobResult<Self> {
        let required = |name: &str| {
            let key = format!("{}{}", prefix, name);
            env::var(&key)
                .map_err(|_| BlobError::config(format!("{} environment variable required", key)))
        };
        let optional = |name: &str| env::var(format!("{}{}", prefix, name)).ok();

        let mut config = Self::new(required("BUCKET")?, required("REGION")?);
        config.endpoint = optional("ENDPOINT");
        if let (Some(key), Some(secret)) =
            (optional("ACCESS_KEY_ID"), optional("SECRET_ACCESS_KEY"))
        {
            config = config.with_credentials(key, secret);
        }
        config.force_path_style = optional("PATH_STYLE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(config)
    }
}

/// Multipart backend on top of the AWS SDK
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    /// Build a client without touching the network
    pub async fn new(config: &S3Config) -> Self {
        let mut builder = match &config.credentials {
            Some(creds) => aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(Credentials::new(
                    creds.access_key_id.clone(),
                    creds.secret_access_key.clone(),
                    None,
                    None,
                    "relay-static",
                )),
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        builder = builder
            .region(Region::new(config.region.clone()))
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(Client::from_conf(builder.build()), config.bucket.clone())
    }

    /// Build the client and check the bucket is reachable
    pub async fn connect(config: &S3Config) -> BlobResult<Self> {
        let backend = Self::new(config).await;
        backend.probe().await?;
        info!(bucket = %backend.bucket, endpoint = ?config.endpoint, "connected to object storage");
        Ok(backend)
    }

    pub fn from_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> BlobError {
        BlobError::backend(err)
    }
}

#[async_trait]
impl MultipartBackend for S3Backend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn probe(&self) -> BlobResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| {
                BlobError::config(format!("bucket {} is not reachable: {}", self.bucket, err))
            })?;
        Ok(())
    }

    async fn init_multipart(&self, key: &str) -> BlobResult<UploadId> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::Private)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        let upload_id = result
            .upload_id()
            .ok_or_else(|| BlobError::upload_failed("backend returned no upload id"))?;
        Ok(UploadId::from_string(upload_id.to_string()))
    }

    async fn put_part(
        &self,
        key: &str,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> BlobResult<CompletedPart> {
        let part_number_i32 = i32::try_from(part_number)
            .map_err(|_| BlobError::invalid(format!("part number {} out of range", part_number)))?;

        let result = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id.as_str())
            .part_number(part_number_i32)
            .body(AwsByteStream::from(body))
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        let etag = result
            .e_tag()
            .ok_or_else(|| BlobError::upload_failed(format!("part {} returned no etag", part_number)))?;
        Ok(CompletedPart {
            part_number,
            etag: etag.to_string(),
        })
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> BlobResult<()> {
        let completed = parts
            .iter()
            .map(|part| {
                aws_sdk_s3::types::CompletedPart::builder()
                    .part_number(part.part_number as i32)
                    .e_tag(&part.etag)
                    .build()
            })
            .collect::<Vec<_>>();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id.as_str())
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &UploadId) -> BlobResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id.as_str())
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        debug!(%upload_id, key, "aborted multipart upload");
        Ok(())
    }
}

#[async_trait]
impl PresignedUrlProvider for S3Backend {
    async fn public_url(&self, locator: &BlobLocator, ttl: Duration) -> BlobResult<String> {
        check_url_ttl(ttl)?;
        let presigning = PresigningConfig::expires_in(ttl).map_err(BlobError::backend)?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(locator.as_str())
            .presigned(presigning)
            .await
            .map_err(Self::map_aws_error)?;
        Ok(request.uri().to_string())
    }
}
