use async_trait::async_trait;
use log::{error, info, warn};
use thiserror::Error;

use crate::assets::asset_url;
use crate::config::StorageSettings;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("delete failed: {0}")]
    Delete(String),
}

/// Object store for uploaded media. Both operations are idempotent.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL of the object.
    async fn put(&self, key: &str, mime: &str, bytes: Vec<u8>) -> Result<String, StoreError>;
    /// Remove the object at `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------- S3 Implementation (AWS or any S3-compatible endpoint) ----------------
pub struct S3AssetStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    public_url: String,
    public_read: bool,
}

impl S3AssetStore {
    pub async fn new(cfg: &StorageSettings) -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(cfg.region.clone()));
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // Path-style addressing for MinIO/local endpoints without wildcard DNS
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(cfg.endpoint.is_some())
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!(
            "Initialized S3 client bucket={} region={} endpoint={}",
            cfg.bucket,
            cfg.region,
            cfg.endpoint.as_deref().unwrap_or("aws")
        );

        if let Err(e) = client.head_bucket().bucket(&cfg.bucket).send().await {
            // Not fatal: credentials may allow object access without bucket-level HEAD.
            warn!("head_bucket failed for '{}': {e:?}", cfg.bucket);
        }

        Ok(Self {
            bucket: cfg.bucket.clone(),
            client,
            public_url: cfg.public_url(),
            public_read: cfg.public_read_acl,
        })
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn put(&self, key: &str, mime: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let size = bytes.len();
        let mut put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(mime);
        if self.public_read {
            put = put.acl(aws_sdk_s3::types::ObjectCannedAcl::PublicRead);
        }
        if let Err(e) = put.send().await {
            error!("put_object failed key={key} bucket={} err={:?}", self.bucket, e);
            let hint = if e.to_string().contains("NoSuchBucket") {
                " (bucket missing or not yet propagated)"
            } else if e.to_string().contains("AccessDenied") {
                " (check AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY permissions)"
            } else {
                ""
            };
            return Err(StoreError::Upload(format!("{e}{hint}")));
        }
        info!("stored object key={key} size={size} mime={mime}");
        Ok(asset_url(&self.public_url, key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                warn!("delete_object failed key={key} bucket={} err={:?}", self.bucket, e);
                StoreError::Delete(e.to_string())
            })?;
        Ok(())
    }
}
