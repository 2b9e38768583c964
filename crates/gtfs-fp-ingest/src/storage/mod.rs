//! Object storage for published artifacts
//!
//! The pipeline only needs three operations against one bucket: an existence
//! check that tells "absent" apart from failure, a put, and a get used when a
//! run resumes from an archive published by an earlier, interrupted run.

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use gtfs_fp_common::checksum::sha256_hex;
use tracing::{debug, info, instrument};

use crate::error::StorageError;

pub mod config;
pub mod memory;

pub use config::StorageConfig;
pub use memory::MemoryStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// `Ok(false)` only when the store positively reports the key as missing
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<UploadResult, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: u64,
}

impl UploadResult {
    pub fn for_data(key: &str, data: &[u8]) -> Self {
        Self {
            key: key.to_string(),
            checksum: sha256_hex(data),
            size: data.len() as u64,
        }
    }
}

/// S3-compatible store (AWS, MinIO, ...)
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(config: &StorageConfig) -> Self {
        debug!("Initializing storage with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "gtfs-fp-storage",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .force_path_style(config.path_style)
            .build();

        info!(bucket = %config.bucket, "Storage client initialized");

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(StorageError::Exists {
                key: key.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            }),
        }
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<UploadResult, StorageError> {
        let result = UploadResult::for_data(key, &data);

        debug!("Uploading {} bytes to s3://{}/{}", result.size, self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| StorageError::Put {
                key: key.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StorageError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Get {
                        key: key.to_string(),
                        message: DisplayErrorContext(&err).to_string(),
                    }
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|err| StorageError::Get {
                key: key.to_string(),
                message: err.to_string(),
            })?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, key);

        Ok(data)
    }
}
