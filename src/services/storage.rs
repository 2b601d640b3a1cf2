use crate::error::StorageError;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Object-store capability the pipeline depends on. Constructed once at
/// startup and shared by reference; tests substitute an in-memory variant.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    /// Fetch an object straight to a local file. The file is fully written
    /// when this returns.
    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        let data = self.get_object(bucket, key).await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_get_error(e.into_service_error()))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transient(e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| classify_put_error(e.into_service_error()))?;
        Ok(())
    }

    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        let mut output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_get_error(e.into_service_error()))?;

        let mut file = tokio::fs::File::create(path).await?;
        while let Some(chunk) = output
            .body
            .try_next()
            .await
            .map_err(|e| StorageError::Transient(e.to_string()))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

fn classify_get_error(err: GetObjectError) -> StorageError {
    if err.is_no_such_key() {
        return StorageError::NotFound;
    }
    match err.code() {
        Some("AccessDenied") => StorageError::AccessDenied,
        _ => StorageError::Transient(err.to_string()),
    }
}

fn classify_put_error(err: PutObjectError) -> StorageError {
    match err.code() {
        Some("AccessDenied") => StorageError::AccessDenied,
        Some("QuotaExceeded") | Some("ServiceQuotaExceededException") => {
            StorageError::QuotaExceeded
        }
        _ => StorageError::Transient(err.to_string()),
    }
}
