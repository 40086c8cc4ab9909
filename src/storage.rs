use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::AppError;

/// How long a presigned image upload URL stays valid.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageError
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unsupported content type '{0}'")]
    UnsupportedType(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedType(_) => AppError::BadRequest(err.to_string()),
            StorageError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

/// StorageService
///
/// The file-intake boundary. The core never handles image bytes: clients upload
/// straight to object storage with a presigned URL and the resulting object key
/// is recorded on the post or category `image` field.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it does not exist. Local setups only.
    async fn ensure_bucket_exists(&self);

    /// Generates a temporary, signed PUT URL for `key`, constrained to `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// image_object_key
///
/// Builds a collision-free object key under `images/`, keeping a sanitized
/// extension from the original filename.
pub fn image_object_key(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());
    format!("images/{}.{}", Uuid::new_v4(), extension)
}

/// Only image uploads are accepted for posts and categories.
pub fn ensure_image_type(content_type: &str) -> Result<(), StorageError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(StorageError::UnsupportedType(content_type.to_string()))
    }
}

/// S3StorageClient
///
/// AWS SDK client for any S3-compatible store (MinIO locally).
/// `force_path_style(true)` is required for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Already-exists is reported as an error too.
            tracing::debug!("create_bucket for {}: {:?}", self.bucket_name, e);
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        ensure_image_type(content_type)?;
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key can never walk out of the bucket prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-process stand-in used by tests and database-free local runs.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Backend("simulated failure".to_string()));
        }
        ensure_image_type(content_type)?;

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_keeps_clean_extension() {
        let key = image_object_key("Holiday Photo.JPG");
        assert!(key.starts_with("images/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn object_key_without_extension() {
        assert!(image_object_key("README").ends_with(".bin"));
    }

    #[test]
    fn sanitize_strips_traversal() {
        assert_eq!(sanitize_key("../../etc/./passwd"), "etc/passwd");
    }
}
