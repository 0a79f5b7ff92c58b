//! S3-compatible backend.
//!
//! Writes use a conditional `PutObject` with `If-None-Match: *`, so the
//! request only succeeds if no object exists at the key yet.

use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};
use aws_sdk_s3::error::ProvideErrorMetadata as _;

use crate::{ObjectStore, StorageError};

/// Connection settings for an S3-compatible endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Endpoint URL, e.g. `https://<account>.r2.cloudflarestorage.com`.
    pub endpoint_url: String,
    /// Signing region (`auto` for R2).
    pub region: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Bucket name.
    pub bucket: String,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Object store backed by an S3-compatible bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Creates a client for the endpoint described by `config`.
    #[must_use]
    pub fn new(config: &S3Config) -> Self {
        let creds = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "survey-env",
        );

        let sdk_config = aws_sdk_s3::Config::builder()
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(creds)
            .force_path_style(true)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }

    async fn put_if_absent(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .content_type(content_type)
            .if_none_match("*")
            .send()
            .await
            .map_err(|e| {
                let status = e.raw_response().map(|r| r.status().as_u16());
                if is_create_conflict(e.code(), status) {
                    StorageError::AlreadyExists {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Put {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                        source: Box::new(e),
                    }
                }
            })?;

        log::debug!("  stored {} ({size} bytes)", self.uri(key));
        Ok(())
    }
}

/// Whether a failed conditional write means the key is already taken.
///
/// S3 answers `412 PreconditionFailed` when the object exists, and
/// `409 ConditionalRequestConflict` when a concurrent conditional write to
/// the same key won the race.
fn is_create_conflict(code: Option<&str>, status: Option<u16>) -> bool {
    matches!(
        code,
        Some("PreconditionFailed" | "ConditionalRequestConflict")
    ) || matches!(status, Some(409 | 412))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_detection() {
        assert!(is_create_conflict(Some("PreconditionFailed"), Some(412)));
        assert!(is_create_conflict(Some("ConditionalRequestConflict"), None));
        assert!(is_create_conflict(None, Some(412)));
        assert!(!is_create_conflict(Some("AccessDenied"), Some(403)));
        assert!(!is_create_conflict(None, None));
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = S3Config {
            endpoint_url: "https://storage.example.com".to_string(),
            region: "auto".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "hunter2".to_string(),
            bucket: "surveys".to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("surveys"));
    }
}
