//! Amazon S3 backed [`ObjectStore`].

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3 as s3;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::UpstreamError;

use super::{ObjectStore, StoreError};

const PROVIDER: &str = "s3";
const CONTENT_TYPE: &str = "audio/mpeg";

/// Error codes S3 returns when the credentials themselves are the problem.
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
    "AccessDenied",
    "InvalidSecurity",
];

/// Bucket location and static credentials.
#[derive(Clone, Default)]
pub struct StorageConfig {
    /// AWS region, e.g. `eu-west-1`.
    pub region: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Bucket name.
    pub bucket: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl StorageConfig {
    /// Creates a configuration for `bucket` in `region`, without credentials.
    #[must_use]
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            ..Self::default()
        }
    }

    /// Reads `AWS_REGION`, `AWS_ACCESS_KEY`, `AWS_SECRET_KEY` and `S3_BUCKET_NAME`.
    ///
    /// Unset variables are left empty and reported when the store is first used.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION").unwrap_or_default(),
            access_key: std::env::var("AWS_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("AWS_SECRET_KEY").unwrap_or_default(),
            bucket: std::env::var("S3_BUCKET_NAME").unwrap_or_default(),
        }
    }

    /// Sets static credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = access_key.into();
        self.secret_key = secret_key.into();
        self
    }

    /// Whether both halves of the credential pair are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }

    /// Public URL for an object stored under `key`.
    #[must_use]
    pub fn object_url(&self, key: &str) -> String {
        format!("https://{}.s3.{}.amazonaws.com/{key}", self.bucket, self.region)
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.bucket.is_empty() {
            return Err(StoreError::Config(
                "S3_BUCKET_NAME environment variable not set".to_owned(),
            ));
        }
        if self.region.is_empty() {
            return Err(StoreError::Config(
                "AWS_REGION environment variable not set".to_owned(),
            ));
        }
        if !self.has_credentials() {
            return Err(StoreError::MissingCredentials {
                reason: "AWS_ACCESS_KEY or AWS_SECRET_KEY environment variable not set".to_owned(),
            });
        }
        Ok(())
    }
}

/// Whether an S3 error code means the credentials were rejected.
#[must_use]
pub fn is_credentials_error_code(code: &str) -> bool {
    CREDENTIAL_ERROR_CODES.contains(&code)
}

/// Map a failed `PutObject` to a [`StoreError`].
///
/// Rejected credentials are a soft failure; any other service error keeps its
/// code. Without a code the request never got a service answer, and `context`
/// renders the full error chain.
fn classify_put_error(
    code: Option<&str>,
    message: Option<&str>,
    context: impl FnOnce() -> String,
) -> StoreError {
    match code {
        Some(code) if is_credentials_error_code(code) => StoreError::MissingCredentials {
            reason: format!("{code}: {}", message.unwrap_or("rejected by S3")),
        },
        Some(code) => StoreError::Upstream(UpstreamError::provider_code(
            PROVIDER,
            code,
            message.unwrap_or("request failed"),
        )),
        None => StoreError::Upstream(UpstreamError::network(context())),
    }
}

/// S3 bucket client. The SDK client is built on the first upload.
#[derive(Debug)]
pub struct S3Store {
    config: StorageConfig,
    client: OnceCell<s3::Client>,
}

impl S3Store {
    /// Create a store; nothing is validated until the first upload.
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Create a store from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(StorageConfig::from_env())
    }

    /// The store configuration.
    #[must_use]
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn client(&self) -> Result<&s3::Client, StoreError> {
        self.config.validate()?;
        let client = self
            .client
            .get_or_init(|| async {
                let credentials = Credentials::new(
                    self.config.access_key.clone(),
                    self.config.secret_key.clone(),
                    None,
                    None,
                    "sfxlib",
                );
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.config.region.clone()))
                    .credentials_provider(credentials)
                    .load()
                    .await;
                s3::Client::new(&sdk_config)
            })
            .await;
        Ok(client)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, path: &Path, key: &str) -> Result<(), StoreError> {
        let client = self.client().await?;

        let body = ByteStream::from_path(path).await.map_err(|e| {
            if path.exists() {
                StoreError::Upstream(UpstreamError::stream(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            } else {
                StoreError::MissingSource {
                    path: path.to_path_buf(),
                }
            }
        })?;

        debug!(bucket = %self.config.bucket, %key, "put_object");
        client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(body)
            .content_type(CONTENT_TYPE)
            .send()
            .await
            .map_err(|err| {
                classify_put_error(err.code(), err.message(), || {
                    DisplayErrorContext(&err).to_string()
                })
            })?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }
}
