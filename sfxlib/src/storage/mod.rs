//! Object storage.
//!
//! [`ObjectStore`] is the narrow seam to a bucket: put one local file under a
//! key, and tell callers where it can be fetched. [`Uploader`] sits on top and
//! turns the soft failures (missing source file, missing or rejected
//! credentials) into an explicit [`UploadOutcome`] instead of an error, so
//! the pipeline can skip the ledger row and keep going.

pub mod s3;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, FilesystemError, Result, UpstreamError};

pub use s3::{S3Store, StorageConfig};

/// Prefix of generated object keys.
pub const KEY_PREFIX: &str = "sound_effect_library_";

/// Generate a fresh object key: `sound_effect_library_<uuid-hex>.mp3`.
#[must_use]
pub fn default_key() -> String {
    format!("{KEY_PREFIX}{}.mp3", Uuid::new_v4().simple())
}

/// Failure reported by an [`ObjectStore`].
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The local file to upload does not exist.
    #[error("source file not found: {}", path.display())]
    MissingSource {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Credentials are absent or the store rejected them.
    #[error("credentials unavailable: {reason}")]
    MissingCredentials {
        /// What was wrong.
        reason: String,
    },

    /// Bucket or region is not configured.
    #[error("{0}")]
    Config(String),

    /// Any other store failure.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// A bucket that accepts local files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` under `key`. The file is read, never removed.
    async fn put_file(&self, path: &Path, key: &str) -> std::result::Result<(), StoreError>;

    /// Public URL an object stored under `key` would have.
    fn public_url(&self, key: &str) -> String;
}

/// Why an upload produced no URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    /// The local file was gone before the upload started.
    MissingSource {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// Credentials were absent or rejected.
    MissingCredentials {
        /// What was wrong.
        reason: String,
    },
}

/// Result of a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The object is stored.
    Uploaded {
        /// Object key.
        key: String,
        /// Public URL of the object.
        url: String,
    },
    /// The upload did not happen; nothing is stored.
    Failed(UploadFailure),
}

impl UploadOutcome {
    /// URL of the stored object, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Uploaded { url, .. } => Some(url),
            Self::Failed(_) => None,
        }
    }

    /// Whether the object was stored.
    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

/// Uploads files through an [`ObjectStore`] and classifies the result.
#[derive(Debug)]
pub struct Uploader<S> {
    store: S,
}

impl<S: ObjectStore> Uploader<S> {
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Upload `path` under `key`, or under [`default_key`] when `key` is `None`.
    ///
    /// Missing source files and credential problems come back as
    /// [`UploadOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the source path cannot be checked,
    /// [`Error::Config`] when the bucket or region is missing, and
    /// [`Error::Upstream`] for any other store failure.
    pub async fn upload(&self, path: &Path, key: Option<&str>) -> Result<UploadOutcome> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| FilesystemError::io(path, e))?;
        if !exists {
            warn!(path = %path.display(), "upload skipped, source file not found");
            return Ok(UploadOutcome::Failed(UploadFailure::MissingSource {
                path: path.to_path_buf(),
            }));
        }

        let key = key.map_or_else(default_key, str::to_owned);
        debug!(path = %path.display(), %key, "uploading");

        match self.store.put_file(path, &key).await {
            Ok(()) => {
                let url = self.store.public_url(&key);
                info!(%key, %url, "uploaded");
                Ok(UploadOutcome::Uploaded { key, url })
            }
            Err(StoreError::MissingSource { path }) => {
                warn!(path = %path.display(), "upload skipped, source file not found");
                Ok(UploadOutcome::Failed(UploadFailure::MissingSource { path }))
            }
            Err(StoreError::MissingCredentials { reason }) => {
                warn!(%reason, "upload skipped, credentials not available");
                Ok(UploadOutcome::Failed(UploadFailure::MissingCredentials { reason }))
            }
            Err(StoreError::Config(message)) => Err(Error::Config(message)),
            Err(StoreError::Upstream(err)) => Err(err.into()),
        }
    }
}
