//! Error types for the sound effect pipeline.
//!
//! Failures fall into two families:
//! - [`UpstreamError`]: any third-party API failure (prompt generation,
//!   audio synthesis, object storage).
//! - [`FilesystemError`]: local read/write failures (audio output, ledger).
//!
//! Both fold into the crate-wide [`Error`] via `From`, so `?` works across
//! component boundaries.

use std::path::{Path, PathBuf};

/// Result type alias for sfxlib operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for sfxlib.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Third-party API failure.
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Local filesystem failure.
    #[error("filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Required configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure came from an upstream that might answer on a
    /// later attempt. See [`UpstreamError::is_transient`].
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Upstream(err) => err.is_transient(),
            Self::Filesystem(_) | Self::Config(_) => false,
        }
    }
}

/// Error type for upstream API calls.
///
/// Each variant represents a distinct failure mode so callers can tell an
/// authentication problem apart from a malformed response.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Authentication or authorization failure.
    #[error("[{provider}] {message}")]
    Auth {
        /// Provider name (e.g., "openai", "elevenlabs").
        provider: String,
        /// Error description.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("[{provider}] Rate limit exceeded")]
    RateLimited {
        /// Provider name.
        provider: String,
    },

    /// Network or connection error.
    #[error("{0}")]
    Network(String),

    /// Response body failed mid-stream.
    #[error("{0}")]
    Stream(String),

    /// HTTP status error with an unrecognised body.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Provider-specific error.
    #[error("[{provider}] {message}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Error description.
        message: String,
        /// Optional error code from the provider.
        code: Option<String>,
    },

    /// Response did not have the expected shape.
    #[error("Expected {expected}, got {got}")]
    ResponseFormat {
        /// Expected format description.
        expected: String,
        /// Actual format received.
        got: String,
    },

    /// The provider answered successfully but returned nothing usable.
    #[error("[{provider}] returned no content")]
    EmptyResponse {
        /// Provider name.
        provider: String,
    },
}

impl UpstreamError {
    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Auth {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a streaming error.
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a provider-specific error.
    #[must_use]
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Create a provider error with an error code.
    #[must_use]
    pub fn provider_code(
        provider: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ResponseFormat {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an empty response error.
    #[must_use]
    pub fn empty_response(provider: impl Into<String>) -> Self {
        Self::EmptyResponse {
            provider: provider.into(),
        }
    }

    /// Whether a later attempt could plausibly succeed.
    ///
    /// Nothing in the pipeline retries; this only informs log output.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.into())
    }
}

/// Error type for local file operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FilesystemError {
    /// Reading or writing failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File exists but its contents are not in the expected format.
    #[error("{}: {message}", path.display())]
    Corrupt {
        /// File involved.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },
}

impl FilesystemError {
    /// Wrap an I/O error with the path it concerns.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a corrupt-content error.
    #[must_use]
    pub fn corrupt(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Path the error concerns.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Corrupt { path, .. } => path,
        }
    }
}
