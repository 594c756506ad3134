//! Error types for descriptor construction, configuration validation and transfers.
//!
//! Configuration problems are fatal and reported all at once; transfer problems
//! are isolated to the resource they happened on.

use std::fmt;
use thiserror::Error;
use url::Url;

/// A single descriptor's name or URL is malformed. Raised when the descriptor is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidResourceError {
    #[error("resource name must not be empty")]
    EmptyName,
    #[error("resource name {0:?} must be a plain file name")]
    NotAFileName(String),
    #[error("invalid URL {url:?}: {source}")]
    MalformedUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("unsupported URL scheme {scheme:?} in {url} (expected http, https or ftp)")]
    UnsupportedScheme { scheme: String, url: String },
    #[error("cannot derive a file name from {0}")]
    NoFileName(String),
    #[error("unknown catalog key {0:?}")]
    UnknownCatalogKey(String),
}

/// Every structural problem found while validating a downloader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .violations.join("\n"))]
pub struct ConfigurationError {
    violations: Vec<String>,
}

impl ConfigurationError {
    pub(crate) fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

/// Phase of a single transfer in which a failure happened.
///
/// A transfer moves `Connecting -> Streaming` and ends either completed or failed;
/// failures carry the last phase entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Opening the connection, negotiating, or waiting for the first byte.
    Connecting,
    /// Copying bytes from the source into the destination file.
    Streaming,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPhase::Connecting => write!(f, "connecting"),
            TransferPhase::Streaming => write!(f, "streaming"),
        }
    }
}

/// Underlying cause of a failed transfer.
#[derive(Debug, Error)]
pub enum TransferCause {
    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    HttpStatus(u32),
    #[error("FTP server replied {code}: {message}")]
    FtpReply { code: u16, message: String },
    #[error("FTP protocol error: {0}")]
    FtpProtocol(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a transport, before it is attributed to a resource.
#[derive(Debug, Error)]
#[error("{cause} (while {phase})")]
pub struct TransportError {
    pub phase: TransferPhase,
    #[source]
    pub cause: TransferCause,
}

impl TransportError {
    pub fn connecting(cause: impl Into<TransferCause>) -> Self {
        Self {
            phase: TransferPhase::Connecting,
            cause: cause.into(),
        }
    }

    pub fn streaming(cause: impl Into<TransferCause>) -> Self {
        Self {
            phase: TransferPhase::Streaming,
            cause: cause.into(),
        }
    }
}

/// A single resource's transfer failed. Recorded as that resource's outcome only.
#[derive(Debug, Error)]
#[error("failed to download {name:?} from {url}: {source}")]
pub struct TransferError {
    pub name: String,
    pub url: Url,
    pub source: TransportError,
}

impl TransferError {
    pub fn phase(&self) -> TransferPhase {
        self.source.phase
    }

    pub fn cause(&self) -> &TransferCause {
        &self.source.cause
    }
}

/// Returned by [`crate::downloader::DownloadReport::into_result`] when at least one
/// resource failed. The whole run has completed by the time this is produced.
#[derive(Debug, Error)]
#[error("{} of {total} resource(s) failed:\n{}", .failures.len(), render_failures(.failures))]
pub struct DownloadFailed {
    pub total: usize,
    pub failures: Vec<TransferError>,
}

fn render_failures(failures: &[TransferError]) -> String {
    failures
        .iter()
        .map(|f| format!("  {}", f))
        .collect::<Vec<_>>()
        .join("\n")
}
