//! Transfer engine: decides whether a resource needs fetching and dispatches the
//! copy to the transport matching the URL scheme.
//!
//! One call handles one file and blocks until the transfer completes or fails.

mod copy;
mod ftp;
mod http;

pub use copy::{copy_buffered, DEFAULT_FTP_BUFFER_BYTES};
pub use ftp::FtpTransport;
pub use http::HttpTransport;

use crate::error::{TransferCause, TransferError, TransportError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Smallest and largest accepted FTP buffer sizes.
const FTP_BUFFER_RANGE: (usize, usize) = (1024, 64 * 1024);

/// Connection and speed limits applied to every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    pub connect_timeout: Duration,
    /// Deadline for a whole transfer; `None` lets a transfer run as long as it makes progress.
    pub timeout: Option<Duration>,
    /// Bytes/s under which a transfer counts as stalled (0 disables stall detection).
    pub low_speed_limit: u32,
    /// How long a transfer may stay stalled, and the idle read timeout for FTP channels.
    pub low_speed_time: Duration,
    pub ftp_buffer_bytes: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Some(Duration::from_secs(3600)),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            ftp_buffer_bytes: DEFAULT_FTP_BUFFER_BYTES,
        }
    }
}

impl TransferSettings {
    /// Problems with these settings, as configuration violation messages.
    pub fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        let (min, max) = FTP_BUFFER_RANGE;
        let size = self.ftp_buffer_bytes;
        if !size.is_power_of_two() || size < min || size > max {
            out.push(format!(
                "FTP buffer size must be a power of two between {} and {} bytes (got {})",
                min, max, size
            ));
        }
        out
    }
}

/// Copies the bytes behind a URL into a local file.
pub trait Transport: Send + Sync {
    /// Fetches `url` into `destination`, truncating any existing file.
    /// Returns the number of bytes written.
    fn fetch(&self, url: &Url, destination: &Path) -> Result<u64, TransportError>;
}

/// Result of one resource's transfer attempt.
#[derive(Debug)]
pub enum TransferOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// The file already existed and overwrite was off; nothing was fetched.
    SkippedExisting,
    Failed(TransferError),
}

impl TransferOutcome {
    pub fn downloaded_path(&self) -> Option<&Path> {
        match self {
            TransferOutcome::Downloaded { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TransferOutcome::SkippedExisting)
    }
}

/// Skip-or-fetch decision plus scheme dispatch.
pub struct TransferEngine {
    http: Box<dyn Transport>,
    ftp: Box<dyn Transport>,
}

impl TransferEngine {
    pub fn new(settings: TransferSettings) -> Self {
        Self::with_transports(
            Box::new(HttpTransport::new(settings)),
            Box::new(FtpTransport::new(settings)),
        )
    }

    /// Engine with custom transports for http(s) and ftp URLs.
    pub fn with_transports(http: Box<dyn Transport>, ftp: Box<dyn Transport>) -> Self {
        Self { http, ftp }
    }

    fn transport_for(&self, url: &Url) -> Option<&dyn Transport> {
        match url.scheme() {
            "http" | "https" => Some(self.http.as_ref()),
            "ftp" => Some(self.ftp.as_ref()),
            _ => None,
        }
    }

    /// Fetches `url` into `destination` unless a regular file is already there and
    /// `overwrite` is false. Failures are returned as an outcome, never raised.
    pub fn transfer_if_needed(&self, destination: &Path, url: &Url, overwrite: bool) -> TransferOutcome {
        if destination.is_file() && !overwrite {
            tracing::info!(
                "refusing to download {} since it already exists at {}",
                url,
                destination.display()
            );
            return TransferOutcome::SkippedExisting;
        }

        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = match self.transport_for(url) {
            Some(transport) => {
                tracing::debug!("fetching {} -> {}", url, destination.display());
                transport.fetch(url, destination)
            }
            None => Err(TransportError::connecting(TransferCause::UnsupportedScheme(
                url.scheme().to_string(),
            ))),
        };

        match result {
            Ok(bytes) => TransferOutcome::Downloaded {
                path: destination.to_path_buf(),
                bytes,
            },
            Err(source) => TransferOutcome::Failed(TransferError {
                name,
                url: url.clone(),
                source,
            }),
        }
    }
}
