//! Single-stream HTTP(S) GET into a local file.
//!
//! The destination is opened when the first body byte arrives, so a request that
//! never connects leaves no empty file behind to be mistaken for a finished download.

use super::{TransferSettings, Transport};
use crate::error::{TransferCause, TransportError};
use curl::easy::Easy;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use url::Url;

const USER_AGENT: &str = concat!("biodl/", env!("CARGO_PKG_VERSION"));

pub struct HttpTransport {
    settings: TransferSettings,
}

impl HttpTransport {
    pub fn new(settings: TransferSettings) -> Self {
        Self { settings }
    }

    fn easy_for(&self, url: &Url) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url.as_str())?;
        easy.useragent(USER_AGENT)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        // Error statuses end the transfer before any body is written.
        easy.fail_on_error(true)?;
        easy.connect_timeout(self.settings.connect_timeout)?;
        easy.low_speed_limit(self.settings.low_speed_limit)?;
        easy.low_speed_time(self.settings.low_speed_time)?;
        if let Some(timeout) = self.settings.timeout {
            easy.timeout(timeout)?;
        }
        Ok(easy)
    }
}

/// Destination file, created lazily on first write. Remembers the first local write error.
struct BodySink<'a> {
    path: &'a Path,
    file: Option<File>,
    written: u64,
    error: Option<io::Error>,
}

impl<'a> BodySink<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            file: None,
            written: 0,
            error: None,
        }
    }

    /// Returns the number of bytes accepted; anything short of `data.len()` aborts curl.
    fn accept(&mut self, data: &[u8]) -> usize {
        if self.file.is_none() {
            match File::create(self.path) {
                Ok(f) => self.file = Some(f),
                Err(e) => {
                    self.error = Some(e);
                    return 0;
                }
            }
        }
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        match file.write_all(data) {
            Ok(()) => {
                self.written += data.len() as u64;
                data.len()
            }
            Err(e) => {
                self.error = Some(e);
                0
            }
        }
    }

    /// Flushes the file, creating it when the body was empty.
    fn finish(self) -> io::Result<u64> {
        let mut file = match self.file {
            Some(f) => f,
            None => File::create(self.path)?,
        };
        file.flush()?;
        file.sync_all()?;
        Ok(self.written)
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &Url, destination: &Path) -> Result<u64, TransportError> {
        let mut easy = self.easy_for(url).map_err(TransportError::connecting)?;
        let mut sink = BodySink::new(destination);

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| Ok(sink.accept(data)))
                .map_err(TransportError::connecting)?;
            transfer.perform()
        };

        if let Some(err) = sink.error.take() {
            tracing::warn!("writing {} failed: {}", destination.display(), err);
            return Err(TransportError::streaming(err));
        }

        if let Err(err) = performed {
            if err.is_http_returned_error() {
                let code = easy.response_code().unwrap_or(0);
                return Err(TransportError::connecting(TransferCause::HttpStatus(code)));
            }
            return Err(if sink.written > 0 {
                TransportError::streaming(err)
            } else {
                TransportError::connecting(err)
            });
        }

        let code = easy.response_code().map_err(TransportError::streaming)?;
        tracing::debug!("GET {} returned HTTP {}", url, code);
        sink.finish().map_err(TransportError::streaming)
    }
}
