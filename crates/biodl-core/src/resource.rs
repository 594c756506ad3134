//! Resource descriptors: the (file name, URL) pairs a downloader fetches.

use crate::error::InvalidResourceError;
use crate::url_model::file_name_from_url;
use std::fmt;
use url::Url;

/// URL schemes a transport exists for.
pub const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// One downloadable artifact: the local file name to write and the URL to fetch it from.
///
/// Two descriptors are equal iff both the name and the URL match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resource {
    name: String,
    url: Url,
}

impl Resource {
    /// Builds a descriptor from a file name and an absolute http/https/ftp URL.
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self, InvalidResourceError> {
        Self::with_url(name, parse_url(url)?)
    }

    /// Builds a descriptor whose file name is the last segment of the URL path.
    pub fn from_url(url: &str) -> Result<Self, InvalidResourceError> {
        let url = parse_url(url)?;
        let name = file_name_from_url(&url)
            .ok_or_else(|| InvalidResourceError::NoFileName(url.to_string()))?;
        Self::with_url(name, url)
    }

    /// Builds a descriptor from an already parsed URL.
    pub fn with_url(name: impl Into<String>, url: Url) -> Result<Self, InvalidResourceError> {
        let name = name.into();
        check_name(&name)?;
        check_scheme(&url)?;
        Ok(Self { name, url })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.url)
    }
}

fn parse_url(url: &str) -> Result<Url, InvalidResourceError> {
    Url::parse(url.trim()).map_err(|source| InvalidResourceError::MalformedUrl {
        url: url.to_string(),
        source,
    })
}

// Names end up joined onto the destination directory, so they must stay inside it.
fn check_name(name: &str) -> Result<(), InvalidResourceError> {
    if name.is_empty() {
        return Err(InvalidResourceError::EmptyName);
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(InvalidResourceError::NotAFileName(name.to_string()));
    }
    Ok(())
}

fn check_scheme(url: &Url) -> Result<(), InvalidResourceError> {
    if SUPPORTED_SCHEMES.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(InvalidResourceError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
            url: url.to_string(),
        })
    }
}
