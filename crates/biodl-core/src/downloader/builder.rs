//! Two-phase construction: a mutable builder collects resources and settings, and
//! `build()` validates them into an immutable [`Downloader`].

use super::Downloader;
use crate::catalog::{Catalog, KnownResource};
use crate::error::{ConfigurationError, InvalidResourceError};
use crate::resource::Resource;
use crate::transfer::{TransferEngine, TransferSettings};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub struct DownloaderBuilder {
    destination: PathBuf,
    overwrite: bool,
    resources: Vec<Resource>,
    settings: TransferSettings,
    catalog: Option<Catalog>,
    engine: Option<TransferEngine>,
}

impl DownloaderBuilder {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            overwrite: false,
            resources: Vec::new(),
            settings: TransferSettings::default(),
            catalog: None,
            engine: None,
        }
    }

    /// Replace files that already exist in the destination (default: false).
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn transfer_settings(mut self, settings: TransferSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Catalog used by [`Self::known`] and [`Self::catalog_key`] instead of the bundled one.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Transfer engine to use instead of one built from the transfer settings.
    pub fn transfer_engine(mut self, engine: TransferEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds a well-known resource from the catalog.
    pub fn known(self, known: KnownResource) -> Result<Self, InvalidResourceError> {
        self.catalog_key(known.key())
    }

    /// Adds the catalog entry stored under `key`.
    pub fn catalog_key(self, key: &str) -> Result<Self, InvalidResourceError> {
        let catalog = self.catalog.as_ref().unwrap_or_else(|| Catalog::bundled());
        let resource = catalog.resource(key)?;
        Ok(self.resource(resource))
    }

    /// Adds `url`, saved under `name`.
    pub fn custom(self, name: impl Into<String>, url: &str) -> Result<Self, InvalidResourceError> {
        let resource = Resource::new(name, url)?;
        Ok(self.resource(resource))
    }

    /// Adds `url`, saved under the last segment of its path.
    pub fn custom_url(self, url: &str) -> Result<Self, InvalidResourceError> {
        let resource = Resource::from_url(url)?;
        Ok(self.resource(resource))
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Validates the configuration and freezes it.
    ///
    /// Every violation found is reported in one [`ConfigurationError`].
    pub fn build(self) -> Result<Downloader, ConfigurationError> {
        let violations = self.validate();
        if !violations.is_empty() {
            let err = ConfigurationError::new(violations);
            tracing::error!("invalid downloader configuration:\n{}", err);
            return Err(err);
        }
        tracing::info!(
            "downloader configured: {} resource(s) into {}",
            self.resources.len(),
            self.destination.display()
        );

        let engine = self
            .engine
            .unwrap_or_else(|| TransferEngine::new(self.settings));
        Ok(Downloader {
            resources: self.resources,
            destination: self.destination,
            overwrite: self.overwrite,
            engine,
        })
    }

    fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.resources.is_empty() {
            violations.push(
                "No resources configured: add a catalog entry or a custom name and URL."
                    .to_string(),
            );
        }
        violations.extend(check_destination(&self.destination));
        violations.extend(duplicated_resources(&self.resources));
        violations.extend(self.settings.violations());
        violations
    }
}

/// Creates the destination when missing, then checks it is a writable directory.
fn check_destination(destination: &Path) -> Vec<String> {
    if !destination.exists() {
        tracing::info!("creating download directory at {}", destination.display());
        if let Err(e) = fs::create_dir_all(destination) {
            return vec![format!(
                "Could not create destination directory {}: {}",
                destination.display(),
                e
            )];
        }
    }
    if !destination.is_dir() {
        return vec![format!(
            "Path must be a directory: {}",
            destination.display()
        )];
    }
    match tempfile::tempfile_in(destination) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!(
            "Directory must be writable: {} ({})",
            destination.display(),
            e
        )],
    }
}

/// One message per resource configured more than once, in order of first appearance.
fn duplicated_resources(resources: &[Resource]) -> Vec<String> {
    let mut counts: HashMap<&Resource, usize> = HashMap::new();
    for resource in resources {
        *counts.entry(resource).or_default() += 1;
    }
    let mut reported = HashSet::new();
    resources
        .iter()
        .filter(|r| counts[r] > 1 && reported.insert(*r))
        .map(|r| format!("Duplicated resource: [{}, {}]", r.name(), r.url()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_resource_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = DownloaderBuilder::new(dir.path()).build().err().unwrap();
        assert_eq!(err.violations().len(), 1);
        assert!(err.to_string().contains("No resources configured"));
    }

    #[test]
    fn duplicates_are_reported_with_name_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = DownloaderBuilder::new(dir.path())
            .custom("hp.json", "https://example.org/hp.json")
            .unwrap()
            .custom("go.obo", "https://example.org/go.obo")
            .unwrap()
            .custom("hp.json", "https://example.org/hp.json")
            .unwrap()
            .custom("hp.json", "https://example.org/hp.json")
            .unwrap()
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err.violations(),
            ["Duplicated resource: [hp.json, https://example.org/hp.json]".to_string()]
        );
    }

    #[test]
    fn same_url_under_two_names_is_not_a_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = DownloaderBuilder::new(dir.path())
            .custom("hp.json", "https://example.org/hp.json")
            .unwrap()
            .custom("hp-copy.json", "https://example.org/hp.json")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(downloader.resources().len(), 2);
    }

    #[test]
    fn file_destination_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mock.txt");
        std::fs::write(&file, b"not a dir").unwrap();
        let err = DownloaderBuilder::new(&file)
            .custom("test.json", "http://url.com/test.json")
            .unwrap()
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("must be a directory"));
    }

    #[test]
    fn all_violations_are_reported_together() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mock.txt");
        std::fs::write(&file, b"").unwrap();
        let settings = TransferSettings {
            ftp_buffer_bytes: 1000,
            ..TransferSettings::default()
        };
        let err = DownloaderBuilder::new(&file)
            .transfer_settings(settings)
            .build()
            .err()
            .unwrap();
        let text = err.to_string();
        assert_eq!(err.violations().len(), 3, "{text}");
        assert!(text.contains("No resources configured"));
        assert!(text.contains("must be a directory"));
        assert!(text.contains("FTP buffer size"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn missing_destination_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let downloader = DownloaderBuilder::new(&nested)
            .known(KnownResource::HpJson)
            .unwrap()
            .build()
            .unwrap();
        assert!(nested.is_dir());
        assert_eq!(downloader.destination(), nested.as_path());
        assert_eq!(downloader.resources()[0].name(), "hp.json");
        assert!(!downloader.overwrite());
    }

    #[test]
    fn uncreatable_destination_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"").unwrap();
        let err = DownloaderBuilder::new(file.join("sub"))
            .custom("a", "https://example.org/a")
            .unwrap()
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("Could not create destination directory"));
    }

    #[cfg(unix)]
    #[test]
    fn read_only_destination_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
        if tempfile::tempfile_in(&locked).is_ok() {
            // Running as root: permissions are not enforced.
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = DownloaderBuilder::new(&locked)
            .custom("hp.json", "https://example.org/hp.json")
            .unwrap()
            .build();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.err().unwrap();
        assert_eq!(err.violations().len(), 1);
        assert!(err.to_string().contains("Directory must be writable"), "{err}");
    }

    #[test]
    fn invalid_custom_resource_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let err = DownloaderBuilder::new(dir.path())
            .custom("test.json", "not a url")
            .err()
            .unwrap();
        assert!(matches!(err, InvalidResourceError::MalformedUrl { .. }));
        assert!(DownloaderBuilder::new(dir.path()).custom_url("https://example.org/").is_err());
        assert!(DownloaderBuilder::new(dir.path()).catalog_key("no.such.key").is_err());
    }

    #[test]
    fn custom_catalog_is_used_for_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = std::collections::BTreeMap::new();
        overrides.insert("hp.json".to_string(), "https://mirror.example.org/hpo/hp-full.json".to_string());
        let catalog = Catalog::bundled().with_overrides(&overrides).unwrap();
        let builder = DownloaderBuilder::new(dir.path())
            .with_catalog(catalog)
            .known(KnownResource::HpJson)
            .unwrap();
        assert_eq!(builder.resources()[0].name(), "hp-full.json");
    }

    #[test]
    fn registration_order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = DownloaderBuilder::new(dir.path())
            .custom_url("https://example.org/c.txt")
            .unwrap()
            .custom_url("ftp://example.org/a.txt")
            .unwrap()
            .custom_url("http://example.org/b.txt")
            .unwrap()
            .build()
            .unwrap();
        let names: Vec<_> = downloader.resources().iter().map(|r| r.name()).collect();
        assert_eq!(names, ["c.txt", "a.txt", "b.txt"]);
    }
}
