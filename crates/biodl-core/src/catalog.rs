//! Catalog of well-known reference resources.
//!
//! The table ships inside the library (`resources/catalog.toml`) and is parsed once
//! per process. Users can replace individual URLs through the `[catalog]` section of
//! the config file, which produces a new [`Catalog`] rather than mutating the bundled one.

use crate::error::InvalidResourceError;
use crate::resource::Resource;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

const BUNDLED_CATALOG: &str = include_str!("../resources/catalog.toml");

static BUNDLED: OnceLock<Catalog> = OnceLock::new();

#[derive(Debug, Deserialize)]
struct CatalogFile {
    resources: BTreeMap<String, String>,
}

/// Well-known resources with an entry in the bundled catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownResource {
    GencodeGrch38V38Basic,
    GencodeGrch38V38Comprehensive,
    GencodeGrch38V39Basic,
    GencodeGrch38V39Comprehensive,
    GeneInfoHuman,
    Hgnc,
    Prosite,
    Mim2GeneMedgen,
    HpDiseaseAnnotations,
    Orpha2Gene,
    HpJson,
    HpObo,
    GoJson,
    GoObo,
    MondoJson,
    MondoOwl,
    MaxoJson,
    MaxoOwl,
    MaxoObo,
    EctoJson,
    EctoOwl,
    UberonJson,
    GenoJson,
    GoaHumanGaf,
}

impl KnownResource {
    pub const ALL: [KnownResource; 24] = [
        KnownResource::GencodeGrch38V38Basic,
        KnownResource::GencodeGrch38V38Comprehensive,
        KnownResource::GencodeGrch38V39Basic,
        KnownResource::GencodeGrch38V39Comprehensive,
        KnownResource::GeneInfoHuman,
        KnownResource::Hgnc,
        KnownResource::Prosite,
        KnownResource::Mim2GeneMedgen,
        KnownResource::HpDiseaseAnnotations,
        KnownResource::Orpha2Gene,
        KnownResource::HpJson,
        KnownResource::HpObo,
        KnownResource::GoJson,
        KnownResource::GoObo,
        KnownResource::MondoJson,
        KnownResource::MondoOwl,
        KnownResource::MaxoJson,
        KnownResource::MaxoOwl,
        KnownResource::MaxoObo,
        KnownResource::EctoJson,
        KnownResource::EctoOwl,
        KnownResource::UberonJson,
        KnownResource::GenoJson,
        KnownResource::GoaHumanGaf,
    ];

    /// Catalog key for this resource.
    pub fn key(self) -> &'static str {
        match self {
            KnownResource::GencodeGrch38V38Basic => "gencode.grch38.v38.basic",
            KnownResource::GencodeGrch38V38Comprehensive => "gencode.grch38.v38.comprehensive",
            KnownResource::GencodeGrch38V39Basic => "gencode.grch38.v39.basic",
            KnownResource::GencodeGrch38V39Comprehensive => "gencode.grch38.v39.comprehensive",
            KnownResource::GeneInfoHuman => "gene-info.human",
            KnownResource::Hgnc => "hgnc.complete-set",
            KnownResource::Prosite => "prosite.dat",
            KnownResource::Mim2GeneMedgen => "mim2gene.medgen",
            KnownResource::HpDiseaseAnnotations => "hp.disease.annotations",
            KnownResource::Orpha2Gene => "orpha-to-gene",
            KnownResource::HpJson => "hp.json",
            KnownResource::HpObo => "hp.obo",
            KnownResource::GoJson => "go.json",
            KnownResource::GoObo => "go.obo",
            KnownResource::MondoJson => "mondo.json",
            KnownResource::MondoOwl => "mondo.owl",
            KnownResource::MaxoJson => "maxo.json",
            KnownResource::MaxoOwl => "maxo.owl",
            KnownResource::MaxoObo => "maxo.obo",
            KnownResource::EctoJson => "ecto.json",
            KnownResource::EctoOwl => "ecto.owl",
            KnownResource::UberonJson => "uberon.json",
            KnownResource::GenoJson => "geno.json",
            KnownResource::GoaHumanGaf => "goa.human.current.v2.2.gaf.gz",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

impl fmt::Display for KnownResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Immutable key -> URL table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, Url>,
}

impl Catalog {
    /// The catalog bundled with the library, parsed on first use.
    ///
    /// # Panics
    ///
    /// Never in a released build: `resources/catalog.toml` is compiled in and
    /// `bundled_catalog_covers_every_known_resource` parses it.
    pub fn bundled() -> &'static Catalog {
        BUNDLED.get_or_init(|| {
            Catalog::parse(BUNDLED_CATALOG).expect("bundled catalog.toml must be valid")
        })
    }

    /// Parses a catalog document (`[resources]` table of key = URL).
    pub fn parse(text: &str) -> Result<Catalog> {
        let file: CatalogFile = toml::from_str(text).context("parse catalog")?;
        let mut entries = BTreeMap::new();
        for (key, raw) in file.resources {
            let url = Url::parse(&raw).with_context(|| format!("catalog entry {key}: invalid URL {raw:?}"))?;
            entries.insert(key, url);
        }
        Ok(Catalog { entries })
    }

    /// Returns a copy of this catalog with the given URLs replacing or adding entries.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> Result<Catalog> {
        let mut entries = self.entries.clone();
        for (key, raw) in overrides {
            let url = Url::parse(raw)
                .with_context(|| format!("catalog override {key}: invalid URL {raw:?}"))?;
            if let Some(previous) = entries.insert(key.clone(), url) {
                tracing::debug!("catalog override for {}: {} replaced", key, previous);
            }
        }
        Ok(Catalog { entries })
    }

    pub fn url(&self, key: &str) -> Option<&Url> {
        self.entries.get(key)
    }

    /// Descriptor for `key`, named after the last segment of its URL path.
    pub fn resource(&self, key: &str) -> Result<Resource, InvalidResourceError> {
        let url = self
            .url(key)
            .ok_or_else(|| InvalidResourceError::UnknownCatalogKey(key.to_string()))?;
        let name = crate::url_model::file_name_from_url(url)
            .ok_or_else(|| InvalidResourceError::NoFileName(url.to_string()))?;
        Resource::with_url(name, url.clone())
    }

    pub fn known(&self, resource: KnownResource) -> Result<Resource, InvalidResourceError> {
        self.resource(resource.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
