//! Download orchestrator.
//!
//! A [`Downloader`] is the frozen product of [`DownloaderBuilder`]: an ordered list of
//! resources, a destination directory and the overwrite flag. `download()` walks the
//! list strictly in order, one blocking transfer at a time. A failed resource is
//! recorded in the report and the run moves on to the next one.

mod builder;

pub use builder::DownloaderBuilder;

use crate::error::{DownloadFailed, TransferError};
use crate::resource::Resource;
use crate::transfer::{TransferEngine, TransferOutcome};
use std::path::{Path, PathBuf};

pub struct Downloader {
    resources: Vec<Resource>,
    destination: PathBuf,
    overwrite: bool,
    engine: TransferEngine,
}

impl Downloader {
    pub fn builder(destination: impl Into<PathBuf>) -> DownloaderBuilder {
        DownloaderBuilder::new(destination)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Fetches every resource not already present, in configuration order.
    ///
    /// Never stops early: each resource gets exactly one outcome in the report.
    pub fn download(&self) -> DownloadReport {
        let mut outcomes = Vec::with_capacity(self.resources.len());
        let mut downloaded = 0usize;

        for resource in &self.resources {
            let target = self.destination.join(resource.name());
            let outcome = self
                .engine
                .transfer_if_needed(&target, resource.url(), self.overwrite);

            match &outcome {
                TransferOutcome::Downloaded { path, bytes } => {
                    tracing::info!(
                        "downloaded {} ({} bytes) to {} ({} files were previously downloaded)",
                        resource.name(),
                        bytes,
                        path.display(),
                        downloaded
                    );
                    downloaded += 1;
                }
                TransferOutcome::SkippedExisting => {}
                TransferOutcome::Failed(err) => {
                    tracing::error!("{}", err);
                }
            }

            outcomes.push(ResourceOutcome {
                resource: resource.clone(),
                outcome,
            });
        }

        DownloadReport { outcomes }
    }
}

/// Outcome of one configured resource.
#[derive(Debug)]
pub struct ResourceOutcome {
    pub resource: Resource,
    pub outcome: TransferOutcome,
}

/// Ordered outcomes of one `download()` call, one per configured resource.
#[derive(Debug)]
pub struct DownloadReport {
    outcomes: Vec<ResourceOutcome>,
}

impl DownloadReport {
    pub fn outcomes(&self) -> &[ResourceOutcome] {
        &self.outcomes
    }

    /// Files written in this run. Skipped resources contribute nothing.
    pub fn downloaded_files(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.downloaded_path())
            .collect()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_skipped()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransferError> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            TransferOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Downloaded files, or every failure of the run as one error.
    pub fn into_result(self) -> Result<Vec<PathBuf>, DownloadFailed> {
        let total = self.outcomes.len();
        let mut files = Vec::new();
        let mut failures = Vec::new();
        for o in self.outcomes {
            match o.outcome {
                TransferOutcome::Downloaded { path, .. } => files.push(path),
                TransferOutcome::SkippedExisting => {}
                TransferOutcome::Failed(err) => failures.push(err),
            }
        }
        if failures.is_empty() {
            Ok(files)
        } else {
            Err(DownloadFailed { total, failures })
        }
    }
}
