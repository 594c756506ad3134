//! `biodl download` – build the downloader from arguments and config, then run it.

use anyhow::Result;
use biodl_core::config::BiodlConfig;
use biodl_core::{Catalog, Downloader, TransferOutcome};
use std::path::PathBuf;

/// Resolved arguments of `biodl download`.
#[derive(Debug)]
pub struct DownloadRequest {
    pub keys: Vec<String>,
    pub custom: Vec<(String, String)>,
    pub urls: Vec<String>,
    pub destination: PathBuf,
    pub overwrite: bool,
}

pub fn run_download(cfg: &BiodlConfig, catalog: Catalog, request: DownloadRequest) -> Result<()> {
    let mut builder = Downloader::builder(&request.destination)
        .overwrite(request.overwrite)
        .transfer_settings(cfg.transfer.to_settings())
        .with_catalog(catalog);
    for key in &request.keys {
        builder = builder.catalog_key(key)?;
    }
    for (name, url) in &request.custom {
        builder = builder.custom(name.as_str(), url)?;
    }
    for url in &request.urls {
        builder = builder.custom_url(url)?;
    }

    let downloader = builder.build()?;
    let report = downloader.download();

    for entry in report.outcomes() {
        let name = entry.resource.name();
        match &entry.outcome {
            TransferOutcome::Downloaded { path, bytes } => {
                println!("downloaded  {:<32} {:>12} bytes  {}", name, bytes, path.display());
            }
            TransferOutcome::SkippedExisting => {
                println!("skipped     {:<32} already present", name);
            }
            TransferOutcome::Failed(err) => {
                println!("failed      {:<32} {}", name, err.source);
            }
        }
    }
    println!(
        "{} downloaded, {} skipped, {} failed in {}",
        report.downloaded_files().len(),
        report.skipped(),
        report.failures().count(),
        downloader.destination().display()
    );

    report.into_result()?;
    Ok(())
}
