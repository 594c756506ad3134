//! CLI for the biodl resource fetcher.

mod commands;

use anyhow::{anyhow, Result};
use biodl_core::config::{self, BiodlConfig};
use biodl_core::Catalog;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_download, run_list, DownloadRequest};

/// Top-level CLI for biodl.
#[derive(Debug, Parser)]
#[command(name = "biodl")]
#[command(about = "biodl: fetch ontologies and annotation files over HTTP(S) and FTP", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download catalog entries and custom URLs into a directory.
    Download {
        /// Catalog keys (see `biodl list`).
        keys: Vec<String>,

        /// Custom resource saved under NAME, given as NAME=URL. Repeatable.
        #[arg(long = "custom", value_name = "NAME=URL", value_parser = parse_custom)]
        custom: Vec<(String, String)>,

        /// Custom URL saved under the last segment of its path. Repeatable.
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// Destination directory (default: config `destination`, then the current directory).
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Replace files that already exist in the destination.
        #[arg(long, overrides_with = "no_overwrite")]
        overwrite: bool,

        /// Keep existing files even when the config sets `overwrite = true`.
        #[arg(long, overrides_with = "overwrite")]
        no_overwrite: bool,
    },

    /// List catalog keys and their URLs.
    List,
}

/// Splits `NAME=URL` at the first `=`.
fn parse_custom(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, url)) if !name.is_empty() && !url.is_empty() => {
            Ok((name.to_string(), url.to_string()))
        }
        _ => Err(format!("expected NAME=URL, got {s:?}")),
    }
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let catalog = Catalog::bundled().with_overrides(&cfg.catalog)?;

        match cli.command {
            CliCommand::Download {
                keys,
                custom,
                urls,
                dest,
                overwrite,
                no_overwrite,
            } => {
                let destination = resolve_destination(dest, &cfg)?;
                let request = DownloadRequest {
                    keys,
                    custom,
                    urls,
                    destination,
                    overwrite: resolve_overwrite(overwrite, no_overwrite, &cfg),
                };
                run_download(&cfg, catalog, request)?;
            }
            CliCommand::List => run_list(&catalog),
        }

        Ok(())
    }
}

/// `--dest`, then the configured destination, then the working directory.
fn resolve_destination(dest: Option<PathBuf>, cfg: &BiodlConfig) -> Result<PathBuf> {
    if let Some(dir) = dest.or_else(|| cfg.destination.clone()) {
        return Ok(dir);
    }
    std::env::current_dir().map_err(|e| anyhow!("cannot determine current directory: {e}"))
}

/// The last of `--overwrite` / `--no-overwrite` wins; without either, the config decides.
fn resolve_overwrite(overwrite: bool, no_overwrite: bool, cfg: &BiodlConfig) -> bool {
    if overwrite {
        true
    } else if no_overwrite {
        false
    } else {
        cfg.overwrite
    }
}

#[cfg(test)]
mod tests;
