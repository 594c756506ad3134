//! User configuration in `$XDG_CONFIG_HOME/biodl/config.toml`.
//!
//! Every field is optional; a missing file is created with the defaults on first run.

use crate::transfer::{TransferSettings, DEFAULT_FTP_BUFFER_BYTES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Transfer limits (optional `[transfer]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Seconds allowed for establishing a connection.
    pub connect_timeout_secs: u64,
    /// Deadline in seconds for a whole transfer; 0 disables the deadline.
    pub timeout_secs: u64,
    /// A transfer slower than this many bytes/s for `low_speed_time_secs` is aborted.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    /// Size of the FTP copy buffer (power of two between 1 KiB and 64 KiB).
    pub ftp_buffer_bytes: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 3600,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            ftp_buffer_bytes: DEFAULT_FTP_BUFFER_BYTES,
        }
    }
}

impl TransferConfig {
    pub fn to_settings(&self) -> TransferSettings {
        TransferSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            low_speed_limit: self.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            ftp_buffer_bytes: self.ftp_buffer_bytes,
        }
    }
}

/// Global configuration loaded from `~/.config/biodl/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiodlConfig {
    /// Default destination directory when none is given on the command line.
    #[serde(default)]
    pub destination: Option<PathBuf>,
    /// Replace files that already exist in the destination.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Catalog key -> URL overrides of the bundled catalog.
    #[serde(default)]
    pub catalog: BTreeMap<String, String>,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("biodl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BiodlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BiodlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BiodlConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
