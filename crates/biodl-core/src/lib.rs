pub mod config;
pub mod logging;

pub mod catalog;
pub mod downloader;
pub mod error;
pub mod resource;
pub mod transfer;
pub mod url_model;

pub use catalog::{Catalog, KnownResource};
pub use downloader::{DownloadReport, Downloader, DownloaderBuilder, ResourceOutcome};
pub use error::{
    ConfigurationError, DownloadFailed, InvalidResourceError, TransferCause, TransferError,
    TransferPhase, TransportError,
};
pub use resource::Resource;
pub use transfer::{TransferEngine, TransferOutcome, TransferSettings, Transport};
