//! CLI command handlers, one file per subcommand.

mod download;
mod list;

pub use download::{run_download, DownloadRequest};
pub use list::run_list;
