//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch audio files from Google Drive into a date-organized local tree.
///
/// Each file lands in `<download dir>/<YYYY-MM-DD_HHMMSS>_<file id>/<name>`,
/// so re-running only fetches what is missing.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "drivefetch")]
#[command(author, version, about)]
pub struct Args {
    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "debug")]
    pub quiet: bool,

    /// Remove the stored OAuth token after the run
    #[arg(long)]
    pub cleanup: bool,

    /// Delete each file from Google Drive once its download is verified
    #[arg(long = "delete-from-gdrive")]
    pub delete_from_gdrive: bool,

    /// Config file (default: $XDG_CONFIG_HOME/drivefetch/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Download directory, overriding `download_dir` from the config file
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}
