//! Merges file configuration and CLI flags into one immutable run configuration.

use std::path::{Path, PathBuf};

use drivefetch_core::config::ListingOptions;
use drivefetch_core::fetch::paths;
use drivefetch_core::{AuthSettings, BatchConfig, ExtensionSet};

use crate::app_config::{FileConfig, LoadedConfig, VerbositySetting};
use crate::cli::Args;

pub(crate) const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub(crate) const DEFAULT_CLIENT_SECRET_FILE: &str = "client_secret.json";
pub(crate) const DEFAULT_TOKEN_FILE: &str = "token.json";
pub(crate) const DEFAULT_LOG_DIR: &str = "logs";

/// Everything a run needs, built once before any work starts.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) batch: BatchConfig,
    pub(crate) auth: AuthSettings,
    pub(crate) drive_api_base_url: Option<String>,
}

/// Fills CLI values the user did not pass from the config file.
///
/// `--delete-from-gdrive` only ever turns deletion on; the config file cannot
/// turn it off again.
pub(crate) fn apply_config_defaults(mut args: Args, file_config: Option<&FileConfig>) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !args.debug
        && !args.quiet
        && let Some(verbosity) = file_config.verbosity
    {
        apply_config_verbosity(&mut args, verbosity);
    }

    if !args.delete_from_gdrive
        && let Some(delete_from_src) = file_config.delete_from_src
    {
        args.delete_from_gdrive = delete_from_src;
    }

    args
}

fn apply_config_verbosity(args: &mut Args, verbosity: VerbositySetting) {
    match verbosity {
        VerbositySetting::Default => {
            args.quiet = false;
            args.debug = false;
        }
        VerbositySetting::Quiet => {
            args.quiet = true;
            args.debug = false;
        }
        VerbositySetting::Debug => {
            args.quiet = false;
            args.debug = true;
        }
    }
}

/// Builds the run configuration.
///
/// Config-file paths resolve against the config file's directory; the
/// `--output-dir` flag and paths used without a config file resolve against `cwd`.
pub(crate) fn resolve_run_settings(args: &Args, loaded: &LoadedConfig, cwd: &Path) -> RunSettings {
    let file_config = loaded.config.clone().unwrap_or_default();
    let config_base = loaded.base_dir().map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);

    let download_root = match &args.output_dir {
        Some(output_dir) => paths::resolve(output_dir, cwd),
        None => paths::resolve(
            file_config
                .download_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            &config_base,
        ),
    };

    let mut batch = BatchConfig::new(download_root).with_delete_after(args.delete_from_gdrive);
    if let Some(folders) = file_config.search_folders {
        batch = batch.with_folders(folders);
    }
    if let Some(extensions) = file_config.allowed_extensions {
        batch = batch.with_extensions(ExtensionSet::new(extensions));
    }
    if let Some(report) = file_config.empty_filter_report {
        batch = batch.with_empty_filter_report(report);
    }

    let mut listing = ListingOptions::default();
    if let Some(page_size) = file_config.page_size {
        listing.page_size = page_size;
    }
    if let Some(follow_next_page) = file_config.follow_next_page {
        listing.follow_next_page = follow_next_page;
    }
    batch = batch.with_listing(listing);

    let client_secret = paths::resolve(
        file_config
            .client_secret_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_SECRET_FILE)),
        &config_base,
    );
    let token = paths::resolve(
        file_config
            .token_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
        &config_base,
    );

    RunSettings {
        batch,
        auth: AuthSettings::new(client_secret, token, args.delete_from_gdrive),
        drive_api_base_url: file_config.drive_api_base_url,
    }
}

/// Directory for the persistent run log, or `None` when file logging is off.
///
/// Resolves like the other config paths: against the config file's directory,
/// or `cwd` when no file was loaded.
pub(crate) fn resolve_log_dir(loaded: &LoadedConfig, cwd: &Path) -> Option<PathBuf> {
    let file_config = loaded.config.as_ref();
    if file_config.and_then(|c| c.log_to_file) == Some(false) {
        return None;
    }
    let base = loaded.base_dir().unwrap_or(cwd);
    let log_dir = file_config
        .and_then(|c| c.log_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
    Some(paths::resolve(log_dir, base))
}

pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else if args.debug {
        "debug"
    } else {
        "info"
    }
}

/// A verbosity flag on the command line wins over `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(cli_args: &Args) -> bool {
    cli_args.debug || cli_args.quiet
}
