use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use drivefetch_core::{DriveClient, OAuthProvider, run_batch};
use tracing::{debug, error, info, warn};

use crate::ProcessExit;
use crate::app::config_runtime::{self, RunSettings};
use crate::app::{exit_handler, terminal};
use crate::app_config;
use crate::cli::Args;

pub(crate) async fn run_drivefetch() -> Result<ProcessExit> {
    let cli = Args::parse();
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli);

    let loaded = app_config::load_file_config_from(cli.config.as_deref())?;
    let args = config_runtime::apply_config_defaults(cli, loaded.config.as_ref());
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    let log_dir = config_runtime::resolve_log_dir(&loaded, &cwd);
    let (log_file, log_file_error) = match log_dir.as_deref().map(terminal::open_log_file) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    let default_level = config_runtime::resolve_default_log_level(&args);
    terminal::init_tracing(
        default_level,
        force_cli_log_level,
        terminal::is_no_color_requested(),
        log_file,
    );
    debug!(?args, "CLI arguments parsed");

    if let Some(path) = loaded.loaded_path() {
        info!(config = %path.display(), "Loaded configuration file");
    }
    if let Some(dir) = &log_dir {
        match log_file_error {
            Some(e) => warn!(
                error = %e,
                dir = %dir.display(),
                "Could not open log file, logging to console only"
            ),
            None => info!(
                log_file = %dir.join(terminal::LOG_FILE_NAME).display(),
                "Writing run log"
            ),
        }
    }
    if args.delete_from_gdrive {
        info!("Deletion from Google Drive enabled");
    }

    let settings = config_runtime::resolve_run_settings(&args, &loaded, &cwd);
    log_banner(&settings);

    let provider = OAuthProvider::new(settings.auth.clone())?.with_consent_prompt(Arc::new(
        |url: &url::Url| {
            eprintln!("\nOpen this URL in your browser to authorize drivefetch:\n\n  {url}\n");
        },
    ));

    info!("Step 1: Authenticating with Google Drive");
    let token = match until_interrupted(provider.authenticate(), interrupted()).await {
        Some(Ok(token)) => token,
        Some(Err(e)) => {
            error!(error = %e, "Authentication failed. Check your client secret file.");
            return Ok(ProcessExit::Failure);
        }
        None => {
            warn!("Authentication interrupted by user");
            return Ok(ProcessExit::Interrupted);
        }
    };

    let store = match settings.drive_api_base_url.as_deref() {
        Some(base_url) => DriveClient::with_base_url(token.as_str(), base_url)?,
        None => DriveClient::new(token.as_str())?,
    };

    info!("Step 2: Downloading audio files");
    let Some(result) = until_interrupted(run_batch(&store, &settings.batch), interrupted()).await
    else {
        warn!("Download interrupted by user. Run again to resume.");
        return Ok(ProcessExit::Interrupted);
    };

    if result.total_count == 0 {
        warn!("No audio files found in the configured folders");
    } else if result.is_complete() {
        info!(total = result.total_count, "Successfully downloaded all audio files");
    } else {
        warn!(
            downloaded = result.success_count,
            total = result.total_count,
            "Some audio files were not downloaded"
        );
    }

    if args.cleanup {
        info!("Step 3: Cleaning up credentials");
        if let Err(e) = provider.cleanup() {
            warn!(error = %e, "Failed to remove stored credentials");
        }
    }

    info!("Download process completed");
    Ok(exit_handler::determine_exit_outcome(&result))
}

fn log_banner(settings: &RunSettings) {
    info!("Google Drive audio file downloader");
    info!(
        folders = ?settings.batch.folders,
        download_dir = %settings.batch.download_root.display(),
        extensions = %settings.batch.allowed_extensions,
        delete_from_source = settings.batch.delete_after,
        "Run configuration"
    );
}

/// Runs `work` to completion unless `interrupt` resolves first.
async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
) -> Option<T> {
    tokio::select! {
        output = work => Some(output),
        () = interrupt => None,
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
