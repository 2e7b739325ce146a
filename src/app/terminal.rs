//! Terminal capability checks and tracing setup.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(no_color_env: bool, dumb_terminal: bool) -> bool {
    no_color_env || dumb_terminal
}

pub(crate) fn is_no_color_requested() -> bool {
    should_disable_color(no_color_env_requested(), is_dumb_terminal())
}

/// File name of the persistent run log inside the log directory.
pub(crate) const LOG_FILE_NAME: &str = "drivefetch.log";

/// The run log records everything this tool does at debug level.
const FILE_LOG_DIRECTIVES: &str = "info,drivefetch=debug,drivefetch_core=debug";

/// Opens the run log for appending, creating the directory when needed.
pub(crate) fn open_log_file(log_dir: &Path) -> io::Result<File> {
    fs::create_dir_all(log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))
}

fn console_filter(default_level: &str, force_cli_level: bool) -> EnvFilter {
    if force_cli_level {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }
}

/// Console output on stderr at the CLI level, plus the debug-level run log
/// when `log_file` is given.
pub(crate) fn build_subscriber(
    default_level: &str,
    force_cli_level: bool,
    no_color: bool,
    log_file: Option<File>,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(!no_color)
        .with_filter(console_filter(default_level, force_cli_level));
    let file = log_file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_filter(EnvFilter::new(FILE_LOG_DIRECTIVES))
    });
    tracing_subscriber::registry().with(console).with(file)
}

pub(crate) fn init_tracing(
    default_level: &str,
    force_cli_level: bool,
    no_color: bool,
    log_file: Option<File>,
) {
    let _ = build_subscriber(default_level, force_cli_level, no_color, log_file).try_init();
}
