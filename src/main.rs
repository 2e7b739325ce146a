//! CLI entry point for drivefetch.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every considered file was downloaded or already present.
    Success,
    /// Some files were downloaded, some failed.
    Partial,
    /// Nothing succeeded, or authentication failed.
    Failure,
    /// Stopped by Ctrl+C.
    Interrupted,
}

impl ProcessExit {
    /// Numeric process exit code.
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial | Self::Failure => 1,
            Self::Interrupted => 130,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_drivefetch().await {
        Ok(exit) => exit.into(),
        Err(error) => {
            // Tracing may not be initialized yet (bad config), so print directly.
            eprintln!("Error: {error:#}");
            ProcessExit::Failure.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessExit;

    #[test]
    fn test_process_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Partial.code(), 1);
        assert_eq!(ProcessExit::Failure.code(), 1);
        assert_eq!(ProcessExit::Interrupted.code(), 130);
    }
}
