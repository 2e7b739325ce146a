//! Exit code logic for the drivefetch process.
//!
//! Single responsibility: map batch counts to the process exit outcome.

use drivefetch_core::BatchResult;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished batch.
///
/// A batch that considered nothing (`0/0`) is a success.
pub(crate) fn determine_exit_outcome(result: &BatchResult) -> ProcessExit {
    if result.is_complete() {
        ProcessExit::Success
    } else if result.success_count > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
