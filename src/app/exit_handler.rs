//! Exit code logic for the nasutil process.
//!
//! Single responsibility: map drain results to the process exit outcome.

use nasutil_core::{DrainReport, DrainSummary};

use crate::ProcessExit;

/// Determines the process exit outcome from the number of URLs left queued after a failure.
pub(crate) fn determine_exit_outcome(failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else {
        ProcessExit::Failure
    }
}

pub(crate) fn exit_for_summary(summary: &DrainSummary) -> ProcessExit {
    determine_exit_outcome(summary.failed())
}

pub(crate) fn exit_for_report(report: &DrainReport) -> ProcessExit {
    determine_exit_outcome(usize::from(report.is_failure()))
}
