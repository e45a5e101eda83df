use std::path::Path;

use tracing::{error, info};

use super::{BatchReport, SourceArchive};
use crate::error::Error;

/// Receives batch progress events. All methods default to doing nothing.
pub trait ProgressReporter {
    fn batch_started(&self, _total: usize) {}

    fn archive_started(&self, _index: usize, _archive: &SourceArchive) {}

    /// `completed` counts finished archives (failed ones included) and only
    /// ever grows.
    fn archive_finished(
        &self,
        _completed: usize,
        _archive: &SourceArchive,
        _outcome: Result<&Path, &Error>,
    ) {
    }

    fn batch_finished(&self, _report: &BatchReport) {}
}

/// Reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn batch_started(&self, total: usize) {
        info!("converting {total} archive(s)");
    }

    fn archive_started(&self, index: usize, archive: &SourceArchive) {
        info!("[{}] {} => start", index + 1, archive.display_name);
    }

    fn archive_finished(
        &self,
        completed: usize,
        archive: &SourceArchive,
        outcome: Result<&Path, &Error>,
    ) {
        match outcome {
            Ok(cbz) => info!(completed, "{} => {}", archive.display_name, cbz.display()),
            Err(e) => error!(completed, "{} => failed: {e}", archive.display_name),
        }
    }

    fn batch_finished(&self, report: &BatchReport) {
        if report.interrupted {
            info!(
                "interrupted after {} of {} archive(s)",
                report.converted.len() + report.failed.len(),
                report.total
            );
        } else {
            info!(
                "done: {} converted, {} failed",
                report.converted.len(),
                report.failed.len()
            );
        }
    }
}
