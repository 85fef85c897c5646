//! Progress reporting for running batches

use crate::types::TaskFailure;
use tokio::sync::mpsc::UnboundedSender;

/// Receives updates as pairs finish, in completion order.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);

    fn on_error(&self, failure: &TaskFailure);
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_progress(&self, _completed: usize, _total: usize) {}

    fn on_error(&self, _failure: &TaskFailure) {}
}

/// Writes updates to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn on_progress(&self, completed: usize, total: usize) {
        log::info!("Progress: {completed}/{total}");
    }

    fn on_error(&self, failure: &TaskFailure) {
        log::warn!("{failure}");
    }
}

/// Updates sent from a running batch to a UI
#[derive(Debug, Clone, PartialEq)]
pub enum BatchUpdate {
    Progress { completed: usize, total: usize },
    Failed { failure: TaskFailure },
}

impl ProgressReporter for UnboundedSender<BatchUpdate> {
    fn on_progress(&self, completed: usize, total: usize) {
        // a dropped receiver only means nobody is watching
        let _ = self.send(BatchUpdate::Progress { completed, total });
    }

    fn on_error(&self, failure: &TaskFailure) {
        let _ = self.send(BatchUpdate::Failed {
            failure: failure.clone(),
        });
    }
}
