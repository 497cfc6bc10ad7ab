//! Progress reporting hooks.
//!
//! [`StatusSink`] receives phase transitions; [`NotaryLogger`] receives
//! warnings about absorbed transient errors. Both default to doing nothing.

use tracing::{info, warn};

use crate::types::{Info, Log, SubmissionId};

/// Receives status updates while a run progresses. Every method is optional.
pub trait StatusSink: Send + Sync {
    /// About to call submit. Called while the submission guard is held.
    fn on_submitting(&self) {}

    /// Submit returned an id.
    fn on_submitted(&self, _id: &SubmissionId) {}

    /// A fresh info view was fetched.
    fn on_info_update(&self, _info: &Info) {}

    /// A fresh log view was fetched.
    fn on_log_update(&self, _log: &Log) {}
}

/// Sink that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatus;

impl StatusSink for NoopStatus {}

/// Sink that reports updates as `tracing` events, tagged with a label
/// (usually the artifact name) so concurrent runs can be told apart.
#[derive(Debug, Clone)]
pub struct TracingStatus {
    label: String,
}

impl TracingStatus {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl StatusSink for TracingStatus {
    fn on_submitting(&self) {
        info!(event = "notarize.submitting", artifact = %self.label);
    }

    fn on_submitted(&self, id: &SubmissionId) {
        info!(event = "notarize.submitted", artifact = %self.label, submission_id = %id);
    }

    fn on_info_update(&self, info: &Info) {
        info!(
            event = "notarize.info",
            artifact = %self.label,
            submission_id = %info.submission_id,
            status = %info.status,
        );
    }

    fn on_log_update(&self, log: &Log) {
        info!(
            event = "notarize.log",
            artifact = %self.label,
            job_id = %log.job_id,
            status = %log.status,
            issues = log.issues.len(),
        );
    }
}

/// Destination for warnings raised by a run.
pub trait NotaryLogger: Send + Sync {
    fn warn(&self, message: &str);
}

/// Logger that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl NotaryLogger for NoopLogger {
    fn warn(&self, _message: &str) {}
}

/// Logger that forwards to `tracing::warn!`. This is the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl NotaryLogger for TracingLogger {
    fn warn(&self, message: &str) {
        warn!("{}", message);
    }
}
