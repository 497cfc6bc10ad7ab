//! Notarization protocol as a step-driven state machine.
//!
//! [`Notarization`] does no I/O and never sleeps. A driver asks it for the
//! [`Action`] to perform next, performs it, and feeds the outcome back through
//! one of the `on_*` methods, which classify the outcome as a [`Step`]. The
//! async [`crate::Orchestrator`] is one such driver; anything that can wait
//! and call the service can be another.
//!
//! ```text
//! Submitting -> QueueWait (loop on 1519) -> InfoPolling (loop on -19000)
//!            -> LogPolling (loop on -19000) -> Done
//! any phase  -> Failed
//! ```

use std::time::Duration;

use serde::Serialize;

use crate::config::NotarizeConfig;
use crate::error::{ErrorClass, NotarizeError, NotarizeFailure, PollPhase, RemoteError, Result};
use crate::types::{Info, Log, SubmissionId, SubmissionStatus};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Submitting,
    QueueWait,
    InfoPolling,
    LogPolling,
    Done,
    Failed,
}

impl Phase {
    pub fn is_finished(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// What the driver should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Take the submission guard and call submit.
    Submit,
    /// Wait `after`, then fetch the info view.
    FetchInfo { id: SubmissionId, after: Duration },
    /// Wait `after`, then fetch the log view.
    FetchLog { id: SubmissionId, after: Duration },
    /// Nothing left to do; call [`Notarization::finish`].
    Finished,
}

/// How an outcome fed into the machine was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Submit succeeded.
    Submitted(SubmissionId),
    /// Still queued (code 1519); keep ticking.
    Queued,
    /// The service knows the submission; info polling starts.
    Acknowledged,
    /// A fresh info view was retained.
    InfoUpdated { terminal: bool },
    /// A fresh log view was retained.
    LogUpdated { terminal: bool },
    /// Transient network error (code -19000); back off and retry.
    Transient(PollPhase),
    /// The run failed and is now finished.
    Failed,
    /// The outcome did not match the current phase and was dropped.
    Ignored,
}

/// Counters describing the work a run performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub queue_polls: u64,
    pub info_polls: u64,
    pub log_polls: u64,
    pub transient_retries: u64,
}

/// Both views of a successfully notarized submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notarized {
    pub info: Info,
    pub log: Log,
}

impl Notarized {
    pub fn submission_id(&self) -> &SubmissionId {
        &self.info.submission_id
    }
}

/// Combine the two terminal statuses into the final outcome.
///
/// Only a double `Invalid` fails. A single `Invalid` view alongside an
/// `Accepted` one resolves to success.
// TODO: confirm with release engineering whether a mixed Accepted/Invalid
// pair should fail before changing this.
pub fn resolve_verdict(
    info: SubmissionStatus,
    log: SubmissionStatus,
) -> std::result::Result<(), NotarizeError> {
    if info == SubmissionStatus::Invalid && log == SubmissionStatus::Invalid {
        return Err(NotarizeError::InvalidPackage);
    }
    Ok(())
}

/// State of one notarization run.
#[derive(Debug, Clone)]
pub struct Notarization {
    config: NotarizeConfig,
    phase: Phase,
    id: Option<SubmissionId>,
    info: Option<Info>,
    log: Option<Log>,
    error: Option<NotarizeError>,
    backoff_pending: bool,
    stats: PollStats,
}

impl Notarization {
    pub fn new(config: NotarizeConfig) -> Self {
        Self {
            config,
            phase: Phase::Submitting,
            id: None,
            info: None,
            log: None,
            error: None,
            backoff_pending: false,
            stats: PollStats::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last retained info view, or the id stub right after submission.
    pub fn info(&self) -> Option<&Info> {
        self.info.as_ref()
    }

    /// Last retained log view, present once log polling started.
    pub fn log(&self) -> Option<&Log> {
        self.log.as_ref()
    }

    pub fn submission_id(&self) -> Option<&SubmissionId> {
        self.id.as_ref()
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// The next thing the driver has to do.
    pub fn next_action(&self) -> Action {
        let id = match (&self.phase, self.submission_id()) {
            (Phase::Submitting, _) => return Action::Submit,
            (Phase::Done | Phase::Failed, _) => return Action::Finished,
            (_, Some(id)) => id.clone(),
            (_, None) => return Action::Finished,
        };
        let after = if self.backoff_pending {
            self.config.transient_backoff
        } else {
            self.config.poll_interval
        };

        match self.phase {
            Phase::QueueWait => Action::FetchInfo {
                id,
                after: self.config.queue_poll_interval,
            },
            Phase::InfoPolling => Action::FetchInfo { id, after },
            Phase::LogPolling => Action::FetchLog { id, after },
            Phase::Submitting | Phase::Done | Phase::Failed => Action::Finished,
        }
    }

    /// Feed back the submit outcome.
    pub fn on_submitted(&mut self, outcome: std::result::Result<SubmissionId, RemoteError>) -> Step {
        if self.phase != Phase::Submitting {
            return Step::Ignored;
        }
        match outcome {
            Ok(id) => {
                self.id = Some(id.clone());
                self.info = Some(Info::pending(id.clone()));
                self.phase = Phase::QueueWait;
                Step::Submitted(id)
            }
            Err(e) => self.fail(NotarizeError::Submission(e)),
        }
    }

    /// Feed back a fetch-info outcome (queue wait or info polling).
    pub fn on_info(&mut self, outcome: std::result::Result<Info, RemoteError>) -> Step {
        match self.phase {
            Phase::QueueWait => {
                self.stats.queue_polls += 1;
                match outcome {
                    Ok(info) => {
                        self.info = Some(info);
                        self.phase = Phase::InfoPolling;
                        Step::Acknowledged
                    }
                    Err(e) if e.classify(PollPhase::QueueWait) == ErrorClass::QueuedNotFound => {
                        Step::Queued
                    }
                    Err(e) => self.fail(NotarizeError::Remote {
                        phase: PollPhase::QueueWait,
                        source: e,
                    }),
                }
            }
            Phase::InfoPolling => {
                self.stats.info_polls += 1;
                match outcome {
                    Ok(info) => {
                        let terminal = info.status.is_terminal();
                        self.info = Some(info);
                        self.backoff_pending = false;
                        if terminal {
                            self.log = self.id.clone().map(Log::pending);
                            self.phase = Phase::LogPolling;
                        }
                        Step::InfoUpdated { terminal }
                    }
                    Err(e) => self.on_poll_error(PollPhase::Info, e),
                }
            }
            _ => Step::Ignored,
        }
    }

    /// Feed back a fetch-log outcome.
    pub fn on_log(&mut self, outcome: std::result::Result<Log, RemoteError>) -> Step {
        if self.phase != Phase::LogPolling {
            return Step::Ignored;
        }
        self.stats.log_polls += 1;
        match outcome {
            Ok(log) => {
                let terminal = log.status.is_terminal();
                self.log = Some(log);
                self.backoff_pending = false;
                if terminal {
                    self.phase = Phase::Done;
                }
                Step::LogUpdated { terminal }
            }
            Err(e) => self.on_poll_error(PollPhase::Log, e),
        }
    }

    /// Stop the run from outside (cancellation, deadline).
    pub fn on_interrupted(&mut self, error: NotarizeError) -> Step {
        if self.phase.is_finished() {
            return Step::Ignored;
        }
        self.fail(error)
    }

    /// Resolve the run. A run that never reached a terminal phase is
    /// reported as cancelled.
    pub fn finish(self) -> Result<Notarized> {
        let Notarization {
            phase,
            info,
            log,
            error,
            ..
        } = self;

        if let Some(error) = error {
            return Err(NotarizeFailure { error, info, log });
        }
        match (phase, info, log) {
            (Phase::Done, Some(info), Some(log)) => match resolve_verdict(info.status, log.status) {
                Ok(()) => Ok(Notarized { info, log }),
                Err(error) => Err(NotarizeFailure {
                    error,
                    info: Some(info),
                    log: Some(log),
                }),
            },
            (_, info, log) => Err(NotarizeFailure {
                error: NotarizeError::Cancelled,
                info,
                log,
            }),
        }
    }

    fn on_poll_error(&mut self, phase: PollPhase, error: RemoteError) -> Step {
        if error.classify(phase) == ErrorClass::TransientUnavailable {
            self.stats.transient_retries += 1;
            self.backoff_pending = true;
            return Step::Transient(phase);
        }
        self.fail(NotarizeError::Remote {
            phase,
            source: error,
        })
    }

    fn fail(&mut self, error: NotarizeError) -> Step {
        self.error = Some(error);
        self.phase = Phase::Failed;
        Step::Failed
    }
}
