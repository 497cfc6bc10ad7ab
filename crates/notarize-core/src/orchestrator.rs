//! Async driver for the notarization state machine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::cancel::CancelSignal;
use crate::config::NotarizeConfig;
use crate::error::{NotarizeError, NotarizeFailure, Result};
use crate::guard::SubmissionGuard;
use crate::machine::{Action, Notarization, Notarized, Step};
use crate::service::NotaryService;
use crate::status::{NoopStatus, NotaryLogger, StatusSink, TracingLogger};
use crate::types::SubmissionRequest;

const TRANSIENT_WARNING: &str = "error that network became unavailable, will retry";

/// Runs notarizations against a [`NotaryService`].
///
/// One orchestrator can drive many runs, sequentially or concurrently. Runs
/// only contend with each other when they share a [`SubmissionGuard`].
pub struct Orchestrator<S> {
    service: S,
    config: NotarizeConfig,
    status: Arc<dyn StatusSink>,
    logger: Arc<dyn NotaryLogger>,
    guard: Option<SubmissionGuard>,
    cancel: CancelSignal,
}

impl<S: NotaryService> Orchestrator<S> {
    /// Default cadence, no status reporting, warnings to `tracing`, a fresh
    /// guard per run and no cancellation.
    pub fn new(service: S) -> Self {
        Self {
            service,
            config: NotarizeConfig::default(),
            status: Arc::new(NoopStatus),
            logger: Arc::new(TracingLogger),
            guard: None,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_config(mut self, config: NotarizeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn NotaryLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Serialise submits with every other run holding a clone of `guard`.
    pub fn with_guard(mut self, guard: SubmissionGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &NotarizeConfig {
        &self.config
    }

    /// Submit `request` and poll until both views are terminal.
    ///
    /// Blocks for as long as the service takes, which can be hours while the
    /// submission is queued; the cancel signal and the configured deadline are
    /// the only ways out. On failure, the returned [`NotarizeFailure`] carries
    /// the last info and log retained before the error.
    #[instrument(skip_all, fields(artifact = %request.artifact.display()))]
    pub async fn notarize(&self, request: &SubmissionRequest) -> Result<Notarized> {
        if let Err(reason) = request.validate() {
            return Err(NotarizeFailure {
                error: NotarizeError::InvalidRequest(reason),
                info: None,
                log: None,
            });
        }

        let guard = self.guard.clone().unwrap_or_default();
        let deadline = self
            .config
            .deadline
            .map(|limit| (Instant::now() + limit, limit));
        let mut run = Notarization::new(self.config.clone());

        loop {
            match run.next_action() {
                Action::Submit => {
                    let outcome = self
                        .interruptible(deadline, async {
                            let _permit = guard.acquire().await;
                            self.status.on_submitting();
                            self.service.submit(request).await
                        })
                        .await;
                    match outcome {
                        Ok(outcome) => {
                            if let Step::Submitted(id) = run.on_submitted(outcome) {
                                info!(submission_id = %id, "submission accepted for processing");
                                self.status.on_submitted(&id);
                            }
                        }
                        Err(interrupt) => {
                            run.on_interrupted(interrupt);
                        }
                    }
                }
                Action::FetchInfo { id, after } => {
                    let outcome = self
                        .interruptible(deadline, async {
                            pause(after).await;
                            self.service.fetch_info(&id).await
                        })
                        .await;
                    let step = match outcome {
                        Ok(outcome) => run.on_info(outcome),
                        Err(interrupt) => run.on_interrupted(interrupt),
                    };
                    self.observe(&run, &step);
                }
                Action::FetchLog { id, after } => {
                    let outcome = self
                        .interruptible(deadline, async {
                            pause(after).await;
                            self.service.fetch_log(&id).await
                        })
                        .await;
                    let step = match outcome {
                        Ok(outcome) => run.on_log(outcome),
                        Err(interrupt) => run.on_interrupted(interrupt),
                    };
                    self.observe(&run, &step);
                }
                Action::Finished => break,
            }
        }

        let stats = run.stats();
        let result = run.finish();
        match &result {
            Ok(done) => info!(
                submission_id = %done.submission_id(),
                info_status = %done.info.status,
                log_status = %done.log.status,
                queue_polls = stats.queue_polls,
                transient_retries = stats.transient_retries,
                "notarization finished"
            ),
            Err(failure) => info!(
                error = %failure.error,
                queue_polls = stats.queue_polls,
                transient_retries = stats.transient_retries,
                "notarization failed"
            ),
        }
        result
    }

    fn observe(&self, run: &Notarization, step: &Step) {
        match step {
            Step::Queued => debug!("submission not indexed yet, still queued"),
            Step::Acknowledged => {
                info!("submission found, polling info");
                // The first indexed info is reported too, though the info phase re-fetches it.
                if let Some(info) = run.info() {
                    self.status.on_info_update(info);
                }
            }
            Step::InfoUpdated { terminal } => {
                if let Some(info) = run.info() {
                    debug!(status = %info.status, terminal, "info updated");
                    self.status.on_info_update(info);
                }
            }
            Step::LogUpdated { terminal } => {
                if let Some(log) = run.log() {
                    debug!(status = %log.status, terminal, "log updated");
                    self.status.on_log_update(log);
                }
            }
            Step::Transient(phase) => {
                debug!(%phase, backoff = ?self.config.transient_backoff, "transient error");
                self.logger.warn(TRANSIENT_WARNING);
            }
            Step::Submitted(_) | Step::Failed | Step::Ignored => {}
        }
    }

    /// Race `fut` against the cancel signal and the deadline.
    async fn interruptible<F: Future>(
        &self,
        deadline: Option<(Instant, Duration)>,
        fut: F,
    ) -> std::result::Result<F::Output, NotarizeError> {
        let expiry = async {
            match deadline {
                Some((at, _)) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(NotarizeError::Cancelled),
            _ = expiry => Err(NotarizeError::DeadlineExceeded(
                deadline.map(|(_, limit)| limit).unwrap_or_default(),
            )),
            out = fut => Ok(out),
        }
    }
}

async fn pause(after: Duration) {
    if !after.is_zero() {
        tokio::time::sleep(after).await;
    }
}

/// Notarize with default collaborators. Shorthand for
/// `Orchestrator::new(service).notarize(request)`.
pub async fn notarize<S: NotaryService>(service: S, request: &SubmissionRequest) -> Result<Notarized> {
    Orchestrator::new(service).notarize(request).await
}
