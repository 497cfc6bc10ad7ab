//! In-memory fakes for the orchestrator seams (testing only)
//!
//! Provides `ScriptedNotaryService`, which replays canned responses and
//! records every call, plus `RecordingStatus` and `RecordingLogger` that
//! capture what the orchestrator reported.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::RemoteError;
use crate::service::{NotaryService, RemoteResult};
use crate::status::{NotaryLogger, StatusSink};
use crate::types::{Info, Log, SubmissionId, SubmissionRequest, SubmissionStatus};

// ---------------------------------------------------------------------------
// ScriptedNotaryService
// ---------------------------------------------------------------------------

/// Remote operation recorded by [`ScriptedNotaryService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Submit,
    Info,
    Log,
}

#[derive(Debug)]
struct Script<T> {
    queue: VecDeque<RemoteResult<T>>,
    fallback: Option<RemoteResult<T>>,
}

impl<T: Clone> Script<T> {
    fn next(&mut self, what: &str) -> RemoteResult<T> {
        self.queue
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(RemoteError::message(format!("{what} script exhausted"))))
    }
}

/// Counts one in-flight call; leaves on drop, including when the call's
/// future is dropped mid-await.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
    active: usize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let active = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, active }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Notary service that replays scripted responses in order.
///
/// Once a script runs dry the fallback response (if any) repeats forever;
/// without one, the call fails with a hard error so unexpected polls show up.
#[derive(Debug)]
pub struct ScriptedNotaryService {
    submit: Mutex<Script<SubmissionId>>,
    info: Mutex<Script<Info>>,
    log: Mutex<Script<Log>>,
    submit_delay: Duration,
    calls: Mutex<Vec<(Call, Instant)>>,
    active_submits: AtomicUsize,
    peak_submits: AtomicUsize,
}

impl Default for ScriptedNotaryService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedNotaryService {
    /// A service whose submit returns a random id and whose polls are empty.
    pub fn new() -> Self {
        let id = SubmissionId::new(uuid::Uuid::new_v4().to_string());
        Self {
            submit: Mutex::new(Script {
                queue: VecDeque::new(),
                fallback: Some(Ok(id)),
            }),
            info: Mutex::new(Script {
                queue: VecDeque::new(),
                fallback: None,
            }),
            log: Mutex::new(Script {
                queue: VecDeque::new(),
                fallback: None,
            }),
            submit_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            active_submits: AtomicUsize::new(0),
            peak_submits: AtomicUsize::new(0),
        }
    }

    /// Submit always returns `id`.
    pub fn with_submission_id(self, id: &str) -> Self {
        self.submit.lock().unwrap().fallback = Some(Ok(SubmissionId::new(id)));
        self
    }

    /// Submit always fails with `error`.
    pub fn with_submit_error(self, error: RemoteError) -> Self {
        self.submit.lock().unwrap().fallback = Some(Err(error));
        self
    }

    /// Submit takes `delay` before answering.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Queue one fetch-info response.
    pub fn push_info(self, response: RemoteResult<Info>) -> Self {
        self.info.lock().unwrap().queue.push_back(response);
        self
    }

    /// Queue one fetch-log response.
    pub fn push_log(self, response: RemoteResult<Log>) -> Self {
        self.log.lock().unwrap().queue.push_back(response);
        self
    }

    /// Response returned by fetch-info once its script is empty.
    pub fn with_info_fallback(self, response: RemoteResult<Info>) -> Self {
        self.info.lock().unwrap().fallback = Some(response);
        self
    }

    /// Response returned by fetch-log once its script is empty.
    pub fn with_log_fallback(self, response: RemoteResult<Log>) -> Self {
        self.log.lock().unwrap().fallback = Some(response);
        self
    }

    pub fn calls(&self) -> Vec<(Call, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, call: Call) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == call)
            .count()
    }

    /// Highest number of submit calls that were in flight at the same time.
    pub fn peak_concurrent_submits(&self) -> usize {
        self.peak_submits.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }
}

#[async_trait]
impl NotaryService for ScriptedNotaryService {
    async fn submit(&self, _request: &SubmissionRequest) -> RemoteResult<SubmissionId> {
        self.record(Call::Submit);
        let in_flight = InFlight::enter(&self.active_submits);
        self.peak_submits.fetch_max(in_flight.active, Ordering::SeqCst);

        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.submit.lock().unwrap().next("submit")
    }

    async fn fetch_info(&self, id: &SubmissionId) -> RemoteResult<Info> {
        self.record(Call::Info);
        let mut response = self.info.lock().unwrap().next("info");
        if let Ok(info) = &mut response {
            info.submission_id = id.clone();
        }
        response
    }

    async fn fetch_log(&self, job_id: &SubmissionId) -> RemoteResult<Log> {
        self.record(Call::Log);
        let mut response = self.log.lock().unwrap().next("log");
        if let Ok(log) = &mut response {
            log.job_id = job_id.clone();
        }
        response
    }
}

/// Info response with `status`. The id is filled in by the fake.
pub fn info_with(status: SubmissionStatus) -> Info {
    Info::pending(SubmissionId::new("")).with_status(status)
}

/// Log response with `status`. The id is filled in by the fake.
pub fn log_with(status: SubmissionStatus) -> Log {
    Log::pending(SubmissionId::new("")).with_status(status)
}

// ---------------------------------------------------------------------------
// RecordingStatus / RecordingLogger
// ---------------------------------------------------------------------------

/// Status callback captured by [`RecordingStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Submitting,
    Submitted(SubmissionId),
    Info(SubmissionStatus),
    Log(SubmissionStatus),
}

/// Status sink that keeps every callback in order.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: StatusEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl StatusSink for RecordingStatus {
    fn on_submitting(&self) {
        self.push(StatusEvent::Submitting);
    }

    fn on_submitted(&self, id: &SubmissionId) {
        self.push(StatusEvent::Submitted(id.clone()));
    }

    fn on_info_update(&self, info: &Info) {
        self.push(StatusEvent::Info(info.status));
    }

    fn on_log_update(&self, log: &Log) {
        self.push(StatusEvent::Log(log.status));
    }
}

/// Logger that keeps every warning.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    warnings: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl NotaryLogger for RecordingLogger {
    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}
