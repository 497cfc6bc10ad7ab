//! Notarize Core - drives a notarization submission to a verdict
//!
//! Provides the orchestration that:
//! - Submits an artifact while holding a per-bundle submission guard
//! - Waits out the service queue (code 1519) on a fixed tick
//! - Polls the info and log views to a terminal status, absorbing transient
//!   network errors (code -19000) with a fixed backoff
//! - Resolves both terminal statuses into a verdict
//!
//! The remote calls themselves are behind [`NotaryService`]; the `notarytool`
//! crate provides the implementation that shells out to `xcrun notarytool`.

pub mod cancel;
pub mod config;
pub mod error;
pub mod fakes;
pub mod guard;
pub mod machine;
pub mod orchestrator;
pub mod service;
pub mod status;
pub mod telemetry;
pub mod types;

// Re-export key types
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::NotarizeConfig;
pub use error::{
    ErrorClass, NotarizeError, NotarizeFailure, PollPhase, RemoteError, Result,
    CODE_NETWORK_UNAVAILABLE, CODE_NOT_FOUND,
};
pub use guard::{GuardRegistry, SubmissionGuard, SubmissionPermit};
pub use machine::{resolve_verdict, Action, Notarization, Notarized, Phase, PollStats, Step};
pub use orchestrator::{notarize, Orchestrator};
pub use service::{NotaryService, RemoteResult};
pub use status::{NoopLogger, NoopStatus, NotaryLogger, StatusSink, TracingLogger, TracingStatus};
pub use telemetry::init_tracing;
pub use types::{
    Credentials, Info, Log, LogIssue, SubmissionId, SubmissionRequest, SubmissionStatus,
    TicketContent,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
