//! The remote operations the orchestrator drives.
//!
//! Implementations speak to the actual notary service (see the `notarytool`
//! crate); the orchestrator only sequences the calls and classifies errors.
//! An in-memory implementation for tests lives in [`crate::fakes`].

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{Info, Log, SubmissionId, SubmissionRequest};

/// Result type for remote notary operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Remote notarization service.
///
/// Errors carry the service's numeric codes so the orchestrator can tell a
/// queued submission (1519) or a network blip (-19000) from a real failure.
#[async_trait]
pub trait NotaryService: Send + Sync {
    /// Upload the artifact and return the id the service assigned.
    async fn submit(&self, request: &SubmissionRequest) -> RemoteResult<SubmissionId>;

    /// Fetch the submission info view.
    async fn fetch_info(&self, id: &SubmissionId) -> RemoteResult<Info>;

    /// Fetch the developer log view. The job id is the submission id.
    async fn fetch_log(&self, job_id: &SubmissionId) -> RemoteResult<Log>;
}

#[async_trait]
impl<T: NotaryService + ?Sized> NotaryService for std::sync::Arc<T> {
    async fn submit(&self, request: &SubmissionRequest) -> RemoteResult<SubmissionId> {
        (**self).submit(request).await
    }

    async fn fetch_info(&self, id: &SubmissionId) -> RemoteResult<Info> {
        (**self).fetch_info(id).await
    }

    async fn fetch_log(&self, job_id: &SubmissionId) -> RemoteResult<Log> {
        (**self).fetch_log(job_id).await
    }
}
