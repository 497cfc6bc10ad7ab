//! Request and result types exchanged with the notary service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Account identity used to authenticate a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Apple ID of the developer account.
    pub developer_id: String,

    /// Password or app-specific password reference. Passed through untouched.
    pub password: String,

    /// Team / provider short name for accounts attached to several providers.
    pub provider: Option<String>,
}

/// A single artifact to notarize. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// The file to notarize (zip, dmg or pkg).
    pub artifact: PathBuf,

    /// Credentials for the submission.
    pub credentials: Credentials,
}

impl SubmissionRequest {
    pub fn new(
        artifact: impl Into<PathBuf>,
        developer_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            credentials: Credentials {
                developer_id: developer_id.into(),
                password: password.into(),
                provider: None,
            },
        }
    }

    /// Set the provider / team identifier.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.credentials.provider = Some(provider.into());
        self
    }

    /// Check the fields the service cannot do without.
    pub fn validate(&self) -> Result<(), String> {
        if self.artifact.as_os_str().is_empty() {
            return Err("artifact path is empty".to_string());
        }
        if self.credentials.developer_id.trim().is_empty() {
            return Err("developer id is empty".to_string());
        }
        if self.credentials.password.is_empty() {
            return Err("password is empty".to_string());
        }
        Ok(())
    }
}

/// Identifier the service assigns to one submission. Doubles as the log job id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn new(id: impl Into<String>) -> Self {
        SubmissionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status reported by the service for both the info and log views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,

    Accepted,

    Invalid,

    /// Any value this crate does not recognise. Never terminal.
    #[serde(other)]
    Unknown,
}

impl SubmissionStatus {
    /// `Accepted` and `Invalid` are final; the service will not change them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Accepted | SubmissionStatus::Invalid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::InProgress => "In Progress",
            SubmissionStatus::Accepted => "Accepted",
            SubmissionStatus::Invalid => "Invalid",
            SubmissionStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission info view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// Submission id this info belongs to.
    #[serde(rename = "id")]
    pub submission_id: SubmissionId,

    #[serde(default)]
    pub status: SubmissionStatus,

    /// Name of the uploaded file as recorded by the service.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,

    /// Free-form message from the service.
    #[serde(default)]
    pub message: Option<String>,
}

impl Info {
    /// Placeholder holding only the id, used before the first successful fetch.
    pub fn pending(submission_id: SubmissionId) -> Self {
        Self {
            submission_id,
            status: SubmissionStatus::InProgress,
            name: None,
            created_date: None,
            message: None,
        }
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.status = status;
        self
    }
}

/// One issue reported in the developer log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogIssue {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub doc_url: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
}

/// One ticket entry of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketContent {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub digest_algorithm: Option<String>,
    #[serde(default)]
    pub cdhash: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Developer log view of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub job_id: SubmissionId,

    #[serde(default)]
    pub status: SubmissionStatus,

    #[serde(default)]
    pub status_summary: Option<String>,

    #[serde(default)]
    pub status_code: Option<i64>,

    #[serde(default)]
    pub archive_filename: Option<String>,

    #[serde(default)]
    pub upload_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sha256: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub issues: Vec<LogIssue>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub ticket_contents: Vec<TicketContent>,
}

impl Log {
    /// Placeholder holding only the job id.
    pub fn pending(job_id: SubmissionId) -> Self {
        Self {
            job_id,
            status: SubmissionStatus::InProgress,
            status_summary: None,
            status_code: None,
            archive_filename: None,
            upload_date: None,
            sha256: None,
            issues: Vec::new(),
            ticket_contents: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.status = status;
        self
    }
}

/// The service writes `null` for empty lists.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_service_strings() {
        let s: SubmissionStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(s, SubmissionStatus::InProgress);
        let s: SubmissionStatus = serde_json::from_str("\"Accepted\"").unwrap();
        assert_eq!(s, SubmissionStatus::Accepted);
        let s: SubmissionStatus = serde_json::from_str("\"Rejected\"").unwrap();
        assert_eq!(s, SubmissionStatus::Unknown);
    }

    #[test]
    fn test_only_accepted_and_invalid_are_terminal() {
        assert!(SubmissionStatus::Accepted.is_terminal());
        assert!(SubmissionStatus::Invalid.is_terminal());
        assert!(!SubmissionStatus::InProgress.is_terminal());
        assert!(!SubmissionStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_info_from_notarytool_json() {
        let json = r#"{
            "id": "2efe2717-52ef-43a5-96dc-0797e4ca1041",
            "status": "Accepted",
            "createdDate": "2023-01-16T18:22:04.873Z",
            "name": "app.zip",
            "message": "Successfully received submission info"
        }"#;
        let info: Info = serde_json::from_str(json).unwrap();
        assert_eq!(info.submission_id.as_str(), "2efe2717-52ef-43a5-96dc-0797e4ca1041");
        assert_eq!(info.status, SubmissionStatus::Accepted);
        assert_eq!(info.name.as_deref(), Some("app.zip"));
        assert!(info.created_date.is_some());
    }

    #[test]
    fn test_log_tolerates_missing_fields() {
        let json = r#"{"jobId": "abc", "status": "Invalid", "issues": [{"severity": "error", "message": "not signed"}]}"#;
        let log: Log = serde_json::from_str(json).unwrap();
        assert_eq!(log.status, SubmissionStatus::Invalid);
        assert_eq!(log.issues.len(), 1);
        assert!(log.ticket_contents.is_empty());
    }

    #[test]
    fn test_log_null_lists() {
        let json = r#"{"jobId": "abc", "status": "Accepted", "issues": null, "ticketContents": null}"#;
        let log: Log = serde_json::from_str(json).unwrap();
        assert!(log.issues.is_empty());
        assert!(log.ticket_contents.is_empty());
    }

    #[test]
    fn test_request_validation() {
        let ok = SubmissionRequest::new("app.zip", "dev@example.com", "secret");
        assert!(ok.validate().is_ok());

        let no_file = SubmissionRequest::new("", "dev@example.com", "secret");
        assert!(no_file.validate().is_err());

        let no_password = SubmissionRequest::new("app.zip", "dev@example.com", "");
        assert!(no_password.validate().is_err());
    }
}
