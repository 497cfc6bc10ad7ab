//! Integration tests driving NotaryTool against a scripted stand-in for notarytool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notarize_core::{
    Credentials, NotarizeConfig, NotarizeError, NotaryService, Orchestrator, SubmissionId,
    SubmissionRequest, SubmissionStatus,
};
use notarytool::{NotaryTool, NotaryToolConfig};
use tempfile::TempDir;

/// Fake notarytool: answers from canned JSON and appends its argv to `args.log`.
const FAKE_NOTARYTOOL: &str = r#"
cmd="$1"; shift
target="$1"
echo "$cmd $*" >> "$(dirname "$0")/args.log"
case "$cmd" in
  submit)
    echo '{"message":"Successfully uploaded file","id":"2efe2717-52ef","path":"'"$target"'"}'
    ;;
  info)
    echo '{"message":"Successfully received submission info","id":"'"$target"'","status":"Accepted","createdDate":"2023-01-16T18:22:04.873Z","name":"App.zip"}'
    ;;
  log)
    echo '{"jobId":"'"$target"'","status":"Accepted","statusSummary":"Ready for distribution","statusCode":0,"archiveFilename":"App.zip","issues":null,"ticketContents":[{"path":"App.zip/App.app","digestAlgorithm":"SHA-256","cdhash":"abc","arch":"arm64"}]}'
    ;;
  *)
    echo "unknown command $cmd" >&2
    exit 64
    ;;
esac
"#;

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("notarytool.sh");
    std::fs::write(&path, body).expect("write script");
    path
}

/// Run the script through `sh` so it needs no exec bit.
fn tool(dir: &TempDir, body: &str) -> NotaryTool {
    let script = write_script(dir.path(), body);
    let config = NotaryToolConfig::custom("sh", vec![script.display().to_string()]);
    NotaryTool::with_config(config, credentials())
}

fn credentials() -> Credentials {
    Credentials {
        developer_id: "dev@example.com".to_string(),
        password: "app-specific".to_string(),
        provider: Some("TEAM123".to_string()),
    }
}

fn request() -> SubmissionRequest {
    SubmissionRequest::new("build/App.zip", "dev@example.com", "app-specific")
        .with_provider("TEAM123")
}

/// Test: submit parses the id and passes credentials through
#[tokio::test]
async fn test_submit_returns_id() {
    let dir = TempDir::new().unwrap();
    let tool = tool(&dir, FAKE_NOTARYTOOL);

    let id = tool.submit(&request()).await.expect("submit");
    assert_eq!(id, SubmissionId::new("2efe2717-52ef"));

    let args = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
    assert!(args.starts_with("submit build/App.zip --apple-id dev@example.com"));
    assert!(args.contains("--team-id TEAM123"));
    assert!(args.contains("--output-format json"));
    assert!(args.contains("--no-wait"));
}

/// Test: info and log views decode from JSON
#[tokio::test]
async fn test_info_and_log_decode() {
    let dir = TempDir::new().unwrap();
    let tool = tool(&dir, FAKE_NOTARYTOOL);
    let id = SubmissionId::new("2efe2717-52ef");

    let info = tool.fetch_info(&id).await.expect("info");
    assert_eq!(info.submission_id, id);
    assert_eq!(info.status, SubmissionStatus::Accepted);
    assert_eq!(info.name.as_deref(), Some("App.zip"));

    let log = tool.fetch_log(&id).await.expect("log");
    assert_eq!(log.job_id, id);
    assert_eq!(log.status, SubmissionStatus::Accepted);
    assert!(log.issues.is_empty());
    assert_eq!(log.ticket_contents.len(), 1);
    assert_eq!(log.ticket_contents[0].arch.as_deref(), Some("arm64"));
}

/// Test: failure output codes are surfaced on the RemoteError
#[tokio::test]
async fn test_failure_codes_are_extracted() {
    let dir = TempDir::new().unwrap();
    let tool = tool(
        &dir,
        r#"echo 'Error: Error Domain=NSURLErrorDomain Code=-19000 "The network connection was lost."' >&2
exit 1
"#,
    );

    let err = tool
        .fetch_info(&SubmissionId::new("abc"))
        .await
        .unwrap_err();
    assert!(err.contains_code(-19000));
    assert!(err.message.contains("exited with code 1"));
}

/// Test: JSON error payloads provide the message
#[tokio::test]
async fn test_json_error_message() {
    let dir = TempDir::new().unwrap();
    let tool = tool(
        &dir,
        r#"echo '{"message":"No submission with id abc found","code":1519}'
exit 69
"#,
    );

    let err = tool.fetch_info(&SubmissionId::new("abc")).await.unwrap_err();
    assert!(err.contains_code(1519));
    assert!(err.message.contains("No submission with id abc found"));
}

/// Test: malformed output is a hard error with no codes
#[tokio::test]
async fn test_malformed_output_is_hard_error() {
    let dir = TempDir::new().unwrap();
    let tool = tool(&dir, "echo 'not json'\n");

    let err = tool.fetch_log(&SubmissionId::new("abc")).await.unwrap_err();
    assert!(err.codes.is_empty());
    assert!(err.message.contains("unexpected notarytool log output"));
}

/// Test: a missing executable is a hard error with no codes
#[tokio::test]
async fn test_missing_program() {
    let config = NotaryToolConfig::custom("/nonexistent/notarytool", vec![]);
    let tool = NotaryTool::with_config(config, credentials());

    let err = tool.submit(&request()).await.unwrap_err();
    assert!(err.codes.is_empty());
    assert!(err.message.contains("failed to run"));
}

/// Test: the per-invocation timeout kills slow invocations
#[tokio::test]
async fn test_timeout() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "sleep 5\n");
    let config = NotaryToolConfig::custom("sh", vec![script.display().to_string()]).with_timeout(1);
    let tool = NotaryTool::with_config(config, credentials());

    let err = tool.fetch_info(&SubmissionId::new("abc")).await.unwrap_err();
    assert!(err.message.contains("timed out after 1 seconds"));
}

/// Test: full orchestration through the scripted tool
#[tokio::test]
async fn test_orchestrated_run() {
    let dir = TempDir::new().unwrap();
    let tool = tool(&dir, FAKE_NOTARYTOOL);
    let config = NotarizeConfig::default()
        .with_queue_poll_interval(Duration::from_millis(10))
        .with_transient_backoff(Duration::from_millis(10));

    let done = Orchestrator::new(tool)
        .with_config(config)
        .notarize(&request())
        .await
        .expect("notarization should succeed");

    assert_eq!(done.info.status, SubmissionStatus::Accepted);
    assert_eq!(done.log.status, SubmissionStatus::Accepted);

    let args = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
    let commands: Vec<&str> = args
        .lines()
        .map(|line| line.split_whitespace().next().unwrap_or(""))
        .collect();
    assert_eq!(commands, vec!["submit", "info", "info", "log"]);
}

/// Test: a rejected upload fails the run without polling
#[tokio::test]
async fn test_orchestrated_submit_failure() {
    let dir = TempDir::new().unwrap();
    let tool = tool(
        &dir,
        r#"echo '{"message":"Unable to upload your app for notarization."}'
exit 1
"#,
    );

    let failure = Orchestrator::new(tool)
        .notarize(&request())
        .await
        .unwrap_err();
    match failure.error {
        NotarizeError::Submission(err) => {
            assert!(err.message.contains("Unable to upload your app"))
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
