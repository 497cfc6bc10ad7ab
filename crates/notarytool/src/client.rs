//! `NotaryService` over the `xcrun notarytool` command line.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use notarize_core::{
    Credentials, Info, Log, NotaryService, RemoteResult, SubmissionId, SubmissionRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::parse::{failure_message, SubmitResponse};

/// How to invoke notarytool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotaryToolConfig {
    /// Executable to run.
    pub program: PathBuf,

    /// Arguments placed before the subcommand.
    pub base_args: Vec<String>,

    /// Per-invocation timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,
}

impl Default for NotaryToolConfig {
    fn default() -> Self {
        NotaryToolConfig {
            program: PathBuf::from("xcrun"),
            base_args: vec!["notarytool".to_string()],
            timeout_secs: 0,
        }
    }
}

impl NotaryToolConfig {
    /// Run `program` with `base_args` instead of `xcrun notarytool`.
    pub fn custom(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        NotaryToolConfig {
            program: program.into(),
            base_args,
            timeout_secs: 0,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Notary service backed by notarytool.
///
/// Polls authenticate with the credentials given at construction; submit uses
/// the credentials carried by the request.
pub struct NotaryTool {
    config: NotaryToolConfig,
    credentials: Credentials,
}

impl NotaryTool {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_config(NotaryToolConfig::default(), credentials)
    }

    pub fn with_config(config: NotaryToolConfig, credentials: Credentials) -> Self {
        NotaryTool {
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &NotaryToolConfig {
        &self.config
    }

    /// Run one subcommand and decode its JSON stdout.
    async fn invoke<T: DeserializeOwned>(
        &self,
        subcommand: &str,
        target: &str,
        credentials: &Credentials,
    ) -> Result<T, ToolError> {
        let start = Instant::now();
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.base_args)
            .arg(subcommand)
            .arg(target)
            .args(credential_args(credentials))
            .args(["--output-format", "json"]);
        if subcommand == "submit" {
            cmd.arg("--no-wait");
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ToolError::Spawn {
            program: self.config.program.display().to_string(),
            source,
        })?;

        let waited = if self.config.timeout_secs > 0 {
            let limit = Duration::from_secs(self.config.timeout_secs);
            match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    return Err(ToolError::Timeout {
                        subcommand: subcommand.to_string(),
                        secs: self.config.timeout_secs,
                    })
                }
            }
        } else {
            child.wait_with_output().await
        };
        let output = waited.map_err(|source| ToolError::Spawn {
            program: self.config.program.display().to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            subcommand,
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis() as u64,
            "notarytool finished"
        );

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(subcommand, exit_code, "notarytool failed");
            return Err(ToolError::Failed {
                subcommand: subcommand.to_string(),
                exit_code,
                message: failure_message(&stdout, &stderr),
                output: format!("{stdout}\n{stderr}"),
            });
        }

        serde_json::from_str(stdout.trim()).map_err(|source| ToolError::Json {
            subcommand: subcommand.to_string(),
            source,
        })
    }
}

fn credential_args(credentials: &Credentials) -> Vec<String> {
    let mut args = vec![
        "--apple-id".to_string(),
        credentials.developer_id.clone(),
        "--password".to_string(),
        credentials.password.clone(),
    ];
    if let Some(provider) = &credentials.provider {
        args.push("--team-id".to_string());
        args.push(provider.clone());
    }
    args
}

#[async_trait]
impl NotaryService for NotaryTool {
    async fn submit(&self, request: &SubmissionRequest) -> RemoteResult<SubmissionId> {
        let artifact = request.artifact.display().to_string();
        let response: SubmitResponse = self
            .invoke("submit", &artifact, &request.credentials)
            .await?;
        if let Some(message) = &response.message {
            debug!(%message, "submit response");
        }
        Ok(SubmissionId(response.id))
    }

    async fn fetch_info(&self, id: &SubmissionId) -> RemoteResult<Info> {
        Ok(self.invoke("info", id.as_str(), &self.credentials).await?)
    }

    async fn fetch_log(&self, job_id: &SubmissionId) -> RemoteResult<Log> {
        Ok(self.invoke("log", job_id.as_str(), &self.credentials).await?)
    }
}
