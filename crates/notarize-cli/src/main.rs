//! Notarize CLI - submit macOS artifacts for notarization
//!
//! The `notarize` command submits one or more artifacts, waits for the
//! service to finish processing them, and reports the verdicts.
//!
//! Artifacts run concurrently. Uploads sharing a bundle id are serialised,
//! since the service rejects concurrent submissions for one bundle.

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use notarize_core::{
    cancel_pair, init_tracing, GuardRegistry, LogIssue, NotarizeConfig, NotarizeError,
    Orchestrator, SubmissionRequest, TracingStatus,
};
use notarytool::{NotaryTool, NotaryToolConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "notarize")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Notarize macOS artifacts with Apple", long_about = None)]
struct Cli {
    /// Artifacts to notarize (zip, dmg or pkg)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Apple ID of the developer account
    #[arg(long, env = "NOTARIZE_APPLE_ID")]
    apple_id: String,

    /// App-specific password
    #[arg(long, env = "NOTARIZE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Team / provider id for accounts with several providers
    #[arg(long, env = "NOTARIZE_PROVIDER")]
    provider: Option<String>,

    /// Bundle id shared by all artifacts; their uploads are serialised
    #[arg(long)]
    bundle_id: Option<String>,

    /// Give up after this many seconds (default: wait indefinitely)
    #[arg(long, env = "NOTARIZE_DEADLINE_SECS")]
    deadline_secs: Option<u64>,

    /// notarytool executable to use instead of `xcrun notarytool`
    #[arg(long)]
    notarytool: Option<PathBuf>,

    /// Timeout for each notarytool invocation, in seconds (0 = none)
    #[arg(long, default_value = "0")]
    tool_timeout_secs: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON report
    #[arg(long)]
    json: bool,
}

/// Per-artifact outcome printed at the end of a run.
#[derive(Debug, Serialize)]
struct RunReport {
    file: String,
    success: bool,
    submission_id: Option<String>,
    info_status: Option<String>,
    log_status: Option<String>,
    error: Option<String>,
    issues: Vec<LogIssue>,
}

impl RunReport {
    fn from_result(file: &Path, result: &notarize_core::Result<notarize_core::Notarized>) -> Self {
        let file = file.display().to_string();
        match result {
            Ok(done) => RunReport {
                file,
                success: true,
                submission_id: Some(done.submission_id().to_string()),
                info_status: Some(done.info.status.to_string()),
                log_status: Some(done.log.status.to_string()),
                error: None,
                issues: done.log.issues.clone(),
            },
            Err(failure) => RunReport {
                file,
                success: false,
                submission_id: failure
                    .info
                    .as_ref()
                    .map(|info| info.submission_id.to_string()),
                info_status: failure.info.as_ref().map(|info| info.status.to_string()),
                log_status: failure.log.as_ref().map(|log| log.status.to_string()),
                error: Some(failure.error.to_string()),
                issues: failure
                    .log
                    .as_ref()
                    .map(|log| log.issues.clone())
                    .unwrap_or_default(),
            },
        }
    }

    fn render(&self) -> String {
        let mut out = if self.success {
            format!("✓ {} notarized", self.file)
        } else {
            format!(
                "✗ {} failed: {}",
                self.file,
                self.error.as_deref().unwrap_or("unknown error")
            )
        };
        if let Some(id) = &self.submission_id {
            out.push_str(&format!("\n    submission: {id}"));
        }
        if let (Some(info), Some(log)) = (&self.info_status, &self.log_status) {
            out.push_str(&format!("\n    info: {info}, log: {log}"));
        }
        for issue in &self.issues {
            out.push_str(&format!(
                "\n    [{}] {}: {}",
                issue.severity.as_deref().unwrap_or("issue"),
                issue.path.as_deref().unwrap_or("-"),
                issue.message.as_deref().unwrap_or("")
            ));
        }
        out
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let mut config = NotarizeConfig::from_env();
    if let Some(secs) = cli.deadline_secs {
        config.deadline = (secs > 0).then(|| Duration::from_secs(secs));
    }

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling notarization");
            cancel.cancel();
        }
    });

    let registry = GuardRegistry::new();
    let tool_config = tool_config(&cli);

    let runs = cli.files.iter().map(|file| {
        let request = build_request(&cli, file);
        let guard_key = cli
            .bundle_id
            .clone()
            .unwrap_or_else(|| file.display().to_string());
        let orchestrator = Orchestrator::new(NotaryTool::with_config(
            tool_config.clone(),
            request.credentials.clone(),
        ))
        .with_config(config.clone())
        .with_status(Arc::new(TracingStatus::new(file.display().to_string())))
        .with_guard(registry.guard_for(&guard_key))
        .with_cancel(signal.clone());

        async move {
            let result = orchestrator.notarize(&request).await;
            (request.artifact, result)
        }
    });

    info!(count = cli.files.len(), "notarizing artifacts");
    let results = join_all(runs).await;

    let reports: Vec<RunReport> = results
        .iter()
        .map(|(file, result)| RunReport::from_result(file, result))
        .collect();
    let cancelled = results.iter().any(|(_, result)| {
        matches!(result, Err(failure) if failure.error == NotarizeError::Cancelled)
    });

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to encode report")?
        );
    } else {
        for report in &reports {
            println!("{}", report.render());
        }
    }

    let failed = reports.iter().filter(|r| !r.success).count();
    if cancelled {
        anyhow::bail!("notarization cancelled");
    }
    if failed > 0 {
        anyhow::bail!("{} of {} artifacts failed notarization", failed, reports.len());
    }
    Ok(())
}

fn build_request(cli: &Cli, file: &Path) -> SubmissionRequest {
    let request = SubmissionRequest::new(file, cli.apple_id.clone(), cli.password.clone());
    match &cli.provider {
        Some(provider) => request.with_provider(provider.clone()),
        None => request,
    }
}

fn tool_config(cli: &Cli) -> NotaryToolConfig {
    let config = match &cli.notarytool {
        Some(program) => NotaryToolConfig::custom(program.clone(), Vec::new()),
        None => NotaryToolConfig::default(),
    };
    config.with_timeout(cli.tool_timeout_secs)
}
