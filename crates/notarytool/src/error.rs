//! Error types for the notarytool adapter

use notarize_core::RemoteError;
use thiserror::Error;

use crate::parse::extract_codes;

/// Errors that can occur while invoking notarytool
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool did not finish in time
    #[error("notarytool {subcommand} timed out after {secs} seconds")]
    Timeout { subcommand: String, secs: u64 },

    /// The tool exited unsuccessfully
    #[error("notarytool {subcommand} exited with code {exit_code}: {message}")]
    Failed {
        subcommand: String,
        exit_code: i32,
        message: String,
        /// Combined stdout and stderr, scanned for service error codes.
        output: String,
    },

    /// The tool printed something that is not the expected JSON
    #[error("unexpected notarytool {subcommand} output: {source}")]
    Json {
        subcommand: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ToolError> for RemoteError {
    fn from(err: ToolError) -> Self {
        let codes = match &err {
            ToolError::Failed { output, .. } => extract_codes(output),
            _ => Vec::new(),
        };
        RemoteError {
            message: err.to_string(),
            codes,
        }
    }
}
