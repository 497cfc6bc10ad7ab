//! notarytool - `NotaryService` backed by `xcrun notarytool`
//!
//! Each remote operation spawns one notarytool invocation with JSON output:
//! - `submit <file> --no-wait` returns the submission id
//! - `info <id>` returns the submission info view
//! - `log <id>` returns the developer log
//!
//! Failed invocations become `RemoteError`s carrying any `Code=` values found
//! in the output, so the orchestrator can classify them.

pub mod client;
pub mod error;
pub mod parse;

pub use client::{NotaryTool, NotaryToolConfig};
pub use error::ToolError;
pub use parse::extract_codes;
