//! Parsing of notarytool output.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

/// Matches `Code=-19000` in NSError descriptions and `"code": 1519` in JSON.
fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?:\bCode=|"code"\s*:\s*)(-?\d+)"#).expect("code pattern is valid")
    })
}

/// Every numeric error code mentioned in `output`, in order, without duplicates.
pub fn extract_codes(output: &str) -> Vec<i64> {
    let mut codes = Vec::new();
    for caps in code_pattern().captures_iter(output) {
        if let Ok(code) = caps[1].parse::<i64>() {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}

/// `submit --output-format json` response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// notarytool JSON error payload, printed on failure.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// The most useful human-readable message in a failed invocation's output.
pub fn failure_message(stdout: &str, stderr: &str) -> String {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(stdout.trim()) {
        return err.message;
    }
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    stdout.trim().to_string()
}
