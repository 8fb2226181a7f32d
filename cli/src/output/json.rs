//! JSON output helpers.
//!
//! Every `--json` code path prints one pretty-printed document on stdout:
//! the command's result on success, or the error object below on failure.

use anyhow::{Context, Result};
use serde::Serialize;

/// Format the JSON error object printed when a command fails.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Pretty-print any serializable result.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_value(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Stable error code for the JSON error object, derived from the error's
/// root domain type.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    use crate::domain::error::{
        ConfigError, EditError, PrerequisiteError, SessionError, StepError, TemplateError,
    };
    if let Some(e) = err.downcast_ref::<SessionError>() {
        return if e.is_transport() {
            "TRANSPORT"
        } else {
            "COMMAND_FAILED"
        };
    }
    if err.downcast_ref::<StepError>().is_some() {
        return "STEP_FAILED";
    }
    if err.downcast_ref::<PrerequisiteError>().is_some() {
        return "PREREQUISITE";
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return "CONFIG";
    }
    if err.downcast_ref::<TemplateError>().is_some() {
        return "TEMPLATE";
    }
    if err.downcast_ref::<EditError>().is_some() {
        return "EDIT";
    }
    "ERROR"
}
