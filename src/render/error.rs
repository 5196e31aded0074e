//! Error rendering.
//!
//! Human output colors the stable error code; JSON output emits a
//! structured object for machine consumption.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::AxlensError;

/// Structured error for JSON consumers.
#[derive(Debug, Serialize)]
struct ErrorJson {
    code: String,
    category: String,
    message: String,
    retryable: bool,
}

impl ErrorJson {
    fn from_error(error: &AxlensError) -> Self {
        Self {
            code: error.error_code().to_string(),
            category: error.category().description().to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Render an error for the selected output format.
#[must_use]
pub fn render_error(
    error: &AxlensError,
    format: OutputFormat,
    no_color: bool,
    pretty: bool,
) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_error_human(error, no_color),
    }
}

fn render_error_json(error: &AxlensError, pretty: bool) -> String {
    let json = ErrorJson::from_error(error);
    if pretty {
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| error.to_string())
    } else {
        serde_json::to_string(&json).unwrap_or_else(|_| error.to_string())
    }
}

fn render_error_human(error: &AxlensError, no_color: bool) -> String {
    let code = error.error_code();
    if no_color {
        format!("error[{code}]: {error}")
    } else {
        format!("{}{}{} {error}", "error[".red().bold(), code.red().bold(), "]:".red().bold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_carries_code_and_retryable() {
        let error = AxlensError::Timeout { seconds: 30 };
        let out = render_error(&error, OutputFormat::Json, true, false);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["retryable"], true);
        assert!(parsed["code"].as_str().unwrap().starts_with("AXL-"));
    }

    #[test]
    fn human_error_names_code() {
        let error = AxlensError::MissingField {
            field: "volume".to_string(),
        };
        let out = render_error(&error, OutputFormat::Human, true, false);
        assert!(out.starts_with("error[AXL-"));
        assert!(out.contains("volume"));
    }
}
