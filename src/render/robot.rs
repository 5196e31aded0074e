//! Robot-mode output (JSON).
//!
//! Provides stable, machine-readable output for scripted consumers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// Envelope around any command's JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct RobotOutput<T: Serialize> {
    pub command: String,
    pub generated_at: DateTime<Utc>,
    pub data: T,
}

impl<T: Serialize> RobotOutput<T> {
    #[must_use]
    pub fn new(command: &str, data: T) -> Self {
        Self {
            command: command.to_string(),
            generated_at: Utc::now(),
            data,
        }
    }
}

/// Render any serializable value as JSON.
///
/// # Errors
///
/// Returns a serialization error.
pub fn render_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(output)?)
    } else {
        Ok(serde_json::to_string(output)?)
    }
}
