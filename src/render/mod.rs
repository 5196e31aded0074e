//! Output rendering for human and robot modes.

pub mod error;
pub mod frame;
pub mod human;
pub mod robot;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::Result;
pub use error::render_error;
pub use frame::{ChartFrame, FrameRow, PivotTable};
pub use robot::RobotOutput;

/// Render a chart frame in the selected format.
///
/// # Errors
///
/// Returns a serialization error in JSON mode.
pub fn render_frame(
    frame: &ChartFrame,
    command: &str,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_frame(frame, no_color)),
        OutputFormat::Json => robot::render_json(&RobotOutput::new(command, frame), pretty),
    }
}

/// Render a pivot table in the selected format.
///
/// # Errors
///
/// Returns a serialization error in JSON mode.
pub fn render_pivot(
    pivot: &PivotTable,
    command: &str,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_pivot(pivot, no_color)),
        OutputFormat::Json => robot::render_json(&RobotOutput::new(command, pivot), pretty),
    }
}

/// Render an arbitrary serializable payload in the selected format; human
/// mode falls back to the provided pre-rendered text.
///
/// # Errors
///
/// Returns a serialization error in JSON mode.
pub fn render_payload<T: Serialize>(
    payload: &T,
    human_text: String,
    command: &str,
    format: OutputFormat,
    pretty: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human_text),
        OutputFormat::Json => robot::render_json(&RobotOutput::new(command, payload), pretty),
    }
}
