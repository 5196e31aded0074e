//! Number formatting utilities.

/// Format a percentage with one decimal place.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Format a USD amount with two decimal places.
#[must_use]
pub fn format_usd(value: f64) -> String {
    format!("${value:.2}")
}

/// Compact human form for large counts and volumes (K/M/B).
#[must_use]
pub fn human_format(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    if abs >= 1e9 {
        format!("{sign}{:.2}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{sign}{:.2}M", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{sign}{:.2}K", abs / 1e3)
    } else if abs.fract() == 0.0 {
        format!("{sign}{abs:.0}")
    } else {
        format!("{sign}{abs:.2}")
    }
}

/// Render an optional cell value; undefined cells show as `-`.
#[must_use]
pub fn format_cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), human_format)
}
