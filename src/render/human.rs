//! Human-readable terminal output.

use colored::Colorize;

use crate::render::frame::{ChartFrame, PivotTable};
use crate::util::format::{format_cell, human_format};

/// Render a KPI block: one `label: value` line per entry.
#[must_use]
pub fn render_kpis(items: &[(&str, String)], no_color: bool) -> String {
    let mut out = String::new();
    for (label, value) in items {
        if no_color {
            out.push_str(&format!("{label}: {value}\n"));
        } else {
            out.push_str(&format!("{}: {}\n", label.bold(), value.cyan()));
        }
    }
    out
}

/// Render a chart frame as an aligned text table.
#[must_use]
pub fn render_frame(frame: &ChartFrame, no_color: bool) -> String {
    if frame.is_empty() {
        return "No data for the selected range.\n".to_string();
    }

    let has_category = frame.rows.iter().any(|r| r.category.is_some());

    let mut headers = vec!["Period".to_string()];
    if has_category {
        headers.push("Category".to_string());
    }
    headers.extend(frame.columns.iter().cloned());

    let rows: Vec<Vec<String>> = frame
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.period.format("%Y-%m-%d").to_string()];
            if has_category {
                cells.push(row.category.clone().unwrap_or_default());
            }
            cells.extend(row.values.iter().map(|v| format_cell(*v)));
            cells
        })
        .collect();

    render_table(&headers, &rows, no_color)
}

/// Render a pivot table with row labels down the side.
#[must_use]
pub fn render_pivot(pivot: &PivotTable, no_color: bool) -> String {
    if pivot.is_empty() {
        return "No data for the selected range.\n".to_string();
    }

    let mut headers = vec![String::new()];
    headers.extend(pivot.col_labels.iter().cloned());

    let rows: Vec<Vec<String>> = pivot
        .row_labels
        .iter()
        .zip(&pivot.cells)
        .map(|(label, cells)| {
            let mut out = vec![label.clone()];
            out.extend(cells.iter().map(|v| human_format(*v)));
            out
        })
        .collect();

    render_table(&headers, &rows, no_color)
}

/// Aligned text table with a separator under the header.
#[must_use]
pub fn render_table(headers: &[String], rows: &[Vec<String>], no_color: bool) -> String {
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut out = String::new();

    let header_line = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect::<Vec<_>>()
        .join("  ");
    if no_color {
        out.push_str(header_line.trim_end());
    } else {
        out.push_str(header_line.trim_end().bold().to_string().as_str());
    }
    out.push('\n');

    let total: usize = widths.iter().sum::<usize>() + 2 * (widths.len().saturating_sub(1));
    out.push_str(&"-".repeat(total));
    out.push('\n');

    for row in rows {
        let line = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Bucket;
    use chrono::{TimeZone, Utc};

    fn frame() -> ChartFrame {
        let buckets = vec![
            Bucket {
                period_start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                dimension: Some("ethereum".to_string()),
                metrics: [("volume".to_string(), 1500.0)].into_iter().collect(),
            },
            Bucket {
                period_start: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                dimension: Some("polygon".to_string()),
                metrics: [("volume".to_string(), 10.0)].into_iter().collect(),
            },
        ];
        ChartFrame::from_buckets(&buckets, &["volume"])
    }

    #[test]
    fn frame_renders_periods_and_values() {
        let out = render_frame(&frame(), true);
        assert!(out.contains("Period"));
        assert!(out.contains("Category"));
        assert!(out.contains("2024-01-01"));
        assert!(out.contains("ethereum"));
        assert!(out.contains("1.50K"));
    }

    #[test]
    fn empty_frame_renders_placeholder() {
        let empty = ChartFrame {
            columns: vec!["volume".to_string()],
            rows: Vec::new(),
        };
        let out = render_frame(&empty, true);
        assert!(out.contains("No data"));
    }

    #[test]
    fn undefined_cells_render_as_dash() {
        let with_series = frame().with_series("change_pct", vec![None, Some(50.0)]);
        let out = render_frame(&with_series, true);
        assert!(out.lines().nth(2).unwrap().trim_end().ends_with('-'));
    }

    #[test]
    fn pivot_renders_grid() {
        let pivot = PivotTable::from_pairs(vec![
            ("osmosis".to_string(), "ethereum".to_string(), 10.0),
            ("polygon".to_string(), "ethereum".to_string(), 5.0),
        ]);
        let out = render_pivot(&pivot, true);
        assert!(out.contains("ethereum"));
        assert!(out.contains("osmosis"));
        assert!(out.contains("10"));
    }

    #[test]
    fn kpi_lines() {
        let out = render_kpis(&[("Total Transfers", "1.20M".to_string())], true);
        assert_eq!(out, "Total Transfers: 1.20M\n");
    }
}
