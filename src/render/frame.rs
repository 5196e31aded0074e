//! Output shaping: chart frames and pivot tables.
//!
//! A [`ChartFrame`] is the tabular form every command renders from: one row
//! per `(period, category)` with a named column per metric or derived
//! series. A [`PivotTable`] is the heatmap form, categories crossed against
//! categories with zero-filled cells.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::model::Bucket;

// =============================================================================
// Chart frame
// =============================================================================

/// One output row of a chart frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRow {
    pub period: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Values aligned with [`ChartFrame::columns`]; `None` marks an
    /// undefined cell (e.g. a ratio with a zero denominator).
    pub values: Vec<Option<f64>>,
}

/// Long-form table: period, optional category, named value columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub columns: Vec<String>,
    pub rows: Vec<FrameRow>,
}

impl ChartFrame {
    /// Build a frame from aggregated buckets, one column per listed metric.
    /// Row order follows the bucket order.
    #[must_use]
    pub fn from_buckets(buckets: &[Bucket], metrics: &[&str]) -> Self {
        let rows = buckets
            .iter()
            .map(|bucket| FrameRow {
                period: bucket.period_start,
                category: bucket.dimension.clone(),
                values: metrics.iter().map(|m| bucket.metric(m)).collect(),
            })
            .collect();

        Self {
            columns: metrics.iter().map(ToString::to_string).collect(),
            rows,
        }
    }

    /// Append a derived series as a new column. The series must be aligned
    /// index-for-index with the rows.
    ///
    /// # Panics
    ///
    /// Panics if the series length differs from the row count; derived
    /// series come from the same bucket slice, so a mismatch is a bug.
    #[must_use]
    pub fn with_series(mut self, name: &str, series: Vec<Option<f64>>) -> Self {
        assert_eq!(series.len(), self.rows.len(), "series/row length mismatch");
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(series) {
            row.values.push(value);
        }
        self
    }

    /// Convenience for series that are always defined.
    #[must_use]
    pub fn with_defined_series(self, name: &str, series: Vec<f64>) -> Self {
        self.with_series(name, series.into_iter().map(Some).collect())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Pivot table
// =============================================================================

/// Wide-form table: row label x column label -> summed value, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `cells[i][j]` is the value for `row_labels[i]` x `col_labels[j]`.
    pub cells: Vec<Vec<f64>>,
}

impl PivotTable {
    /// Build a pivot from `(row, col, value)` triples. Duplicate pairs sum;
    /// absent pairs read as zero. Labels come out sorted.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String, f64)>,
    {
        let mut sums: BTreeMap<(String, String), f64> = BTreeMap::new();
        for (row, col, value) in pairs {
            *sums.entry((row, col)).or_insert(0.0) += value;
        }

        let mut row_labels: Vec<String> = sums.keys().map(|(r, _)| r.clone()).collect();
        row_labels.sort();
        row_labels.dedup();
        let mut col_labels: Vec<String> = sums.keys().map(|(_, c)| c.clone()).collect();
        col_labels.sort();
        col_labels.dedup();

        let cells = row_labels
            .iter()
            .map(|row| {
                col_labels
                    .iter()
                    .map(|col| {
                        sums.get(&(row.clone(), col.clone()))
                            .copied()
                            .unwrap_or(0.0)
                    })
                    .collect()
            })
            .collect();

        Self {
            row_labels,
            col_labels,
            cells,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bucket(day: u32, dimension: Option<&str>, value: f64) -> Bucket {
        Bucket {
            period_start: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            dimension: dimension.map(String::from),
            metrics: [("volume".to_string(), value)].into_iter().collect(),
        }
    }

    #[test]
    fn frame_from_buckets_keeps_order_and_columns() {
        let buckets = vec![bucket(1, Some("A"), 10.0), bucket(2, Some("B"), 20.0)];
        let frame = ChartFrame::from_buckets(&buckets, &["volume"]);

        assert_eq!(frame.columns, vec!["volume"]);
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(frame.rows[0].category.as_deref(), Some("A"));
        assert_eq!(frame.rows[0].values, vec![Some(10.0)]);
        assert_eq!(frame.rows[1].values, vec![Some(20.0)]);
    }

    #[test]
    fn missing_metric_becomes_none_cell() {
        let buckets = vec![bucket(1, None, 1.0)];
        let frame = ChartFrame::from_buckets(&buckets, &["volume", "absent"]);
        assert_eq!(frame.rows[0].values, vec![Some(1.0), None]);
    }

    #[test]
    fn with_series_appends_aligned_column() {
        let buckets = vec![bucket(1, None, 1.0), bucket(2, None, 2.0)];
        let frame = ChartFrame::from_buckets(&buckets, &["volume"])
            .with_defined_series("cumulative", vec![1.0, 3.0])
            .with_series("change_pct", vec![None, Some(100.0)]);

        assert_eq!(frame.columns, vec!["volume", "cumulative", "change_pct"]);
        assert_eq!(frame.rows[1].values, vec![Some(2.0), Some(3.0), Some(100.0)]);
    }

    #[test]
    #[should_panic(expected = "series/row length mismatch")]
    fn with_series_rejects_misaligned_input() {
        let buckets = vec![bucket(1, None, 1.0)];
        let _ = ChartFrame::from_buckets(&buckets, &["volume"]).with_series("bad", vec![]);
    }

    #[test]
    fn pivot_sums_duplicates_and_zero_fills() {
        let pivot = PivotTable::from_pairs(vec![
            ("osmosis".to_string(), "ethereum".to_string(), 10.0),
            ("osmosis".to_string(), "ethereum".to_string(), 5.0),
            ("polygon".to_string(), "fantom".to_string(), 2.0),
        ]);

        assert_eq!(pivot.row_labels, vec!["osmosis", "polygon"]);
        assert_eq!(pivot.col_labels, vec!["ethereum", "fantom"]);
        assert_eq!(pivot.cells[0], vec![15.0, 0.0]);
        assert_eq!(pivot.cells[1], vec![0.0, 2.0]);
    }

    #[test]
    fn empty_pivot() {
        let pivot = PivotTable::from_pairs(Vec::new());
        assert!(pivot.is_empty());
        assert!(pivot.cells.is_empty());
    }
}
