//! Calendar-bucket aggregation.
//!
//! Groups timestamped records into day/week/month buckets, applies one
//! aggregation op per metric, and returns buckets ordered by
//! `(period_start, dimension)`. This is a pure in-memory transformation:
//! no retries, no cross-call state, safe to call from concurrent requests.
//!
//! Zero-fill policy is sparse: a `(period, dimension)` pair with no records
//! produces no row. Consumers computing shares or stacked series must treat
//! a missing pair as absent, not zero.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::model::{Bucket, MetricValue, Record};
use crate::error::{AxlensError, Result};

// =============================================================================
// Granularity
// =============================================================================

/// Calendar bucket granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Parse from CLI argument or config value (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Some(Self::Day),
            "week" | "weekly" => Some(Self::Week),
            "month" | "monthly" => Some(Self::Month),
            _ => None,
        }
    }

    /// Canonical lowercase name, as used in warehouse `date_trunc` calls.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Align a timestamp to the start of its bucket.
    ///
    /// Day buckets align to UTC midnight; week buckets to the ISO week
    /// start (Monday); month buckets to the first calendar day. Truncation
    /// is deterministic: equal inputs always land in the same bucket.
    #[must_use]
    pub fn truncate(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let aligned = match self {
            Self::Day => date,
            Self::Week => {
                let back = u64::from(date.weekday().num_days_from_monday());
                date - chrono::Days::new(back)
            }
            Self::Month => {
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
            }
        };
        aligned.and_time(NaiveTime::MIN).and_utc()
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Date range
// =============================================================================

/// Closed date range `[start, end]`, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, failing fast when `start > end`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` when the range is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AxlensError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Inclusive range start.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Inclusive range end.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether a date falls inside the closed range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// =============================================================================
// Aggregation ops
// =============================================================================

/// How a metric is aggregated within a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    /// Sum of numeric values.
    Sum,
    /// Count of distinct values (numeric or text).
    CountDistinct,
    /// Arithmetic mean of numeric values.
    Average,
}

/// One metric to aggregate: the record field it reads and the op applied.
/// The output bucket carries the aggregate under the same field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub field: String,
    pub op: AggregateOp,
}

impl MetricSpec {
    #[must_use]
    pub fn sum(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: AggregateOp::Sum,
        }
    }

    #[must_use]
    pub fn count_distinct(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: AggregateOp::CountDistinct,
        }
    }

    #[must_use]
    pub fn average(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: AggregateOp::Average,
        }
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Distinct-count key: text values hash as-is, numbers by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DistinctKey {
    Bits(u64),
    Text(String),
}

impl DistinctKey {
    fn from_value(value: &MetricValue) -> Self {
        match value {
            MetricValue::Number(n) => Self::Bits(n.to_bits()),
            MetricValue::Text(t) => Self::Text(t.clone()),
        }
    }
}

/// Per-metric accumulator state within one bucket.
enum MetricAcc {
    Sum(f64),
    Average { sum: f64, count: u64 },
    Distinct(HashSet<DistinctKey>),
}

impl MetricAcc {
    fn new(op: AggregateOp) -> Self {
        match op {
            AggregateOp::Sum => Self::Sum(0.0),
            AggregateOp::Average => Self::Average { sum: 0.0, count: 0 },
            AggregateOp::CountDistinct => Self::Distinct(HashSet::new()),
        }
    }

    fn observe(&mut self, field: &str, value: &MetricValue) -> Result<()> {
        match self {
            Self::Sum(total) => {
                *total += require_number(field, value)?;
            }
            Self::Average { sum, count } => {
                *sum += require_number(field, value)?;
                *count += 1;
            }
            Self::Distinct(seen) => {
                seen.insert(DistinctKey::from_value(value));
            }
        }
        Ok(())
    }

    fn finish(self) -> f64 {
        match self {
            Self::Sum(total) => total,
            #[allow(clippy::cast_precision_loss)]
            Self::Average { sum, count } => {
                // A bucket only exists because at least one record landed in it.
                sum / (count.max(1) as f64)
            }
            #[allow(clippy::cast_precision_loss)]
            Self::Distinct(seen) => seen.len() as f64,
        }
    }
}

fn require_number(field: &str, value: &MetricValue) -> Result<f64> {
    value
        .as_number()
        .ok_or_else(|| AxlensError::DataConversion {
            field: field.to_string(),
            value: value.display_value(),
        })
}

/// Group records into calendar buckets and aggregate the requested metrics.
///
/// Records strictly outside `[range.start, range.end]` (by UTC date) are
/// excluded before bucketing. Output is sorted ascending by
/// `(period_start, dimension)`, one row per pair present in the filtered
/// input. Empty input produces empty output.
///
/// The call is all-or-nothing: a record missing a requested metric field,
/// or carrying a non-numeric value for a sum/average metric, fails the
/// whole aggregation rather than producing a partial result.
///
/// # Errors
///
/// - `MissingField` when a filtered record lacks a requested metric.
/// - `DataConversion` when sum/average hits a non-numeric value.
pub fn aggregate(
    records: &[Record],
    granularity: Granularity,
    range: &DateRange,
    metrics: &[MetricSpec],
) -> Result<Vec<Bucket>> {
    let mut groups: BTreeMap<(DateTime<Utc>, Option<String>), Vec<MetricAcc>> = BTreeMap::new();

    for record in records {
        if !range.contains(record.timestamp.date_naive()) {
            continue;
        }

        let key = (
            granularity.truncate(record.timestamp),
            record.dimension.clone(),
        );
        let accs = groups
            .entry(key)
            .or_insert_with(|| metrics.iter().map(|m| MetricAcc::new(m.op)).collect());

        for (spec, acc) in metrics.iter().zip(accs.iter_mut()) {
            let value =
                record
                    .metrics
                    .get(&spec.field)
                    .ok_or_else(|| AxlensError::MissingField {
                        field: spec.field.clone(),
                    })?;
            acc.observe(&spec.field, value)?;
        }
    }

    // BTreeMap iteration yields (period_start, dimension) in ascending order,
    // with dimensionless buckets before labeled ones.
    Ok(groups
        .into_iter()
        .map(|((period_start, dimension), accs)| Bucket {
            period_start,
            dimension,
            metrics: metrics
                .iter()
                .zip(accs)
                .map(|(spec, acc)| (spec.field.clone(), acc.finish()))
                .collect(),
        })
        .collect())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn day_truncation_hits_midnight() {
        let aligned = Granularity::Day.truncate(ts(2024, 3, 15, 17));
        assert_eq!(aligned, ts(2024, 3, 15, 0));
    }

    #[test]
    fn week_truncation_hits_iso_monday() {
        // 2024-03-15 is a Friday; the ISO week starts Monday 2024-03-11.
        let aligned = Granularity::Week.truncate(ts(2024, 3, 15, 9));
        assert_eq!(aligned, ts(2024, 3, 11, 0));

        // A Monday truncates to itself.
        let aligned = Granularity::Week.truncate(ts(2024, 3, 11, 23));
        assert_eq!(aligned, ts(2024, 3, 11, 0));
    }

    #[test]
    fn month_truncation_hits_first_day() {
        let aligned = Granularity::Month.truncate(ts(2024, 2, 29, 12));
        assert_eq!(aligned, ts(2024, 2, 1, 0));
    }

    #[test]
    fn granularity_from_arg() {
        assert_eq!(Granularity::from_arg("DAY"), Some(Granularity::Day));
        assert_eq!(Granularity::from_arg("weekly"), Some(Granularity::Week));
        assert_eq!(Granularity::from_arg("month"), Some(Granularity::Month));
        assert_eq!(Granularity::from_arg("fortnight"), None);
    }

    #[test]
    fn inverted_range_fails_fast() {
        let err = DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, AxlensError::InvalidDateRange { .. }));
    }

    #[test]
    fn single_day_range_is_valid() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap();
        assert!(range.contains(date(2024, 1, 1)));
        assert!(!range.contains(date(2024, 1, 2)));
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        let buckets = aggregate(&[], Granularity::Day, &range, &[MetricSpec::sum("v")]).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn records_outside_range_are_excluded() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let records = vec![
            Record::new(ts(2023, 12, 31, 23)).with_metric("v", 1.0),
            Record::new(ts(2024, 1, 15, 0)).with_metric("v", 2.0),
            Record::new(ts(2024, 2, 1, 0)).with_metric("v", 4.0),
        ];

        let buckets =
            aggregate(&records, Granularity::Month, &range, &[MetricSpec::sum("v")]).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].metric("v"), Some(2.0));
    }

    #[test]
    fn sum_partitions_by_dimension() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        let records = vec![
            Record::new(ts(2024, 1, 1, 1)).with_dimension("A").with_metric("v", 10.0),
            Record::new(ts(2024, 1, 2, 1)).with_dimension("A").with_metric("v", 20.0),
            Record::new(ts(2024, 1, 1, 1)).with_dimension("B").with_metric("v", 5.0),
        ];

        let buckets =
            aggregate(&records, Granularity::Week, &range, &[MetricSpec::sum("v")]).unwrap();
        // 2024-01-01 is a Monday: one week bucket per dimension.
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].dimension.as_deref(), Some("A"));
        assert_eq!(buckets[0].metric("v"), Some(30.0));
        assert_eq!(buckets[1].dimension.as_deref(), Some("B"));
        assert_eq!(buckets[1].metric("v"), Some(5.0));
    }

    #[test]
    fn count_distinct_over_text_ids() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let records = vec![
            Record::new(ts(2024, 1, 1, 1)).with_metric("user", "0xaaa"),
            Record::new(ts(2024, 1, 2, 1)).with_metric("user", "0xaaa"),
            Record::new(ts(2024, 1, 3, 1)).with_metric("user", "0xbbb"),
        ];

        let buckets = aggregate(
            &records,
            Granularity::Month,
            &range,
            &[MetricSpec::count_distinct("user")],
        )
        .unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].metric("user"), Some(2.0));
    }

    #[test]
    fn average_within_bucket() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let records = vec![
            Record::new(ts(2024, 1, 1, 1)).with_metric("fee", 2.0),
            Record::new(ts(2024, 1, 2, 1)).with_metric("fee", 4.0),
        ];

        let buckets = aggregate(
            &records,
            Granularity::Month,
            &range,
            &[MetricSpec::average("fee")],
        )
        .unwrap();
        assert_eq!(buckets[0].metric("fee"), Some(3.0));
    }

    #[test]
    fn sum_over_text_value_is_conversion_error() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let records = vec![Record::new(ts(2024, 1, 1, 1)).with_metric("v", "oops")];

        let err =
            aggregate(&records, Granularity::Day, &range, &[MetricSpec::sum("v")]).unwrap_err();
        match err {
            AxlensError::DataConversion { field, value } => {
                assert_eq!(field, "v");
                assert_eq!(value, "oops");
            }
            other => panic!("expected DataConversion, got {other:?}"),
        }
    }

    #[test]
    fn missing_metric_field_fails_whole_call() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let records = vec![
            Record::new(ts(2024, 1, 1, 1)).with_metric("v", 1.0),
            Record::new(ts(2024, 1, 2, 1)),
        ];

        let err =
            aggregate(&records, Granularity::Day, &range, &[MetricSpec::sum("v")]).unwrap_err();
        assert!(matches!(err, AxlensError::MissingField { field } if field == "v"));
    }

    #[test]
    fn buckets_sorted_by_period_then_dimension() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();
        let records = vec![
            Record::new(ts(2024, 2, 5, 1)).with_dimension("B").with_metric("v", 1.0),
            Record::new(ts(2024, 1, 5, 1)).with_dimension("B").with_metric("v", 1.0),
            Record::new(ts(2024, 2, 5, 1)).with_dimension("A").with_metric("v", 1.0),
        ];

        let buckets =
            aggregate(&records, Granularity::Month, &range, &[MetricSpec::sum("v")]).unwrap();
        let keys: Vec<_> = buckets
            .iter()
            .map(|b| (b.period_start, b.dimension.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (ts(2024, 1, 1, 0), Some("B".to_string())),
                (ts(2024, 2, 1, 0), Some("A".to_string())),
                (ts(2024, 2, 1, 0), Some("B".to_string())),
            ]
        );
    }

    #[test]
    fn coarser_granularity_never_increases_bucket_count() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();
        let mut records = Vec::new();
        for day in [1, 3, 9, 15, 28] {
            records.push(Record::new(ts(2024, 1, day, 6)).with_metric("v", 1.0));
            records.push(Record::new(ts(2024, 2, day, 6)).with_metric("v", 1.0));
        }

        let spec = [MetricSpec::sum("v")];
        let days = aggregate(&records, Granularity::Day, &range, &spec).unwrap();
        let weeks = aggregate(&records, Granularity::Week, &range, &spec).unwrap();
        let months = aggregate(&records, Granularity::Month, &range, &spec).unwrap();

        assert!(weeks.len() <= days.len());
        assert!(months.len() <= weeks.len());
    }

    #[test]
    fn bucket_sums_conserve_input_total() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 2, 28)).unwrap();
        let records = vec![
            Record::new(ts(2024, 1, 1, 1)).with_dimension("A").with_metric("v", 10.0),
            Record::new(ts(2024, 1, 20, 1)).with_dimension("A").with_metric("v", 7.5),
            Record::new(ts(2024, 2, 3, 1)).with_dimension("B").with_metric("v", 2.5),
        ];

        for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
            let buckets = aggregate(&records, granularity, &range, &[MetricSpec::sum("v")]).unwrap();
            let total: f64 = buckets.iter().filter_map(|b| b.metric("v")).sum();
            assert!((total - 20.0).abs() < 1e-9, "{granularity} total {total}");
        }
    }
}
