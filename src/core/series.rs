//! Derived series over bucketed data.
//!
//! All functions take an aggregated bucket slice (ordered ascending by
//! `period_start`, as produced by [`crate::core::bucket::aggregate`]) and
//! return a vector aligned index-for-index with the input. Series are
//! partitioned by dimension internally, mirroring the warehouse window
//! functions they replace (`PARTITION BY dimension ORDER BY date`).
//!
//! Undefined ratios are `None`, never 0.0, infinity, or NaN.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::core::model::Bucket;
use crate::error::{AxlensError, Result};

/// Pull one metric out of every bucket, erroring on the first bucket that
/// lacks it. Derived series never partially compute.
fn metric_values(buckets: &[Bucket], metric: &str) -> Result<Vec<f64>> {
    buckets
        .iter()
        .map(|b| {
            b.metric(metric).ok_or_else(|| AxlensError::MissingField {
                field: metric.to_string(),
            })
        })
        .collect()
}

/// Running total of a metric, per dimension, up to and including each bucket.
///
/// # Errors
///
/// Returns `MissingField` if any bucket lacks the metric.
pub fn cumulative_sum(buckets: &[Bucket], metric: &str) -> Result<Vec<f64>> {
    let values = metric_values(buckets, metric)?;
    let mut running: HashMap<Option<&str>, f64> = HashMap::new();

    Ok(buckets
        .iter()
        .zip(values)
        .map(|(bucket, value)| {
            let total = running.entry(bucket.dimension.as_deref()).or_insert(0.0);
            *total += value;
            *total
        })
        .collect())
}

/// Trailing rolling average: mean over the current bucket and up to
/// `preceding` earlier buckets of the same dimension.
///
/// The window is shorter at the series start (no padding), so the first
/// bucket's rolling average equals its own value.
///
/// # Errors
///
/// Returns `MissingField` if any bucket lacks the metric.
pub fn rolling_average(buckets: &[Bucket], metric: &str, preceding: usize) -> Result<Vec<f64>> {
    let values = metric_values(buckets, metric)?;
    let mut windows: HashMap<Option<&str>, VecDeque<f64>> = HashMap::new();

    Ok(buckets
        .iter()
        .zip(values)
        .map(|(bucket, value)| {
            let window = windows.entry(bucket.dimension.as_deref()).or_default();
            window.push_back(value);
            if window.len() > preceding + 1 {
                window.pop_front();
            }
            #[allow(clippy::cast_precision_loss)]
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            mean
        })
        .collect())
}

/// Period-over-period percent change for the same dimension:
/// `(current - previous) / previous * 100`.
///
/// `None` when the dimension has no earlier bucket or the previous value
/// is zero.
///
/// # Errors
///
/// Returns `MissingField` if any bucket lacks the metric.
pub fn percent_change(buckets: &[Bucket], metric: &str) -> Result<Vec<Option<f64>>> {
    let values = metric_values(buckets, metric)?;
    let mut previous: HashMap<Option<&str>, f64> = HashMap::new();

    Ok(buckets
        .iter()
        .zip(values)
        .map(|(bucket, value)| {
            let prior = previous.insert(bucket.dimension.as_deref(), value);
            match prior {
                Some(prev) if prev != 0.0 => Some((value - prev) / prev * 100.0),
                _ => None,
            }
        })
        .collect())
}

/// Normalized share of the period total: each bucket's value divided by
/// the sum across all dimensions sharing its `period_start`.
///
/// `None` for every bucket of a period whose total is zero — the share is
/// undefined there and must not be coerced to a number.
///
/// # Errors
///
/// Returns `MissingField` if any bucket lacks the metric.
pub fn share_of_total(buckets: &[Bucket], metric: &str) -> Result<Vec<Option<f64>>> {
    let values = metric_values(buckets, metric)?;

    let mut totals: HashMap<DateTime<Utc>, f64> = HashMap::new();
    for (bucket, value) in buckets.iter().zip(&values) {
        *totals.entry(bucket.period_start).or_insert(0.0) += value;
    }

    Ok(buckets
        .iter()
        .zip(values)
        .map(|(bucket, value)| {
            let total = totals.get(&bucket.period_start).copied().unwrap_or(0.0);
            if total == 0.0 {
                None
            } else {
                Some(value / total)
            }
        })
        .collect())
}

// =============================================================================
// Tests
// =============================================================================
