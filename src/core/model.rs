//! Core data model for calendar-bucket aggregation.
//!
//! `Record`s are ephemeral query results, created fresh per request and
//! never persisted. `Bucket`s are derived from them and live only for the
//! duration of one render cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Metric values
// =============================================================================

/// A single metric observation carried by a [`Record`].
///
/// Numeric values feed sum/average aggregation. Text values exist so
/// count-distinct can run over identifiers (tx ids, addresses); attempting
/// to sum or average a text value is a data-shape error naming the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// The numeric value, if this observation is numeric.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Lossless display form, used in conversion error messages.
    #[must_use]
    pub fn display_value(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        Self::Number(value as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// =============================================================================
// Record
// =============================================================================

/// A timestamped observation with an optional categorical dimension and a
/// mapping of metric name to value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// When the observation happened (UTC).
    pub timestamp: DateTime<Utc>,

    /// Optional category label (e.g., platform, source chain, service).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,

    /// Metric name -> observed value.
    pub metrics: BTreeMap<String, MetricValue>,
}

impl Record {
    /// Create a record with no dimension and no metrics.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            dimension: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Attach a dimension label.
    #[must_use]
    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    /// Attach a metric observation.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }
}

// =============================================================================
// Bucket
// =============================================================================

/// Aggregated metrics for one `(period_start, dimension)` pair.
///
/// `period_start` is aligned to the bucket boundary for the granularity
/// that produced it: UTC midnight for day buckets, the ISO week's Monday
/// for week buckets, the first calendar day for month buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub period_start: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,

    /// Aggregated metric name -> numeric value.
    pub metrics: BTreeMap<String, f64>,
}

impl Bucket {
    /// Look up an aggregated metric by name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

// =============================================================================
// Transfer events
// =============================================================================

/// Which interchain service produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Plain token transfer (Satellite-style).
    TokenTransfer,
    /// General message passing call (Squid-style).
    Gmp,
}

impl ServiceKind {
    /// Display label matching the warehouse `service` column.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TokenTransfer => "Token Transfers",
            Self::Gmp => "GMP",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One executed interchain event from the unified transfers ∪ GMP view.
///
/// Optional fields reflect the source data: GMP rows occasionally lack a
/// resolvable fee or amount, and some bridged rows carry no chain labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub created_at: DateTime<Utc>,
    pub id: String,
    pub service: ServiceKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_chain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<String>,

    /// Acting address: recipient for token transfers, call sender for GMP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// USD amount, when the source data resolved a price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// USD fee, when the source data resolved one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
}
