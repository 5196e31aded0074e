//! Dune Analytics result fetcher.
//!
//! Two saved queries back the dashboard: per-platform daily activity and
//! chain TVL. Both are read through the results endpoint
//! (`/api/v1/query/{id}/results`), which returns the latest materialized
//! rows without triggering an execution.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::http::fetch_json;
use crate::error::{AxlensError, Result};

/// Saved query: daily transactions and volume per platform.
pub const PLATFORM_QUERY_ID: u64 = 5_575_605;

/// Saved query: TVL per chain and token.
pub const TVL_QUERY_ID: u64 = 5_524_904;

const DEFAULT_BASE_URL: &str = "https://api.dune.com";

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    result: ResultsBody,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    rows: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPlatformRow {
    date: String,
    platform: String,
    num_txs: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct RawTvlRow {
    #[serde(rename = "Chain")]
    chain: String,
    #[serde(rename = "Token Symbol")]
    token_symbol: Option<String>,
    /// The saved query hands TVL back as either a number or a numeric
    /// string depending on the column type upstream.
    #[serde(rename = "TVL")]
    tvl: serde_json::Value,
}

// =============================================================================
// Output rows
// =============================================================================

/// One day of one platform's activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformRow {
    pub date: DateTime<Utc>,
    pub platform: String,
    pub num_txs: f64,
    pub volume: f64,
}

/// TVL for one chain/token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlRow {
    pub chain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    pub tvl: f64,
}

// =============================================================================
// Client
// =============================================================================

/// Read-only client for saved-query results.
pub struct DuneClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DuneClient {
    #[must_use]
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        }
    }

    /// Point at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn results_url(&self, query_id: u64) -> String {
        format!(
            "{}/api/v1/query/{query_id}/results?api_key={}",
            self.base_url, self.api_key
        )
    }

    /// Fetch the per-platform activity rows, ascending by date.
    ///
    /// Rows with an unparseable date are dropped with a warning rather than
    /// failing the whole result set.
    ///
    /// # Errors
    ///
    /// Returns `Http`/`Network`/`ParseResponse` from the underlying fetch.
    pub async fn platform_activity(&self) -> Result<Vec<PlatformRow>> {
        let url = self.results_url(PLATFORM_QUERY_ID);
        debug!(query_id = PLATFORM_QUERY_ID, "fetching platform activity");
        let envelope: ResultsEnvelope = fetch_json(&self.client, &url).await?;

        let mut rows = Vec::with_capacity(envelope.result.rows.len());
        for raw in envelope.result.rows {
            let Ok(parsed) = serde_json::from_value::<RawPlatformRow>(raw) else {
                warn!("skipping malformed platform row");
                continue;
            };
            let Some(date) = parse_date(&parsed.date) else {
                warn!(date = %parsed.date, "skipping platform row with bad date");
                continue;
            };
            rows.push(PlatformRow {
                date,
                platform: parsed.platform,
                num_txs: parsed.num_txs,
                volume: parsed.volume,
            });
        }
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    /// Fetch chain TVL rows, descending by TVL.
    ///
    /// # Errors
    ///
    /// Returns `Http`/`Network`/`ParseResponse` from the underlying fetch.
    pub async fn chain_tvl(&self) -> Result<Vec<TvlRow>> {
        let url = self.results_url(TVL_QUERY_ID);
        debug!(query_id = TVL_QUERY_ID, "fetching chain TVL");
        let envelope: ResultsEnvelope = fetch_json(&self.client, &url).await?;

        let mut rows = Vec::with_capacity(envelope.result.rows.len());
        for raw in envelope.result.rows {
            let parsed: RawTvlRow = serde_json::from_value(raw)
                .map_err(|e| AxlensError::ParseResponse(e.to_string()))?;
            let Some(tvl) = coerce_number(&parsed.tvl) else {
                warn!(chain = %parsed.chain, "skipping TVL row with non-numeric value");
                continue;
            };
            rows.push(TvlRow {
                chain: parsed.chain,
                token_symbol: parsed.token_symbol,
                tvl,
            });
        }
        rows.sort_by(|a, b| b.tvl.partial_cmp(&a.tvl).unwrap_or(std::cmp::Ordering::Equal));
        Ok(rows)
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn coerce_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
