//! Canonical warehouse query construction.
//!
//! The dashboard's pages each carried their own near-identical inline SQL,
//! differing only in filter predicates. This module is the single source of
//! truth: a structured [`QueryFilter`] plus a builder function produces one
//! canonical query, so two call sites asking for the same thing get
//! byte-identical SQL (and the same cache key).
//!
//! Aggregation deliberately does *not* happen in SQL. The builders select
//! row-level events; bucketing, window math, and ratios run in Rust via
//! [`crate::core::bucket`] and [`crate::core::series`], which keeps one
//! authoritative definition per metric instead of per-page variants.

use crate::core::bucket::{DateRange, Granularity};
use crate::core::model::ServiceKind;

/// SQL dialect a query engine speaks.
///
/// The hosted warehouse gets the full semi-structured query over the raw
/// fact tables; a local SQLite mirror stores the already-flattened event
/// view and gets plain SQL over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Warehouse,
    SqliteMirror,
}

/// Structured filter over the unified interchain-event view.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub range: DateRange,
    /// Event status filter; default `executed`.
    pub statuses: Vec<String>,
    /// Simplified-status filter; default `received`.
    pub simplified_statuses: Vec<String>,
    /// Source-chain allow-list; empty means all chains.
    pub source_chains: Vec<String>,
    /// Which services to include; default both.
    pub services: Vec<ServiceKind>,
}

impl QueryFilter {
    /// Filter with the canonical defaults: executed + received, both
    /// services, all chains.
    #[must_use]
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            statuses: vec!["executed".to_string()],
            simplified_statuses: vec!["received".to_string()],
            source_chains: Vec::new(),
            services: vec![ServiceKind::TokenTransfer, ServiceKind::Gmp],
        }
    }

    /// Restrict to an allow-list of source chains (lowercased).
    #[must_use]
    pub fn with_source_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_chains = chains
            .into_iter()
            .map(|c| c.into().to_lowercase())
            .collect();
        self
    }

    /// Restrict to a single service kind.
    #[must_use]
    pub fn with_services(mut self, services: Vec<ServiceKind>) -> Self {
        self.services = services;
        self
    }
}

/// Escape a string literal for embedding in SQL (doubling single quotes).
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a quoted, comma-separated IN list.
fn in_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", escape_literal(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shared predicate block for one leg of the unified view.
fn leg_predicates(filter: &QueryFilter, timestamp_col: &str) -> String {
    let mut predicates = vec![
        format!("{timestamp_col}::date >= '{}'", filter.range.start()),
        format!("{timestamp_col}::date <= '{}'", filter.range.end()),
    ];
    if !filter.statuses.is_empty() {
        predicates.push(format!("status IN ({})", in_list(&filter.statuses)));
    }
    if !filter.simplified_statuses.is_empty() {
        predicates.push(format!(
            "simplified_status IN ({})",
            in_list(&filter.simplified_statuses)
        ));
    }
    predicates.join("\n      AND ")
}

/// Canonical row-level query over the transfers ∪ GMP union.
///
/// Emits one row per executed event with columns `created_at`,
/// `source_chain`, `destination_chain`, `user_address`, `amount_usd`,
/// `fee_usd`, `event_id`, `service`. The acting address is the recipient
/// for token transfers and the call transaction sender for GMP — the one
/// authoritative definition used by every user metric.
#[must_use]
pub fn service_events_sql(filter: &QueryFilter) -> String {
    let mut legs = Vec::new();

    if filter.services.contains(&ServiceKind::TokenTransfer) {
        legs.push(format!(
            "    SELECT created_at,\n           \
             LOWER(data:send:original_source_chain) AS source_chain,\n           \
             LOWER(data:send:original_destination_chain) AS destination_chain,\n           \
             recipient_address AS user_address,\n           \
             data:send:amount * data:link:price AS amount_usd,\n           \
             data:send:fee_value AS fee_usd,\n           \
             id AS event_id,\n           \
             'Token Transfers' AS service\n    \
             FROM axelar.axelscan.fact_transfers\n    \
             WHERE {}",
            leg_predicates(filter, "created_at")
        ));
    }

    if filter.services.contains(&ServiceKind::Gmp) {
        legs.push(format!(
            "    SELECT created_at,\n           \
             TO_VARCHAR(LOWER(data:call:chain)) AS source_chain,\n           \
             TO_VARCHAR(LOWER(data:call:returnValues:destinationChain)) AS destination_chain,\n           \
             TO_VARCHAR(data:call:transaction:from) AS user_address,\n           \
             data:value AS amount_usd,\n           \
             COALESCE(\n               \
             ((data:gas:gas_used_amount) * (data:gas_price_rate:source_token.token_price.usd)),\n               \
             TRY_CAST(data:fees:express_fee_usd::float AS FLOAT)\n           \
             ) AS fee_usd,\n           \
             TO_VARCHAR(id) AS event_id,\n           \
             'GMP' AS service\n    \
             FROM axelar.axelscan.fact_gmp\n    \
             WHERE {}",
            leg_predicates(filter, "created_at")
        ));
    }

    let union = legs.join("\n\n    UNION ALL\n\n");

    let chain_filter = if filter.source_chains.is_empty() {
        String::new()
    } else {
        format!(
            "\nWHERE source_chain IN ({})",
            in_list(&filter.source_chains)
        )
    };

    format!(
        "WITH axelar_service AS (\n{union}\n)\nSELECT created_at,\n       source_chain,\n       \
         destination_chain,\n       user_address,\n       amount_usd,\n       fee_usd,\n       \
         event_id,\n       service\nFROM axelar_service{chain_filter}\nORDER BY created_at"
    )
}

/// Mirror variant of [`service_events_sql`]: the local SQLite mirror stores
/// the flattened canonical view as a `service_events` table (executed +
/// received rows only), so only the range, chain, and service predicates
/// apply.
#[must_use]
pub fn mirror_events_sql(filter: &QueryFilter) -> String {
    let mut predicates = vec![
        format!("date(created_at) >= '{}'", filter.range.start()),
        format!("date(created_at) <= '{}'", filter.range.end()),
    ];
    if !filter.source_chains.is_empty() {
        predicates.push(format!(
            "source_chain IN ({})",
            in_list(&filter.source_chains)
        ));
    }
    if filter.services.len() == 1 {
        predicates.push(format!(
            "service = '{}'",
            escape_literal(filter.services[0].label())
        ));
    }

    format!(
        "SELECT created_at,\n       source_chain,\n       destination_chain,\n       \
         user_address,\n       amount_usd,\n       fee_usd,\n       event_id,\n       service\n\
         FROM service_events\nWHERE {}\nORDER BY created_at",
        predicates.join("\n  AND ")
    )
}

/// Dialect-dispatching entry point for the canonical event query.
#[must_use]
pub fn events_sql(filter: &QueryFilter, dialect: SqlDialect) -> String {
    match dialect {
        SqlDialect::Warehouse => service_events_sql(filter),
        SqlDialect::SqliteMirror => mirror_events_sql(filter),
    }
}

/// Raw transaction query (overview page): one row per transaction with its
/// success flag, bucketed in Rust.
#[must_use]
pub fn transaction_rows_sql(range: &DateRange, dialect: SqlDialect) -> String {
    match dialect {
        SqlDialect::Warehouse => format!(
            "SELECT block_timestamp,\n       tx_id,\n       tx_succeeded\n\
             FROM axelar.core.fact_transactions\n\
             WHERE block_timestamp::date >= '{}'\n  AND block_timestamp::date <= '{}'\n\
             ORDER BY block_timestamp",
            range.start(),
            range.end()
        ),
        SqlDialect::SqliteMirror => format!(
            "SELECT block_timestamp,\n       tx_id,\n       tx_succeeded\n\
             FROM fact_transactions\n\
             WHERE date(block_timestamp) >= '{}'\n  AND date(block_timestamp) <= '{}'\n\
             ORDER BY block_timestamp",
            range.start(),
            range.end()
        ),
    }
}

/// Debug helper: the `date_trunc` spelling a warehouse-side consumer of the
/// same bucketing would use. Kept so logged queries and Rust buckets can be
/// eyeballed against each other.
#[must_use]
pub fn date_trunc_expr(granularity: Granularity, column: &str) -> String {
    format!("date_trunc('{}', {column})", granularity.as_str())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn identical_filters_produce_identical_sql() {
        let a = service_events_sql(&QueryFilter::new(range()));
        let b = service_events_sql(&QueryFilter::new(range()));
        assert_eq!(a, b);
    }

    #[test]
    fn default_filter_includes_both_services() {
        let sql = service_events_sql(&QueryFilter::new(range()));
        assert!(sql.contains("fact_transfers"));
        assert!(sql.contains("fact_gmp"));
        assert!(sql.contains("UNION ALL"));
    }

    #[test]
    fn default_filter_pins_status_predicates() {
        let sql = service_events_sql(&QueryFilter::new(range()));
        assert!(sql.contains("status IN ('executed')"));
        assert!(sql.contains("simplified_status IN ('received')"));
        assert!(sql.contains("created_at::date >= '2023-01-01'"));
        assert!(sql.contains("created_at::date <= '2025-07-31'"));
    }

    #[test]
    fn single_service_drops_the_other_leg() {
        let filter = QueryFilter::new(range()).with_services(vec![ServiceKind::Gmp]);
        let sql = service_events_sql(&filter);
        assert!(sql.contains("fact_gmp"));
        assert!(!sql.contains("fact_transfers"));
        assert!(!sql.contains("UNION ALL"));
    }

    #[test]
    fn chain_allow_list_becomes_in_clause() {
        let filter = QueryFilter::new(range()).with_source_chains(["Ethereum", "polygon"]);
        let sql = service_events_sql(&filter);
        assert!(sql.contains("source_chain IN ('ethereum', 'polygon')"));
    }

    #[test]
    fn empty_allow_list_means_no_chain_filter() {
        let sql = service_events_sql(&QueryFilter::new(range()));
        assert!(!sql.contains("source_chain IN"));
    }

    #[test]
    fn literals_are_escaped() {
        let mut filter = QueryFilter::new(range());
        filter.statuses = vec!["exec'uted".to_string()];
        let sql = service_events_sql(&filter);
        assert!(sql.contains("'exec''uted'"));
    }

    #[test]
    fn transaction_rows_sql_carries_range() {
        let sql = transaction_rows_sql(&range(), SqlDialect::Warehouse);
        assert!(sql.contains("fact_transactions"));
        assert!(sql.contains("block_timestamp::date >= '2023-01-01'"));
        assert!(sql.contains("block_timestamp::date <= '2025-07-31'"));
    }

    #[test]
    fn mirror_events_sql_is_plain_sqlite() {
        let filter = QueryFilter::new(range())
            .with_source_chains(["ethereum"])
            .with_services(vec![ServiceKind::Gmp]);
        let sql = events_sql(&filter, SqlDialect::SqliteMirror);
        assert!(sql.contains("FROM service_events"));
        assert!(sql.contains("date(created_at) >= '2023-01-01'"));
        assert!(sql.contains("source_chain IN ('ethereum')"));
        assert!(sql.contains("service = 'GMP'"));
        assert!(!sql.contains("::date"));
        assert!(!sql.contains("UNION ALL"));
    }

    #[test]
    fn mirror_transaction_sql_uses_unqualified_table() {
        let sql = transaction_rows_sql(&range(), SqlDialect::SqliteMirror);
        assert!(sql.contains("FROM fact_transactions"));
        assert!(sql.contains("date(block_timestamp) >= '2023-01-01'"));
    }

    #[test]
    fn date_trunc_expr_spelling() {
        use crate::core::bucket::Granularity;
        assert_eq!(
            date_trunc_expr(Granularity::Week, "created_at"),
            "date_trunc('week', created_at)"
        );
    }
}
