//! User-activity metrics over interchain events.
//!
//! All definitions here are the canonical ones: a user is the acting
//! address of an executed event (recipient for token transfers, call
//! sender for GMP), a new user is one whose first-ever event falls in the
//! bucket, and stickiness is average daily actives over monthly actives.
//! Every command that reports these numbers goes through this module, so
//! two views can never disagree on what "active" means.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::core::bucket::{aggregate, DateRange, Granularity, MetricSpec};
use crate::core::model::{Record, TransferEvent};
use crate::core::series::{percent_change, rolling_average};
use crate::error::Result;

// =============================================================================
// User activity
// =============================================================================

/// One bucket of the user-activity breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivityRow {
    pub period_start: DateTime<Utc>,
    /// Distinct acting addresses in the bucket.
    pub active_users: f64,
    /// Addresses whose first-ever event falls in the bucket.
    pub new_users: f64,
    /// Active minus new.
    pub recurring_users: f64,
    /// Running total of new users.
    pub cumulative_new_users: f64,
    /// Trailing mean of actives over the current and 6 preceding buckets.
    pub avg_7: f64,
    /// Trailing mean of actives over the current and 29 preceding buckets.
    pub avg_30: f64,
    /// Period-over-period change of actives; `None` without a nonzero
    /// predecessor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
    /// New users as a fraction of actives; `None` when the bucket is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_share: Option<f64>,
    /// Recurring users as a fraction of actives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_share: Option<f64>,
}

/// Compute the active/new/recurring breakdown per bucket.
///
/// First-seen classification runs over *all* supplied events, then the
/// output is filtered to `range` — an address that first acted before the
/// range start counts as recurring inside it, not new.
///
/// # Errors
///
/// Propagates aggregation failures (inverted range, malformed events).
pub fn user_activity(
    events: &[TransferEvent],
    granularity: Granularity,
    range: &DateRange,
) -> Result<Vec<UserActivityRow>> {
    let mut first_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for event in events {
        if let Some(user) = event.user.as_deref() {
            first_seen
                .entry(user)
                .and_modify(|ts| {
                    if event.created_at < *ts {
                        *ts = event.created_at;
                    }
                })
                .or_insert(event.created_at);
        }
    }

    // Active users per bucket, inside the requested range.
    let records: Vec<Record> = events
        .iter()
        .filter_map(|e| {
            e.user
                .as_deref()
                .map(|u| Record::new(e.created_at).with_metric("user", u))
        })
        .collect();
    let active = aggregate(
        &records,
        granularity,
        range,
        &[MetricSpec::count_distinct("user")],
    )?;

    // New users per bucket, keyed by each address's first-ever event.
    let mut new_by_bucket: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for ts in first_seen.values() {
        if range.contains(ts.date_naive()) {
            *new_by_bucket.entry(granularity.truncate(*ts)).or_insert(0.0) += 1.0;
        }
    }

    let avg7 = rolling_average(&active, "user", 6)?;
    let avg30 = rolling_average(&active, "user", 29)?;
    let change = percent_change(&active, "user")?;

    let mut cumulative_new = 0.0;
    let rows = active
        .iter()
        .enumerate()
        .map(|(i, bucket)| {
            let active_users = bucket.metric("user").unwrap_or(0.0);
            let new_users = new_by_bucket
                .get(&bucket.period_start)
                .copied()
                .unwrap_or(0.0);
            let recurring_users = active_users - new_users;
            cumulative_new += new_users;

            let (new_share, recurring_share) = if active_users > 0.0 {
                (
                    Some(new_users / active_users),
                    Some(recurring_users / active_users),
                )
            } else {
                (None, None)
            };

            UserActivityRow {
                period_start: bucket.period_start,
                active_users,
                new_users,
                recurring_users,
                cumulative_new_users: cumulative_new,
                avg_7: avg7[i],
                avg_30: avg30[i],
                change_pct: change[i],
                new_share,
                recurring_share,
            }
        })
        .collect();

    Ok(rows)
}

// =============================================================================
// Stickiness
// =============================================================================

/// One month of the stickiness series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StickinessRow {
    pub month_start: DateTime<Utc>,
    /// Distinct actives in the month.
    pub mau: f64,
    /// Mean of the month's daily distinct actives, over days with activity.
    pub avg_dau: f64,
    /// `avg_dau / mau * 100`; `None` when the month has no actives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stickiness_pct: Option<f64>,
}

/// Monthly stickiness: average DAU as a percentage of MAU.
///
/// # Errors
///
/// Propagates aggregation failures.
pub fn stickiness(events: &[TransferEvent], range: &DateRange) -> Result<Vec<StickinessRow>> {
    let records: Vec<Record> = events
        .iter()
        .filter_map(|e| {
            e.user
                .as_deref()
                .map(|u| Record::new(e.created_at).with_metric("user", u))
        })
        .collect();

    let daily = aggregate(
        &records,
        Granularity::Day,
        range,
        &[MetricSpec::count_distinct("user")],
    )?;

    // DAU series grouped into months.
    let mut dau_by_month: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    for bucket in &daily {
        dau_by_month
            .entry(Granularity::Month.truncate(bucket.period_start))
            .or_default()
            .push(bucket.metric("user").unwrap_or(0.0));
    }

    // MAU needs distinct addresses over the whole month, not a sum of DAUs.
    let mut users_by_month: HashMap<DateTime<Utc>, HashSet<&str>> = HashMap::new();
    for event in events {
        let Some(user) = event.user.as_deref() else {
            continue;
        };
        if range.contains(event.created_at.date_naive()) {
            users_by_month
                .entry(Granularity::Month.truncate(event.created_at))
                .or_default()
                .insert(user);
        }
    }

    let rows = dau_by_month
        .into_iter()
        .map(|(month_start, daus)| {
            #[allow(clippy::cast_precision_loss)]
            let avg_dau = daus.iter().sum::<f64>() / daus.len() as f64;
            #[allow(clippy::cast_precision_loss)]
            let mau = users_by_month
                .get(&month_start)
                .map_or(0.0, |users| users.len() as f64);
            let stickiness_pct = if mau > 0.0 {
                Some(avg_dau / mau * 100.0)
            } else {
                None
            };
            StickinessRow {
                month_start,
                mau,
                avg_dau,
                stickiness_pct,
            }
        })
        .collect();

    Ok(rows)
}

// =============================================================================
// Route statistics
// =============================================================================

/// Aggregated source -> destination route totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub source_chain: String,
    pub destination_chain: String,
    pub transfers: f64,
    pub volume_usd: f64,
}

/// Collapse events into per-route totals, descending by transfer count.
/// Events missing either chain label are skipped.
#[must_use]
pub fn route_summaries(events: &[TransferEvent]) -> Vec<RouteSummary> {
    let mut routes: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();
    for event in events {
        let (Some(src), Some(dst)) = (event.source_chain.as_deref(), event.destination_chain.as_deref())
        else {
            continue;
        };
        let entry = routes
            .entry((src.to_string(), dst.to_string()))
            .or_insert((0.0, 0.0));
        entry.0 += 1.0;
        entry.1 += event.amount.unwrap_or(0.0);
    }

    let mut out: Vec<RouteSummary> = routes
        .into_iter()
        .map(|((source_chain, destination_chain), (transfers, volume_usd))| RouteSummary {
            source_chain,
            destination_chain,
            transfers,
            volume_usd,
        })
        .collect();
    out.sort_by(|a, b| {
        b.transfers
            .partial_cmp(&a.transfers)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

/// First day of the month containing `date`.
#[must_use]
pub fn month_floor(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ServiceKind;
    use chrono::TimeZone;

    fn event(day: u32, user: &str) -> TransferEvent {
        TransferEvent {
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
            id: format!("tx-{day}-{user}"),
            service: ServiceKind::Gmp,
            source_chain: Some("ethereum".to_string()),
            destination_chain: Some("osmosis".to_string()),
            user: Some(user.to_string()),
            amount: Some(10.0),
            fee: Some(0.1),
        }
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn new_plus_recurring_equals_active() {
        let events = vec![
            event(1, "alice"),
            event(1, "bob"),
            event(2, "alice"),
            event(2, "carol"),
        ];
        let rows = user_activity(
            &events,
            Granularity::Day,
            &range((2024, 1, 1), (2024, 1, 31)),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].active_users, 2.0);
        assert_eq!(rows[0].new_users, 2.0);
        assert_eq!(rows[0].recurring_users, 0.0);

        assert_eq!(rows[1].active_users, 2.0);
        assert_eq!(rows[1].new_users, 1.0); // carol
        assert_eq!(rows[1].recurring_users, 1.0); // alice
        for row in &rows {
            assert_eq!(row.new_users + row.recurring_users, row.active_users);
        }
    }

    #[test]
    fn first_seen_before_range_counts_as_recurring() {
        let events = vec![event(1, "alice"), event(10, "alice")];
        let rows = user_activity(
            &events,
            Granularity::Day,
            &range((2024, 1, 5), (2024, 1, 31)),
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].active_users, 1.0);
        assert_eq!(rows[0].new_users, 0.0);
        assert_eq!(rows[0].recurring_users, 1.0);
    }

    #[test]
    fn cumulative_new_users_is_monotone() {
        let events = vec![
            event(1, "alice"),
            event(2, "bob"),
            event(3, "carol"),
            event(3, "alice"),
        ];
        let rows = user_activity(
            &events,
            Granularity::Day,
            &range((2024, 1, 1), (2024, 1, 31)),
        )
        .unwrap();

        let series: Vec<f64> = rows.iter().map(|r| r.cumulative_new_users).collect();
        assert_eq!(series, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn change_pct_matches_actives() {
        let events = vec![
            event(1, "alice"),
            event(2, "alice"),
            event(2, "bob"),
        ];
        let rows = user_activity(
            &events,
            Granularity::Day,
            &range((2024, 1, 1), (2024, 1, 31)),
        )
        .unwrap();

        assert_eq!(rows[0].change_pct, None);
        assert_eq!(rows[1].change_pct, Some(100.0));
    }

    #[test]
    fn rolling_averages_use_trailing_windows() {
        let events = vec![event(1, "a"), event(2, "b"), event(2, "c")];
        let rows = user_activity(
            &events,
            Granularity::Day,
            &range((2024, 1, 1), (2024, 1, 31)),
        )
        .unwrap();

        assert_eq!(rows[0].avg_7, 1.0);
        assert_eq!(rows[1].avg_7, 1.5);
        assert_eq!(rows[1].avg_30, 1.5);
    }

    #[test]
    fn stickiness_single_month() {
        // Two active days: 2 and 1 distinct users; 2 distinct over the month.
        let events = vec![event(1, "alice"), event(1, "bob"), event(2, "alice")];
        let rows = stickiness(&events, &range((2024, 1, 1), (2024, 1, 31))).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mau, 2.0);
        assert_eq!(rows[0].avg_dau, 1.5);
        assert_eq!(rows[0].stickiness_pct, Some(75.0));
    }

    #[test]
    fn route_summaries_sorted_by_transfers() {
        let mut events = vec![event(1, "a"), event(2, "b"), event(3, "c")];
        events[2].source_chain = Some("polygon".to_string());
        let routes = route_summaries(&events);

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].source_chain, "ethereum");
        assert_eq!(routes[0].transfers, 2.0);
        assert_eq!(routes[0].volume_usd, 20.0);
        assert_eq!(routes[1].source_chain, "polygon");
    }

    #[test]
    fn route_summaries_skip_unlabeled_events() {
        let mut e = event(1, "a");
        e.destination_chain = None;
        assert!(route_summaries(&[e]).is_empty());
    }
}
