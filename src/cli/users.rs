//! Users command: active/new/recurring addresses and monthly stickiness.

use serde::Serialize;

use crate::cli::args::RangeArgs;
use crate::cli::{CommandContext, degrade_to_empty};
use crate::core::metrics::{StickinessRow, UserActivityRow, stickiness, user_activity};
use crate::core::query::{QueryFilter, events_sql};
use crate::core::warehouse::QueryEngine;
use crate::providers::flipside::fetch_service_events;
use crate::render;
use crate::render::human::{render_kpis, render_table};
use crate::storage::CacheKey;
use crate::storage::cache::TTL_WAREHOUSE_SECS;
use crate::util::format::{format_cell, format_percent, human_format};
use crate::error::Result;

#[derive(Debug, Serialize)]
struct UsersReport {
    activity: Vec<UserActivityRow>,
    stickiness: Vec<StickinessRow>,
}

/// Execute the users command.
///
/// # Errors
///
/// Fatal on a missing mirror database or bad flags; warehouse failures
/// degrade to an empty report.
pub async fn execute(args: &RangeArgs, ctx: &CommandContext) -> Result<()> {
    let range = args.date_range()?;
    let granularity = args.granularity.into();

    // Both services; the canonical user is the recipient for transfers and
    // the call sender for GMP, which the query already encodes.
    let filter = QueryFilter::new(range);
    let pool = ctx.warehouse_pool()?;
    let key = {
        let conn = pool.acquire()?;
        CacheKey::new("warehouse_events", events_sql(&filter, conn.dialect()))
    };
    let events = degrade_to_empty(
        ctx.cache.get_or_fetch(&key, TTL_WAREHOUSE_SECS, || {
            let mut conn = pool.acquire()?;
            fetch_service_events(&mut *conn, &filter)
        }),
        "warehouse",
    )?;

    let report = UsersReport {
        activity: user_activity(&events, granularity, &range)?,
        stickiness: stickiness(&events, &range)?,
    };

    let human = render_human(&report, ctx.no_color);
    let output = render::render_payload(&report, human, "users", ctx.format, ctx.pretty)?;
    println!("{output}");
    Ok(())
}

fn render_human(report: &UsersReport, no_color: bool) -> String {
    if report.activity.is_empty() {
        return "No data for the selected range.\n".to_string();
    }

    let total_new: f64 = report.activity.iter().map(|r| r.new_users).sum();
    let peak_active = report
        .activity
        .iter()
        .map(|r| r.active_users)
        .fold(0.0_f64, f64::max);

    let mut out = render_kpis(
        &[
            ("New users", human_format(total_new)),
            ("Peak active users", human_format(peak_active)),
        ],
        no_color,
    );
    out.push('\n');

    let headers: Vec<String> = [
        "Period", "Active", "New", "Recurring", "Cum. new", "Avg 7", "Avg 30", "Change", "New %",
        "Recur %",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    let rows: Vec<Vec<String>> = report
        .activity
        .iter()
        .map(|r| {
            vec![
                r.period_start.format("%Y-%m-%d").to_string(),
                human_format(r.active_users),
                human_format(r.new_users),
                human_format(r.recurring_users),
                human_format(r.cumulative_new_users),
                human_format(r.avg_7),
                human_format(r.avg_30),
                r.change_pct.map_or_else(|| "-".to_string(), format_percent),
                r.new_share
                    .map_or_else(|| "-".to_string(), |v| format_percent(v * 100.0)),
                r.recurring_share
                    .map_or_else(|| "-".to_string(), |v| format_percent(v * 100.0)),
            ]
        })
        .collect();
    out.push_str(&render_table(&headers, &rows, no_color));

    if !report.stickiness.is_empty() {
        out.push_str("\nStickiness\n");
        let headers: Vec<String> = ["Month", "MAU", "Avg DAU", "Stickiness"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let rows: Vec<Vec<String>> = report
            .stickiness
            .iter()
            .map(|r| {
                vec![
                    r.month_start.format("%Y-%m").to_string(),
                    human_format(r.mau),
                    human_format(r.avg_dau),
                    r.stickiness_pct
                        .map_or_else(|| format_cell(None), format_percent),
                ]
            })
            .collect();
        out.push_str(&render_table(&headers, &rows, no_color));
    }
    out
}
