//! Tokens command: token-transfer activity per source chain from the
//! warehouse mirror.

use crate::cli::args::TokensArgs;
use crate::cli::{CommandContext, degrade_to_empty};
use crate::core::bucket::{MetricSpec, aggregate};
use crate::core::model::{Record, ServiceKind};
use crate::core::query::{QueryFilter, events_sql};
use crate::core::series::cumulative_sum;
use crate::core::warehouse::QueryEngine;
use crate::providers::flipside::fetch_service_events;
use crate::render;
use crate::render::human::render_kpis;
use crate::storage::CacheKey;
use crate::storage::cache::TTL_WAREHOUSE_SECS;
use crate::util::format::human_format;
use crate::error::Result;

/// Execute the tokens command.
///
/// # Errors
///
/// Fatal on a missing mirror database or bad flags; warehouse failures
/// degrade to an empty report.
pub async fn execute(args: &TokensArgs, ctx: &CommandContext) -> Result<()> {
    let range = args.range.date_range()?;
    let granularity = args.range.granularity.into();

    let mut filter = QueryFilter::new(range).with_services(vec![ServiceKind::TokenTransfer]);
    if !args.chains.is_empty() {
        filter = filter.with_source_chains(args.chains.iter().map(String::as_str));
    }

    let pool = ctx.warehouse_pool()?;
    // The SQL text captures every filter knob, so it doubles as the cache key.
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

    let records: Vec<Record> = events
        .iter()
        .map(|e| {
            let mut record = Record::new(e.created_at).with_metric("transfers", e.id.as_str());
            if let Some(chain) = &e.source_chain {
                record = record.with_dimension(chain.as_str());
            }
            record.with_metric("volume", e.amount.unwrap_or(0.0))
        })
        .collect();

    let buckets = aggregate(
        &records,
        granularity,
        &range,
        &[
            MetricSpec::count_distinct("transfers"),
            MetricSpec::sum("volume"),
        ],
    )?;
    let frame = render::ChartFrame::from_buckets(&buckets, &["transfers", "volume"])
        .with_defined_series("cumulative_transfers", cumulative_sum(&buckets, "transfers")?);

    if matches!(ctx.format, crate::cli::OutputFormat::Human) {
        let total_transfers: f64 = buckets.iter().filter_map(|b| b.metric("transfers")).sum();
        let total_volume: f64 = buckets.iter().filter_map(|b| b.metric("volume")).sum();
        let mut out = render_kpis(
            &[
                ("Transfers", human_format(total_transfers)),
                ("Volume (USD)", human_format(total_volume)),
            ],
            ctx.no_color,
        );
        out.push('\n');
        out.push_str(&render::human::render_frame(&frame, ctx.no_color));
        println!("{out}");
    } else {
        let output = render::render_frame(&frame, "tokens", ctx.format, ctx.pretty, ctx.no_color)?;
        println!("{output}");
    }
    Ok(())
}
