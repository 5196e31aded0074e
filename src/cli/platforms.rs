//! Platforms command: Squid/other front-end activity from Dune saved queries.

use crate::cli::args::RangeArgs;
use crate::cli::{CommandContext, degrade_to_empty};
use crate::core::bucket::{MetricSpec, aggregate};
use crate::core::http::build_client;
use crate::core::model::Record;
use crate::core::series::{cumulative_sum, share_of_total};
use crate::providers::dune::{DuneClient, PLATFORM_QUERY_ID, PlatformRow};
use crate::render;
use crate::render::human::render_kpis;
use crate::storage::CacheKey;
use crate::storage::cache::TTL_DUNE_PLATFORMS_SECS;
use crate::util::format::human_format;
use crate::error::Result;

/// Execute the platforms command.
///
/// # Errors
///
/// Fatal on missing API key or bad flags; upstream failures degrade to an
/// empty report.
pub async fn execute(args: &RangeArgs, ctx: &CommandContext) -> Result<()> {
    let range = args.date_range()?;
    let granularity = args.granularity.into();

    let rows = fetch_platform_rows(ctx).await?;
    let records: Vec<Record> = rows
        .iter()
        .filter(|r| range.contains(r.date.date_naive()))
        .map(|r| {
            Record::new(r.date)
                .with_dimension(r.platform.as_str())
                .with_metric("num_txs", r.num_txs)
                .with_metric("volume", r.volume)
        })
        .collect();

    let buckets = aggregate(
        &records,
        granularity,
        &range,
        &[MetricSpec::sum("num_txs"), MetricSpec::sum("volume")],
    )?;
    let frame = render::ChartFrame::from_buckets(&buckets, &["num_txs", "volume"])
        .with_defined_series("cumulative_volume", cumulative_sum(&buckets, "volume")?)
        .with_series("volume_share", share_of_total(&buckets, "volume")?);

    let total_txs: f64 = buckets.iter().filter_map(|b| b.metric("num_txs")).sum();
    let total_volume: f64 = buckets.iter().filter_map(|b| b.metric("volume")).sum();

    if matches!(ctx.format, crate::cli::OutputFormat::Human) {
        let mut out = render_kpis(
            &[
                ("Transactions", human_format(total_txs)),
                ("Volume (USD)", human_format(total_volume)),
            ],
            ctx.no_color,
        );
        out.push('\n');
        out.push_str(&render::human::render_frame(&frame, ctx.no_color));
        println!("{out}");
    } else {
        let output = render::render_frame(&frame, "platforms", ctx.format, ctx.pretty, ctx.no_color)?;
        println!("{output}");
    }
    Ok(())
}

async fn fetch_platform_rows(ctx: &CommandContext) -> Result<Vec<PlatformRow>> {
    let key = CacheKey::new("dune_platforms", PLATFORM_QUERY_ID.to_string());
    if let Some(cached) = ctx.cache.get(&key) {
        return Ok(cached);
    }

    let api_key = ctx.dune_api_key()?;
    let client = DuneClient::new(build_client(ctx.config.timeout)?, api_key);
    let rows = degrade_to_empty(client.platform_activity().await, "dune_platforms")?;
    if !rows.is_empty() {
        if let Err(e) = ctx.cache.put(&key, &rows, TTL_DUNE_PLATFORMS_SECS) {
            tracing::warn!("Failed to write cache entry: {}", e);
        }
    }
    Ok(rows)
}
