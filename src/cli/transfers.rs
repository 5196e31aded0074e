//! Transfers command: transaction counts by success, plus chain TVL.

use serde::Serialize;

use crate::cli::args::TransfersArgs;
use crate::cli::{CommandContext, degrade_to_empty};
use crate::core::bucket::{MetricSpec, aggregate};
use crate::core::http::build_client;
use crate::core::model::Record;
use crate::providers::dune::{DuneClient, TVL_QUERY_ID, TvlRow};
use crate::providers::flipside::fetch_transaction_rows;
use crate::render::{self, ChartFrame};
use crate::render::human::{render_kpis, render_table};
use crate::storage::CacheKey;
use crate::storage::cache::{TTL_DUNE_TVL_SECS, TTL_WAREHOUSE_SECS};
use crate::util::format::human_format;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct TransfersReport {
    activity: ChartFrame,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tvl: Vec<TvlRow>,
}

/// Execute the transfers command.
///
/// # Errors
///
/// Configuration failures are fatal; upstream/data failures degrade to an
/// empty section with a warning.
pub async fn execute(args: &TransfersArgs, ctx: &CommandContext) -> Result<()> {
    let range = args.range.date_range()?;
    let granularity = args.range.granularity.into();

    let pool = ctx.warehouse_pool()?;
    let key = CacheKey::new(
        "warehouse_txs",
        format!("{}..{}", range.start(), range.end()),
    );
    let rows = degrade_to_empty(
        ctx.cache.get_or_fetch(&key, TTL_WAREHOUSE_SECS, || {
            let mut conn = pool.acquire()?;
            fetch_transaction_rows(&mut *conn, &range)
        }),
        "warehouse",
    )?;

    let records: Vec<Record> = rows
        .iter()
        .map(|r| {
            Record::new(r.block_timestamp)
                .with_dimension(if r.tx_succeeded { "success" } else { "failure" })
                .with_metric("txs", r.tx_id.as_str())
        })
        .collect();
    let buckets = aggregate(
        &records,
        granularity,
        &range,
        &[MetricSpec::count_distinct("txs")],
    )?;
    let activity = ChartFrame::from_buckets(&buckets, &["txs"]);

    let tvl = if args.no_tvl {
        Vec::new()
    } else {
        fetch_tvl(ctx).await?
    };

    let report = TransfersReport { activity, tvl };
    let human = render_human(&report, rows.len(), ctx.no_color);
    let output = render::render_payload(&report, human, "transfers", ctx.format, ctx.pretty)?;
    println!("{output}");
    Ok(())
}

async fn fetch_tvl(ctx: &CommandContext) -> Result<Vec<TvlRow>> {
    let key = CacheKey::new("dune_tvl", TVL_QUERY_ID.to_string());
    if let Some(cached) = ctx.cache.get(&key) {
        return Ok(cached);
    }

    let api_key = ctx.dune_api_key()?;
    let client = DuneClient::new(build_client(ctx.config.timeout)?, api_key);
    let rows = degrade_to_empty(client.chain_tvl().await, "dune_tvl")?;
    if !rows.is_empty() {
        if let Err(e) = ctx.cache.put(&key, &rows, TTL_DUNE_TVL_SECS) {
            tracing::warn!("Failed to write cache entry: {}", e);
        }
    }
    Ok(rows)
}

#[allow(clippy::cast_precision_loss)]
fn render_human(report: &TransfersReport, total_rows: usize, no_color: bool) -> String {
    let total: f64 = report
        .activity
        .rows
        .iter()
        .flat_map(|r| r.values.iter().flatten())
        .sum();
    let mut out = render_kpis(
        &[
            ("Transactions", human_format(total)),
            ("Raw rows", human_format(total_rows as f64)),
        ],
        no_color,
    );
    out.push('\n');
    out.push_str(&render::human::render_frame(&report.activity, no_color));

    if !report.tvl.is_empty() {
        out.push_str("\nChain TVL\n");
        let headers = vec![
            "Chain".to_string(),
            "Token".to_string(),
            "TVL".to_string(),
        ];
        let rows: Vec<Vec<String>> = report
            .tvl
            .iter()
            .map(|r| {
                vec![
                    r.chain.clone(),
                    r.token_symbol.clone().unwrap_or_default(),
                    human_format(r.tvl),
                ]
            })
            .collect();
        out.push_str(&render_table(&headers, &rows, no_color));
    }
    out
}
