//! Routes command: GMP traffic per source/destination pair from Axelarscan.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cli::args::{PivotMetric, RoutesArgs};
use crate::cli::{CommandContext, degrade_to_empty};
use crate::core::http::build_client;
use crate::providers::axelarscan::{AxelarscanClient, GMP_STATS_CONTRACTS, RouteStat};
use crate::render::{self, PivotTable};
use crate::render::human::{render_kpis, render_table};
use crate::storage::CacheKey;
use crate::storage::cache::TTL_AXELARSCAN_SECS;
use crate::util::format::human_format;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct RoutesReport {
    routes: Vec<RouteStat>,
    source_chains: usize,
    destination_chains: usize,
    paths: usize,
}

/// Execute the routes command.
///
/// # Errors
///
/// Upstream failures degrade to an empty report; everything else is fatal.
pub async fn execute(args: &RoutesArgs, ctx: &CommandContext) -> Result<()> {
    let routes = fetch_routes(ctx).await?;
    let merged = merge_routes(routes);

    if let Some(metric) = args.pivot {
        let pairs = merged.iter().map(|r| {
            let value = match metric {
                PivotMetric::Volume => r.volume_usd,
                PivotMetric::Transfers => r.num_txs,
            };
            (r.destination_chain.clone(), r.source_chain.clone(), value)
        });
        let pivot = PivotTable::from_pairs(pairs);
        let output = render::render_pivot(&pivot, "routes", ctx.format, ctx.pretty, ctx.no_color)?;
        println!("{output}");
        return Ok(());
    }

    let report = summarize(merged);
    let human = render_human(&report, ctx.no_color);
    let output = render::render_payload(&report, human, "routes", ctx.format, ctx.pretty)?;
    println!("{output}");
    Ok(())
}

async fn fetch_routes(ctx: &CommandContext) -> Result<Vec<RouteStat>> {
    let key = CacheKey::new("axelarscan_routes", GMP_STATS_CONTRACTS.join(","));
    if let Some(cached) = ctx.cache.get(&key) {
        return Ok(cached);
    }

    let client = AxelarscanClient::new(build_client(ctx.config.timeout)?);
    let routes = degrade_to_empty(client.all_route_stats().await, "axelarscan")?;
    if !routes.is_empty() {
        if let Err(e) = ctx.cache.put(&key, &routes, TTL_AXELARSCAN_SECS) {
            tracing::warn!("Failed to write cache entry: {}", e);
        }
    }
    Ok(routes)
}

/// Sum counters for routes reported under more than one gateway contract.
fn merge_routes(routes: Vec<RouteStat>) -> Vec<RouteStat> {
    let mut by_pair: BTreeMap<(String, String), RouteStat> = BTreeMap::new();
    for route in routes {
        let key = (route.source_chain.clone(), route.destination_chain.clone());
        by_pair
            .entry(key)
            .and_modify(|existing| {
                existing.volume_usd += route.volume_usd;
                existing.num_txs += route.num_txs;
            })
            .or_insert(route);
    }
    by_pair.into_values().collect()
}

fn summarize(mut routes: Vec<RouteStat>) -> RoutesReport {
    routes.sort_by(|a, b| {
        b.volume_usd
            .partial_cmp(&a.volume_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let source_chains = routes
        .iter()
        .map(|r| r.source_chain.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    let destination_chains = routes
        .iter()
        .map(|r| r.destination_chain.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    let paths = routes.len();

    RoutesReport {
        routes,
        source_chains,
        destination_chains,
        paths,
    }
}

fn render_human(report: &RoutesReport, no_color: bool) -> String {
    let total_volume: f64 = report.routes.iter().map(|r| r.volume_usd).sum();
    let total_txs: f64 = report.routes.iter().map(|r| r.num_txs).sum();

    let mut out = render_kpis(
        &[
            ("Source chains", report.source_chains.to_string()),
            ("Destination chains", report.destination_chains.to_string()),
            ("Paths", report.paths.to_string()),
            ("Volume (USD)", human_format(total_volume)),
            ("Transfers", human_format(total_txs)),
        ],
        no_color,
    );

    if report.routes.is_empty() {
        out.push_str("\nNo data for the selected range.\n");
        return out;
    }

    out.push('\n');
    let headers = vec![
        "Path".to_string(),
        "Volume".to_string(),
        "Transfers".to_string(),
    ];
    let rows: Vec<Vec<String>> = report
        .routes
        .iter()
        .map(|r| {
            vec![
                r.path(),
                human_format(r.volume_usd),
                human_format(r.num_txs),
            ]
        })
        .collect();
    out.push_str(&render_table(&headers, &rows, no_color));
    out
}
