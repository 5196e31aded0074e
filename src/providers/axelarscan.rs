//! Axelarscan GMP statistics fetcher.
//!
//! The `GMPStatsByChains` endpoint returns, per tracked contract, a nested
//! source-chain -> destination-chain tree of transfer counts and USD
//! volume. This module flattens that tree into [`RouteStat`] rows.

use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::http::fetch_json;
use crate::error::Result;

const DEFAULT_BASE_URL: &str = "https://api.axelarscan.io";

/// Contracts whose GMP traffic the dashboard tracks: the EVM gateway and
/// its Axelar-native counterpart.
pub const GMP_STATS_CONTRACTS: [&str; 2] = [
    "0xB5FB4BE02232B1bBA4dC8f81dc24C26980dE9e3C",
    "axelar1aqcj54lzz0rk22gvqgcn8fr5tx4rzwdv5wv5j9dmnacgefvd7wzsy2j2mr",
];

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct GmpStatsResponse {
    #[serde(default)]
    source_chains: Vec<SourceChainEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceChainEntry {
    key: String,
    #[serde(default)]
    destination_chains: Vec<DestinationChainEntry>,
}

#[derive(Debug, Deserialize)]
struct DestinationChainEntry {
    key: String,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    num_txs: f64,
}

// =============================================================================
// Output rows
// =============================================================================

/// Flattened per-route totals for one source/destination pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStat {
    pub source_chain: String,
    pub destination_chain: String,
    pub volume_usd: f64,
    pub num_txs: f64,
}

impl RouteStat {
    /// Display path label, `source ➡ destination`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{} ➡ {}", self.source_chain, self.destination_chain)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for the public Axelarscan API.
pub struct AxelarscanClient {
    client: Client,
    base_url: String,
}

impl AxelarscanClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Route stats for a single contract.
    ///
    /// # Errors
    ///
    /// Returns `Http`/`Network`/`ParseResponse` from the underlying fetch.
    pub async fn route_stats(&self, contract_address: &str) -> Result<Vec<RouteStat>> {
        let url = format!(
            "{}/gmp/GMPStatsByChains?contractAddress={contract_address}",
            self.base_url
        );
        debug!(contract = contract_address, "fetching GMP route stats");
        let response: GmpStatsResponse = fetch_json(&self.client, &url).await?;
        Ok(flatten(response))
    }

    /// Combined route stats across all tracked contracts, fetched
    /// concurrently. Routes appearing under both contracts stay as separate
    /// rows; callers aggregate as needed.
    ///
    /// # Errors
    ///
    /// Fails if any contract fetch fails.
    pub async fn all_route_stats(&self) -> Result<Vec<RouteStat>> {
        let fetches = GMP_STATS_CONTRACTS
            .iter()
            .map(|contract| self.route_stats(contract));
        let per_contract = try_join_all(fetches).await?;
        Ok(per_contract.into_iter().flatten().collect())
    }
}

fn flatten(response: GmpStatsResponse) -> Vec<RouteStat> {
    let mut out = Vec::new();
    for source in response.source_chains {
        for dest in source.destination_chains {
            out.push(RouteStat {
                source_chain: source.key.clone(),
                destination_chain: dest.key,
                volume_usd: dest.volume,
                num_txs: dest.num_txs,
            });
        }
    }
    out
}
