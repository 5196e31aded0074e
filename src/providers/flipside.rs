//! Warehouse fetchers over the canonical queries.
//!
//! Thin layer between [`crate::core::query`] builders and the typed event
//! structs: runs the SQL through a scoped [`QueryEngine`] session and maps
//! rows field by field, naming the offending column on shape mismatches.
//! The SQL dialect comes from the engine, so the same fetcher serves both
//! the hosted warehouse and a local SQLite mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::model::{ServiceKind, TransferEvent};
use crate::core::query::{events_sql, transaction_rows_sql, QueryFilter};
use crate::core::warehouse::QueryEngine;
use crate::core::DateRange;
use crate::error::{AxlensError, Result};

/// One raw transaction with its success flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub block_timestamp: DateTime<Utc>,
    pub tx_id: String,
    pub tx_succeeded: bool,
}

fn service_from_label(label: &str) -> Result<ServiceKind> {
    match label {
        "Token Transfers" => Ok(ServiceKind::TokenTransfer),
        "GMP" => Ok(ServiceKind::Gmp),
        other => Err(AxlensError::DataConversion {
            field: "service".to_string(),
            value: other.to_string(),
        }),
    }
}

/// Fetch executed interchain events matching `filter`.
///
/// # Errors
///
/// Returns `Warehouse` on query failure, `MissingField`/`DataConversion`
/// on malformed rows.
pub fn fetch_service_events<E: QueryEngine>(
    engine: &mut E,
    filter: &QueryFilter,
) -> Result<Vec<TransferEvent>> {
    let sql = events_sql(filter, engine.dialect());
    let rows = engine.execute(&sql)?;
    debug!(rows = rows.len(), "fetched service events");

    rows.iter()
        .map(|row| {
            Ok(TransferEvent {
                created_at: row.timestamp("created_at")?,
                id: row.text("event_id")?.to_string(),
                service: service_from_label(row.text("service")?)?,
                source_chain: row.opt_text("source_chain").map(str::to_string),
                destination_chain: row.opt_text("destination_chain").map(str::to_string),
                user: row.opt_text("user_address").map(str::to_string),
                amount: row.opt_number("amount_usd"),
                fee: row.opt_number("fee_usd"),
            })
        })
        .collect()
}

/// Fetch raw transactions with success flags for the overview counts.
///
/// # Errors
///
/// Returns `Warehouse` on query failure, `MissingField`/`DataConversion`
/// on malformed rows.
pub fn fetch_transaction_rows<E: QueryEngine>(
    engine: &mut E,
    range: &DateRange,
) -> Result<Vec<TransactionRow>> {
    let sql = transaction_rows_sql(range, engine.dialect());
    let rows = engine.execute(&sql)?;
    debug!(rows = rows.len(), "fetched transaction rows");

    rows.iter()
        .map(|row| {
            Ok(TransactionRow {
                block_timestamp: row.timestamp("block_timestamp")?,
                tx_id: row.text("tx_id")?.to_string(),
                tx_succeeded: row.number("tx_succeeded")? != 0.0,
            })
        })
        .collect()
}
