//! Data providers: the warehouse mirror and the public HTTP APIs.

pub mod axelarscan;
pub mod dune;
pub mod flipside;

pub use axelarscan::{AxelarscanClient, RouteStat};
pub use dune::{DuneClient, PlatformRow, TvlRow};
pub use flipside::{fetch_service_events, fetch_transaction_rows, TransactionRow};
