//! Core data model, aggregation, and fetch infrastructure.

pub mod bucket;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod query;
pub mod series;
pub mod warehouse;

pub use bucket::{AggregateOp, DateRange, Granularity, MetricSpec, aggregate};
pub use metrics::{RouteSummary, StickinessRow, UserActivityRow, route_summaries, stickiness, user_activity};
pub use model::{Bucket, MetricValue, Record, ServiceKind, TransferEvent};
pub use query::{QueryFilter, SqlDialect, events_sql, service_events_sql, transaction_rows_sql};
pub use series::{cumulative_sum, percent_change, rolling_average, share_of_total};
pub use warehouse::{ConnectionPool, PooledConnection, QueryEngine, Row, ScalarValue, SqliteEngine};
