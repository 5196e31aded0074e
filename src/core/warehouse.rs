//! Warehouse query execution.
//!
//! The dashboard originally held one module-level connection shared by
//! every page. Here the connection is an explicitly passed, scoped handle:
//! commands acquire a [`PooledConnection`] from a [`ConnectionPool`] and the
//! handle returns to the pool on drop, on every exit path including errors.
//!
//! [`QueryEngine`] is the seam: given SQL over a pre-established session it
//! returns tabular rows of `name -> scalar`. [`SqliteEngine`] implements it
//! over a local SQLite mirror for offline use and tests; a hosted warehouse
//! client would implement the same trait.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::core::query::SqlDialect;
use crate::error::{AxlensError, Result};

// =============================================================================
// Rows and scalars
// =============================================================================

/// A single cell value from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Number(f64),
    Text(String),
}

impl ScalarValue {
    /// Numeric view; text that parses as a number counts (warehouse
    /// drivers frequently hand decimals back as strings).
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(t) => t.trim().parse().ok(),
            Self::Null => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn display_value(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}

/// One result row: column name -> scalar value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, ScalarValue>,
}

impl Row {
    #[must_use]
    pub fn new(values: BTreeMap<String, ScalarValue>) -> Self {
        Self { values }
    }

    /// Raw cell access.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.values.get(column)
    }

    /// Required text column.
    ///
    /// # Errors
    ///
    /// `MissingField` when absent or null; `DataConversion` when numeric.
    pub fn text(&self, column: &str) -> Result<&str> {
        match self.get(column) {
            None | Some(ScalarValue::Null) => Err(AxlensError::MissingField {
                field: column.to_string(),
            }),
            Some(ScalarValue::Text(t)) => Ok(t),
            Some(other) => Err(AxlensError::DataConversion {
                field: column.to_string(),
                value: other.display_value(),
            }),
        }
    }

    /// Optional text column (null and absent both read as `None`).
    #[must_use]
    pub fn opt_text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(ScalarValue::as_text)
    }

    /// Required numeric column.
    ///
    /// # Errors
    ///
    /// `MissingField` when absent or null; `DataConversion` when the value
    /// is not numeric.
    pub fn number(&self, column: &str) -> Result<f64> {
        match self.get(column) {
            None | Some(ScalarValue::Null) => Err(AxlensError::MissingField {
                field: column.to_string(),
            }),
            Some(value) => value.as_number().ok_or_else(|| AxlensError::DataConversion {
                field: column.to_string(),
                value: value.display_value(),
            }),
        }
    }

    /// Optional numeric column.
    #[must_use]
    pub fn opt_number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(ScalarValue::as_number)
    }

    /// Required timestamp column. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`,
    /// and bare `YYYY-MM-DD` (read as UTC midnight).
    ///
    /// # Errors
    ///
    /// `MissingField` when absent or null; `DataConversion` on an
    /// unparseable value.
    pub fn timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
        let raw = self.text(column)?;
        parse_timestamp(raw).ok_or_else(|| AxlensError::DataConversion {
            field: column.to_string(),
            value: raw.to_string(),
        })
    }
}

/// Parse the timestamp spellings warehouse drivers actually emit.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

// =============================================================================
// Query engine
// =============================================================================

/// A credentialed, pre-established query session.
pub trait QueryEngine: Send {
    /// Execute one SQL statement and return all result rows.
    ///
    /// # Errors
    ///
    /// Returns `Warehouse` when the provider rejects or fails the query.
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Which SQL dialect the canonical query builders should emit for
    /// this engine.
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Warehouse
    }
}

// =============================================================================
// Connection pool
// =============================================================================

type EngineFactory<E> = Box<dyn Fn() -> Result<E> + Send + Sync>;

/// Pool of reusable query sessions.
///
/// `acquire` hands out an idle session or builds a fresh one; the guard
/// returns it on drop. No session is ever reachable as process-global
/// state.
pub struct ConnectionPool<E: QueryEngine> {
    factory: EngineFactory<E>,
    idle: Mutex<Vec<E>>,
}

impl<E: QueryEngine> ConnectionPool<E> {
    /// Create a pool that builds sessions with `factory` on demand.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Acquire a scoped session.
    ///
    /// # Errors
    ///
    /// Propagates the factory error when a fresh session cannot be built.
    pub fn acquire(&self) -> Result<PooledConnection<'_, E>> {
        let reused = self
            .idle
            .lock()
            .map_err(|_| AxlensError::Warehouse {
                message: "connection pool poisoned".to_string(),
            })?
            .pop();

        let engine = match reused {
            Some(engine) => engine,
            None => (self.factory)()?,
        };

        Ok(PooledConnection {
            pool: self,
            engine: Some(engine),
        })
    }

    /// Number of idle sessions currently parked in the pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    fn release(&self, engine: E) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(engine);
        }
    }
}

/// Scoped session handle; returns to its pool on drop.
pub struct PooledConnection<'a, E: QueryEngine> {
    pool: &'a ConnectionPool<E>,
    engine: Option<E>,
}

impl<E: QueryEngine> Deref for PooledConnection<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine.as_ref().expect("engine present until drop")
    }
}

impl<E: QueryEngine> DerefMut for PooledConnection<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine.as_mut().expect("engine present until drop")
    }
}

impl<E: QueryEngine> Drop for PooledConnection<'_, E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine);
        }
    }
}

// =============================================================================
// SQLite engine
// =============================================================================

/// [`QueryEngine`] over a local SQLite mirror of the warehouse tables.
pub struct SqliteEngine {
    conn: rusqlite::Connection,
}

impl SqliteEngine {
    /// Open a mirror database file.
    ///
    /// # Errors
    ///
    /// Returns `Warehouse` when the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path).map_err(|e| AxlensError::Warehouse {
            message: format!("open {}: {e}", path.display()),
        })?;
        Ok(Self { conn })
    }

    /// In-memory engine for tests.
    ///
    /// # Errors
    ///
    /// Returns `Warehouse` when SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(|e| AxlensError::Warehouse {
            message: e.to_string(),
        })?;
        Ok(Self { conn })
    }

    /// Run DDL/DML without reading results (test setup, mirror refresh).
    ///
    /// # Errors
    ///
    /// Returns `Warehouse` on execution failure.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| AxlensError::Warehouse {
                message: e.to_string(),
            })
    }
}

impl QueryEngine for SqliteEngine {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::SqliteMirror
    }

    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql).map_err(|e| AxlensError::Warehouse {
            message: e.to_string(),
        })?;
        let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

        let mut rows = stmt.query([]).map_err(|e| AxlensError::Warehouse {
            message: e.to_string(),
        })?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| AxlensError::Warehouse {
            message: e.to_string(),
        })? {
            let mut values = BTreeMap::new();
            for (i, name) in columns.iter().enumerate() {
                let value = match row.get_ref(i).map_err(|e| AxlensError::Warehouse {
                    message: e.to_string(),
                })? {
                    rusqlite::types::ValueRef::Null => ScalarValue::Null,
                    #[allow(clippy::cast_precision_loss)]
                    rusqlite::types::ValueRef::Integer(n) => ScalarValue::Number(n as f64),
                    rusqlite::types::ValueRef::Real(f) => ScalarValue::Number(f),
                    rusqlite::types::ValueRef::Text(t) => {
                        ScalarValue::Text(String::from_utf8_lossy(t).into_owned())
                    }
                    rusqlite::types::ValueRef::Blob(_) => ScalarValue::Null,
                };
                values.insert(name.clone(), value);
            }
            out.push(Row::new(values));
        }
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================
