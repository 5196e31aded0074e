//! CLI argument parsing and command dispatch.

pub mod args;
pub mod platforms;
pub mod routes;
pub mod tokens;
pub mod transfers;
pub mod users;

pub use args::{Cli, Commands, OutputFormat};

use crate::core::warehouse::{ConnectionPool, SqliteEngine};
use crate::error::{AxlensError, Result};
use crate::storage::{FetchCache, ResolvedConfig};

/// Shared per-invocation state handed to every command.
pub struct CommandContext {
    pub config: ResolvedConfig,
    pub cache: FetchCache,
    pub format: OutputFormat,
    pub pretty: bool,
    pub no_color: bool,
}

impl CommandContext {
    /// Build the context from parsed CLI flags.
    ///
    /// # Errors
    ///
    /// Propagates config resolution failures.
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = ResolvedConfig::resolve(cli)?;
        let format = match config.format {
            OutputFormat::Json => OutputFormat::Json,
            OutputFormat::Human => cli.effective_format(),
        };
        let no_color =
            config.no_color || !crate::util::env::should_use_color(cli.no_color);
        Ok(Self {
            cache: FetchCache::new(),
            format,
            pretty: cli.pretty || config.pretty,
            no_color,
            config,
        })
    }

    /// Pool of scoped warehouse sessions over the local mirror.
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` when the mirror database does not exist.
    pub fn warehouse_pool(&self) -> Result<ConnectionPool<SqliteEngine>> {
        let path = self.config.warehouse_path.clone();
        if !path.exists() {
            return Err(AxlensError::ConfigInvalid {
                key: "warehouse".to_string(),
                value: path.display().to_string(),
                message: "mirror database not found; set AXLENS_WAREHOUSE or [warehouse].mirror_path"
                    .to_string(),
            });
        }
        Ok(ConnectionPool::new(move || SqliteEngine::open(&path)))
    }

    /// Dune API key, required by commands that read Dune saved queries.
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` when no key is configured.
    pub fn dune_api_key(&self) -> Result<String> {
        self.config
            .dune_api_key
            .clone()
            .ok_or_else(|| AxlensError::ConfigInvalid {
                key: "dune.api_key".to_string(),
                value: String::new(),
                message: "set AXLENS_DUNE_API_KEY or [dune].api_key".to_string(),
            })
    }
}

/// Downgrade upstream/data failures to a logged warning plus an empty
/// result set, so one flaky source never kills the whole report.
/// Configuration and internal errors stay fatal.
pub fn degrade_to_empty<T>(result: Result<Vec<T>>, source: &str) -> Result<Vec<T>> {
    match result {
        Ok(values) => Ok(values),
        Err(e) if e.is_warn_and_empty() => {
            tracing::warn!(source, error = %e, "fetch failed; continuing with empty data");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
