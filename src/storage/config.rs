//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux/macOS: `~/.config/axlens/config.toml`
//! - Windows: `%APPDATA%/axlens/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `AXLENS_FORMAT`: Output format (human, json)
//! - `AXLENS_TIMEOUT`: Default timeout in seconds
//! - `AXLENS_NO_COLOR` or `NO_COLOR`: Disable colors (1, true, yes)
//! - `AXLENS_VERBOSE`: Enable verbose output (1, true, yes)
//! - `AXLENS_PRETTY`: Pretty-print JSON output (1, true, yes)
//! - `AXLENS_DUNE_API_KEY`: Dune Analytics API key
//! - `AXLENS_WAREHOUSE`: Path to the local warehouse mirror database
//! - `AXLENS_CONFIG`: Override config file path

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat};
use crate::error::{AxlensError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable for output format.
pub const ENV_FORMAT: &str = "AXLENS_FORMAT";
/// Environment variable for timeout in seconds.
pub const ENV_TIMEOUT: &str = "AXLENS_TIMEOUT";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "AXLENS_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
/// Environment variable for verbose output.
pub const ENV_VERBOSE: &str = "AXLENS_VERBOSE";
/// Environment variable for pretty JSON output.
pub const ENV_PRETTY: &str = "AXLENS_PRETTY";
/// Environment variable for the Dune API key.
pub const ENV_DUNE_API_KEY: &str = "AXLENS_DUNE_API_KEY";
/// Environment variable for the warehouse mirror path.
pub const ENV_WAREHOUSE: &str = "AXLENS_WAREHOUSE";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "AXLENS_CONFIG";

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Output format.
    pub format: OutputFormat,
    /// Request timeout.
    pub timeout: Duration,
    /// Whether to disable colored output.
    pub no_color: bool,
    /// Whether verbose logging is enabled.
    pub verbose: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
    /// Dune API key, when configured.
    pub dune_api_key: Option<String>,
    /// Path to the local warehouse mirror database.
    pub warehouse_path: PathBuf,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub format: ConfigSource,
    pub timeout: ConfigSource,
    pub no_color: ConfigSource,
    pub verbose: ConfigSource,
    pub pretty: ConfigSource,
    pub dune_api_key: ConfigSource,
    pub warehouse_path: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables,
    /// and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or a
    /// resolved value fails validation.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config = Self::load_config()?;

        let mut sources = ConfigSources::default();

        let format = Self::resolve_format(cli, &config, &mut sources.format)?;
        let timeout = Self::resolve_timeout(&config, &mut sources.timeout);
        let no_color = Self::resolve_no_color(cli, &config, &mut sources.no_color);
        let verbose = Self::resolve_verbose(cli, &mut sources.verbose);
        let pretty = Self::resolve_pretty(cli, &config, &mut sources.pretty);
        let dune_api_key = Self::resolve_dune_api_key(&config, &mut sources.dune_api_key);
        let warehouse_path = Self::resolve_warehouse_path(&config, &mut sources.warehouse_path);

        Ok(Self {
            format,
            timeout,
            no_color,
            verbose,
            pretty,
            dune_api_key,
            warehouse_path,
            sources,
        })
    }

    /// Load config file, respecting the AXLENS_CONFIG override.
    fn load_config() -> Result<Config> {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            Config::load_from(Path::new(&path))
        } else {
            Config::load()
        }
    }

    /// Resolve output format setting.
    fn resolve_format(
        cli: &Cli,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<OutputFormat> {
        // 1. CLI --json flag (shorthand)
        if cli.json {
            *source = ConfigSource::Cli;
            return Ok(OutputFormat::Json);
        }

        // 2. Environment variable. Clap sets a default for --format, so an
        // explicitly non-default flag wins and env beats the clap default.
        if let Ok(format_env) = std::env::var(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return Self::parse_format(&format_env);
        }

        if cli.format != OutputFormat::Human {
            *source = ConfigSource::Cli;
            return Ok(cli.format);
        }

        // 3. Config file
        if let Some(ref format_str) = config.output.format {
            *source = ConfigSource::ConfigFile;
            return Self::parse_format(format_str);
        }

        // 4. Default (from clap)
        *source = ConfigSource::Default;
        Ok(OutputFormat::Human)
    }

    /// Parse a format string into OutputFormat.
    fn parse_format(s: &str) -> Result<OutputFormat> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(AxlensError::ConfigInvalid {
                key: "format".to_string(),
                value: s.to_string(),
                message: "valid formats: human, json".to_string(),
            }),
        }
    }

    /// Resolve timeout setting.
    fn resolve_timeout(config: &Config, source: &mut ConfigSource) -> Duration {
        // 1. Environment variable
        if let Ok(timeout_env) = std::env::var(ENV_TIMEOUT) {
            if let Ok(timeout) = timeout_env.parse::<u64>() {
                *source = ConfigSource::Env;
                return Duration::from_secs(timeout);
            }
        }

        // 2. Config file (carries the built-in default)
        *source = ConfigSource::ConfigFile;
        Duration::from_secs(config.general.timeout_seconds)
    }

    /// Resolve no_color setting.
    fn resolve_no_color(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        // 1. CLI --no-color flag
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }

        // 2. Environment variable (AXLENS_NO_COLOR or standard NO_COLOR)
        if Self::is_env_truthy(ENV_NO_COLOR) || std::env::var(ENV_NO_COLOR_STD).is_ok() {
            *source = ConfigSource::Env;
            return true;
        }

        // 3. Config file (inverted: output.color = false means no_color)
        if !config.output.color {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        // 4. Default
        *source = ConfigSource::Default;
        false
    }

    /// Resolve verbose setting.
    fn resolve_verbose(cli: &Cli, source: &mut ConfigSource) -> bool {
        if cli.verbose {
            *source = ConfigSource::Cli;
            return true;
        }

        if Self::is_env_truthy(ENV_VERBOSE) {
            *source = ConfigSource::Env;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }

    /// Resolve pretty setting.
    fn resolve_pretty(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }

        if Self::is_env_truthy(ENV_PRETTY) {
            *source = ConfigSource::Env;
            return true;
        }

        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }

    /// Resolve the Dune API key.
    fn resolve_dune_api_key(config: &Config, source: &mut ConfigSource) -> Option<String> {
        if let Ok(key) = std::env::var(ENV_DUNE_API_KEY) {
            if !key.trim().is_empty() {
                *source = ConfigSource::Env;
                return Some(key);
            }
        }

        if let Some(ref key) = config.dune.api_key {
            *source = ConfigSource::ConfigFile;
            return Some(key.clone());
        }

        *source = ConfigSource::Default;
        None
    }

    /// Resolve the warehouse mirror path.
    fn resolve_warehouse_path(config: &Config, source: &mut ConfigSource) -> PathBuf {
        if let Ok(path) = std::env::var(ENV_WAREHOUSE) {
            if !path.trim().is_empty() {
                *source = ConfigSource::Env;
                return PathBuf::from(path);
            }
        }

        if let Some(ref path) = config.warehouse.mirror_path {
            *source = ConfigSource::ConfigFile;
            return PathBuf::from(path);
        }

        *source = ConfigSource::Default;
        AppPaths::new().mirror_db_file()
    }

    /// Check if an environment variable is set to a truthy value.
    fn is_env_truthy(var: &str) -> bool {
        std::env::var(var)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

// =============================================================================
// Config file schema
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Warehouse settings.
    pub warehouse: WarehouseConfig,
    /// Dune Analytics settings.
    pub dune: DuneConfig,
    /// Output settings.
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default timeout for network requests in seconds.
    pub timeout_seconds: u64,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            log_level: None,
        }
    }
}

/// Warehouse configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Path to the local SQLite mirror database.
    pub mirror_path: Option<String>,
}

/// Dune Analytics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DuneConfig {
    /// API key used for saved-query result fetches.
    pub api_key: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json).
    pub format: Option<String>,
    /// Whether to use colors in output.
    pub color: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| AxlensError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| AxlensError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }
}
