//! CLI argument definitions using clap.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::core::bucket::{DateRange, Granularity};
use crate::error::{AxlensError, Result};

/// Default analysis window start, matching the dashboard defaults.
pub const DEFAULT_START: &str = "2023-01-01";
/// Default analysis window end.
pub const DEFAULT_END: &str = "2025-07-31";

/// Axelar interchain analytics in your terminal.
#[derive(Parser, Debug)]
#[command(name = "axlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub const fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands, one per dashboard page.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transaction counts by success over time, plus chain TVL
    Transfers(TransfersArgs),

    /// Per-platform transaction and volume series
    Platforms(RangeArgs),

    /// Source/destination route totals and pivots
    Routes(RoutesArgs),

    /// Transfer counts by source chain over time
    Tokens(TokensArgs),

    /// User activity: active/new/recurring, rolling averages, stickiness
    Users(RangeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Shared window/granularity arguments.
#[derive(Parser, Debug, Clone)]
pub struct RangeArgs {
    /// Bucket granularity
    #[arg(long, value_enum, default_value = "month")]
    pub granularity: GranularityArg,

    /// Window start (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE", default_value = DEFAULT_START)]
    pub start: String,

    /// Window end (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE", default_value = DEFAULT_END)]
    pub end: String,
}

impl RangeArgs {
    /// Parse and validate the date window.
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` on an unparseable date, `InvalidDateRange` when
    /// start is after end.
    pub fn date_range(&self) -> Result<DateRange> {
        let start = parse_date("start", &self.start)?;
        let end = parse_date("end", &self.end)?;
        DateRange::new(start, end)
    }
}

/// Arguments for the `transfers` command.
#[derive(Parser, Debug)]
pub struct TransfersArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Skip the chain TVL table
    #[arg(long)]
    pub no_tvl: bool,
}

/// Arguments for the `routes` command.
#[derive(Parser, Debug)]
pub struct RoutesArgs {
    /// Show a source x destination pivot instead of the route table
    #[arg(long, value_enum)]
    pub pivot: Option<PivotMetric>,
}

/// Arguments for the `tokens` command.
#[derive(Parser, Debug)]
pub struct TokensArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Restrict to these source chains (repeatable)
    #[arg(long = "chain", value_name = "CHAIN")]
    pub chains: Vec<String>,
}

/// Arguments for the `completions` command.
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Which metric a route pivot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PivotMetric {
    /// USD volume
    Volume,
    /// Transfer count
    Transfers,
}

/// Bucket granularity CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GranularityArg {
    Day,
    Week,
    #[default]
    Month,
}

impl From<GranularityArg> for Granularity {
    fn from(value: GranularityArg) -> Self {
        match value {
            GranularityArg::Day => Self::Day,
            GranularityArg::Week => Self::Week,
            GranularityArg::Month => Self::Month,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AxlensError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        message: "expected YYYY-MM-DD".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn range_args_defaults_resolve() {
        let args = RangeArgs {
            granularity: GranularityArg::Month,
            start: DEFAULT_START.to_string(),
            end: DEFAULT_END.to_string(),
        };
        let range = args.date_range().unwrap();
        assert_eq!(range.start().to_string(), "2023-01-01");
        assert_eq!(range.end().to_string(), "2025-07-31");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let args = RangeArgs {
            granularity: GranularityArg::Day,
            start: "2024-02-01".to_string(),
            end: "2024-01-01".to_string(),
        };
        assert!(matches!(
            args.date_range().unwrap_err(),
            AxlensError::InvalidDateRange { .. }
        ));
    }

    #[test]
    fn bad_date_names_the_flag() {
        let args = RangeArgs {
            granularity: GranularityArg::Day,
            start: "Jan 1".to_string(),
            end: DEFAULT_END.to_string(),
        };
        match args.date_range().unwrap_err() {
            AxlensError::ConfigInvalid { key, .. } => assert_eq!(key, "start"),
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }
}
