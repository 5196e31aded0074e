//! axlens - Axelar interchain analytics
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::{CommandFactory, Parser};
use std::process::ExitCode;

use axlens::cli::{Cli, CommandContext, Commands};
use axlens::core::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = cli
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .or_else(|| logging::parse_log_level_from_env().map(logging::LogLevel::from_tracing_level))
        .unwrap_or_default();
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, cli.verbose);

    let format = cli.effective_format();
    let no_color = cli.no_color;
    let pretty = cli.pretty;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            let error_output = axlens::render::error::render_error(&e, format, no_color, pretty);
            eprintln!("{error_output}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> axlens::Result<()> {
    match &cli.command {
        None => {
            print_quickstart();
            Ok(())
        }

        Some(Commands::Completions(args)) => {
            let mut command = Cli::command();
            clap_complete::generate(args.shell, &mut command, "axlens", &mut std::io::stdout());
            Ok(())
        }

        Some(Commands::Transfers(args)) => {
            axlens::cli::transfers::execute(args, &CommandContext::new(&cli)?).await
        }
        Some(Commands::Platforms(args)) => {
            axlens::cli::platforms::execute(args, &CommandContext::new(&cli)?).await
        }
        Some(Commands::Routes(args)) => {
            axlens::cli::routes::execute(args, &CommandContext::new(&cli)?).await
        }
        Some(Commands::Tokens(args)) => {
            axlens::cli::tokens::execute(args, &CommandContext::new(&cli)?).await
        }
        Some(Commands::Users(args)) => {
            axlens::cli::users::execute(args, &CommandContext::new(&cli)?).await
        }
    }
}

/// Print quickstart help when no command is given.
fn print_quickstart() {
    println!(
        r"axlens - Axelar interchain analytics

Explore Axelar network activity from the terminal.

USAGE:
    axlens [OPTIONS] <COMMAND>

COMMANDS:
    transfers    Interchain transaction counts and chain TVL
    platforms    Activity per front-end platform (Squid et al.)
    routes       GMP traffic per source/destination pair
    tokens       Token-transfer volume per source chain
    users        Active, new, and recurring addresses; stickiness
    completions  Generate shell completions

QUICK START:
    axlens transfers                        # Monthly transaction overview
    axlens platforms --granularity week     # Weekly platform activity
    axlens routes --pivot volume            # Source x destination volume grid
    axlens tokens --chain ethereum          # Token flows out of Ethereum
    axlens users --start 2024-01-01         # User retention since January

ROBOT MODE (for scripts and agents):
    axlens transfers --json                 # JSON output
    axlens users --json --pretty            # Indented JSON

For more help: axlens --help
");

    println!("Version: {}", env!("CARGO_PKG_VERSION"));
}
