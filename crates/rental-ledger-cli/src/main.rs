mod commands;
mod config;
mod input;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::allocation::{AllocateArgs, PlanPaymentArgs};
use commands::currency::ConvertArgs;
use commands::reporting::{ReportArgs, ScopeRangeArgs};

/// Rent allocation previews and owner revenue reports
#[derive(Parser)]
#[command(
    name = "rentals",
    version,
    about = "Rent allocation previews and owner revenue reports",
    long_about = "Allocates tenant payments across monthly billing periods and \
                  aggregates income and expenses into per-property and per-owner \
                  distributions, normalised to a single reporting currency with \
                  decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine settings as JSON (canonical currency, epsilon, period limit)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Spread a payment over consecutive monthly billing periods
    Allocate(AllocateArgs),
    /// Preview the drafts a (possibly multi-part) payment would create
    PlanPayment(PlanPaymentArgs),
    /// Convert an amount into or out of the canonical currency
    Convert(ConvertArgs),
    /// Print the date range fetched for a report scope
    ScopeRange(ScopeRangeArgs),
    /// Build a revenue report from raw payment, expense and ownership rows
    Report(ReportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let engine = match config::load(cli.config.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(2);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Allocate(args) => commands::allocation::run_allocate(args, &engine),
        Commands::PlanPayment(args) => commands::allocation::run_plan_payment(args, &engine),
        Commands::Convert(args) => commands::currency::run_convert(args, &engine),
        Commands::ScopeRange(args) => commands::reporting::run_scope_range(args),
        Commands::Report(args) => commands::reporting::run_report(args, &engine),
        Commands::Version => {
            println!("rentals {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
