use clap::Args;
use serde_json::{json, Value};

use rental_ledger_core::reporting::report::{build_report, ReportInput};
use rental_ledger_core::reporting::ScopeFilter;
use rental_ledger_core::EngineConfig;

use crate::input;

/// Arguments for resolving a scope's fetch range
#[derive(Args)]
pub struct ScopeRangeArgs {
    /// Report year
    #[arg(long)]
    pub year: i32,

    /// Comma-separated months (1-12); omit for the whole year
    #[arg(long, value_delimiter = ',')]
    pub months: Vec<u32>,
}

/// Arguments for the revenue report
#[derive(Args)]
pub struct ReportArgs {
    /// Path to JSON input file with scope, raw rows and ownership
    #[arg(long)]
    pub input: Option<String>,

    /// Count pending payments and expenses too
    #[arg(long)]
    pub include_pending: bool,

    /// Fail on the first malformed row
    #[arg(long)]
    pub strict: bool,
}

pub fn run_scope_range(args: ScopeRangeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scope = ScopeFilter::year(args.year).with_months(args.months);
    let (start, end) = scope.date_range()?;
    Ok(json!({
        "result": {
            "year": scope.year,
            "months": scope.selected_months(),
            "start": start,
            "end": end,
        }
    }))
}

pub fn run_report(
    args: ReportArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut report_input: ReportInput = input::require(args.input.as_deref(), "revenue report")?;
    report_input.include_pending |= args.include_pending;
    report_input.strict |= args.strict;
    let result = build_report(&report_input, config)?;
    Ok(serde_json::to_value(result)?)
}
