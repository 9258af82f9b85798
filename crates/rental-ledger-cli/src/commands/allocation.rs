use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use rental_ledger_core::allocation::planning::active_contract_for;
use rental_ledger_core::allocation::{
    plan_payment, preview_allocation, AllocationRequest, PaymentSubmission,
};
use rental_ledger_core::records::Contract;
use rental_ledger_core::{Currency, EngineConfig};

use crate::input;

/// Arguments for a single-currency allocation preview
#[derive(Args)]
pub struct AllocateArgs {
    /// Amount received
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Currency of the amount (USD, VES, EUR, ...)
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// First billing month to cover (1-12)
    #[arg(long)]
    pub start_month: Option<u32>,

    /// Year of the first billing month
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Amount due each period, in the payment's currency
    #[arg(long, alias = "rent")]
    pub due: Option<Decimal>,

    /// Reference echoed on every allocation
    #[arg(long)]
    pub reference: Option<String>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for payment planning
#[derive(Args)]
pub struct PlanPaymentArgs {
    /// Path to JSON input file with `submission` and `contract` (or `contracts`)
    #[arg(long)]
    pub input: Option<String>,
}

/// A submission plus either the contract it pays or the tenant's contracts
/// to pick the active one from.
#[derive(Deserialize)]
struct PlanPaymentInput {
    submission: PaymentSubmission,
    #[serde(default)]
    contract: Option<Contract>,
    #[serde(default)]
    contracts: Vec<Contract>,
}

pub fn run_allocate(
    args: AllocateArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AllocationRequest = match input::document(args.input.as_deref())? {
        Some(request) => request,
        None => AllocationRequest {
            amount: args
                .amount
                .ok_or("--amount is required (or provide --input)")?,
            currency: Currency::parse(&args.currency)
                .ok_or_else(|| format!("Unknown currency '{}'", args.currency))?,
            start_month: args
                .start_month
                .ok_or("--start-month is required (or provide --input)")?,
            start_year: args
                .start_year
                .ok_or("--start-year is required (or provide --input)")?,
            periodic_due_amount: args.due.ok_or("--due is required (or provide --input)")?,
            source_reference: args.reference,
        },
    };

    let result = preview_allocation(config, &request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_plan_payment(
    args: PlanPaymentArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let plan_input: PlanPaymentInput = input::require(args.input.as_deref(), "payment planning")?;
    let submission = &plan_input.submission;

    let contract = match plan_input.contract.as_ref() {
        Some(contract) => contract,
        None => active_contract_for(
            &plan_input.contracts,
            &submission.tenant_id,
            submission.date,
        )?,
    };

    let result = plan_payment(submission, contract, config)?;
    Ok(serde_json::to_value(result)?)
}
