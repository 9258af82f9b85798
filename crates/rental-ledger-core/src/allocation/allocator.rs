use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::RentalLedgerError;
use crate::types::{with_metadata, BillingPeriod, ComputationOutput, Currency, Money};
use crate::RentalLedgerResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One request to spread a received amount over consecutive billing periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Amount received, in `currency`
    pub amount: Money,
    pub currency: Currency,
    /// First billing period paid for (1–12)
    pub start_month: u32,
    pub start_year: i32,
    /// Periodic due amount already expressed in `currency`
    pub periodic_due_amount: Money,
    /// Echoed onto every allocation; defaults to the currency code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
}

/// The share of a payment assigned to one billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodAllocation {
    pub month: u32,
    pub year: i32,
    /// In the currency of the originating payment part
    pub amount: Money,
    pub currency: Currency,
    /// True when the period's full due amount was covered
    pub is_full: bool,
    pub source_reference: String,
}

impl PeriodAllocation {
    pub fn period(&self) -> BillingPeriod {
        BillingPeriod {
            year: self.year,
            month: self.month,
        }
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Allocate `amount` over consecutive months starting at
/// (`start_month`, `start_year`), using the default engine settings.
pub fn allocate(
    amount: Money,
    currency: &Currency,
    start_month: u32,
    start_year: i32,
    periodic_due_amount: Money,
) -> RentalLedgerResult<Vec<PeriodAllocation>> {
    let request = AllocationRequest {
        amount,
        currency: currency.clone(),
        start_month,
        start_year,
        periodic_due_amount,
        source_reference: None,
    };
    allocate_with(&EngineConfig::default(), &request)
}

/// Greedy, chronological allocation.
///
/// Each period takes the full due amount while enough remains; the last
/// period takes whatever is left. The emitted amounts always sum to the
/// requested amount exactly:
/// * a remainder within `epsilon` below the due amount closes its period
///   as full, carrying the exact remainder;
/// * dust of at most `epsilon` left after a full period is folded into
///   that period instead of opening a new one.
pub fn allocate_with(
    config: &EngineConfig,
    request: &AllocationRequest,
) -> RentalLedgerResult<Vec<PeriodAllocation>> {
    validate_request(request)?;

    let due = request.periodic_due_amount;
    let epsilon = config.epsilon;
    let source_reference = request
        .source_reference
        .clone()
        .unwrap_or_else(|| request.currency.code().to_string());

    let mut remaining = request.amount;
    let mut period = BillingPeriod::new(request.start_month, request.start_year)?;
    let mut allocations: Vec<PeriodAllocation> = Vec::new();

    while remaining > Decimal::ZERO {
        if allocations.len() >= config.max_periods as usize {
            return Err(RentalLedgerError::validation(
                "periodic_due_amount",
                format!(
                    "Allocating {} {} at {} per period exceeds the {}-period limit",
                    request.amount, request.currency, due, config.max_periods
                ),
            ));
        }

        let (slice, is_full) = if remaining >= due {
            (due, true)
        } else if remaining >= due - epsilon {
            (remaining, true)
        } else {
            (remaining, false)
        };
        remaining -= slice;

        let mut allocation = PeriodAllocation {
            month: period.month,
            year: period.year,
            amount: slice,
            currency: request.currency.clone(),
            is_full,
            source_reference: source_reference.clone(),
        };
        if remaining > Decimal::ZERO && remaining <= epsilon {
            allocation.amount += remaining;
            remaining = Decimal::ZERO;
        }
        allocations.push(allocation);
        if remaining > Decimal::ZERO {
            period = period.next()?;
        }
    }

    debug!(
        amount = %request.amount,
        currency = %request.currency,
        periods = allocations.len(),
        full = allocations.iter().filter(|a| a.is_full).count(),
        "allocated payment across billing periods"
    );

    Ok(allocations)
}

fn validate_request(request: &AllocationRequest) -> RentalLedgerResult<()> {
    if request.amount <= Decimal::ZERO {
        return Err(RentalLedgerError::validation(
            "amount",
            format!("Amount must be positive, got {}", request.amount),
        ));
    }
    if request.periodic_due_amount <= Decimal::ZERO {
        return Err(RentalLedgerError::validation(
            "periodic_due_amount",
            format!(
                "Periodic due amount must be positive, got {}",
                request.periodic_due_amount
            ),
        ));
    }
    if !(1..=12).contains(&request.start_month) {
        return Err(RentalLedgerError::validation(
            "start_month",
            format!("Start month must be between 1 and 12, got {}", request.start_month),
        ));
    }
    Ok(())
}

/// Envelope form used by the CLI and bindings to show an allocation before
/// it is committed.
pub fn preview_allocation(
    config: &EngineConfig,
    request: &AllocationRequest,
) -> RentalLedgerResult<ComputationOutput<Vec<PeriodAllocation>>> {
    let allocations = allocate_with(config, request)?;

    let mut warnings = Vec::new();
    if let Some(last) = allocations.last().filter(|a| !a.is_full) {
        warnings.push(format!(
            "{} is only partially covered: {} of {} {}",
            last.period(),
            last.amount,
            request.periodic_due_amount,
            request.currency
        ));
    }

    Ok(with_metadata(
        "Greedy chronological allocation against a fixed periodic due amount",
        request,
        warnings,
        &config.canonical_currency,
        allocations,
    ))
}
