//! Payment registration: turn a submitted payment (one or more parts, each
//! in its own currency) into per-period allocations and the payment rows
//! that will be committed for them.
//!
//! Nothing here touches storage. The caller fetches the contract, asks for
//! a plan, shows it, and on confirmation persists `PaymentPlan::drafts`
//! verbatim. Because planning is pure, re-planning the same submission at
//! commit time yields exactly the previewed rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::allocation::allocator::{allocate_with, AllocationRequest, PeriodAllocation};
use crate::config::EngineConfig;
use crate::currency::CurrencyNormalizer;
use crate::error::RentalLedgerError;
use crate::records::{Contract, ContractStatus, PaymentStatus};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::RentalLedgerResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One tranche of a submitted payment, e.g. the USD cash and the VES
/// transfer that together settle a tenant's rent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPart {
    pub amount: Money,
    pub currency: Currency,
    /// Overrides the submission-level rate for this part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Rate>,
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSubmission {
    pub tenant_id: String,
    pub contract_id: String,
    /// Date the money was received
    pub date: NaiveDate,
    pub start_month: u32,
    pub start_year: i32,
    pub parts: Vec<PaymentPart>,
    /// Rate of the day for every non-canonical currency in the submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Rate>,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub concept: String,
}

/// A payment row ready to be persisted, one per period allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub tenant_id: String,
    pub contract_id: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Rate>,
    /// First day of the billing month
    pub billing_period: NaiveDate,
    pub status: PaymentStatus,
    pub reference: String,
    pub concept: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartPlan {
    pub part_index: usize,
    pub amount: Money,
    pub currency: Currency,
    /// The contract's due amount expressed in this part's currency
    pub due_in_part_currency: Money,
    pub allocations: Vec<PeriodAllocation>,
    /// This part's value in the canonical currency
    pub canonical_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub contract_id: String,
    pub due_amount: Money,
    pub due_currency: Currency,
    pub parts: Vec<PartPlan>,
    pub drafts: Vec<PaymentDraft>,
    pub total_canonical: Money,
}

// ---------------------------------------------------------------------------
// Contract lookups
// ---------------------------------------------------------------------------

/// The periodic amount a contract charges.
pub fn recurring_due(contract: &Contract) -> RentalLedgerResult<Money> {
    if contract.status != ContractStatus::Active {
        return Err(RentalLedgerError::NoRecurringAmount(format!(
            "contract {} is not active",
            contract.id
        )));
    }
    if contract.rent_amount <= Decimal::ZERO {
        return Err(RentalLedgerError::NoRecurringAmount(format!(
            "contract {} has no positive rent amount",
            contract.id
        )));
    }
    Ok(contract.rent_amount)
}

/// The tenant's active contract covering `on_date`. When several overlap
/// the most recently started one wins.
pub fn active_contract_for<'a>(
    contracts: &'a [Contract],
    tenant_id: &str,
    on_date: NaiveDate,
) -> RentalLedgerResult<&'a Contract> {
    contracts
        .iter()
        .filter(|c| c.tenant_id == tenant_id)
        .filter(|c| c.status == ContractStatus::Active && c.covers(on_date))
        .max_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)))
        .ok_or_else(|| {
            RentalLedgerError::NoRecurringAmount(format!(
                "no active contract for tenant {tenant_id} on {on_date}"
            ))
        })
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Build the allocation plan for a submitted payment.
///
/// Every part is allocated independently from the submission's start
/// period against the contract rent converted into that part's currency
/// (rounded to the minor unit). Any failing part aborts the whole plan.
pub fn plan_payment(
    submission: &PaymentSubmission,
    contract: &Contract,
    config: &EngineConfig,
) -> RentalLedgerResult<ComputationOutput<PaymentPlan>> {
    if submission.parts.is_empty() {
        return Err(RentalLedgerError::validation(
            "parts",
            "At least one payment part is required",
        ));
    }
    if submission.contract_id != contract.id {
        return Err(RentalLedgerError::validation(
            "contract_id",
            format!(
                "Submission targets contract {} but contract {} was supplied",
                submission.contract_id, contract.id
            ),
        ));
    }
    if submission.tenant_id != contract.tenant_id {
        return Err(RentalLedgerError::validation(
            "tenant_id",
            format!(
                "Contract {} belongs to tenant {}, not {}",
                contract.id, contract.tenant_id, submission.tenant_id
            ),
        ));
    }
    let rent = recurring_due(contract)?;
    let normalizer = CurrencyNormalizer::from_config(config);
    let status = if config.auto_approve {
        PaymentStatus::Approved
    } else {
        PaymentStatus::Pending
    };

    let mut warnings = Vec::new();
    let mut parts = Vec::with_capacity(submission.parts.len());
    let mut drafts = Vec::new();
    let mut total_canonical = Decimal::ZERO;

    for (index, part) in submission.parts.iter().enumerate() {
        let part_rate = part.exchange_rate.or(submission.exchange_rate);
        let contract_rate = if contract.currency == part.currency {
            part_rate
        } else {
            submission.exchange_rate
        };
        let due_local = normalizer.round_minor(normalizer.convert(
            rent,
            &contract.currency,
            contract_rate,
            &part.currency,
            part_rate,
        )?);

        let reference = if part.reference.is_empty() {
            submission.reference.clone()
        } else {
            part.reference.clone()
        };
        let request = AllocationRequest {
            amount: part.amount,
            currency: part.currency.clone(),
            start_month: submission.start_month,
            start_year: submission.start_year,
            periodic_due_amount: due_local,
            source_reference: Some(if reference.is_empty() {
                part.currency.code().to_string()
            } else {
                reference.clone()
            }),
        };
        let allocations = allocate_with(config, &request)?;
        let canonical_amount = normalizer.to_canonical(part.amount, &part.currency, part_rate)?;
        total_canonical = total_canonical.checked_add(canonical_amount).ok_or_else(|| {
            RentalLedgerError::validation("parts", "canonical total is out of decimal range")
        })?;

        if let Some(last) = allocations.last().filter(|a| !a.is_full) {
            warnings.push(format!(
                "Part {} leaves {} partially paid ({} of {} {})",
                index + 1,
                last.period(),
                last.amount,
                due_local,
                part.currency
            ));
        }

        for allocation in &allocations {
            drafts.push(draft_for(
                submission,
                allocation,
                part_rate.filter(|_| !normalizer.is_canonical(&part.currency)),
                status,
                &reference,
            )?);
        }

        parts.push(PartPlan {
            part_index: index,
            amount: part.amount,
            currency: part.currency.clone(),
            due_in_part_currency: due_local,
            allocations,
            canonical_amount,
        });
    }

    if parts.len() > 1 {
        warnings.push(format!(
            "{} parts are each allocated from {}-{:02}; periods may be recorded more than once",
            parts.len(),
            submission.start_year,
            submission.start_month
        ));
    }

    info!(
        contract = %contract.id,
        parts = parts.len(),
        drafts = drafts.len(),
        "planned payment"
    );
    debug!(total_canonical = %total_canonical, "payment plan total");

    let plan = PaymentPlan {
        contract_id: contract.id.clone(),
        due_amount: rent,
        due_currency: contract.currency.clone(),
        parts,
        drafts,
        total_canonical,
    };

    Ok(with_metadata(
        "Per-part greedy allocation against contract rent converted to the part currency",
        submission,
        warnings,
        &config.canonical_currency,
        plan,
    ))
}

fn draft_for(
    submission: &PaymentSubmission,
    allocation: &PeriodAllocation,
    exchange_rate: Option<Rate>,
    status: PaymentStatus,
    reference: &str,
) -> RentalLedgerResult<PaymentDraft> {
    let period = allocation.period();
    let concept = if !submission.concept.is_empty() {
        submission.concept.clone()
    } else if allocation.is_full {
        format!("Rent {period}")
    } else {
        format!("Partial rent {period}")
    };
    Ok(PaymentDraft {
        tenant_id: submission.tenant_id.clone(),
        contract_id: submission.contract_id.clone(),
        date: submission.date,
        amount: allocation.amount,
        currency: allocation.currency.clone(),
        exchange_rate,
        billing_period: period.first_day()?,
        status,
        reference: reference.to_string(),
        concept,
    })
}
