use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::currency::CurrencyNormalizer;
use crate::records::{
    build_properties, ingest_expenses, ingest_payments, Contract, ExpenseStatus, PaymentStatus,
    PropertyDirectory, PropertyRecord, RawExpense, RawOwnershipRow, RawPayment, Tenant, Unit,
};
use crate::reporting::aggregate::{aggregate, AggregationResult};
use crate::reporting::filter::{narrow_expenses, narrow_payments, resolve, ScopeFilter};
use crate::error::RentalLedgerError;
use crate::types::{with_metadata, ComputationOutput};
use crate::RentalLedgerResult;

/// Everything a report needs, as fetched from the data store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    pub scope: ScopeFilter,
    #[serde(default)]
    pub payments: Vec<RawPayment>,
    #[serde(default)]
    pub expenses: Vec<RawExpense>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
    #[serde(default)]
    pub ownership: Vec<RawOwnershipRow>,
    /// Count pending payments and expenses as well as settled ones
    #[serde(default)]
    pub include_pending: bool,
    /// Abort on the first malformed row instead of reporting it as a warning
    #[serde(default)]
    pub strict: bool,
}

impl ReportInput {
    pub fn from_json(raw: &str) -> RentalLedgerResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Full reporting pipeline: validate rows, resolve the scope, narrow,
/// then aggregate.
///
/// Only approved payments and paid expenses count unless `include_pending`
/// is set; rejected payments and cancelled expenses never do.
pub fn build_report(
    input: &ReportInput,
    config: &EngineConfig,
) -> RentalLedgerResult<ComputationOutput<AggregationResult>> {
    config.validate()?;

    let payments = ingest_payments(&input.payments);
    let expenses = ingest_expenses(&input.expenses);
    let properties = build_properties(&input.properties, &input.ownership);
    let directory = PropertyDirectory::new(&input.contracts, &input.units, &input.tenants);
    if input.strict {
        if let Some(bad) = payments
            .rejected
            .iter()
            .chain(&expenses.rejected)
            .chain(&properties.rejected)
            .next()
        {
            return Err(RentalLedgerError::InvalidRecord {
                id: bad.id.clone(),
                reason: bad.reason.clone(),
            });
        }
    }
    let scope = resolve(&input.scope, &properties.accepted)?;

    let counted_payments: Vec<_> = payments
        .accepted
        .into_iter()
        .filter(|p| match p.status {
            PaymentStatus::Approved => true,
            PaymentStatus::Pending => input.include_pending,
            PaymentStatus::Rejected => false,
        })
        .collect();
    let counted_expenses: Vec<_> = expenses
        .accepted
        .into_iter()
        .filter(|e| match e.status {
            ExpenseStatus::Paid => true,
            ExpenseStatus::Pending => input.include_pending,
            ExpenseStatus::Cancelled => false,
        })
        .collect();

    let scoped_payments = narrow_payments(&counted_payments, &directory, &scope);
    let scoped_expenses = narrow_expenses(&counted_expenses, &scope);
    let narrowed_out = (counted_payments.len() - scoped_payments.len())
        + (counted_expenses.len() - scoped_expenses.len());
    debug!(
        payments = scoped_payments.len(),
        expenses = scoped_expenses.len(),
        out_of_scope = narrowed_out,
        "narrowed report inputs"
    );

    let normalizer = CurrencyNormalizer::from_config(config);
    let mut result = aggregate(
        &scoped_payments,
        &scoped_expenses,
        &directory,
        &properties.accepted,
        &scope,
        &normalizer,
    );
    result.reconciliation.out_of_scope_count += narrowed_out;

    let mut warnings: Vec<String> = Vec::new();
    for (kind, rejected) in [
        ("payment", &payments.rejected),
        ("expense", &expenses.rejected),
        ("ownership row", &properties.rejected),
    ] {
        warnings.extend(
            rejected
                .iter()
                .map(|r| format!("Rejected {kind} {}: {}", r.id, r.reason)),
        );
    }
    warnings.extend(result.warnings.iter().map(ToString::to_string));

    info!(
        year = input.scope.year,
        properties = result.per_property.len(),
        owners = result.per_owner.len(),
        warnings = warnings.len(),
        "built revenue report"
    );

    Ok(with_metadata(
        "Canonical-currency net income per property, distributed by ownership percentage",
        &input.scope,
        warnings,
        &config.canonical_currency,
        result,
    ))
}
