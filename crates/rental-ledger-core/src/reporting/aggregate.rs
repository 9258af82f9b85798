use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

use crate::currency::CurrencyNormalizer;
use crate::records::{Expense, OwnershipEntry, Payment, Property, PropertyDirectory};
use crate::reporting::filter::ResolvedScope;
use crate::types::{BillingPeriod, Currency, Money, Percent, Rate};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One payment as it appears on a line-item report. Amounts keep the
/// currency they were received in; `canonical_amount` is what entered the
/// totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub payment_id: String,
    pub date: NaiveDate,
    pub tenant_name: String,
    pub concept: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    /// Amount received, in `currency`
    pub credit: Money,
    pub currency: Currency,
    /// Only present for non-canonical currencies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    /// `None` when the payment could not be normalised
    pub canonical_amount: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyLedger {
    pub currency: Currency,
    pub entries: Vec<LedgerEntry>,
    /// Sum of `credit`, in `currency`
    pub total_original: Money,
    /// Sum of the canonical amounts that could be computed
    pub total_canonical: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub property_id: String,
    pub property_name: String,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    pub payment_count: usize,
    pub expense_count: usize,
    /// Sum of ownership percentages; 0 when nobody owns the property
    pub ownership_total: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerPropertyShare {
    pub property_id: String,
    pub percentage: Percent,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerShare {
    pub owner_id: String,
    pub owner_name: String,
    /// Canonical currency
    pub amount: Money,
    /// Share of the total distributed across the scope, 0–100
    pub percentage_of_total: Percent,
    pub properties: Vec<OwnerPropertyShare>,
}

/// Net income of properties nobody owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnassignedBucket {
    pub property_ids: Vec<String>,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Payment,
    Expense,
}

/// A record left out of the canonical totals, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub record_id: String,
    pub kind: RecordKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
}

/// Where every unit of net income ended up.
///
/// `total_net == distributed_total + unassigned_total + undistributed_total
///  + other_owners_total`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub total_income: Money,
    pub total_expense: Money,
    pub total_net: Money,
    /// Credited to the owners listed in `per_owner`
    pub distributed_total: Money,
    /// Net of properties without owners
    pub unassigned_total: Money,
    /// Net not covered because ownership sums to less than 100%
    /// (negative when it sums to more)
    pub undistributed_total: Money,
    /// Shares of co-owners left out by an owner filter
    pub other_owners_total: Money,
    pub skipped_count: usize,
    pub out_of_scope_count: usize,
}

impl Reconciliation {
    /// Absolute gap between net income and where it was accounted for.
    pub fn discrepancy(&self) -> Money {
        (self.total_net
            - self.distributed_total
            - self.unassigned_total
            - self.undistributed_total
            - self.other_owners_total)
            .abs()
    }
}

/// Non-fatal findings raised while aggregating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportWarning {
    UnassignedOwnership { property_id: String, net: Money },
    OwnershipOverAllocated { property_id: String, total: Percent },
    SkippedRecord { record_id: String, reason: String },
    DistributionOutOfRange { property_id: String, net: Money },
}

impl fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportWarning::UnassignedOwnership { property_id, net } => write!(
                f,
                "Property {property_id} has net income {net} but no registered owners; reported as unassigned"
            ),
            ReportWarning::OwnershipOverAllocated { property_id, total } => write!(
                f,
                "Ownership of property {property_id} sums to {total}%, more than 100%"
            ),
            ReportWarning::SkippedRecord { record_id, reason } => {
                write!(f, "Record {record_id} excluded from totals: {reason}")
            }
            ReportWarning::DistributionOutOfRange { property_id, net } => write!(
                f,
                "Net income {net} of property {property_id} is out of range for owner distribution; left out of owner totals"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub ledger_by_currency: Vec<CurrencyLedger>,
    pub per_property: Vec<PropertySummary>,
    pub per_owner: Vec<OwnerShare>,
    pub unassigned: UnassignedBucket,
    pub monthly: Vec<MonthlyTotal>,
    pub skipped: Vec<SkippedRecord>,
    pub reconciliation: Reconciliation,
    pub warnings: Vec<ReportWarning>,
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PropertyTotals {
    income: Money,
    expense: Money,
    payment_count: usize,
    expense_count: usize,
}

struct OwnerTotals {
    owner_name: String,
    amount: Money,
    properties: Vec<OwnerPropertyShare>,
}

#[derive(Default)]
struct LedgerTotals {
    entries: Vec<LedgerEntry>,
    total_original: Money,
    total_canonical: Money,
}

#[derive(Default)]
struct MonthTotals {
    income: Money,
    expense: Money,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregate payments and expenses into ledgers, per-property net income
/// and per-owner distributions.
///
/// Inputs are expected to be narrowed to `scope` already; every record is
/// checked again and anything outside is ignored and counted. Status
/// filtering (only approved payments count as income) is the caller's job.
pub fn aggregate(
    payments: &[Payment],
    expenses: &[Expense],
    directory: &PropertyDirectory,
    properties: &[Property],
    scope: &ResolvedScope,
    normalizer: &CurrencyNormalizer,
) -> AggregationResult {
    let mut totals: HashMap<String, PropertyTotals> = HashMap::new();
    let mut months: BTreeMap<BillingPeriod, MonthTotals> = BTreeMap::new();
    let mut ledgers: BTreeMap<Currency, LedgerTotals> = BTreeMap::new();
    let mut skipped: Vec<SkippedRecord> = Vec::new();
    let mut out_of_scope = 0usize;
    // Sum of every counted amount; bounds all per-property and monthly totals.
    let mut gross = Decimal::ZERO;

    // -- Payments: ledger lines and canonical income --
    for payment in payments {
        let property_id = directory.property_of(payment);
        if !scope.admits(payment.date, property_id) {
            out_of_scope += 1;
            continue;
        }

        let ledger = ledgers.entry(payment.currency.clone()).or_default();
        let Some(total_original) = ledger.total_original.checked_add(payment.amount) else {
            skipped.push(SkippedRecord {
                record_id: payment.id.clone(),
                kind: RecordKind::Payment,
                reason: format!(
                    "amount {} {} is out of range for the ledger total",
                    payment.amount, payment.currency
                ),
            });
            continue;
        };
        ledger.total_original = total_original;

        let counted = match (
            property_id,
            normalizer.to_canonical(payment.amount, &payment.currency, payment.exchange_rate),
        ) {
            (None, _) => Err(format!(
                "contract {} does not resolve to a property",
                payment.contract_id
            )),
            (Some(_), Err(e)) => Err(e.to_string()),
            (Some(pid), Ok(amount)) => match gross.checked_add(amount.abs()) {
                Some(next) => {
                    gross = next;
                    Ok((pid, amount))
                }
                None => Err(format!(
                    "canonical amount {amount} is out of range for the report totals"
                )),
            },
        };
        let canonical_amount = match counted {
            Ok((pid, amount)) => {
                let t = totals.entry(pid.to_string()).or_default();
                t.income += amount;
                t.payment_count += 1;
                months
                    .entry(BillingPeriod::of(payment.date))
                    .or_default()
                    .income += amount;
                ledger.total_canonical += amount;
                Some(amount)
            }
            Err(reason) => {
                skipped.push(SkippedRecord {
                    record_id: payment.id.clone(),
                    kind: RecordKind::Payment,
                    reason,
                });
                None
            }
        };

        ledger.entries.push(LedgerEntry {
            payment_id: payment.id.clone(),
            date: payment.date,
            tenant_name: directory
                .tenant_name(&payment.tenant_id)
                .unwrap_or(&payment.tenant_id)
                .to_string(),
            concept: payment.concept.clone(),
            reference: payment.reference.clone(),
            property_id: property_id.map(str::to_string),
            credit: payment.amount,
            currency: payment.currency.clone(),
            rate: payment
                .exchange_rate
                .filter(|_| !normalizer.is_canonical(&payment.currency)),
            canonical_amount,
        });
    }

    // -- Expenses: already canonical --
    for expense in expenses {
        if !scope.admits(expense.date, Some(expense.property_id.as_str())) {
            out_of_scope += 1;
            continue;
        }
        let Some(next) = gross.checked_add(expense.amount.abs()) else {
            skipped.push(SkippedRecord {
                record_id: expense.id.clone(),
                kind: RecordKind::Expense,
                reason: format!("amount {} is out of range for the report totals", expense.amount),
            });
            continue;
        };
        gross = next;
        let t = totals.entry(expense.property_id.clone()).or_default();
        t.expense += expense.amount;
        t.expense_count += 1;
        months
            .entry(BillingPeriod::of(expense.date))
            .or_default()
            .expense += expense.amount;
    }

    // -- Per-property net: every in-scope property, then any property the
    //    records reference that the ownership map does not know --
    let known: HashMap<&str, &Property> = properties.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut order: Vec<(String, String)> = properties
        .iter()
        .filter(|p| scope.admits_property(Some(p.id.as_str())))
        .map(|p| (p.id.clone(), p.name.clone()))
        .collect();
    let mut unknown: Vec<String> = totals
        .keys()
        .filter(|id| !known.contains_key(id.as_str()))
        .cloned()
        .collect();
    unknown.sort();
    order.extend(unknown.into_iter().map(|id| (id.clone(), id)));

    let mut warnings: Vec<ReportWarning> = Vec::new();
    let mut per_property = Vec::with_capacity(order.len());
    let mut owners: BTreeMap<String, OwnerTotals> = BTreeMap::new();
    let mut unassigned = UnassignedBucket::default();
    let mut undistributed_total = Decimal::ZERO;
    let mut other_owners_total = Decimal::ZERO;
    let mut distributed_total = Decimal::ZERO;
    // Sum over distributed properties of |net| scaled by max(ownership, 100%);
    // bounds every owner and distribution total.
    let mut exposure = Decimal::ZERO;

    for (property_id, property_name) in order {
        let t = totals.remove(&property_id).unwrap_or_default();
        let net = t.income - t.expense;
        let owner_entries = known
            .get(property_id.as_str())
            .map(|p| p.owners.as_slice())
            .unwrap_or(&[]);
        let ownership_total: Percent = owner_entries.iter().map(|o| o.percentage).sum();

        // -- Owner distribution --
        if owner_entries.is_empty() {
            unassigned.property_ids.push(property_id.clone());
            unassigned.total += net;
            if !net.is_zero() {
                warn!(property = %property_id, net = %net, "net income with no registered owners");
                warnings.push(ReportWarning::UnassignedOwnership {
                    property_id: property_id.clone(),
                    net,
                });
            }
        } else {
            if ownership_total > Decimal::ONE_HUNDRED {
                warnings.push(ReportWarning::OwnershipOverAllocated {
                    property_id: property_id.clone(),
                    total: ownership_total,
                });
            }
            match split_net(net, owner_entries, ownership_total, exposure) {
                Some(split) => {
                    exposure = split.exposure;
                    for (entry, share) in owner_entries.iter().zip(split.shares) {
                        if !scope.credits_owner(&entry.owner_id) {
                            other_owners_total += share;
                            continue;
                        }
                        let owner = owners
                            .entry(entry.owner_id.clone())
                            .or_insert_with(|| OwnerTotals {
                                owner_name: entry.owner_name.clone(),
                                amount: Decimal::ZERO,
                                properties: Vec::new(),
                            });
                        owner.amount += share;
                        distributed_total += share;
                        owner.properties.push(OwnerPropertyShare {
                            property_id: property_id.clone(),
                            percentage: entry.percentage,
                            amount: share,
                        });
                    }
                    undistributed_total += split.uncovered;
                }
                None => {
                    warn!(property = %property_id, net = %net, "net income out of range for distribution");
                    warnings.push(ReportWarning::DistributionOutOfRange {
                        property_id: property_id.clone(),
                        net,
                    });
                }
            }
        }

        per_property.push(PropertySummary {
            property_id,
            property_name,
            income: t.income,
            expense: t.expense,
            net,
            payment_count: t.payment_count,
            expense_count: t.expense_count,
            ownership_total,
        });
    }

    // -- Percentage of total --
    let mut per_owner: Vec<OwnerShare> = owners
        .into_iter()
        .map(|(owner_id, o)| OwnerShare {
            owner_id,
            owner_name: o.owner_name,
            amount: o.amount,
            percentage_of_total: o
                .amount
                .checked_div(distributed_total)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ZERO),
            properties: o.properties,
        })
        .collect();
    per_owner.sort_by(|a, b| {
        a.owner_name
            .cmp(&b.owner_name)
            .then_with(|| a.owner_id.cmp(&b.owner_id))
    });

    // -- Ledgers: canonical currency first, then by code --
    let mut ledger_by_currency: Vec<CurrencyLedger> = ledgers
        .into_iter()
        .map(|(currency, mut ledger)| {
            ledger
                .entries
                .sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.payment_id.cmp(&b.payment_id)));
            CurrencyLedger {
                currency,
                entries: ledger.entries,
                total_original: ledger.total_original,
                total_canonical: ledger.total_canonical,
            }
        })
        .collect();
    ledger_by_currency.sort_by_key(|l| !normalizer.is_canonical(&l.currency));

    // -- Monthly breakdown over every selected month --
    let monthly: Vec<MonthlyTotal> = scope
        .months
        .iter()
        .map(|&month| {
            let key = BillingPeriod {
                year: scope.year,
                month,
            };
            let m = months.remove(&key).unwrap_or_default();
            MonthlyTotal {
                year: scope.year,
                month,
                income: m.income,
                expense: m.expense,
                net: m.income - m.expense,
            }
        })
        .collect();

    for s in &skipped {
        warn!(record = %s.record_id, reason = %s.reason, "record excluded from report totals");
        warnings.push(ReportWarning::SkippedRecord {
            record_id: s.record_id.clone(),
            reason: s.reason.clone(),
        });
    }

    let total_income: Money = per_property.iter().map(|p| p.income).sum();
    let total_expense: Money = per_property.iter().map(|p| p.expense).sum();
    let reconciliation = Reconciliation {
        total_income,
        total_expense,
        total_net: total_income - total_expense,
        distributed_total,
        unassigned_total: unassigned.total,
        undistributed_total,
        other_owners_total,
        skipped_count: skipped.len(),
        out_of_scope_count: out_of_scope,
    };

    debug!(
        properties = per_property.len(),
        owners = per_owner.len(),
        skipped = reconciliation.skipped_count,
        out_of_scope = reconciliation.out_of_scope_count,
        total_net = %reconciliation.total_net,
        "aggregated revenue"
    );

    AggregationResult {
        ledger_by_currency,
        per_property,
        per_owner,
        unassigned,
        monthly,
        skipped,
        reconciliation,
        warnings,
    }
}

struct NetSplit {
    shares: Vec<Money>,
    uncovered: Money,
    exposure: Money,
}

/// Split `net` across `owners` by percentage, with the remainder up to 100%
/// as `uncovered`. `None` when the shares would push the running `exposure`
/// out of decimal range.
fn split_net(
    net: Money,
    owners: &[OwnershipEntry],
    ownership_total: Percent,
    exposure: Money,
) -> Option<NetSplit> {
    let scale = ownership_total.max(Decimal::ONE_HUNDRED);
    let exposure = exposure.checked_add(share_of(net.abs(), scale)?)?;
    let shares = owners
        .iter()
        .map(|o| share_of(net, o.percentage))
        .collect::<Option<Vec<_>>>()?;
    let uncovered = share_of(net, Decimal::ONE_HUNDRED - ownership_total)?;
    Some(NetSplit {
        shares,
        uncovered,
        exposure,
    })
}

/// `percentage`% of `amount`, dividing first when the product alone would
/// leave decimal range.
fn share_of(amount: Money, percentage: Percent) -> Option<Money> {
    match amount.checked_mul(percentage) {
        Some(product) => Some(product / Decimal::ONE_HUNDRED),
        None => (amount / Decimal::ONE_HUNDRED).checked_mul(percentage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        Contract, ContractStatus, ExpenseStatus, OwnershipEntry, PaymentStatus, Tenant, Unit,
    };
    use crate::reporting::filter::{resolve, ScopeFilter};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn directory() -> PropertyDirectory {
        let contract = |id: &str, unit: &str| Contract {
            id: id.into(),
            tenant_id: format!("t-{id}"),
            unit_id: unit.into(),
            rent_amount: dec!(100),
            currency: Currency::USD,
            start_date: date(2024, 1, 1),
            end_date: None,
            status: ContractStatus::Active,
        };
        PropertyDirectory::new(
            &[contract("c1", "u1"), contract("c2", "u2"), contract("c3", "u-orphan")],
            &[
                Unit { id: "u1".into(), property_id: "a".into() },
                Unit { id: "u2".into(), property_id: "b".into() },
            ],
            &[Tenant { id: "t-c1".into(), name: "Luisa Pérez".into() }],
        )
    }

    fn owner(id: &str, pct: Decimal) -> OwnershipEntry {
        OwnershipEntry {
            owner_id: id.into(),
            owner_name: id.to_uppercase(),
            percentage: pct,
        }
    }

    fn property(id: &str, owners: Vec<OwnershipEntry>) -> Property {
        Property { id: id.into(), name: format!("Edificio {id}"), owners }
    }

    fn payment(id: &str, contract: &str, amount: Decimal, currency: Currency, rate: Option<Decimal>) -> Payment {
        Payment {
            id: id.into(),
            tenant_id: format!("t-{contract}"),
            contract_id: contract.into(),
            date: date(2024, 3, 5),
            amount,
            currency,
            exchange_rate: rate,
            billing_period: None,
            status: PaymentStatus::Approved,
            reference: String::new(),
            concept: "Rent".into(),
        }
    }

    fn expense(id: &str, property_id: &str, amount: Decimal) -> Expense {
        Expense {
            id: id.into(),
            property_id: property_id.into(),
            amount,
            category: "maintenance".into(),
            date: date(2024, 3, 20),
            status: ExpenseStatus::Paid,
        }
    }

    fn run(payments: &[Payment], expenses: &[Expense], properties: &[Property], scope: ScopeFilter) -> AggregationResult {
        let resolved = resolve(&scope, properties).unwrap();
        aggregate(payments, expenses, &directory(), properties, &resolved, &CurrencyNormalizer::default())
    }

    #[test]
    fn test_single_owner_gets_full_net() {
        let props = vec![property("a", vec![owner("o1", dec!(100))])];
        let out = run(
            &[payment("p1", "c1", dec!(1000), Currency::USD, None)],
            &[expense("e1", "a", dec!(200))],
            &props,
            ScopeFilter::year(2024).with_months([3]),
        );
        assert_eq!(out.per_property[0].net, dec!(800));
        assert_eq!(out.per_owner.len(), 1);
        assert_eq!(out.per_owner[0].amount, dec!(800));
        assert_eq!(out.per_owner[0].percentage_of_total, dec!(100));
        assert_eq!(out.reconciliation.discrepancy(), Decimal::ZERO);
    }

    #[test]
    fn test_sixty_forty_split() {
        let props = vec![property("a", vec![owner("o1", dec!(60)), owner("o2", dec!(40))])];
        let out = run(
            &[payment("p1", "c1", dec!(700), Currency::USD, None)],
            &[expense("e1", "a", dec!(200))],
            &props,
            ScopeFilter::year(2024),
        );
        let amounts: Vec<Decimal> = out.per_owner.iter().map(|o| o.amount).collect();
        assert_eq!(amounts, vec![dec!(300), dec!(200)]);
        assert_eq!(amounts.iter().copied().sum::<Decimal>(), out.per_property[0].net);
        assert_eq!(out.per_owner[0].percentage_of_total, dec!(60));
    }

    #[test]
    fn test_ves_ledger_keeps_original_currency() {
        let props = vec![property("a", vec![owner("o1", dec!(100))])];
        let out = run(
            &[
                payment("p1", "c1", dec!(4000), Currency::VES, Some(dec!(40))),
                payment("p2", "c1", dec!(50), Currency::USD, Some(dec!(40))),
            ],
            &[],
            &props,
            ScopeFilter::year(2024),
        );
        assert_eq!(out.ledger_by_currency.len(), 2);
        let usd = &out.ledger_by_currency[0];
        assert_eq!(usd.currency, Currency::USD);
        assert_eq!(usd.entries[0].rate, None);
        assert_eq!(usd.entries[0].tenant_name, "Luisa Pérez");
        let ves = &out.ledger_by_currency[1];
        assert_eq!(ves.entries[0].credit, dec!(4000));
        assert_eq!(ves.entries[0].currency, Currency::VES);
        assert_eq!(ves.entries[0].rate, Some(dec!(40)));
        assert_eq!(ves.entries[0].canonical_amount, Some(dec!(100)));
        assert_eq!(ves.total_original, dec!(4000));
        assert_eq!(out.per_property[0].income, dec!(150));
    }

    #[test]
    fn test_missing_rate_skipped_and_counted_not_zeroed() {
        let props = vec![property("a", vec![owner("o1", dec!(100))])];
        let out = run(
            &[
                payment("p1", "c1", dec!(4000), Currency::VES, None),
                payment("p2", "c1", dec!(100), Currency::USD, None),
            ],
            &[],
            &props,
            ScopeFilter::year(2024),
        );
        assert_eq!(out.per_property[0].income, dec!(100));
        assert_eq!(out.per_property[0].payment_count, 1);
        assert_eq!(out.reconciliation.skipped_count, 1);
        assert_eq!(out.skipped[0].record_id, "p1");
        assert_eq!(out.skipped[0].kind, RecordKind::Payment);
        let ves = out
            .ledger_by_currency
            .iter()
            .find(|l| l.currency == Currency::VES)
            .unwrap();
        assert_eq!(ves.entries[0].canonical_amount, None);
        assert_eq!(ves.total_canonical, Decimal::ZERO);
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, ReportWarning::SkippedRecord { record_id, .. } if record_id == "p1")));
    }

    #[test]
    fn test_unresolvable_payment_is_skipped() {
        let out = run(
            &[payment("p9", "c3", dec!(100), Currency::USD, None)],
            &[],
            &[],
            ScopeFilter::year(2024),
        );
        assert_eq!(out.skipped.len(), 1);
        assert!(out.skipped[0].reason.contains("does not resolve"));
        assert_eq!(out.reconciliation.total_income, Decimal::ZERO);

        let usd = &out.ledger_by_currency[0];
        assert_eq!(usd.total_original, dec!(100));
        assert_eq!(usd.entries[0].canonical_amount, None);
        assert_eq!(usd.total_canonical, out.reconciliation.total_income);
    }

    #[test]
    fn test_out_of_range_payment_is_skipped_not_fatal() {
        let props = vec![property("a", vec![owner("o1", dec!(100))])];
        let out = run(
            &[
                payment("p1", "c1", Decimal::MAX, Currency::VES, Some(dec!(0.5))),
                payment("p2", "c1", dec!(100), Currency::USD, None),
            ],
            &[],
            &props,
            ScopeFilter::year(2024),
        );
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].record_id, "p1");
        assert_eq!(out.reconciliation.total_income, dec!(100));
        assert_eq!(out.per_owner[0].amount, dec!(100));

        let ves = out
            .ledger_by_currency
            .iter()
            .find(|l| l.currency == Currency::VES)
            .unwrap();
        assert_eq!(ves.entries[0].canonical_amount, None);
        assert_eq!(ves.total_canonical, Decimal::ZERO);
    }

    #[test]
    fn test_ledger_total_overflow_skips_the_payment() {
        let props = vec![property("a", vec![owner("o1", dec!(100))])];
        let out = run(
            &[
                payment("p1", "c1", Decimal::MAX, Currency::USD, None),
                payment("p2", "c1", dec!(1), Currency::USD, None),
            ],
            &[],
            &props,
            ScopeFilter::year(2024),
        );
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].record_id, "p2");
        assert_eq!(out.ledger_by_currency[0].entries.len(), 1);
        assert_eq!(out.reconciliation.total_income, Decimal::MAX);
        assert_eq!(out.per_owner[0].amount, Decimal::MAX);
        assert_eq!(out.reconciliation.discrepancy(), Decimal::ZERO);
    }

    #[test]
    fn test_over_allocated_net_out_of_range_is_not_distributed() {
        let props = vec![property("a", vec![owner("o1", dec!(100)), owner("o2", dec!(100))])];
        let out = run(
            &[payment("p1", "c1", Decimal::MAX, Currency::USD, None)],
            &[],
            &props,
            ScopeFilter::year(2024),
        );
        assert_eq!(out.per_property[0].net, Decimal::MAX);
        assert!(out.per_owner.is_empty());
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, ReportWarning::DistributionOutOfRange { property_id, .. } if property_id == "a")));
    }

    #[test]
    fn test_ownerless_property_reported_as_unassigned() {
        let props = vec![
            property("a", vec![owner("o1", dec!(100))]),
            property("b", vec![]),
        ];
        let out = run(
            &[
                payment("p1", "c1", dec!(500), Currency::USD, None),
                payment("p2", "c2", dec!(300), Currency::USD, None),
            ],
            &[],
            &props,
            ScopeFilter::year(2024),
        );
        assert_eq!(out.unassigned.property_ids, vec!["b".to_string()]);
        assert_eq!(out.unassigned.total, dec!(300));
        assert_eq!(out.reconciliation.distributed_total, dec!(500));
        assert_eq!(out.reconciliation.total_net, dec!(800));
        assert_eq!(out.reconciliation.discrepancy(), Decimal::ZERO);
        assert!(out.warnings.iter().any(|w| matches!(
            w,
            ReportWarning::UnassignedOwnership { property_id, .. } if property_id == "b"
        )));
    }

    #[test]
    fn test_under_and_over_allocated_ownership_reconciles() {
        let props = vec![
            property("a", vec![owner("o1", dec!(50))]),
            property("b", vec![owner("o2", dec!(80)), owner("o3", dec!(40))]),
        ];
        let out = run(
            &[
                payment("p1", "c1", dec!(100), Currency::USD, None),
                payment("p2", "c2", dec!(100), Currency::USD, None),
            ],
            &[],
            &props,
            ScopeFilter::year(2024),
        );
        assert_eq!(out.reconciliation.distributed_total, dec!(170));
        assert_eq!(out.reconciliation.undistributed_total, dec!(30));
        assert_eq!(out.reconciliation.discrepancy(), Decimal::ZERO);
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, ReportWarning::OwnershipOverAllocated { .. })));
    }

    #[test]
    fn test_owner_filter_credits_only_selected_owner() {
        let props = vec![property("a", vec![owner("o1", dec!(60)), owner("o2", dec!(40))])];
        let out = run(
            &[payment("p1", "c1", dec!(500), Currency::USD, None)],
            &[],
            &props,
            ScopeFilter::year(2024).with_owners(["o2"]),
        );
        assert_eq!(out.per_owner.len(), 1);
        assert_eq!(out.per_owner[0].owner_id, "o2");
        assert_eq!(out.per_owner[0].amount, dec!(200));
        assert_eq!(out.per_owner[0].percentage_of_total, dec!(100));
        assert_eq!(out.reconciliation.other_owners_total, dec!(300));
        assert_eq!(out.reconciliation.discrepancy(), Decimal::ZERO);
    }

    #[test]
    fn test_out_of_scope_records_counted() {
        let props = vec![property("a", vec![owner("o1", dec!(100))])];
        let mut february = payment("p2", "c1", dec!(100), Currency::USD, None);
        february.date = date(2024, 2, 10);
        let out = run(
            &[payment("p1", "c1", dec!(100), Currency::USD, None), february],
            &[expense("e1", "b", dec!(10))],
            &props,
            ScopeFilter::year(2024).with_months([1, 3]).with_properties(["a"]),
        );
        assert_eq!(out.reconciliation.total_income, dec!(100));
        assert_eq!(out.reconciliation.out_of_scope_count, 2);
        let months: Vec<u32> = out.monthly.iter().map(|m| m.month).collect();
        assert_eq!(months, vec![1, 3]);
        assert_eq!(out.monthly[1].income, dec!(100));
    }

    #[test]
    fn test_zero_distribution_reports_zero_percent() {
        let props = vec![property("a", vec![owner("o1", dec!(100))])];
        let out = run(&[], &[], &props, ScopeFilter::year(2024));
        assert_eq!(out.per_property.len(), 1);
        assert_eq!(out.per_property[0].net, Decimal::ZERO);
        assert_eq!(out.per_owner[0].percentage_of_total, Decimal::ZERO);
        assert!(out.warnings.is_empty());
    }
}
