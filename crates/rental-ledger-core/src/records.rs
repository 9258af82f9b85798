//! Typed records consumed by the engine, and the ingestion boundary that
//! turns loosely typed data-store rows into them.
//!
//! The data store hands back rows where any column may be null, a string
//! where a number was expected, or a status nobody recognises. Rows are
//! validated here, once; anything malformed is rejected with a reason and
//! never reaches the allocation or reporting code.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::types::{BillingPeriod, Currency, Money, Percent, Rate};

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    /// `paid` is the label older rows use for approved payments.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "approved" | "paid" => Some(PaymentStatus::Approved),
            "rejected" => Some(PaymentStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Paid,
    Cancelled,
}

impl ExpenseStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ExpenseStatus::Pending),
            "paid" | "approved" => Some(ExpenseStatus::Paid),
            "cancelled" | "canceled" => Some(ExpenseStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Expired,
}

/// A received payment, one row per billing period once committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub tenant_id: String,
    pub contract_id: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub currency: Currency,
    /// Non-canonical units per canonical unit; required to normalise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<BillingPeriod>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub concept: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub tenant_id: String,
    pub unit_id: String,
    /// Periodic due amount, in `currency`.
    pub rent_amount: Money,
    #[serde(default)]
    pub currency: Currency,
    pub start_date: NaiveDate,
    /// `None` means the contract runs indefinitely.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
}

impl Contract {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub property_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

/// One owner's stake in a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipEntry {
    pub owner_id: String,
    pub owner_name: String,
    /// 0–100
    pub percentage: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owners: Vec<OwnershipEntry>,
}

impl Property {
    pub fn ownership_total(&self) -> Percent {
        self.owners.iter().map(|o| o.percentage).sum()
    }

    pub fn has_owner_in<'a>(&self, mut owner_ids: impl Iterator<Item = &'a String>) -> bool {
        owner_ids.any(|id| self.owners.iter().any(|o| &o.owner_id == id))
    }
}

/// A property expense; amounts are already in the canonical currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub property_id: String,
    pub amount: Money,
    #[serde(default)]
    pub category: String,
    pub date: NaiveDate,
    pub status: ExpenseStatus,
}

// ---------------------------------------------------------------------------
// Property directory: contract -> unit -> property, tenant names
// ---------------------------------------------------------------------------

/// Lookup tables resolving which property a payment belongs to.
#[derive(Debug, Clone, Default)]
pub struct PropertyDirectory {
    contract_units: HashMap<String, String>,
    unit_properties: HashMap<String, String>,
    tenant_names: HashMap<String, String>,
}

impl PropertyDirectory {
    pub fn new(contracts: &[Contract], units: &[Unit], tenants: &[Tenant]) -> Self {
        PropertyDirectory {
            contract_units: contracts
                .iter()
                .map(|c| (c.id.clone(), c.unit_id.clone()))
                .collect(),
            unit_properties: units
                .iter()
                .map(|u| (u.id.clone(), u.property_id.clone()))
                .collect(),
            tenant_names: tenants
                .iter()
                .map(|t| (t.id.clone(), t.name.clone()))
                .collect(),
        }
    }

    pub fn property_of_contract(&self, contract_id: &str) -> Option<&str> {
        let unit = self.contract_units.get(contract_id)?;
        self.unit_properties.get(unit).map(String::as_str)
    }

    pub fn property_of(&self, payment: &Payment) -> Option<&str> {
        self.property_of_contract(&payment.contract_id)
    }

    pub fn tenant_name(&self, tenant_id: &str) -> Option<&str> {
        self.tenant_names.get(tenant_id).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// A row that failed validation, with the reason it was refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub id: String,
    pub reason: String,
}

/// Outcome of validating a batch of raw rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingested<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Ingested {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPayment {
    pub id: Option<String>,
    pub tenant_id: Option<String>,
    pub contract_id: Option<String>,
    pub date: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub billing_period: Option<String>,
    pub status: Option<String>,
    pub reference: Option<String>,
    pub concept: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawExpense {
    pub id: Option<String>,
    pub property_id: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOwnershipRow {
    pub property_id: Option<String>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub percentage: Option<Decimal>,
}

/// A property row without its owners; owners arrive as separate rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub name: String,
}

/// Accepts `YYYY-MM-DD` as well as full timestamps (`2024-03-05T10:00:00Z`),
/// keeping only the calendar date.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("missing {field}")),
    }
}

fn positive(value: Option<Decimal>, field: &str) -> Result<Decimal, String> {
    match value {
        Some(v) if v > Decimal::ZERO => Ok(v),
        Some(v) => Err(format!("{field} must be positive, got {v}")),
        None => Err(format!("missing {field}")),
    }
}

fn validate_payment(raw: &RawPayment, id: &str) -> Result<Payment, String> {
    let date_raw = required(&raw.date, "date")?;
    let date = parse_date(date_raw).ok_or_else(|| format!("unparseable date '{date_raw}'"))?;
    let currency_raw = required(&raw.currency, "currency")?;
    let currency = Currency::parse(currency_raw)
        .ok_or_else(|| format!("unknown currency '{currency_raw}'"))?;
    let status_raw = required(&raw.status, "status")?;
    let status = PaymentStatus::parse(status_raw)
        .ok_or_else(|| format!("unknown status '{status_raw}'"))?;
    let billing_period = match raw.billing_period.as_deref() {
        Some(p) if !p.trim().is_empty() => Some(BillingPeriod::of(
            parse_date(p).ok_or_else(|| format!("unparseable billing_period '{p}'"))?,
        )),
        _ => None,
    };
    Ok(Payment {
        id: id.to_string(),
        tenant_id: required(&raw.tenant_id, "tenant_id")?.to_string(),
        contract_id: required(&raw.contract_id, "contract_id")?.to_string(),
        date,
        amount: positive(raw.amount, "amount")?,
        currency,
        exchange_rate: raw.exchange_rate,
        billing_period,
        status,
        reference: raw.reference.clone().unwrap_or_default(),
        concept: raw.concept.clone().unwrap_or_default(),
    })
}

fn validate_expense(raw: &RawExpense, id: &str) -> Result<Expense, String> {
    let date_raw = required(&raw.date, "date")?;
    let date = parse_date(date_raw).ok_or_else(|| format!("unparseable date '{date_raw}'"))?;
    let status_raw = required(&raw.status, "status")?;
    let status = ExpenseStatus::parse(status_raw)
        .ok_or_else(|| format!("unknown status '{status_raw}'"))?;
    Ok(Expense {
        id: id.to_string(),
        property_id: required(&raw.property_id, "property_id")?.to_string(),
        amount: positive(raw.amount, "amount")?,
        category: raw.category.clone().unwrap_or_default(),
        date,
        status,
    })
}

/// Rows without an id are labelled by their position so rejections stay
/// traceable.
fn row_id(id: &Option<String>, index: usize) -> String {
    match id.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => format!("#{index}"),
    }
}

pub fn ingest_payments(raw: &[RawPayment]) -> Ingested<Payment> {
    let mut out = Ingested::default();
    for (index, row) in raw.iter().enumerate() {
        let id = row_id(&row.id, index);
        match validate_payment(row, &id) {
            Ok(payment) => out.accepted.push(payment),
            Err(reason) => out.rejected.push(RejectedRecord { id, reason }),
        }
    }
    debug!(
        accepted = out.accepted.len(),
        rejected = out.rejected.len(),
        "ingested payments"
    );
    out
}

pub fn ingest_expenses(raw: &[RawExpense]) -> Ingested<Expense> {
    let mut out = Ingested::default();
    for (index, row) in raw.iter().enumerate() {
        let id = row_id(&row.id, index);
        match validate_expense(row, &id) {
            Ok(expense) => out.accepted.push(expense),
            Err(reason) => out.rejected.push(RejectedRecord { id, reason }),
        }
    }
    debug!(
        accepted = out.accepted.len(),
        rejected = out.rejected.len(),
        "ingested expenses"
    );
    out
}

fn validate_ownership_row<'a>(
    row: &'a RawOwnershipRow,
    properties: &[PropertyRecord],
) -> Result<(&'a str, OwnershipEntry), String> {
    let property_id = required(&row.property_id, "property_id")?;
    if !properties.iter().any(|p| p.id == property_id) {
        return Err(format!("unknown property '{property_id}'"));
    }
    let owner_id = required(&row.owner_id, "owner_id")?;
    let percentage = row.percentage.ok_or("missing percentage")?;
    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(format!("percentage must be within 0..=100, got {percentage}"));
    }
    let owner_name = match row.owner_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => owner_id.to_string(),
    };
    Ok((
        property_id,
        OwnershipEntry {
            owner_id: owner_id.to_string(),
            owner_name,
            percentage,
        },
    ))
}

/// Attach ownership rows to their properties. Properties keep input order;
/// owners keep row order.
pub fn build_properties(
    properties: &[PropertyRecord],
    rows: &[RawOwnershipRow],
) -> Ingested<Property> {
    let mut owners: BTreeMap<&str, Vec<OwnershipEntry>> = BTreeMap::new();
    let mut rejected = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let label = format!(
            "{}/{}",
            row.property_id.as_deref().unwrap_or("?"),
            row.owner_id.as_deref().unwrap_or("?")
        );
        let checked = validate_ownership_row(row, properties);
        match checked {
            Ok((property_id, entry)) => owners.entry(property_id).or_default().push(entry),
            Err(reason) => rejected.push(RejectedRecord {
                id: format!("ownership {label} (row {index})"),
                reason,
            }),
        }
    }

    let accepted = properties
        .iter()
        .map(|p| Property {
            id: p.id.clone(),
            name: p.name.clone(),
            owners: owners.remove(p.id.as_str()).unwrap_or_default(),
        })
        .collect();

    Ingested { accepted, rejected }
}
