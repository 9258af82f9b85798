use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RentalLedgerError;
use crate::RentalLedgerResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Exchange rates: units of the non-canonical currency per one canonical unit
/// (e.g. 40 VES per USD).
pub type Rate = Decimal;

/// Ownership and report percentages, expressed 0–100.
pub type Percent = Decimal;

/// Currency code. Serialised as its ISO-style code string ("USD", "VES").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Currency {
    #[default]
    USD,
    VES,
    EUR,
    Other(String),
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Currency::USD => "USD",
            Currency::VES => "VES",
            Currency::EUR => "EUR",
            Currency::Other(code) => code,
        }
    }

    /// Parse a currency code as stored by the data store. Accepts any
    /// three-letter alphabetic code, case-insensitively; `Bs` is the
    /// legacy label for bolívares.
    pub fn parse(raw: &str) -> Option<Currency> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("bs") {
            return Some(Currency::VES);
        }
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        Some(Currency::from(trimmed.to_ascii_uppercase()))
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Currency::USD,
            "VES" | "BS" => Currency::VES,
            "EUR" => Currency::EUR,
            other => Currency::Other(other.to_string()),
        }
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A calendar month against which rent is charged.
///
/// Field order matters: the derived ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(month: u32, year: i32) -> RentalLedgerResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(RentalLedgerError::validation(
                "month",
                format!("Month must be between 1 and 12, got {month}"),
            ));
        }
        Ok(BillingPeriod { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        BillingPeriod {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month, rolling the year after December.
    pub fn next(self) -> RentalLedgerResult<Self> {
        if self.month < 12 {
            return Ok(BillingPeriod {
                year: self.year,
                month: self.month + 1,
            });
        }
        let year = self.year.checked_add(1).ok_or_else(|| {
            RentalLedgerError::validation("year", format!("no billing period follows {self}"))
        })?;
        Ok(BillingPeriod { year, month: 1 })
    }

    pub fn first_day(self) -> RentalLedgerResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            RentalLedgerError::validation(
                "billing_period",
                format!("{}-{:02} is not a representable date", self.year, self.month),
            )
        })
    }

    pub fn last_day(self) -> RentalLedgerResult<NaiveDate> {
        let next = self.next()?.first_day()?;
        next.pred_opt().ok_or_else(|| {
            RentalLedgerError::validation("billing_period", "date underflow")
        })
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. Deliberately carries no timing so that
/// a preview and its later commit serialise identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
    pub canonical_currency: Currency,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    canonical_currency: &Currency,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "rust_decimal_128bit".to_string(),
            canonical_currency: canonical_currency.clone(),
        },
    }
}
