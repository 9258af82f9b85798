use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::RentalLedgerError;
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::RentalLedgerResult;

/// Converts amounts between the canonical reporting currency and the
/// currency a payment was received in.
///
/// Rates always express non-canonical units per one canonical unit, so
/// `to_canonical` divides and `to_local` multiplies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyNormalizer {
    canonical: Currency,
    minor_unit_dp: u32,
}

impl CurrencyNormalizer {
    pub fn new(canonical: Currency, minor_unit_dp: u32) -> Self {
        CurrencyNormalizer {
            canonical,
            minor_unit_dp,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.canonical_currency.clone(), config.minor_unit_dp)
    }

    pub fn canonical(&self) -> &Currency {
        &self.canonical
    }

    pub fn is_canonical(&self, currency: &Currency) -> bool {
        *currency == self.canonical
    }

    /// Normalise `amount` held in `currency` to the canonical currency.
    ///
    /// Canonical amounts pass through untouched and the rate is ignored.
    pub fn to_canonical(
        &self,
        amount: Money,
        currency: &Currency,
        exchange_rate: Option<Rate>,
    ) -> RentalLedgerResult<Money> {
        if self.is_canonical(currency) {
            return Ok(amount);
        }
        let rate = self.require_rate(currency, exchange_rate, "normalisation")?;
        amount
            .checked_div(rate)
            .ok_or_else(|| overflow(amount, currency, rate))
    }

    /// Express a canonical amount (e.g. one month's rent) in `target`.
    pub fn to_local(
        &self,
        amount_in_canonical: Money,
        target: &Currency,
        exchange_rate: Option<Rate>,
    ) -> RentalLedgerResult<Money> {
        if self.is_canonical(target) {
            return Ok(amount_in_canonical);
        }
        let rate = self.require_rate(target, exchange_rate, "local conversion")?;
        amount_in_canonical
            .checked_mul(rate)
            .ok_or_else(|| overflow(amount_in_canonical, target, rate))
    }

    /// Convert between two arbitrary currencies by way of the canonical one.
    /// `from_rate` prices `from`, `to_rate` prices `to`.
    pub fn convert(
        &self,
        amount: Money,
        from: &Currency,
        from_rate: Option<Rate>,
        to: &Currency,
        to_rate: Option<Rate>,
    ) -> RentalLedgerResult<Money> {
        if from == to {
            return Ok(amount);
        }
        let canonical = self.to_canonical(amount, from, from_rate)?;
        self.to_local(canonical, to, to_rate)
    }

    /// Round to the currency minor unit, midpoint away from zero.
    pub fn round_minor(&self, amount: Money) -> Money {
        amount.round_dp_with_strategy(self.minor_unit_dp, RoundingStrategy::MidpointAwayFromZero)
    }

    fn require_rate(
        &self,
        currency: &Currency,
        exchange_rate: Option<Rate>,
        context: &str,
    ) -> RentalLedgerResult<Rate> {
        match exchange_rate {
            Some(rate) if rate > Decimal::ZERO => Ok(rate),
            _ => Err(RentalLedgerError::MissingExchangeRate {
                currency: currency.clone(),
                context: format!("{context} into {}", self.canonical),
            }),
        }
    }
}

fn overflow(amount: Money, currency: &Currency, rate: Rate) -> RentalLedgerError {
    RentalLedgerError::validation(
        "amount",
        format!("{amount} {currency} at rate {rate} is out of decimal range"),
    )
}

impl Default for CurrencyNormalizer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

// ---------------------------------------------------------------------------
// One-off conversions
// ---------------------------------------------------------------------------

/// A single amount to move into (or, with `to_local`, out of) the
/// canonical currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub amount: Money,
    pub currency: Currency,
    /// Units of `currency` per canonical unit
    #[serde(default)]
    pub exchange_rate: Option<Rate>,
    /// Treat `amount` as canonical and express it in `currency`
    #[serde(default)]
    pub to_local: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub from: Currency,
    pub to: Currency,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    /// Full-precision result
    pub converted: Money,
    /// `converted` rounded to the minor unit
    pub rounded: Money,
}

pub fn preview_conversion(
    config: &EngineConfig,
    request: &ConversionRequest,
) -> RentalLedgerResult<ComputationOutput<Conversion>> {
    if request.amount < Decimal::ZERO {
        return Err(RentalLedgerError::validation(
            "amount",
            "Amount must not be negative",
        ));
    }
    let normalizer = CurrencyNormalizer::from_config(config);
    let canonical = normalizer.canonical().clone();
    let (from, to, converted) = if request.to_local {
        let local = normalizer.to_local(request.amount, &request.currency, request.exchange_rate)?;
        (canonical, request.currency.clone(), local)
    } else {
        let amount =
            normalizer.to_canonical(request.amount, &request.currency, request.exchange_rate)?;
        (request.currency.clone(), canonical, amount)
    };
    let rate = request
        .exchange_rate
        .filter(|_| !normalizer.is_canonical(&request.currency));

    Ok(with_metadata(
        "Division by the quoted rate into the canonical currency, multiplication out of it",
        request,
        Vec::new(),
        &config.canonical_currency,
        Conversion {
            rounded: normalizer.round_minor(converted),
            from,
            to,
            amount: request.amount,
            rate,
            converted,
        },
    ))
}
