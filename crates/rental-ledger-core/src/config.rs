use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RentalLedgerError;
use crate::types::Currency;
use crate::RentalLedgerResult;

/// Engine-wide settings. Every entry point takes one explicitly; the CLI
/// loads it from `--config <file.json>` and falls back to `Default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency every report total is normalised to.
    pub canonical_currency: Currency,
    /// Decimal places of the currency minor unit (2 for cents/céntimos).
    pub minor_unit_dp: u32,
    /// Tolerance when comparing a remainder against the periodic due amount.
    pub epsilon: Decimal,
    /// Upper bound on the number of periods a single allocation may span.
    pub max_periods: u32,
    /// Committed payment drafts start as `approved` instead of `pending`.
    pub auto_approve: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            canonical_currency: Currency::USD,
            minor_unit_dp: 2,
            epsilon: dec!(0.000001),
            max_periods: 1200,
            auto_approve: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> RentalLedgerResult<()> {
        if self.epsilon < Decimal::ZERO {
            return Err(RentalLedgerError::validation(
                "epsilon",
                "Epsilon cannot be negative",
            ));
        }
        if self.minor_unit_dp > 8 {
            return Err(RentalLedgerError::validation(
                "minor_unit_dp",
                format!("At most 8 decimal places supported, got {}", self.minor_unit_dp),
            ));
        }
        if self.max_periods == 0 {
            return Err(RentalLedgerError::validation(
                "max_periods",
                "At least one period must be allowed",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "canonical_currency": "EUR", "auto_approve": true }"#)
                .unwrap();
        assert_eq!(cfg.canonical_currency, Currency::EUR);
        assert!(cfg.auto_approve);
        assert_eq!(cfg.minor_unit_dp, 2);
        assert_eq!(cfg.epsilon, dec!(0.000001));
    }

    #[test]
    fn test_validate_rejects_zero_max_periods() {
        let cfg = EngineConfig {
            max_periods: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }
}
