use thiserror::Error;

use crate::types::Currency;

#[derive(Debug, Error)]
pub enum RentalLedgerError {
    #[error("Invalid input: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Missing exchange rate: a positive {currency} rate is required for {context}")]
    MissingExchangeRate { currency: Currency, context: String },

    #[error("No recurring amount: {0}")]
    NoRecurringAmount(String),

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RentalLedgerError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        RentalLedgerError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RentalLedgerError {
    fn from(e: serde_json::Error) -> Self {
        RentalLedgerError::Serialization(e.to_string())
    }
}
