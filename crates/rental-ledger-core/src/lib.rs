pub mod config;
pub mod currency;
pub mod error;
pub mod records;
pub mod types;

#[cfg(feature = "allocation")]
pub mod allocation;

#[cfg(feature = "reporting")]
pub mod reporting;

pub use config::EngineConfig;
pub use currency::CurrencyNormalizer;
pub use error::RentalLedgerError;
pub use types::*;

/// Standard result type for all rental-ledger operations
pub type RentalLedgerResult<T> = Result<T, RentalLedgerError>;
