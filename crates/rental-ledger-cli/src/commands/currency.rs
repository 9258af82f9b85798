use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use rental_ledger_core::currency::{preview_conversion, ConversionRequest};
use rental_ledger_core::{Currency, EngineConfig};

/// Arguments for currency conversion
#[derive(Args)]
pub struct ConvertArgs {
    /// Amount to convert
    #[arg(long)]
    pub amount: Decimal,

    /// The non-canonical side of the conversion
    #[arg(long)]
    pub currency: String,

    /// Units of `--currency` per canonical unit (e.g. 36.5 VES per USD)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Treat the amount as canonical and express it in `--currency`
    #[arg(long)]
    pub to_local: bool,
}

pub fn run_convert(
    args: ConvertArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = ConversionRequest {
        amount: args.amount,
        currency: Currency::parse(&args.currency)
            .ok_or_else(|| format!("Unknown currency '{}'", args.currency))?,
        exchange_rate: args.rate,
        to_local: args.to_local,
    };
    let result = preview_conversion(config, &request)?;
    Ok(serde_json::to_value(result)?)
}
