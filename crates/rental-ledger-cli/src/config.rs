use rental_ledger_core::EngineConfig;
use tracing::debug;

use crate::input;

/// Engine settings from `--config`, or the defaults. Missing keys fall back
/// to their defaults.
pub fn load(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config: EngineConfig = match path {
        Some(p) => input::file::read_json(p)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    debug!(
        canonical = %config.canonical_currency,
        max_periods = config.max_periods,
        "engine configuration loaded"
    );
    Ok(config)
}
