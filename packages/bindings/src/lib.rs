use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use rental_ledger_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine settings from an optional JSON string; absent or empty means
/// defaults.
fn engine_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    let config: EngineConfig = match config_json.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => serde_json::from_str(raw).map_err(to_napi_error)?,
        _ => EngineConfig::default(),
    };
    config.validate().map_err(to_napi_error)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[napi]
pub fn allocate_periods(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: rental_ledger_core::allocation::AllocationRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = rental_ledger_core::allocation::preview_allocation(&config, &input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct PlanPaymentInput {
    submission: rental_ledger_core::allocation::PaymentSubmission,
    contract: rental_ledger_core::records::Contract,
}

#[napi]
pub fn plan_payment(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: PlanPaymentInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        rental_ledger_core::allocation::plan_payment(&input.submission, &input.contract, &config)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[napi]
pub fn build_report(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input = rental_ledger_core::reporting::report::ReportInput::from_json(&input_json)
        .map_err(to_napi_error)?;
    let output = rental_ledger_core::reporting::report::build_report(&input, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn scope_date_range(input_json: String) -> NapiResult<String> {
    let scope: rental_ledger_core::reporting::ScopeFilter =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let (start, end) = scope.date_range().map_err(to_napi_error)?;
    serde_json::to_string(&serde_json::json!({ "start": start, "end": end }))
        .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

#[napi]
pub fn to_canonical(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: rental_ledger_core::currency::ConversionRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = rental_ledger_core::currency::preview_conversion(&config, &input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
