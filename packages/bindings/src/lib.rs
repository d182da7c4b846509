use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use lendcast_core::debt::DebtTranche;
use lendcast_core::params::ModelParameters;
use lendcast_core::scenario::ScenarioShock;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

#[napi]
pub fn calibrate(input_json: String) -> NapiResult<String> {
    let records: Vec<lendcast_core::calibrate::HistoricalYearRecord> =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        lendcast_core::calibrate::calibrate_assumptions(&records).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Projection and stress
// ---------------------------------------------------------------------------

#[napi]
pub fn project_model(input_json: String) -> NapiResult<String> {
    let params: ModelParameters = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = lendcast_core::projector::project(&params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct StressInput {
    params: ModelParameters,
    custom_shock: Option<ScenarioShock>,
}

#[napi]
pub fn apply_stress(input_json: String) -> NapiResult<String> {
    let input: StressInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        lendcast_core::scenario::run_stress_suite(&input.params, input.custom_shock.as_ref())
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Debt
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BlendInput {
    tranches: Vec<DebtTranche>,
    horizon_years: u32,
}

#[napi]
pub fn blend_tranches(input_json: String) -> NapiResult<String> {
    let input: BlendInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = lendcast_core::debt::blend_tranches(&input.tranches, input.horizon_years)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Covenants
// ---------------------------------------------------------------------------

#[napi]
pub fn covenant_schedule(input_json: String) -> NapiResult<String> {
    let params: ModelParameters = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = lendcast_core::projector::project(&params).map_err(to_napi_error)?;
    let rows = lendcast_core::covenants::compliance_schedule(&output.result, &params.covenants);
    serde_json::to_string(&rows).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FlowsInput {
    cash_flows: Vec<rust_decimal::Decimal>,
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let input: FlowsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let irr = lendcast_core::solver::irr(&input.cash_flows).map_err(to_napi_error)?;
    serde_json::to_string(&irr).map_err(to_napi_error)
}
