use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::params::ModelParameters;
use crate::projector::{self, ProjectionResult};
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::EngineResult;

/// Additive deltas applied to a base parameter set. All default to zero;
/// the all-zero shock is the identity transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioShock {
    pub growth_delta: Rate,
    pub cogs_delta: Rate,
    pub opex_delta: Rate,
    pub capex_delta: Rate,
    /// Applied to the existing-debt rate, the facility rate, and every tranche
    pub rate_delta: Rate,
    pub wacc_delta: Rate,
    pub term_g_delta: Rate,
}

impl ScenarioShock {
    pub fn is_zero(&self) -> bool {
        *self == ScenarioShock::default()
    }
}

/// A named shock from the preset table, or a caller-supplied custom one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedShock {
    pub name: String,
    pub shock: ScenarioShock,
}

/// The fixed stress-scenario table.
pub fn preset_shocks() -> Vec<NamedShock> {
    vec![
        NamedShock {
            name: "base".into(),
            shock: ScenarioShock::default(),
        },
        NamedShock {
            name: "mild_downside".into(),
            shock: ScenarioShock {
                growth_delta: dec!(-0.02),
                cogs_delta: dec!(0.01),
                rate_delta: dec!(0.01),
                ..ScenarioShock::default()
            },
        },
        NamedShock {
            name: "severe_downside".into(),
            shock: ScenarioShock {
                growth_delta: dec!(-0.05),
                cogs_delta: dec!(0.03),
                opex_delta: dec!(0.02),
                capex_delta: dec!(0.01),
                rate_delta: dec!(0.03),
                wacc_delta: dec!(0.02),
                term_g_delta: dec!(-0.01),
            },
        },
        NamedShock {
            name: "cost_inflation".into(),
            shock: ScenarioShock {
                cogs_delta: dec!(0.04),
                opex_delta: dec!(0.03),
                ..ScenarioShock::default()
            },
        },
        NamedShock {
            name: "rate_shock".into(),
            shock: ScenarioShock {
                rate_delta: dec!(0.04),
                wacc_delta: dec!(0.02),
                ..ScenarioShock::default()
            },
        },
    ]
}

/// Produce a new parameter set with each delta added to the corresponding
/// base field. The base is never mutated.
pub fn apply_shocks(base: &ModelParameters, shock: &ScenarioShock) -> ModelParameters {
    let mut shocked = base.clone();
    shocked.operating.growth += shock.growth_delta;
    shocked.operating.cogs_pct += shock.cogs_delta;
    shocked.operating.opex_pct += shock.opex_delta;
    shocked.operating.capex_pct += shock.capex_delta;
    shocked.capital.interest_rate += shock.rate_delta;
    shocked.capital.wacc += shock.wacc_delta;
    shocked.capital.terminal_growth += shock.term_g_delta;
    shocked.facility.rate += shock.rate_delta;
    for tranche in &mut shocked.tranches {
        tranche.rate += shock.rate_delta;
    }
    shocked
}

/// Projection outcome for one scenario of the stress suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub shock: ScenarioShock,
    pub projection: ProjectionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSuiteOutput {
    pub scenarios: Vec<ScenarioOutcome>,
}

/// Project the base case and every preset shock, plus an optional custom
/// shock. Scenarios are independent; a scenario whose shocked parameters
/// are invalid is skipped with a warning rather than failing the suite.
pub fn run_stress_suite(
    base: &ModelParameters,
    custom: Option<&ScenarioShock>,
) -> EngineResult<ComputationOutput<StressSuiteOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    base.validate()?;

    let mut suite = preset_shocks();
    if let Some(shock) = custom {
        suite.push(NamedShock {
            name: "custom".into(),
            shock: shock.clone(),
        });
    }

    let mut scenarios = Vec::with_capacity(suite.len());
    for named in suite {
        let shocked = apply_shocks(base, &named.shock);
        match projector::project(&shocked) {
            Ok(output) => {
                for w in output.warnings {
                    warnings.push(format!("[{}] {w}", named.name));
                }
                scenarios.push(ScenarioOutcome {
                    name: named.name,
                    shock: named.shock,
                    projection: output.result,
                });
            }
            Err(e) => {
                warnings.push(format!("[{}] scenario skipped: {e}", named.name));
            }
        }
    }

    let output = StressSuiteOutput { scenarios };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Preset Stress Scenario Suite",
        &serde_json::json!({
            "base_digest": base.digest().to_string(),
            "custom_shock": custom.is_some(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
