use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::{safe_div, with_metadata, ComputationOutput, Money, Rate};
use crate::EngineResult;

/// Opex share of revenue assumed when backing COGS out of the EBITDA
/// margin. The calibrator only observes EBITDA, so the COGS/opex split
/// is an approximation, not a measurement.
const FIXED_OPEX_ASSUMPTION: Rate = dec!(0.20);

/// Capex proxy used when no consecutive-year asset data is available.
const DEFAULT_CAPEX_PCT: Rate = dec!(0.04);

/// One year of historical financials, as entered by the caller.
/// The engine only consumes these; it never produces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalYearRecord {
    pub year: i32,
    pub revenue: Money,
    pub ebitda: Money,
    pub net_income: Money,
    pub total_assets: Money,
    pub working_capital: Money,
    pub short_term_debt: Money,
    pub long_term_debt: Money,
    pub interest_expense: Money,
}

/// Baseline assumptions derived from history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratedAssumptions {
    /// Most recent year's revenue
    pub base_revenue: Money,
    /// Mean year-over-year revenue growth
    pub growth: Rate,
    /// 1 − avg EBITDA margin − fixed opex assumption
    pub cogs_pct: Rate,
    pub opex_pct: Rate,
    /// Mean working capital as a share of revenue
    pub wc_pct_of_rev: Rate,
    /// Capex proxy from asset build plus earnings retention
    pub capex_pct: Rate,
    pub avg_net_margin: Rate,
    /// Number of records that passed the revenue > 0 filter
    pub valid_years: usize,
}

/// Derive baseline growth/margin/working-capital/capex assumptions from
/// historical records.
///
/// Returns `Ok(None)` (with a warning) when fewer than two records have
/// positive revenue — the caller keeps its prior or default assumptions.
pub fn calibrate_assumptions(
    records: &[HistoricalYearRecord],
) -> EngineResult<ComputationOutput<Option<CalibratedAssumptions>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut valid: Vec<&HistoricalYearRecord> = records
        .iter()
        .filter(|r| r.revenue > Decimal::ZERO)
        .collect();
    valid.sort_by_key(|r| r.year);

    if valid.len() < 2 {
        warnings.push(format!(
            "Calibration requires at least 2 years with positive revenue; got {}. No assumptions derived.",
            valid.len()
        ));
        let elapsed = start.elapsed().as_micros() as u64;
        return Ok(with_metadata(
            "Historical Assumption Calibration",
            &serde_json::json!({ "records": records.len() }),
            warnings,
            elapsed,
            None,
        ));
    }

    let n = Decimal::from(valid.len() as i64);

    // Mean year-over-year revenue growth
    let mut growth_sum = Decimal::ZERO;
    for pair in valid.windows(2) {
        growth_sum += (pair[1].revenue - pair[0].revenue) / pair[0].revenue;
    }
    let growth = growth_sum / Decimal::from((valid.len() - 1) as i64);

    // Mean ratios to revenue
    let avg_ebitda_margin: Rate = valid
        .iter()
        .map(|r| r.ebitda / r.revenue)
        .sum::<Decimal>()
        / n;
    let avg_net_margin: Rate = valid
        .iter()
        .map(|r| r.net_income / r.revenue)
        .sum::<Decimal>()
        / n;
    let wc_pct_of_rev: Rate = valid
        .iter()
        .map(|r| r.working_capital / r.revenue)
        .sum::<Decimal>()
        / n;

    let cogs_pct = Decimal::ONE - avg_ebitda_margin - FIXED_OPEX_ASSUMPTION;
    if cogs_pct < Decimal::ZERO {
        warnings.push(format!(
            "Implied COGS share is negative ({cogs_pct}); EBITDA margin exceeds {}",
            Decimal::ONE - FIXED_OPEX_ASSUMPTION
        ));
    }

    // Capex proxy: asset build plus retained earnings, per consecutive pair
    let mut capex_samples: Vec<Rate> = Vec::new();
    for pair in valid.windows(2) {
        let delta_assets = pair[1].total_assets - pair[0].total_assets;
        let proxy = safe_div(
            delta_assets + pair[1].net_income,
            pair[1].revenue,
            Decimal::ZERO,
        );
        capex_samples.push(proxy.max(Decimal::ZERO));
    }
    let capex_pct = if capex_samples.is_empty() {
        DEFAULT_CAPEX_PCT
    } else {
        capex_samples.iter().copied().sum::<Decimal>() / Decimal::from(capex_samples.len() as i64)
    };

    let assumptions = CalibratedAssumptions {
        base_revenue: valid.last().map(|r| r.revenue).unwrap_or(Decimal::ZERO),
        growth,
        cogs_pct,
        opex_pct: FIXED_OPEX_ASSUMPTION,
        wc_pct_of_rev,
        capex_pct,
        avg_net_margin,
        valid_years: valid.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Historical Assumption Calibration",
        &serde_json::json!({
            "records": records.len(),
            "valid_years": assumptions.valid_years,
            "fixed_opex_assumption": FIXED_OPEX_ASSUMPTION.to_string(),
        }),
        warnings,
        elapsed,
        Some(assumptions),
    ))
}
