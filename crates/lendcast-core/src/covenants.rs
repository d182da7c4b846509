use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::params::CovenantThresholds;
use crate::projector::{ProjectionResult, YearRow};
use crate::types::{summarize_ratios, Money, Ratio, RatioSummary};

/// Per-year covenant breach flags. A `NotApplicable` ratio never breaches:
/// no debt means nothing to covenant against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreachFlags {
    pub dscr_breach: bool,
    pub icr_breach: bool,
    pub leverage_breach: bool,
}

/// Test one year's ratios against the thresholds. The boundary is an
/// inclusive pass: DSCR exactly at the minimum complies.
pub fn evaluate_row(
    dscr: Ratio,
    icr: Ratio,
    net_debt_to_ebitda: Ratio,
    thresholds: &CovenantThresholds,
) -> BreachFlags {
    let dscr_breach = matches!(dscr, Ratio::Value(v) if v < thresholds.min_dscr);
    let icr_breach = matches!(icr, Ratio::Value(v) if v < thresholds.target_icr);
    let leverage_breach =
        matches!(net_debt_to_ebitda, Ratio::Value(v) if v > thresholds.max_nd_to_ebitda);
    BreachFlags {
        dscr_breach,
        icr_breach,
        leverage_breach,
    }
}

/// Breach counts and ratio distributions across the projection horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditStats {
    pub dscr: RatioSummary,
    pub icr: RatioSummary,
    pub leverage: RatioSummary,
    pub dscr_breaches: u32,
    pub icr_breaches: u32,
    pub leverage_breaches: u32,
    /// Zero breaches of any covenant across the full horizon
    pub overall_compliant: bool,
}

pub fn aggregate_credit_stats(rows: &[YearRow]) -> CreditStats {
    let dscr: Vec<Ratio> = rows.iter().map(|r| r.dscr).collect();
    let icr: Vec<Ratio> = rows.iter().map(|r| r.icr).collect();
    let leverage: Vec<Ratio> = rows.iter().map(|r| r.net_debt_to_ebitda).collect();

    let dscr_breaches = rows.iter().filter(|r| r.dscr_breach).count() as u32;
    let icr_breaches = rows.iter().filter(|r| r.icr_breach).count() as u32;
    let leverage_breaches = rows.iter().filter(|r| r.leverage_breach).count() as u32;

    CreditStats {
        dscr: summarize_ratios(&dscr),
        icr: summarize_ratios(&icr),
        leverage: summarize_ratios(&leverage),
        dscr_breaches,
        icr_breaches,
        leverage_breaches,
        overall_compliant: dscr_breaches + icr_breaches + leverage_breaches == 0,
    }
}

/// Pass/breach status of a single covenant in a single year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CovenantStatus {
    Pass,
    Breach,
    /// Covenant does not apply (no debt service / no interest)
    NotApplicable,
}

impl std::fmt::Display for CovenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CovenantStatus::Pass => write!(f, "PASS"),
            CovenantStatus::Breach => write!(f, "BREACH"),
            CovenantStatus::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// One row of the covenant compliance schedule consumed by exporters.
/// Rendering (CSV etc.) is the consumer's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRow {
    pub year: i32,
    pub dscr: Ratio,
    pub dscr_headroom: Ratio,
    pub dscr_status: CovenantStatus,
    pub icr: Ratio,
    pub icr_headroom: Ratio,
    pub icr_status: CovenantStatus,
    pub net_debt_to_ebitda: Ratio,
    pub leverage_status: CovenantStatus,
    /// Ending debt over enterprise value
    pub ltv_pct: Ratio,
    pub ltv_headroom: Ratio,
    pub total_debt_service: Money,
    pub cash_after_debt_service: Money,
    pub overall_status: CovenantStatus,
}

/// Build the year-by-year compliance schedule from a projection.
pub fn compliance_schedule(
    projection: &ProjectionResult,
    thresholds: &CovenantThresholds,
) -> Vec<ComplianceRow> {
    projection
        .years
        .iter()
        .map(|row| {
            let dscr_status = status_min(row.dscr, row.dscr_breach);
            let icr_status = status_min(row.icr, row.icr_breach);
            let leverage_status = status_min(row.net_debt_to_ebitda, row.leverage_breach);

            let ltv_pct = Ratio::from_div(row.ending_debt, projection.enterprise_value);
            let ltv_headroom = match ltv_pct {
                Ratio::Value(v) => Ratio::Value(thresholds.max_ltv - v),
                Ratio::NotApplicable => Ratio::NotApplicable,
            };

            let any_breach = row.dscr_breach || row.icr_breach || row.leverage_breach;
            let overall_status = if any_breach {
                CovenantStatus::Breach
            } else {
                CovenantStatus::Pass
            };

            ComplianceRow {
                year: row.year,
                dscr: row.dscr,
                dscr_headroom: headroom_above(row.dscr, thresholds.min_dscr),
                dscr_status,
                icr: row.icr,
                icr_headroom: headroom_above(row.icr, thresholds.target_icr),
                icr_status,
                net_debt_to_ebitda: row.net_debt_to_ebitda,
                leverage_status,
                ltv_pct,
                ltv_headroom,
                total_debt_service: row.total_debt_service,
                cash_after_debt_service: row.fcff - row.total_debt_service,
                overall_status,
            }
        })
        .collect()
}

fn status_min(ratio: Ratio, breached: bool) -> CovenantStatus {
    match ratio {
        Ratio::NotApplicable => CovenantStatus::NotApplicable,
        Ratio::Value(_) if breached => CovenantStatus::Breach,
        Ratio::Value(_) => CovenantStatus::Pass,
    }
}

fn headroom_above(ratio: Ratio, threshold: Decimal) -> Ratio {
    match ratio {
        Ratio::Value(v) => Ratio::Value(v - threshold),
        Ratio::NotApplicable => Ratio::NotApplicable,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
