use lendcast_core::params::ModelParameters;
use lendcast_core::projector::project;
use lendcast_core::scenario::{apply_shocks, run_stress_suite, ScenarioShock};
use lendcast_core::types::Ratio;
use lendcast_core::EngineError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The reference deal: 100M revenue growing 8%, 40% COGS, 25% opex,
/// financed by a single 100M amortizing facility at 12% over 5 years.
fn reference_deal() -> ModelParameters {
    ModelParameters::builder()
        .horizon(2025, 5)
        .base_revenue(dec!(100_000_000))
        .growth(dec!(0.08))
        .cogs_pct(dec!(0.40))
        .opex_pct(dec!(0.25))
        .capex_pct(dec!(0.04))
        .da_pct_of_ppe(dec!(0.10))
        .wc_pct_of_rev(dec!(0.10))
        .tax_rate(dec!(0.25))
        .wacc(dec!(0.10))
        .terminal_growth(dec!(0.02))
        .facility_amount(dec!(100_000_000))
        .facility_rate(dec!(0.12))
        .facility_tenor(5)
        .build()
        .unwrap()
}

// ===========================================================================
// End-to-end reference scenario
// ===========================================================================

#[test]
fn test_reference_deal_year_one() {
    let out = project(&reference_deal()).unwrap();
    let y1 = &out.result.years[0];

    // Year-1 EBITDA = 100M * 1.08 * (1 - 0.40 - 0.25) = 37.8M
    assert_eq!(y1.ebitda, dec!(37_800_000));

    // Annual debt service on 100M @ 12% / 5y ≈ 27.74M
    assert!(
        (y1.total_debt_service - dec!(27_740_973)).abs() < dec!(1_000),
        "debt service {}",
        y1.total_debt_service
    );
}

#[test]
fn test_reference_deal_debt_retired_at_tenor() {
    let out = project(&reference_deal()).unwrap();
    let last = out.result.years.last().unwrap();
    assert!(last.ending_debt.abs() < dec!(1));
}

#[test]
fn test_reference_deal_covenants_computed_every_year() {
    let out = project(&reference_deal()).unwrap();
    for row in &out.result.years {
        assert!(row.dscr.is_applicable());
        assert!(row.icr.is_applicable());
    }
    let stats = &out.result.credit_stats;
    assert!(stats.dscr.min.is_applicable());
    assert!(stats.icr.mean.is_applicable());
}

#[test]
fn test_rows_are_fresh_per_run() {
    let params = reference_deal();
    let first = project(&params).unwrap();
    let second = project(&params).unwrap();
    // Same digest, equal values, independent allocations
    assert_eq!(first.result.params_digest, second.result.params_digest);
    assert_eq!(
        first.result.years.len(),
        second.result.years.len()
    );
    for (a, b) in first.result.years.iter().zip(second.result.years.iter()) {
        assert_eq!(a.fcff, b.fcff);
        assert_eq!(a.ending_debt, b.ending_debt);
    }
}

// ===========================================================================
// Shock laws
// ===========================================================================

#[test]
fn test_identity_shock_law() {
    let base = reference_deal();
    let shocked = apply_shocks(&base, &ScenarioShock::default());
    assert_eq!(base, shocked);

    let a = project(&base).unwrap().result;
    let b = project(&shocked).unwrap().result;
    assert_eq!(a.enterprise_value, b.enterprise_value);
    assert_eq!(a.equity_value, b.equity_value);
    assert_eq!(a.terminal_value, b.terminal_value);
    for (ra, rb) in a.years.iter().zip(b.years.iter()) {
        assert_eq!(ra.revenue, rb.revenue);
        assert_eq!(ra.fcfe, rb.fcfe);
        assert_eq!(ra.dscr, rb.dscr);
    }
}

#[test]
fn test_downside_shock_reduces_coverage() {
    let base = reference_deal();
    let shock = ScenarioShock {
        growth_delta: dec!(-0.05),
        cogs_delta: dec!(0.03),
        rate_delta: dec!(0.02),
        ..ScenarioShock::default()
    };
    let base_out = project(&base).unwrap().result;
    let stressed_out = project(&apply_shocks(&base, &shock)).unwrap().result;

    let base_dscr = base_out.credit_stats.dscr.min.value().unwrap();
    let stressed_dscr = stressed_out.credit_stats.dscr.min.value().unwrap();
    assert!(stressed_dscr < base_dscr);
    assert!(stressed_out.enterprise_value < base_out.enterprise_value);
}

#[test]
fn test_stress_suite_base_matches_direct_projection() {
    let base = reference_deal();
    let direct = project(&base).unwrap().result;
    let suite = run_stress_suite(&base, None).unwrap().result;
    let suite_base = &suite.scenarios[0];
    assert_eq!(suite_base.name, "base");
    assert_eq!(suite_base.projection.enterprise_value, direct.enterprise_value);
}

// ===========================================================================
// Rejection and edge behavior
// ===========================================================================

#[test]
fn test_terminal_growth_rejected_before_projection() {
    let result = ModelParameters::builder()
        .horizon(2025, 5)
        .base_revenue(dec!(1_000_000))
        .wacc(dec!(0.08))
        .terminal_growth(dec!(0.09))
        .build();
    assert!(matches!(result, Err(EngineError::FinancialImpossibility(_))));
}

#[test]
fn test_no_debt_deal_reports_not_applicable_coverage() {
    let params = ModelParameters::builder()
        .horizon(2025, 4)
        .base_revenue(dec!(10_000_000))
        .growth(dec!(0.05))
        .cogs_pct(dec!(0.45))
        .opex_pct(dec!(0.25))
        .build()
        .unwrap();
    let out = project(&params).unwrap().result;
    for row in &out.years {
        assert_eq!(row.dscr, Ratio::NotApplicable);
        assert_eq!(row.icr, Ratio::NotApplicable);
        assert_eq!(row.total_debt_service, Decimal::ZERO);
    }
    assert!(out.credit_stats.overall_compliant);
    assert_eq!(out.credit_stats.dscr.min, Ratio::NotApplicable);
}

#[test]
fn test_overleveraged_deal_breaches_and_still_renders() {
    // Tiny business, huge facility: breaches everywhere but the
    // projection still produces a full result with warnings.
    let params = ModelParameters::builder()
        .horizon(2025, 5)
        .base_revenue(dec!(1_000_000))
        .growth(dec!(0.02))
        .cogs_pct(dec!(0.55))
        .opex_pct(dec!(0.30))
        .facility_amount(dec!(50_000_000))
        .facility_rate(dec!(0.14))
        .facility_tenor(5)
        .build()
        .unwrap();
    let out = project(&params).unwrap();
    assert_eq!(out.result.years.len(), 5);
    assert!(!out.result.credit_stats.overall_compliant);
    assert!(out.result.credit_stats.dscr_breaches > 0);
    assert!(!out.warnings.is_empty());
}
