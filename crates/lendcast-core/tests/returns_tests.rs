use lendcast_core::calibrate::{calibrate_assumptions, HistoricalYearRecord};
use lendcast_core::params::ModelParameters;
use lendcast_core::projector::project;
use lendcast_core::solver;
use lendcast_core::types::Ratio;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Solver closed forms
// ===========================================================================

#[test]
fn test_irr_five_year_single_exit() {
    // 100 * 1.1^5 = 161.051 -> IRR exactly 10%
    let flows = vec![
        dec!(-100),
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        dec!(161.051),
    ];
    let rate = solver::irr(&flows).unwrap().unwrap();
    assert!((rate - dec!(0.10)).abs() < dec!(0.001), "got {rate}");
}

#[test]
fn test_npv_at_irr_is_zero() {
    let flows = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
    let rate = solver::irr(&flows).unwrap().unwrap();
    let residual = solver::npv(rate, &flows).unwrap();
    assert!(residual.abs() < dec!(0.01), "residual {residual}");
}

// ===========================================================================
// Projection-level returns
// ===========================================================================

fn healthy_deal() -> ModelParameters {
    ModelParameters::builder()
        .horizon(2025, 5)
        .base_revenue(dec!(100_000_000))
        .growth(dec!(0.08))
        .cogs_pct(dec!(0.40))
        .opex_pct(dec!(0.25))
        .capex_pct(dec!(0.04))
        .wc_pct_of_rev(dec!(0.10))
        .wacc(dec!(0.10))
        .terminal_growth(dec!(0.02))
        .facility_amount(dec!(50_000_000))
        .facility_rate(dec!(0.10))
        .facility_tenor(5)
        .build()
        .unwrap()
}

#[test]
fn test_healthy_deal_has_defined_returns() {
    let out = project(&healthy_deal()).unwrap().result;
    let returns = &out.returns;
    assert!(returns.equity_invested > Decimal::ZERO);
    assert!(returns.irr.is_some());
    match returns.moic {
        Ratio::Value(moic) => assert!(moic > Decimal::ZERO),
        Ratio::NotApplicable => panic!("MOIC should be defined for a funded deal"),
    }
}

#[test]
fn test_moic_is_distributions_over_invested() {
    let out = project(&healthy_deal()).unwrap().result;
    let r = &out.returns;
    let expected = r.total_distributions / r.equity_invested;
    assert_eq!(r.moic, Ratio::Value(expected));
}

#[test]
fn test_higher_wacc_lowers_enterprise_value() {
    let cheap = project(&healthy_deal()).unwrap().result;
    let dear_params = ModelParameters::builder()
        .horizon(2025, 5)
        .base_revenue(dec!(100_000_000))
        .growth(dec!(0.08))
        .cogs_pct(dec!(0.40))
        .opex_pct(dec!(0.25))
        .capex_pct(dec!(0.04))
        .wc_pct_of_rev(dec!(0.10))
        .wacc(dec!(0.14))
        .terminal_growth(dec!(0.02))
        .facility_amount(dec!(50_000_000))
        .facility_rate(dec!(0.10))
        .facility_tenor(5)
        .build()
        .unwrap();
    let dear = project(&dear_params).unwrap().result;
    assert!(dear.enterprise_value < cheap.enterprise_value);
}

#[test]
fn test_multiples_reported() {
    let out = project(&healthy_deal()).unwrap().result;
    assert!(out.ev_to_ebitda.is_applicable());
    assert!(out.ev_to_revenue.is_applicable());
    // EV/EBITDA should exceed EV/Revenue for a sub-100% margin business
    let ev_ebitda = out.ev_to_ebitda.value().unwrap();
    let ev_revenue = out.ev_to_revenue.value().unwrap();
    assert!(ev_ebitda > ev_revenue);
}

// ===========================================================================
// Calibrate -> project pipeline
// ===========================================================================

fn history() -> Vec<HistoricalYearRecord> {
    let mut records = Vec::new();
    let mut revenue = dec!(80_000_000);
    for year in 2021..=2024 {
        records.push(HistoricalYearRecord {
            year,
            revenue,
            ebitda: revenue * dec!(0.32),
            net_income: revenue * dec!(0.11),
            total_assets: revenue * dec!(0.85),
            working_capital: revenue * dec!(0.11),
            short_term_debt: dec!(2_000_000),
            long_term_debt: dec!(30_000_000),
            interest_expense: dec!(2_500_000),
        });
        revenue *= dec!(1.06);
    }
    records
}

#[test]
fn test_calibrated_assumptions_feed_projection() {
    let calibrated = calibrate_assumptions(&history())
        .unwrap()
        .result
        .expect("4 clean years should calibrate");

    assert!((calibrated.growth - dec!(0.06)).abs() < dec!(0.0001));

    let params = ModelParameters::builder()
        .horizon(2025, 5)
        .assumptions(&calibrated)
        .wacc(dec!(0.11))
        .terminal_growth(dec!(0.02))
        .facility_amount(dec!(40_000_000))
        .facility_rate(dec!(0.09))
        .facility_tenor(5)
        .build()
        .unwrap();

    let out = project(&params).unwrap().result;
    assert_eq!(out.years.len(), 5);
    // Year-1 revenue grows off the calibrated base at the calibrated rate
    let expected_y1 = calibrated.base_revenue * (Decimal::ONE + calibrated.growth);
    assert!((out.years[0].revenue - expected_y1).abs() < dec!(1));
}
