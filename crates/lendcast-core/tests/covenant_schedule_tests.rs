use lendcast_core::covenants::{compliance_schedule, CovenantStatus};
use lendcast_core::params::ModelParameters;
use lendcast_core::projector::project;
use lendcast_core::types::Ratio;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn leveraged_deal() -> ModelParameters {
    ModelParameters::builder()
        .horizon(2025, 5)
        .base_revenue(dec!(100_000_000))
        .growth(dec!(0.08))
        .cogs_pct(dec!(0.40))
        .opex_pct(dec!(0.25))
        .facility_amount(dec!(100_000_000))
        .facility_rate(dec!(0.12))
        .facility_tenor(5)
        .min_dscr(dec!(1.20))
        .target_icr(dec!(2.0))
        .max_nd_to_ebitda(dec!(4.0))
        .max_ltv(dec!(0.75))
        .build()
        .unwrap()
}

#[test]
fn test_schedule_has_one_row_per_year() {
    let params = leveraged_deal();
    let out = project(&params).unwrap().result;
    let schedule = compliance_schedule(&out, &params.covenants);
    assert_eq!(schedule.len(), 5);
    assert_eq!(schedule[0].year, 2026);
    assert_eq!(schedule[4].year, 2030);
}

#[test]
fn test_headroom_consistent_with_status() {
    let params = leveraged_deal();
    let out = project(&params).unwrap().result;
    for row in compliance_schedule(&out, &params.covenants) {
        if let (Ratio::Value(headroom), status) = (row.dscr_headroom, row.dscr_status) {
            if headroom >= Decimal::ZERO {
                assert_eq!(status, CovenantStatus::Pass);
            } else {
                assert_eq!(status, CovenantStatus::Breach);
            }
        }
        if let (Ratio::Value(headroom), status) = (row.icr_headroom, row.icr_status) {
            if headroom >= Decimal::ZERO {
                assert_eq!(status, CovenantStatus::Pass);
            } else {
                assert_eq!(status, CovenantStatus::Breach);
            }
        }
    }
}

#[test]
fn test_cash_after_debt_service_column() {
    let params = leveraged_deal();
    let out = project(&params).unwrap().result;
    let schedule = compliance_schedule(&out, &params.covenants);
    for (row, year) in schedule.iter().zip(out.years.iter()) {
        assert_eq!(row.total_debt_service, year.total_debt_service);
        assert_eq!(
            row.cash_after_debt_service,
            year.fcff - year.total_debt_service
        );
    }
}

#[test]
fn test_ltv_declines_as_facility_amortizes() {
    let params = leveraged_deal();
    let out = project(&params).unwrap().result;
    let schedule = compliance_schedule(&out, &params.covenants);
    let ltvs: Vec<Decimal> = schedule
        .iter()
        .filter_map(|r| r.ltv_pct.value())
        .collect();
    assert_eq!(ltvs.len(), 5);
    for pair in ltvs.windows(2) {
        assert!(pair[1] <= pair[0], "LTV should fall as debt amortizes");
    }
}

#[test]
fn test_no_debt_rows_marked_not_applicable() {
    let params = ModelParameters::builder()
        .horizon(2025, 3)
        .base_revenue(dec!(5_000_000))
        .growth(dec!(0.04))
        .cogs_pct(dec!(0.50))
        .opex_pct(dec!(0.20))
        .build()
        .unwrap();
    let out = project(&params).unwrap().result;
    let schedule = compliance_schedule(&out, &params.covenants);
    for row in schedule {
        assert_eq!(row.dscr_status, CovenantStatus::NotApplicable);
        assert_eq!(row.icr_status, CovenantStatus::NotApplicable);
        assert_eq!(row.overall_status, CovenantStatus::Pass);
    }
}

#[test]
fn test_breaching_deal_flags_overall_status() {
    let params = ModelParameters::builder()
        .horizon(2025, 5)
        .base_revenue(dec!(10_000_000))
        .growth(dec!(0.02))
        .cogs_pct(dec!(0.50))
        .opex_pct(dec!(0.30))
        .facility_amount(dec!(60_000_000))
        .facility_rate(dec!(0.13))
        .facility_tenor(5)
        .build()
        .unwrap();
    let out = project(&params).unwrap().result;
    let schedule = compliance_schedule(&out, &params.covenants);
    assert!(schedule
        .iter()
        .any(|r| r.overall_status == CovenantStatus::Breach));
}
