use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::debt::{
    validate_custom_intervals, AmortizationType, DebtTranche, PaymentFrequency,
};
use crate::error::EngineError;
use crate::types::{Money, Multiple, Rate};
use crate::EngineResult;

/// Tolerance on tranche principals matching the requested facility amount.
const TRANCHE_SUM_TOLERANCE: Rate = dec!(0.005);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Horizon {
    pub start_year: i32,
    pub years: u32,
}

/// Revenue and cost assumptions driving the operating model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatingAssumptions {
    pub base_revenue: Money,
    pub growth: Rate,
    pub cogs_pct: Rate,
    pub opex_pct: Rate,
    pub capex_pct: Rate,
    pub da_pct_of_ppe: Rate,
    pub wc_pct_of_rev: Rate,
}

/// Opening balance sheet and discounting assumptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapitalStructure {
    pub opening_debt: Money,
    pub opening_cash: Money,
    pub opening_ppe: Money,
    /// Rate on existing (pre-facility) debt
    pub interest_rate: Rate,
    pub tax_rate: Rate,
    pub wacc: Rate,
    pub terminal_growth: Rate,
}

/// Terms of the facility under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacilityTerms {
    pub amount: Money,
    pub rate: Rate,
    pub tenor_years: u32,
    pub payment_frequency: PaymentFrequency,
    pub amortization: AmortizationType,
    pub interest_only_years: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CovenantThresholds {
    pub min_dscr: Rate,
    pub target_icr: Rate,
    pub max_nd_to_ebitda: Multiple,
    pub max_ltv: Rate,
}

/// Immutable input to a projection run. Construct via [`ModelParameters::builder`],
/// which resolves every default exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelParameters {
    pub horizon: Horizon,
    pub operating: OperatingAssumptions,
    pub capital: CapitalStructure,
    pub facility: FacilityTerms,
    pub covenants: CovenantThresholds,
    /// Multi-tranche mode when non-empty; replaces the single facility schedule
    pub tranches: Vec<DebtTranche>,
}

impl ModelParameters {
    pub fn builder() -> ModelParametersBuilder {
        ModelParametersBuilder::default()
    }

    /// Stable digest of the full parameter set. Outputs are keyed by this,
    /// so memoization by callers is safe.
    pub fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn multi_tranche(&self) -> bool {
        !self.tranches.is_empty()
    }

    /// Reject invalid configurations before any projection runs.
    pub fn validate(&self) -> EngineResult<()> {
        if self.horizon.years == 0 {
            return Err(EngineError::InvalidInput {
                field: "horizon.years".into(),
                reason: "Projection horizon must be at least 1 year".into(),
            });
        }
        if self.operating.base_revenue <= Decimal::ZERO {
            return Err(EngineError::InvalidInput {
                field: "base_revenue".into(),
                reason: "Base revenue must be positive".into(),
            });
        }
        if self.operating.growth <= dec!(-1) {
            return Err(EngineError::InvalidInput {
                field: "growth".into(),
                reason: "Growth must be greater than -100%".into(),
            });
        }
        if self.capital.tax_rate < Decimal::ZERO || self.capital.tax_rate > Decimal::ONE {
            return Err(EngineError::InvalidInput {
                field: "tax_rate".into(),
                reason: "Tax rate must be between 0 and 1".into(),
            });
        }
        if self.capital.wacc <= Decimal::ZERO {
            return Err(EngineError::InvalidInput {
                field: "wacc".into(),
                reason: "WACC must be positive".into(),
            });
        }
        // Gordon growth constraint, checked up front
        if self.capital.terminal_growth >= self.capital.wacc {
            return Err(EngineError::FinancialImpossibility(format!(
                "Terminal growth ({}) must be less than WACC ({}) for the Gordon growth model",
                self.capital.terminal_growth, self.capital.wacc
            )));
        }
        if let AmortizationType::Custom { intervals } = &self.facility.amortization {
            validate_custom_intervals(intervals)?;
        }

        if self.multi_tranche() && self.facility.amount > Decimal::ZERO {
            let total: Money = self.tranches.iter().map(|t| t.principal).sum();
            let deviation = ((total - self.facility.amount) / self.facility.amount).abs();
            if deviation > TRANCHE_SUM_TOLERANCE {
                return Err(EngineError::InvalidInput {
                    field: "tranches".into(),
                    reason: format!(
                        "Tranche principals ({total}) must sum to the requested amount ({})",
                        self.facility.amount
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Single normalization point for every defaulted parameter. Fallbacks
/// live here and nowhere else.
#[derive(Debug, Default)]
pub struct ModelParametersBuilder {
    start_year: Option<i32>,
    years: Option<u32>,
    base_revenue: Option<Money>,
    growth: Option<Rate>,
    cogs_pct: Option<Rate>,
    opex_pct: Option<Rate>,
    capex_pct: Option<Rate>,
    da_pct_of_ppe: Option<Rate>,
    wc_pct_of_rev: Option<Rate>,
    opening_debt: Option<Money>,
    opening_cash: Option<Money>,
    opening_ppe: Option<Money>,
    interest_rate: Option<Rate>,
    tax_rate: Option<Rate>,
    wacc: Option<Rate>,
    terminal_growth: Option<Rate>,
    facility_amount: Option<Money>,
    facility_rate: Option<Rate>,
    facility_tenor: Option<u32>,
    payment_frequency: Option<PaymentFrequency>,
    amortization: Option<AmortizationType>,
    interest_only_years: Option<u32>,
    min_dscr: Option<Rate>,
    target_icr: Option<Rate>,
    max_nd_to_ebitda: Option<Multiple>,
    max_ltv: Option<Rate>,
    tranches: Vec<DebtTranche>,
}

impl ModelParametersBuilder {
    pub fn horizon(mut self, start_year: i32, years: u32) -> Self {
        self.start_year = Some(start_year);
        self.years = Some(years);
        self
    }

    pub fn base_revenue(mut self, v: Money) -> Self {
        self.base_revenue = Some(v);
        self
    }

    pub fn growth(mut self, v: Rate) -> Self {
        self.growth = Some(v);
        self
    }

    pub fn cogs_pct(mut self, v: Rate) -> Self {
        self.cogs_pct = Some(v);
        self
    }

    pub fn opex_pct(mut self, v: Rate) -> Self {
        self.opex_pct = Some(v);
        self
    }

    pub fn capex_pct(mut self, v: Rate) -> Self {
        self.capex_pct = Some(v);
        self
    }

    pub fn da_pct_of_ppe(mut self, v: Rate) -> Self {
        self.da_pct_of_ppe = Some(v);
        self
    }

    pub fn wc_pct_of_rev(mut self, v: Rate) -> Self {
        self.wc_pct_of_rev = Some(v);
        self
    }

    pub fn opening_debt(mut self, v: Money) -> Self {
        self.opening_debt = Some(v);
        self
    }

    pub fn opening_cash(mut self, v: Money) -> Self {
        self.opening_cash = Some(v);
        self
    }

    pub fn opening_ppe(mut self, v: Money) -> Self {
        self.opening_ppe = Some(v);
        self
    }

    pub fn interest_rate(mut self, v: Rate) -> Self {
        self.interest_rate = Some(v);
        self
    }

    pub fn tax_rate(mut self, v: Rate) -> Self {
        self.tax_rate = Some(v);
        self
    }

    pub fn wacc(mut self, v: Rate) -> Self {
        self.wacc = Some(v);
        self
    }

    pub fn terminal_growth(mut self, v: Rate) -> Self {
        self.terminal_growth = Some(v);
        self
    }

    pub fn facility_amount(mut self, v: Money) -> Self {
        self.facility_amount = Some(v);
        self
    }

    pub fn facility_rate(mut self, v: Rate) -> Self {
        self.facility_rate = Some(v);
        self
    }

    pub fn facility_tenor(mut self, years: u32) -> Self {
        self.facility_tenor = Some(years);
        self
    }

    pub fn payment_frequency(mut self, v: PaymentFrequency) -> Self {
        self.payment_frequency = Some(v);
        self
    }

    pub fn amortization(mut self, v: AmortizationType) -> Self {
        self.amortization = Some(v);
        self
    }

    pub fn interest_only_years(mut self, v: u32) -> Self {
        self.interest_only_years = Some(v);
        self
    }

    pub fn min_dscr(mut self, v: Rate) -> Self {
        self.min_dscr = Some(v);
        self
    }

    pub fn target_icr(mut self, v: Rate) -> Self {
        self.target_icr = Some(v);
        self
    }

    pub fn max_nd_to_ebitda(mut self, v: Multiple) -> Self {
        self.max_nd_to_ebitda = Some(v);
        self
    }

    pub fn max_ltv(mut self, v: Rate) -> Self {
        self.max_ltv = Some(v);
        self
    }

    pub fn tranches(mut self, tranches: Vec<DebtTranche>) -> Self {
        self.tranches = tranches;
        self
    }

    /// Seed operating assumptions from calibrator output, leaving any
    /// explicitly-set field untouched.
    pub fn assumptions(mut self, a: &crate::calibrate::CalibratedAssumptions) -> Self {
        self.base_revenue = self.base_revenue.or(Some(a.base_revenue));
        self.growth = self.growth.or(Some(a.growth));
        self.cogs_pct = self.cogs_pct.or(Some(a.cogs_pct));
        self.opex_pct = self.opex_pct.or(Some(a.opex_pct));
        self.capex_pct = self.capex_pct.or(Some(a.capex_pct));
        self.wc_pct_of_rev = self.wc_pct_of_rev.or(Some(a.wc_pct_of_rev));
        self
    }

    /// Resolve defaults and validate.
    pub fn build(self) -> EngineResult<ModelParameters> {
        let params = ModelParameters {
            horizon: Horizon {
                start_year: self.start_year.unwrap_or(2025),
                years: self.years.unwrap_or(5),
            },
            operating: OperatingAssumptions {
                base_revenue: self.base_revenue.unwrap_or(Decimal::ZERO),
                growth: self.growth.unwrap_or(dec!(0.03)),
                cogs_pct: self.cogs_pct.unwrap_or(dec!(0.50)),
                opex_pct: self.opex_pct.unwrap_or(dec!(0.20)),
                capex_pct: self.capex_pct.unwrap_or(dec!(0.04)),
                da_pct_of_ppe: self.da_pct_of_ppe.unwrap_or(dec!(0.10)),
                wc_pct_of_rev: self.wc_pct_of_rev.unwrap_or(dec!(0.10)),
            },
            capital: CapitalStructure {
                opening_debt: self.opening_debt.unwrap_or(Decimal::ZERO),
                opening_cash: self.opening_cash.unwrap_or(Decimal::ZERO),
                opening_ppe: self.opening_ppe.unwrap_or(Decimal::ZERO),
                interest_rate: self.interest_rate.unwrap_or(dec!(0.10)),
                tax_rate: self.tax_rate.unwrap_or(dec!(0.25)),
                wacc: self.wacc.unwrap_or(dec!(0.10)),
                terminal_growth: self.terminal_growth.unwrap_or(dec!(0.02)),
            },
            facility: FacilityTerms {
                amount: self.facility_amount.unwrap_or(Decimal::ZERO),
                rate: self.facility_rate.unwrap_or(dec!(0.10)),
                tenor_years: self.facility_tenor.unwrap_or(5),
                payment_frequency: self.payment_frequency.unwrap_or(PaymentFrequency::Annual),
                amortization: self.amortization.unwrap_or(AmortizationType::Amortizing),
                interest_only_years: self.interest_only_years.unwrap_or(0),
            },
            covenants: CovenantThresholds {
                min_dscr: self.min_dscr.unwrap_or(dec!(1.20)),
                target_icr: self.target_icr.unwrap_or(dec!(2.0)),
                max_nd_to_ebitda: self.max_nd_to_ebitda.unwrap_or(dec!(4.0)),
                max_ltv: self.max_ltv.unwrap_or(dec!(0.75)),
            },
            tranches: self.tranches,
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_builder() -> ModelParametersBuilder {
        ModelParameters::builder()
            .horizon(2025, 5)
            .base_revenue(dec!(100_000_000))
            .growth(dec!(0.08))
            .cogs_pct(dec!(0.40))
            .opex_pct(dec!(0.25))
            .facility_amount(dec!(100_000_000))
            .facility_rate(dec!(0.12))
            .facility_tenor(5)
    }

    #[test]
    fn test_builder_resolves_defaults_once() {
        let p = base_builder().build().unwrap();
        assert_eq!(p.capital.wacc, dec!(0.10));
        assert_eq!(p.covenants.min_dscr, dec!(1.20));
        assert_eq!(p.covenants.max_ltv, dec!(0.75));
        assert_eq!(p.facility.payment_frequency, PaymentFrequency::Annual);
    }

    #[test]
    fn test_terminal_growth_at_or_above_wacc_rejected() {
        let result = base_builder()
            .wacc(dec!(0.08))
            .terminal_growth(dec!(0.08))
            .build();
        assert!(matches!(
            result,
            Err(EngineError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_nonpositive_wacc_rejected() {
        let result = base_builder().wacc(Decimal::ZERO).terminal_growth(dec!(-0.01)).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_base_revenue_rejected() {
        let result = ModelParameters::builder().horizon(2025, 5).build();
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn test_tranche_sum_must_match_facility_amount() {
        let tranches = vec![crate::debt::DebtTranche {
            id: "a".into(),
            name: "Senior".into(),
            principal: dec!(50_000_000),
            rate: dec!(0.10),
            tenor_years: 5,
            amortization_type: AmortizationType::Amortizing,
            interest_only_years: 0,
            maturity_date: None,
            seniority: 1,
        }];
        let result = base_builder().tranches(tranches).build();
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn test_digest_stable_and_input_sensitive() {
        let a = base_builder().build().unwrap();
        let b = base_builder().build().unwrap();
        assert_eq!(a.digest(), b.digest());

        let c = base_builder().growth(dec!(0.09)).build().unwrap();
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn test_calibrated_assumptions_do_not_override_explicit_fields() {
        let calibrated = crate::calibrate::CalibratedAssumptions {
            base_revenue: dec!(50_000_000),
            growth: dec!(0.02),
            cogs_pct: dec!(0.55),
            opex_pct: dec!(0.20),
            wc_pct_of_rev: dec!(0.15),
            capex_pct: dec!(0.05),
            avg_net_margin: dec!(0.08),
            valid_years: 3,
        };
        let p = base_builder().assumptions(&calibrated).build().unwrap();
        // Explicit values win
        assert_eq!(p.operating.base_revenue, dec!(100_000_000));
        assert_eq!(p.operating.growth, dec!(0.08));
        // Unset fields take the calibrated values
        assert_eq!(p.operating.wc_pct_of_rev, dec!(0.15));
        assert_eq!(p.operating.capex_pct, dec!(0.05));
    }

    #[test]
    fn test_bad_custom_intervals_rejected_up_front() {
        let result = base_builder()
            .amortization(AmortizationType::Custom {
                intervals: vec![dec!(0.5), dec!(0.3)],
            })
            .build();
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }
}
