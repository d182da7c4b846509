use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::EngineError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::EngineResult;

/// Tolerance on custom amortization intervals summing to 100%.
const INTERVAL_SUM_TOLERANCE: Decimal = dec!(0.005);

/// Repayment profile for a loan or tranche.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmortizationType {
    /// Level annuity payment over the tenor
    Amortizing,
    /// Interest only; principal is not scheduled within the tenor
    InterestOnly,
    /// Interest only with full principal due at maturity
    Bullet,
    /// Annuity over the non-balloon portion, balloon due at maturity
    Balloon { balloon_pct: Rate },
    /// Principal released per caller-supplied fractions (one per year),
    /// which must sum to 1.0 within tolerance
    Custom { intervals: Vec<Rate> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
}

impl PaymentFrequency {
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PaymentFrequency::Annual => 1,
            PaymentFrequency::SemiAnnual => 2,
            PaymentFrequency::Quarterly => 4,
            PaymentFrequency::Monthly => 12,
        }
    }
}

/// One distinct debt instrument within a multi-tranche capital structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DebtTranche {
    pub id: String,
    pub name: String,
    pub principal: Money,
    pub rate: Rate,
    pub tenor_years: u32,
    pub amortization_type: AmortizationType,
    pub interest_only_years: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maturity_date: Option<NaiveDate>,
    pub seniority: u32,
}

/// A single year in an amortization schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtPeriod {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub total_payment: Money,
    pub closing_balance: Money,
}

/// Summed per-year service across a tranche stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendedDebtOutput {
    pub periods: Vec<DebtPeriod>,
    pub total_principal: Money,
    /// Principal-weighted average rate
    pub blended_rate: Rate,
    /// Tranches whose tenor ends inside the projection horizon.
    /// A reported condition, not an error.
    pub refinancing_required: Vec<String>,
}

/// Annual debt service for a single loan.
///
/// - `amortizing`: annuity PMT over the tenor at the periodic rate
/// - `interest_only` / `bullet`: interest only (`P·r`)
/// - `balloon`: annuity over `P·(1 − balloon_pct)`
/// - `custom`: first interval's principal plus first-year interest
/// - zero rate degenerates to straight `P / n`
pub fn annual_debt_service(
    principal: Money,
    annual_rate: Rate,
    tenor_years: u32,
    amortization: &AmortizationType,
    frequency: PaymentFrequency,
) -> EngineResult<Money> {
    validate_loan(principal, annual_rate, tenor_years)?;

    match amortization {
        AmortizationType::Amortizing => {
            annuity_annual_service(principal, annual_rate, tenor_years, frequency)
        }
        AmortizationType::InterestOnly | AmortizationType::Bullet => Ok(principal * annual_rate),
        AmortizationType::Balloon { balloon_pct } => {
            validate_balloon_pct(*balloon_pct)?;
            annuity_annual_service(
                principal * (Decimal::ONE - balloon_pct),
                annual_rate,
                tenor_years,
                frequency,
            )
        }
        AmortizationType::Custom { intervals } => {
            validate_custom_intervals(intervals)?;
            let first_principal = intervals
                .first()
                .map(|pct| principal * pct)
                .unwrap_or(Decimal::ZERO);
            Ok(first_principal + principal * annual_rate)
        }
    }
}

/// Level annual payment, compounding at the stated payment frequency.
fn annuity_annual_service(
    principal: Money,
    annual_rate: Rate,
    tenor_years: u32,
    frequency: PaymentFrequency,
) -> EngineResult<Money> {
    let m = Decimal::from(frequency.periods_per_year());
    let n_periods = Decimal::from(tenor_years * frequency.periods_per_year());

    if annual_rate.is_zero() {
        return Ok(principal / Decimal::from(tenor_years));
    }

    let periodic_rate = annual_rate / m;
    let factor = (Decimal::ONE + periodic_rate).powd(n_periods);
    let denom = factor - Decimal::ONE;
    if denom.is_zero() {
        return Err(EngineError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }
    let periodic_payment = principal * periodic_rate * factor / denom;
    Ok(periodic_payment * m)
}

/// Build a year-by-year schedule for a single loan, extended (with zero
/// rows) to `horizon_years` when the tenor is shorter. The amortizing
/// phase pays and compounds at the stated frequency; interest-only grace
/// years apply to both amortizing and balloon loans.
pub fn build_amortization_schedule(
    principal: Money,
    annual_rate: Rate,
    tenor_years: u32,
    amortization: &AmortizationType,
    frequency: PaymentFrequency,
    interest_only_years: u32,
    horizon_years: u32,
) -> EngineResult<Vec<DebtPeriod>> {
    validate_loan(principal, annual_rate, tenor_years)?;
    if interest_only_years >= tenor_years
        && matches!(
            amortization,
            AmortizationType::Amortizing | AmortizationType::Balloon { .. }
        )
    {
        return Err(EngineError::InvalidInput {
            field: "interest_only_years".into(),
            reason: "Grace period must be shorter than the tenor".into(),
        });
    }
    if let AmortizationType::Custom { intervals } = amortization {
        validate_custom_intervals(intervals)?;
    }
    if let AmortizationType::Balloon { balloon_pct } = amortization {
        validate_balloon_pct(*balloon_pct)?;
    }

    let n_years = horizon_years.max(tenor_years);
    let amortizing_years = tenor_years - interest_only_years;

    // Per-year interest/principal split for a fully amortizing loan
    let amortizing_split = match amortization {
        AmortizationType::Amortizing => Some(periodic_amortization(
            principal,
            annual_rate,
            amortizing_years,
            frequency,
        )?),
        _ => None,
    };
    // Level annual payment over the non-balloon portion
    let balloon_payment = match amortization {
        AmortizationType::Balloon { balloon_pct } => Some(annuity_annual_service(
            principal * (Decimal::ONE - balloon_pct),
            annual_rate,
            amortizing_years,
            frequency,
        )?),
        _ => None,
    };

    let mut periods = Vec::with_capacity(n_years as usize);
    let mut balance = principal;

    for year in 1..=n_years {
        let opening = balance;
        let within_tenor = year <= tenor_years;
        let in_grace = year <= interest_only_years
            && matches!(
                amortization,
                AmortizationType::Amortizing | AmortizationType::Balloon { .. }
            );

        let (interest, principal_due) = if !within_tenor {
            (Decimal::ZERO, Decimal::ZERO)
        } else if in_grace {
            (opening * annual_rate, Decimal::ZERO)
        } else {
            match amortization {
                AmortizationType::Amortizing => {
                    let idx = (year - interest_only_years - 1) as usize;
                    let (i, p) = amortizing_split
                        .as_ref()
                        .and_then(|s| s.get(idx).copied())
                        .unwrap_or((Decimal::ZERO, Decimal::ZERO));
                    (i, p.min(opening))
                }
                AmortizationType::InterestOnly => (opening * annual_rate, Decimal::ZERO),
                AmortizationType::Bullet => {
                    let due = if year == tenor_years {
                        opening
                    } else {
                        Decimal::ZERO
                    };
                    (opening * annual_rate, due)
                }
                AmortizationType::Balloon { .. } => {
                    let interest = opening * annual_rate;
                    let due = if year == tenor_years {
                        // Final year: remaining amortization plus the balloon
                        opening
                    } else {
                        let pmt = balloon_payment.unwrap_or(Decimal::ZERO);
                        (pmt - interest).min(opening).max(Decimal::ZERO)
                    };
                    (interest, due)
                }
                AmortizationType::Custom { intervals } => {
                    let idx = (year - 1) as usize;
                    let due = intervals
                        .get(idx)
                        .map(|pct| (principal * pct).min(opening))
                        .unwrap_or(Decimal::ZERO);
                    (opening * annual_rate, due)
                }
            }
        };

        // Ending balance floored at zero
        balance = (opening - principal_due).max(Decimal::ZERO);

        periods.push(DebtPeriod {
            year,
            opening_balance: opening,
            interest,
            principal: principal_due,
            total_payment: interest + principal_due,
            closing_balance: balance,
        });
    }

    Ok(periods)
}

/// Schedule each tranche independently, then sum per-year services.
pub fn blend_tranches(
    tranches: &[DebtTranche],
    horizon_years: u32,
) -> EngineResult<ComputationOutput<BlendedDebtOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if tranches.is_empty() {
        return Err(EngineError::InsufficientData(
            "At least one tranche is required".into(),
        ));
    }
    if horizon_years == 0 {
        return Err(EngineError::InvalidInput {
            field: "horizon_years".into(),
            reason: "Horizon must be at least 1 year".into(),
        });
    }

    let total_principal: Money = tranches.iter().map(|t| t.principal).sum();
    if total_principal <= Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "tranches".into(),
            reason: "Total tranche principal must be positive".into(),
        });
    }

    // Blended rate is weighted by principal, not by service
    let blended_rate: Rate = tranches
        .iter()
        .map(|t| t.principal * t.rate)
        .sum::<Decimal>()
        / total_principal;

    let n_years = tranches
        .iter()
        .map(|t| t.tenor_years)
        .max()
        .unwrap_or(horizon_years)
        .max(horizon_years);

    let mut combined: Vec<DebtPeriod> = (1..=n_years)
        .map(|year| DebtPeriod {
            year,
            opening_balance: Decimal::ZERO,
            interest: Decimal::ZERO,
            principal: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            closing_balance: Decimal::ZERO,
        })
        .collect();

    let mut refinancing_required = Vec::new();

    for tranche in tranches {
        let schedule = build_amortization_schedule(
            tranche.principal,
            tranche.rate,
            tranche.tenor_years,
            &tranche.amortization_type,
            PaymentFrequency::Annual,
            tranche.interest_only_years,
            n_years,
        )?;

        for (slot, period) in combined.iter_mut().zip(schedule.iter()) {
            slot.opening_balance += period.opening_balance;
            slot.interest += period.interest;
            slot.principal += period.principal;
            slot.total_payment += period.total_payment;
            slot.closing_balance += period.closing_balance;
        }

        if tranche.tenor_years < horizon_years {
            warnings.push(format!(
                "Tranche '{}' matures in year {} inside the {horizon_years}-year horizon; refinancing required",
                tranche.name, tranche.tenor_years
            ));
            refinancing_required.push(tranche.id.clone());
        }
    }

    let output = BlendedDebtOutput {
        periods: combined,
        total_principal,
        blended_rate,
        refinancing_required,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multi-Tranche Debt Blending",
        &serde_json::json!({
            "tranches": tranches.len(),
            "total_principal": total_principal.to_string(),
            "horizon_years": horizon_years,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Year-by-year (interest, principal) split for a level-payment loan
/// paying and compounding at the stated frequency. Sub-periods are
/// simulated so the balance reaches zero exactly at the end of `years`.
fn periodic_amortization(
    principal: Money,
    annual_rate: Rate,
    years: u32,
    frequency: PaymentFrequency,
) -> EngineResult<Vec<(Money, Money)>> {
    if years == 0 {
        return Err(EngineError::InvalidInput {
            field: "tenor_years".into(),
            reason: "Amortization period must be at least 1 year".into(),
        });
    }
    let m = frequency.periods_per_year();
    let periodic_rate = annual_rate / Decimal::from(m);
    let total_periods = Decimal::from(years * m);

    let payment = if annual_rate.is_zero() {
        principal / total_periods
    } else {
        let factor = (Decimal::ONE + periodic_rate).powd(total_periods);
        let denom = factor - Decimal::ONE;
        if denom.is_zero() {
            return Err(EngineError::DivisionByZero {
                context: "level payment annuity factor".into(),
            });
        }
        principal * periodic_rate * factor / denom
    };

    let mut balance = principal;
    let mut split = Vec::with_capacity(years as usize);
    for _ in 0..years {
        let mut interest_for_year = Decimal::ZERO;
        let mut principal_for_year = Decimal::ZERO;
        for _ in 0..m {
            let interest = balance * periodic_rate;
            let repay = (payment - interest).min(balance).max(Decimal::ZERO);
            interest_for_year += interest;
            principal_for_year += repay;
            balance -= repay;
        }
        split.push((interest_for_year, principal_for_year));
    }
    Ok(split)
}

fn validate_loan(principal: Money, annual_rate: Rate, tenor_years: u32) -> EngineResult<()> {
    if principal <= Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if annual_rate < Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "rate".into(),
            reason: "Rate cannot be negative".into(),
        });
    }
    if tenor_years == 0 {
        return Err(EngineError::InvalidInput {
            field: "tenor_years".into(),
            reason: "Tenor must be at least 1 year".into(),
        });
    }
    Ok(())
}

fn validate_balloon_pct(balloon_pct: Rate) -> EngineResult<()> {
    if balloon_pct < Decimal::ZERO || balloon_pct >= Decimal::ONE {
        return Err(EngineError::InvalidInput {
            field: "balloon_pct".into(),
            reason: "Balloon percentage must be in [0, 1)".into(),
        });
    }
    Ok(())
}

pub(crate) fn validate_custom_intervals(intervals: &[Rate]) -> EngineResult<()> {
    if intervals.is_empty() {
        return Err(EngineError::InvalidInput {
            field: "intervals".into(),
            reason: "Custom amortization requires at least one interval".into(),
        });
    }
    let sum: Decimal = intervals.iter().copied().sum();
    if (sum - Decimal::ONE).abs() > INTERVAL_SUM_TOLERANCE {
        return Err(EngineError::InvalidInput {
            field: "intervals".into(),
            reason: format!("Custom intervals must sum to 100% (±0.5%), got {sum}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
