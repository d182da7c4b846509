use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::EngineError;
use crate::types::{Money, Rate, Years};
use crate::EngineResult;

const IRR_TOLERANCE: Decimal = dec!(0.0001);
const IRR_INITIAL_GUESS: Rate = dec!(0.10);
const MAX_NEWTON_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 1000;
const RATE_LOWER_BOUND: Rate = dec!(-0.99);
const RATE_UPPER_BOUND: Rate = dec!(10);

/// Net Present Value of a series of cash flows (index 0 is undiscounted).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> EngineResult<Money> {
    if rate <= dec!(-1) {
        return Err(EngineError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(EngineError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// Internal Rate of Return.
///
/// Newton-Raphson on NPV(rate) = 0 with the analytic derivative, falling
/// back to bisection over [-0.99, 10] when Newton stalls or diverges.
///
/// Returns `Ok(None)` when the series lacks both a positive and a
/// negative flow — the IRR is mathematically undefined there, which is
/// distinct from a valid 0% IRR and from non-convergence.
pub fn irr(cash_flows: &[Money]) -> EngineResult<Option<Rate>> {
    if cash_flows.len() < 2 {
        return Err(EngineError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let has_positive = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    let has_negative = cash_flows.iter().any(|cf| cf.is_sign_negative());
    if !has_positive || !has_negative {
        return Ok(None);
    }

    let mut rate = IRR_INITIAL_GUESS;

    for _ in 0..MAX_NEWTON_ITERATIONS {
        let (npv_val, dnpv) = npv_and_derivative(rate, cash_flows);

        if npv_val.abs() < IRR_TOLERANCE {
            return Ok(Some(rate));
        }
        if dnpv.is_zero() {
            break;
        }

        rate -= npv_val / dnpv;
        rate = rate.clamp(RATE_LOWER_BOUND, RATE_UPPER_BOUND);
    }

    bisect_irr(cash_flows).map(Some)
}

/// Modified IRR: negative flows discounted at the finance rate, positive
/// flows compounded at the reinvestment rate.
pub fn mirr(
    cash_flows: &[Money],
    finance_rate: Rate,
    reinvest_rate: Rate,
) -> EngineResult<Option<Rate>> {
    let n = cash_flows.len();
    if n < 2 {
        return Err(EngineError::InsufficientData(
            "MIRR requires at least 2 cash flows".into(),
        ));
    }

    let periods = Decimal::from((n - 1) as i64);
    let mut pv_negative = Decimal::ZERO;
    let mut fv_positive = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let t_dec = Decimal::from(t as i64);
        if cf.is_sign_negative() {
            pv_negative += cf / (Decimal::ONE + finance_rate).powd(t_dec);
        } else {
            fv_positive += cf * (Decimal::ONE + reinvest_rate).powd(periods - t_dec);
        }
    }

    if pv_negative.is_zero() || fv_positive.is_zero() {
        return Ok(None);
    }

    let ratio = fv_positive / -pv_negative;
    if ratio <= Decimal::ZERO {
        return Ok(None);
    }

    let root = ratio.powd(Decimal::ONE / periods);
    Ok(Some(root - Decimal::ONE))
}

/// Years until cumulative cash flow turns non-negative, interpolated
/// within the crossing year. `None` when the flows never pay back.
pub fn payback_period(cash_flows: &[Money]) -> Option<Years> {
    cumulative_payback(cash_flows.iter().copied())
}

/// Payback on discounted flows.
pub fn discounted_payback(cash_flows: &[Money], rate: Rate) -> EngineResult<Option<Years>> {
    if rate <= dec!(-1) {
        return Err(EngineError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let discounted: Vec<Money> = cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| {
            if t > 0 {
                discount *= one_plus_r;
            }
            cf / discount
        })
        .collect();
    Ok(cumulative_payback(discounted.into_iter()))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> (Decimal, Decimal) {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let t_dec = Decimal::from(t as i64);
        let discount = one_plus_r.powd(t_dec);
        if discount.is_zero() {
            continue;
        }
        npv_val += cf / discount;
        if t > 0 {
            dnpv -= t_dec * cf / one_plus_r.powd(t_dec + Decimal::ONE);
        }
    }

    (npv_val, dnpv)
}

/// Bisection fallback over the full admissible rate range. Requires the
/// NPV to change sign across the bracket.
fn bisect_irr(cash_flows: &[Money]) -> EngineResult<Rate> {
    let mut lo = RATE_LOWER_BOUND;
    let mut hi = RATE_UPPER_BOUND;
    let mut npv_lo = npv(lo, cash_flows)?;
    let npv_hi = npv(hi, cash_flows)?;

    if (npv_lo.is_sign_positive()) == (npv_hi.is_sign_positive()) {
        return Err(EngineError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: MAX_NEWTON_ITERATIONS,
            last_delta: npv_lo,
        });
    }

    let mut last_npv = npv_lo;
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let npv_mid = npv(mid, cash_flows)?;
        last_npv = npv_mid;

        if npv_mid.abs() < IRR_TOLERANCE || (hi - lo).abs() < IRR_TOLERANCE {
            return Ok(mid);
        }

        if (npv_mid.is_sign_positive()) == (npv_lo.is_sign_positive()) {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }
    }

    Err(EngineError::ConvergenceFailure {
        function: "IRR (bisection)".into(),
        iterations: MAX_BISECTION_ITERATIONS,
        last_delta: last_npv,
    })
}

fn cumulative_payback(flows: impl Iterator<Item = Money>) -> Option<Years> {
    let mut cumulative = Decimal::ZERO;
    let mut prev_cumulative = Decimal::ZERO;

    for (t, cf) in flows.enumerate() {
        prev_cumulative = cumulative;
        cumulative += cf;
        if t > 0 && cumulative >= Decimal::ZERO && prev_cumulative < Decimal::ZERO {
            // Interpolate within the crossing year
            let fraction = if cf.is_zero() {
                Decimal::ZERO
            } else {
                -prev_cumulative / cf
            };
            return Some(Decimal::from((t - 1) as i64) + fraction);
        }
    }

    if cumulative >= Decimal::ZERO && prev_cumulative >= Decimal::ZERO {
        Some(Decimal::ZERO)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate_sums_flows() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(Decimal::ZERO, &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_irr_known_closed_form() {
        // 100 * 1.1^5 = 161.051, so IRR is exactly 10%
        let cfs = vec![
            dec!(-100),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(161.051),
        ];
        let rate = irr(&cfs).unwrap().unwrap();
        assert!((rate - dec!(0.10)).abs() < dec!(0.001), "got {rate}");
    }

    #[test]
    fn test_irr_undefined_without_sign_change() {
        let all_positive = vec![dec!(100), dec!(50), dec!(50)];
        assert!(irr(&all_positive).unwrap().is_none());

        let all_negative = vec![dec!(-100), dec!(-50)];
        assert!(irr(&all_negative).unwrap().is_none());
    }

    #[test]
    fn test_irr_distinct_from_zero_percent() {
        // Breakeven series has a genuine 0% IRR, not "undefined"
        let cfs = vec![dec!(-100), dec!(50), dec!(50)];
        let rate = irr(&cfs).unwrap().unwrap();
        assert!(rate.abs() < dec!(0.001), "got {rate}");
    }

    #[test]
    fn test_irr_deeply_negative() {
        // Recovering only 30% of investment: IRR well below zero
        let cfs = vec![dec!(-100), dec!(10), dec!(10), dec!(10)];
        let rate = irr(&cfs).unwrap().unwrap();
        assert!(rate < dec!(-0.3), "got {rate}");
    }

    #[test]
    fn test_irr_requires_two_flows() {
        assert!(matches!(
            irr(&[dec!(-100)]),
            Err(EngineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_mirr_between_finance_and_irr() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let m = mirr(&cfs, dec!(0.08), dec!(0.08)).unwrap().unwrap();
        // FV of 400s at 8%: 400*1.1664 + 400*1.08 + 400 = 1298.56
        // MIRR = (1298.56/1000)^(1/3) - 1 ≈ 9.1%
        assert!((m - dec!(0.091)).abs() < dec!(0.005), "got {m}");
    }

    #[test]
    fn test_mirr_undefined_without_both_signs() {
        assert!(mirr(&[dec!(100), dec!(50)], dec!(0.08), dec!(0.08))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_payback_interpolated() {
        // Cumulative: -100, -60, -20, +20 -> crosses during year 3 at 20/40
        let cfs = vec![dec!(-100), dec!(40), dec!(40), dec!(40)];
        let p = payback_period(&cfs).unwrap();
        assert_eq!(p, dec!(2.5));
    }

    #[test]
    fn test_payback_never_recovered() {
        let cfs = vec![dec!(-100), dec!(10), dec!(10)];
        assert!(payback_period(&cfs).is_none());
    }

    #[test]
    fn test_discounted_payback_longer_than_simple() {
        let cfs = vec![dec!(-100), dec!(40), dec!(40), dec!(40), dec!(40)];
        let simple = payback_period(&cfs).unwrap();
        let discounted = discounted_payback(&cfs, dec!(0.10)).unwrap().unwrap();
        assert!(discounted > simple);
    }

    #[test]
    fn test_npv_rejects_rate_at_or_below_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-100), dec!(50)]).is_err());
    }
}
