use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::EngineError;
use crate::solver;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Ratio};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// WACC via CAPM
// ---------------------------------------------------------------------------

/// Inputs for deriving WACC from first principles. Optional path: callers
/// may also supply a WACC directly in the model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapmInput {
    pub risk_free_rate: Rate,
    pub market_risk_premium: Rate,
    pub beta: Decimal,
    pub cost_of_debt: Rate,
    pub tax_rate: Rate,
    pub debt_weight: Rate,
    pub equity_weight: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc: Rate,
    pub cost_of_equity: Rate,
    pub after_tax_cost_of_debt: Rate,
}

/// WACC = Ke·We + Kd·(1−t)·Wd, with Ke from CAPM:
/// Ke = risk_free + beta · market_risk_premium.
pub fn derive_wacc(input: &CapmInput) -> EngineResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.risk_free_rate < Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "Risk-free rate cannot be negative".into(),
        });
    }
    if input.beta <= Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "beta".into(),
            reason: "Beta must be positive".into(),
        });
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(EngineError::InvalidInput {
            field: "tax_rate".into(),
            reason: "Tax rate must be between 0 and 1".into(),
        });
    }
    let weight_sum = input.debt_weight + input.equity_weight;
    if (weight_sum - Decimal::ONE).abs() > dec!(0.01) {
        return Err(EngineError::InvalidInput {
            field: "debt_weight + equity_weight".into(),
            reason: format!("Capital structure weights must sum to 1.0, got {weight_sum}"),
        });
    }

    let cost_of_equity = input.risk_free_rate + input.beta * input.market_risk_premium;
    let after_tax_cost_of_debt = input.cost_of_debt * (Decimal::ONE - input.tax_rate);
    let wacc = cost_of_equity * input.equity_weight + after_tax_cost_of_debt * input.debt_weight;

    if wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {wacc} exceeds 20%; appropriate for high-risk situations only"
        ));
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "WACC via CAPM",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// DCF building blocks
// ---------------------------------------------------------------------------

/// Gordon growth terminal value. The caller guarantees `wacc > g` via
/// parameter validation; this re-checks as a final guard.
pub fn terminal_value(final_fcf: Money, terminal_growth: Rate, wacc: Rate) -> EngineResult<Money> {
    let denom = wacc - terminal_growth;
    if denom <= Decimal::ZERO {
        return Err(EngineError::FinancialImpossibility(
            "WACC must exceed terminal growth rate".into(),
        ));
    }
    Ok(final_fcf * (Decimal::ONE + terminal_growth) / denom)
}

/// Sum of end-of-year present values: Σ flows[t-1] / (1+rate)^t.
pub fn present_value_of_flows(flows: &[Money], rate: Rate) -> EngineResult<Money> {
    if rate <= dec!(-1) {
        return Err(EngineError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut pv = Decimal::ZERO;
    for flow in flows {
        discount *= one_plus_r;
        if discount.is_zero() {
            return Err(EngineError::DivisionByZero {
                context: "present value discount factor".into(),
            });
        }
        pv += flow / discount;
    }
    Ok(pv)
}

/// Present value of a single amount received after `years` periods.
pub fn present_value_at(amount: Money, rate: Rate, years: u32) -> Money {
    let discount = (Decimal::ONE + rate).powd(Decimal::from(years));
    if discount.is_zero() {
        Decimal::ZERO
    } else {
        amount / discount
    }
}

// ---------------------------------------------------------------------------
// Equity returns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityReturns {
    pub equity_invested: Money,
    pub total_distributions: Money,
    /// None when the equity cash flow series has no sign change
    pub irr: Option<Rate>,
    pub moic: Ratio,
}

/// Equity IRR and MOIC over the FCFE stream plus exit proceeds.
///
/// Cash flow series: `[-equity_invested, fcfe_1, .., fcfe_n + exit_equity]`.
pub fn equity_returns(
    equity_invested: Money,
    fcfe_flows: &[Money],
    exit_equity: Money,
) -> EngineResult<EquityReturns> {
    if fcfe_flows.is_empty() {
        return Err(EngineError::InsufficientData(
            "Equity returns require at least one projection year".into(),
        ));
    }

    let mut flows: Vec<Money> = Vec::with_capacity(fcfe_flows.len() + 1);
    flows.push(-equity_invested);
    flows.extend_from_slice(fcfe_flows);
    if let Some(last) = flows.last_mut() {
        *last += exit_equity;
    }

    let irr = if equity_invested > Decimal::ZERO {
        solver::irr(&flows)?
    } else {
        None
    };

    let total_distributions: Money = fcfe_flows.iter().copied().sum::<Decimal>() + exit_equity;
    let moic = Ratio::from_div(total_distributions, equity_invested);

    Ok(EquityReturns {
        equity_invested,
        total_distributions,
        irr,
        moic,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
