use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::covenants::{self, CreditStats};
use crate::debt::{self, DebtPeriod};
use crate::params::ModelParameters;
use crate::types::{with_metadata, ComputationOutput, Money, Ratio};
use crate::valuation::{self, EquityReturns};
use crate::EngineResult;

/// One projection year. Produced once per run and never mutated;
/// a parameter change produces a fresh row set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearRow {
    pub year: i32,
    // Income statement
    pub revenue: Money,
    pub cogs: Money,
    pub opex: Money,
    pub ebitda: Money,
    pub da: Money,
    pub ebit: Money,
    pub interest_expense: Money,
    pub tax: Money,
    pub net_income: Money,
    // Cash flow
    pub capex: Money,
    pub nwc_change: Money,
    pub fcff: Money,
    pub fcfe: Money,
    pub cash_balance: Money,
    // Debt roll
    pub beginning_debt: Money,
    pub principal_payment: Money,
    pub ending_debt: Money,
    pub total_debt_service: Money,
    // Credit ratios
    pub dscr: Ratio,
    pub icr: Ratio,
    pub net_debt_to_ebitda: Ratio,
    // Covenant flags
    pub dscr_breach: bool,
    pub icr_breach: bool,
    pub leverage_breach: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub years: Vec<YearRow>,
    pub terminal_value: Money,
    pub pv_terminal_value: Money,
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub ev_to_ebitda: Ratio,
    pub ev_to_revenue: Ratio,
    pub price_to_earnings: Ratio,
    pub returns: EquityReturns,
    pub credit_stats: CreditStats,
    /// Digest of the input parameters; results are memo-keyed by this
    pub params_digest: u64,
}

/// Run the full year-by-year projection, covenant evaluation, and DCF
/// valuation for one parameter set. Pure: same inputs, same output.
pub fn project(params: &ModelParameters) -> EngineResult<ComputationOutput<ProjectionResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    params.validate()?;

    let n_years = params.horizon.years;
    let facility_schedule = build_facility_schedule(params, &mut warnings)?;

    // Existing debt is serviced interest-only over the horizon
    let existing_debt = params.capital.opening_debt;
    let existing_interest = existing_debt * params.capital.interest_rate;

    let mut rows: Vec<YearRow> = Vec::with_capacity(n_years as usize);
    let mut prev_revenue = params.operating.base_revenue;
    let mut ppe = params.capital.opening_ppe;
    let mut cash = params.capital.opening_cash;

    for t in 1..=n_years {
        let op = &params.operating;
        let revenue = prev_revenue * (Decimal::ONE + op.growth);
        let cogs = revenue * op.cogs_pct;
        let opex = revenue * op.opex_pct;
        let ebitda = revenue - cogs - opex;

        let capex = revenue * op.capex_pct;
        // D&A charged on the capex-inclusive PPE balance
        let da = (ppe + capex) * op.da_pct_of_ppe;
        ppe = ppe + capex - da;
        let ebit = ebitda - da;

        let fac = facility_period(&facility_schedule, t);
        let interest_expense = existing_interest + fac.interest;
        let principal_payment = fac.principal;

        let tax = ((ebit - interest_expense) * params.capital.tax_rate).max(Decimal::ZERO);
        let net_income = ebit - interest_expense - tax;

        let nwc_change = (revenue - prev_revenue) * op.wc_pct_of_rev;
        let fcff = ebitda - tax - capex - nwc_change;
        let fcfe = fcff - principal_payment;

        let beginning_debt = existing_debt + fac.opening_balance;
        let ending_debt = (beginning_debt - principal_payment).max(Decimal::ZERO);
        let total_debt_service = interest_expense + principal_payment;

        cash += fcfe;

        let dscr = Ratio::from_div(fcff, total_debt_service);
        let icr = Ratio::from_div(ebitda, interest_expense);
        let net_debt_to_ebitda = Ratio::from_div(ending_debt - cash, ebitda);

        let flags = covenants::evaluate_row(dscr, icr, net_debt_to_ebitda, &params.covenants);

        rows.push(YearRow {
            year: params.horizon.start_year + t as i32,
            revenue,
            cogs,
            opex,
            ebitda,
            da,
            ebit,
            interest_expense,
            tax,
            net_income,
            capex,
            nwc_change,
            fcff,
            fcfe,
            cash_balance: cash,
            beginning_debt,
            principal_payment,
            ending_debt,
            total_debt_service,
            dscr,
            icr,
            net_debt_to_ebitda,
            dscr_breach: flags.dscr_breach,
            icr_breach: flags.icr_breach,
            leverage_breach: flags.leverage_breach,
        });

        prev_revenue = revenue;
    }

    // --- Valuation ---
    let fcff_flows: Vec<Money> = rows.iter().map(|r| r.fcff).collect();
    let last = rows.last().ok_or_else(|| {
        crate::error::EngineError::InsufficientData("No projection years generated".into())
    })?;

    let tv = valuation::terminal_value(
        last.fcff,
        params.capital.terminal_growth,
        params.capital.wacc,
    )?;
    let pv_tv = valuation::present_value_at(tv, params.capital.wacc, n_years);
    let pv_fcff = valuation::present_value_of_flows(&fcff_flows, params.capital.wacc)?;
    let enterprise_value = pv_fcff + pv_tv;

    if enterprise_value < Decimal::ZERO {
        warnings.push(format!(
            "Enterprise value is negative ({enterprise_value}); projected cash flows do not support the capital structure"
        ));
    }

    let equity_value = enterprise_value - last.ending_debt + last.cash_balance;

    // --- Multiples ---
    let ev_to_ebitda = Ratio::from_div(enterprise_value, last.ebitda);
    let ev_to_revenue = Ratio::from_div(enterprise_value, last.revenue);
    let price_to_earnings = Ratio::from_div(equity_value, last.net_income);

    // --- Equity returns ---
    let total_facility = if params.multi_tranche() {
        params.tranches.iter().map(|t| t.principal).sum()
    } else {
        params.facility.amount
    };
    let opening_total_debt = params.capital.opening_debt + total_facility;
    let mut equity_invested = enterprise_value - opening_total_debt + params.capital.opening_cash;
    if equity_invested <= Decimal::ZERO {
        warnings.push(format!(
            "Implied entry equity is non-positive ({equity_invested}); IRR and MOIC reported as undefined"
        ));
        equity_invested = Decimal::ZERO;
    }
    let fcfe_flows: Vec<Money> = rows.iter().map(|r| r.fcfe).collect();
    let exit_equity = tv - last.ending_debt + last.cash_balance;
    let returns = valuation::equity_returns(equity_invested, &fcfe_flows, exit_equity)?;

    // --- Credit aggregates ---
    let credit_stats = covenants::aggregate_credit_stats(&rows);

    let result = ProjectionResult {
        years: rows,
        terminal_value: tv,
        pv_terminal_value: pv_tv,
        enterprise_value,
        equity_value,
        ev_to_ebitda,
        ev_to_revenue,
        price_to_earnings,
        returns,
        credit_stats,
        params_digest: params.digest(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multi-Year Credit Projection with DCF Valuation",
        params,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Combined facility schedule over the horizon: the tranche stack when
/// multi-tranche mode is active, the single requested facility otherwise.
fn build_facility_schedule(
    params: &ModelParameters,
    warnings: &mut Vec<String>,
) -> EngineResult<Vec<DebtPeriod>> {
    if params.multi_tranche() {
        let blended = debt::blend_tranches(&params.tranches, params.horizon.years)?;
        warnings.extend(blended.warnings);
        Ok(blended.result.periods)
    } else if params.facility.amount > Decimal::ZERO {
        debt::build_amortization_schedule(
            params.facility.amount,
            params.facility.rate,
            params.facility.tenor_years,
            &params.facility.amortization,
            params.facility.payment_frequency,
            params.facility.interest_only_years,
            params.horizon.years,
        )
    } else {
        Ok(Vec::new())
    }
}

/// Zero service for years beyond the schedule (or with no facility at all).
fn facility_period(schedule: &[DebtPeriod], year: u32) -> DebtPeriod {
    schedule
        .iter()
        .find(|p| p.year == year)
        .cloned()
        .unwrap_or(DebtPeriod {
            year,
            opening_balance: Decimal::ZERO,
            interest: Decimal::ZERO,
            principal: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            closing_balance: Decimal::ZERO,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
