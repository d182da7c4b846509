use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lendcast_core::valuation::{self, CapmInput};

use crate::input;

/// Arguments for WACC derivation from CAPM inputs
#[derive(Args)]
pub struct WaccArgs {
    /// Path to a JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Risk-free rate
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Market risk premium
    #[arg(long)]
    pub market_risk_premium: Option<Decimal>,

    /// Equity beta
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Pre-tax cost of debt
    #[arg(long)]
    pub cost_of_debt: Option<Decimal>,

    /// Corporate tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Debt weight in the capital structure
    #[arg(long)]
    pub debt_weight: Option<Decimal>,

    /// Equity weight in the capital structure
    #[arg(long)]
    pub equity_weight: Option<Decimal>,
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let capm: CapmInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        CapmInput {
            risk_free_rate: args
                .risk_free_rate
                .ok_or("--risk-free-rate is required (or provide --input)")?,
            market_risk_premium: args
                .market_risk_premium
                .ok_or("--market-risk-premium is required (or provide --input)")?,
            beta: args.beta.ok_or("--beta is required (or provide --input)")?,
            cost_of_debt: args
                .cost_of_debt
                .ok_or("--cost-of-debt is required (or provide --input)")?,
            tax_rate: args
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            debt_weight: args
                .debt_weight
                .ok_or("--debt-weight is required (or provide --input)")?,
            equity_weight: args
                .equity_weight
                .ok_or("--equity-weight is required (or provide --input)")?,
        }
    };

    let result = valuation::derive_wacc(&capm)?;
    Ok(serde_json::to_value(result)?)
}
