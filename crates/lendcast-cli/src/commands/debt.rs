use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::{json, Value};

use lendcast_core::debt::{self, AmortizationType, DebtTranche, PaymentFrequency};

use crate::input;

/// Arguments for single-loan annual debt service
#[derive(Args)]
pub struct DebtServiceArgs {
    /// Path to a JSON input file (required for custom amortization intervals)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Tenor in years
    #[arg(long, alias = "tenor")]
    pub tenor_years: Option<u32>,

    /// Repayment profile: amortizing, interest_only, bullet, balloon
    #[arg(long)]
    pub amortization: Option<String>,

    /// Balloon share of principal (with --amortization balloon)
    #[arg(long)]
    pub balloon_pct: Option<Decimal>,

    /// Payment frequency: annual, semi_annual, quarterly, monthly
    #[arg(long)]
    pub frequency: Option<String>,
}

/// Arguments for multi-tranche blending
#[derive(Args)]
pub struct BlendArgs {
    /// Path to a JSON file: { "tranches": [...], "horizon_years": n }
    #[arg(long)]
    pub input: Option<String>,

    /// Projection horizon in years (overrides the file value)
    #[arg(long)]
    pub horizon_years: Option<u32>,
}

#[derive(Deserialize)]
struct LoanInput {
    principal: Decimal,
    rate: Decimal,
    tenor_years: u32,
    amortization: Option<AmortizationType>,
    payment_frequency: Option<PaymentFrequency>,
}

#[derive(Deserialize)]
struct BlendInput {
    tranches: Vec<DebtTranche>,
    horizon_years: Option<u32>,
}

pub fn run_debt_service(args: DebtServiceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        LoanInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            tenor_years: args
                .tenor_years
                .ok_or("--tenor-years is required (or provide --input)")?,
            amortization: match args.amortization.as_deref() {
                None => None,
                Some(s) => Some(parse_amortization(s, args.balloon_pct)?),
            },
            payment_frequency: match args.frequency.as_deref() {
                None => None,
                Some(s) => Some(parse_frequency(s)?),
            },
        }
    };

    let amortization = loan.amortization.unwrap_or(AmortizationType::Amortizing);
    let frequency = loan.payment_frequency.unwrap_or(PaymentFrequency::Annual);

    let annual_service = debt::annual_debt_service(
        loan.principal,
        loan.rate,
        loan.tenor_years,
        &amortization,
        frequency,
    )?;

    Ok(json!({
        "result": {
            "principal": loan.principal,
            "rate": loan.rate,
            "tenor_years": loan.tenor_years,
            "amortization": amortization,
            "payment_frequency": frequency,
            "annual_service": annual_service,
        }
    }))
}

pub fn run_blend(args: BlendArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let blend: BlendInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file (or piped JSON) is required for blending".into());
    };

    let horizon = args
        .horizon_years
        .or(blend.horizon_years)
        .ok_or("--horizon-years is required (or set horizon_years in the input)")?;

    let result = debt::blend_tranches(&blend.tranches, horizon)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_amortization(
    s: &str,
    balloon_pct: Option<Decimal>,
) -> Result<AmortizationType, Box<dyn std::error::Error>> {
    match s {
        "amortizing" => Ok(AmortizationType::Amortizing),
        "interest_only" | "interest-only" => Ok(AmortizationType::InterestOnly),
        "bullet" => Ok(AmortizationType::Bullet),
        "balloon" => Ok(AmortizationType::Balloon {
            balloon_pct: balloon_pct.unwrap_or(dec!(0.30)),
        }),
        "custom" => Err("custom intervals require --input with an intervals array".into()),
        other => Err(format!("Unknown amortization type: {}", other).into()),
    }
}

fn parse_frequency(s: &str) -> Result<PaymentFrequency, Box<dyn std::error::Error>> {
    match s {
        "annual" => Ok(PaymentFrequency::Annual),
        "semi_annual" | "semi-annual" | "semiannual" => Ok(PaymentFrequency::SemiAnnual),
        "quarterly" => Ok(PaymentFrequency::Quarterly),
        "monthly" => Ok(PaymentFrequency::Monthly),
        other => Err(format!("Unknown payment frequency: {}", other).into()),
    }
}
