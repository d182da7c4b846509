use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use lendcast_core::solver;

use crate::input;

/// Arguments for IRR calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct IrrArgs {
    /// Path to a JSON input file: { "cash_flows": [...] }
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated cash flows, first one at time zero (e.g. "-1000,400,400,400")
    #[arg(long)]
    pub flows: Option<String>,
}

/// Arguments for NPV calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct NpvArgs {
    /// Path to a JSON input file: { "rate": r, "cash_flows": [...] }
    #[arg(long)]
    pub input: Option<String>,

    /// Discount rate
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Comma-separated cash flows, first one at time zero
    #[arg(long)]
    pub flows: Option<String>,
}

#[derive(Deserialize)]
struct FlowsInput {
    cash_flows: Vec<Decimal>,
}

#[derive(Deserialize)]
struct NpvInput {
    rate: Decimal,
    cash_flows: Vec<Decimal>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let flows: Vec<Decimal> = if let Some(ref path) = args.input {
        let parsed: FlowsInput = input::file::read_json(path)?;
        parsed.cash_flows
    } else if let Some(data) = input::stdin::read_stdin()? {
        let parsed: FlowsInput = serde_json::from_value(data)?;
        parsed.cash_flows
    } else if let Some(ref raw) = args.flows {
        parse_flows(raw)?
    } else {
        return Err("--flows or --input is required for IRR".into());
    };

    let irr = solver::irr(&flows)?;
    Ok(json!({
        "result": {
            "irr": irr,
            "cash_flows": flows,
        }
    }))
}

pub fn run_npv(args: NpvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (rate, flows): (Decimal, Vec<Decimal>) = if let Some(ref path) = args.input {
        let parsed: NpvInput = input::file::read_json(path)?;
        (parsed.rate, parsed.cash_flows)
    } else if let Some(data) = input::stdin::read_stdin()? {
        let parsed: NpvInput = serde_json::from_value(data)?;
        (parsed.rate, parsed.cash_flows)
    } else {
        let rate = args.rate.ok_or("--rate is required (or provide --input)")?;
        let raw = args
            .flows
            .as_ref()
            .ok_or("--flows is required (or provide --input)")?;
        (rate, parse_flows(raw)?)
    };

    let npv = solver::npv(rate, &flows)?;
    Ok(json!({
        "result": {
            "npv": npv,
            "rate": rate,
            "cash_flows": flows,
        }
    }))
}

fn parse_flows(raw: &str) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    raw.split(',')
        .map(|s| {
            s.trim()
                .parse::<Decimal>()
                .map_err(|e| format!("Invalid cash flow '{}': {}", s.trim(), e).into())
        })
        .collect()
}
