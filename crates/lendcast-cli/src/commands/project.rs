use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lendcast_core::params::ModelParameters;
use lendcast_core::projector;
use lendcast_core::scenario::{self, ScenarioShock};

use crate::input;

/// Arguments for a single projection run
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ProjectArgs {
    /// Path to a JSON file holding a full parameter set (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// First projection year
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Projection horizon in years
    #[arg(long)]
    pub years: Option<u32>,

    /// Base (most recent) annual revenue
    #[arg(long)]
    pub base_revenue: Option<Decimal>,

    /// Annual revenue growth rate
    #[arg(long)]
    pub growth: Option<Decimal>,

    /// COGS as a share of revenue
    #[arg(long)]
    pub cogs_pct: Option<Decimal>,

    /// Operating expenses as a share of revenue
    #[arg(long)]
    pub opex_pct: Option<Decimal>,

    /// Capex as a share of revenue
    #[arg(long)]
    pub capex_pct: Option<Decimal>,

    /// Depreciation as a share of gross PP&E
    #[arg(long, alias = "da-pct")]
    pub da_pct_of_ppe: Option<Decimal>,

    /// Working capital as a share of revenue
    #[arg(long, alias = "wc-pct")]
    pub wc_pct_of_rev: Option<Decimal>,

    /// Existing debt at the start of the projection
    #[arg(long)]
    pub opening_debt: Option<Decimal>,

    /// Cash at the start of the projection
    #[arg(long)]
    pub opening_cash: Option<Decimal>,

    /// Gross PP&E at the start of the projection
    #[arg(long)]
    pub opening_ppe: Option<Decimal>,

    /// Rate on existing debt
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Corporate tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Discount rate for DCF valuation
    #[arg(long)]
    pub wacc: Option<Decimal>,

    /// Perpetuity growth rate for the terminal value
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// New facility principal
    #[arg(long)]
    pub facility_amount: Option<Decimal>,

    /// New facility annual rate
    #[arg(long)]
    pub facility_rate: Option<Decimal>,

    /// New facility tenor in years
    #[arg(long)]
    pub facility_tenor: Option<u32>,

    /// Interest-only years at the front of the facility
    #[arg(long)]
    pub interest_only_years: Option<u32>,

    /// Minimum DSCR covenant
    #[arg(long)]
    pub min_dscr: Option<Decimal>,

    /// Minimum ICR covenant
    #[arg(long)]
    pub target_icr: Option<Decimal>,

    /// Maximum net debt / EBITDA covenant
    #[arg(long)]
    pub max_nd_to_ebitda: Option<Decimal>,

    /// Maximum loan-to-value covenant
    #[arg(long)]
    pub max_ltv: Option<Decimal>,

    /// Preset scenario name: base, mild_downside, severe_downside,
    /// cost_inflation, rate_shock
    #[arg(long)]
    pub scenario: Option<String>,

    /// Additive delta on the growth rate
    #[arg(long)]
    pub growth_delta: Option<Decimal>,

    /// Additive delta on the COGS percentage
    #[arg(long)]
    pub cogs_delta: Option<Decimal>,

    /// Additive delta on the opex percentage
    #[arg(long)]
    pub opex_delta: Option<Decimal>,

    /// Additive delta on the capex percentage
    #[arg(long)]
    pub capex_delta: Option<Decimal>,

    /// Additive delta on every debt rate
    #[arg(long)]
    pub rate_delta: Option<Decimal>,

    /// Additive delta on the WACC
    #[arg(long)]
    pub wacc_delta: Option<Decimal>,

    /// Additive delta on the terminal growth rate
    #[arg(long)]
    pub term_g_delta: Option<Decimal>,
}

/// Arguments for the preset stress-scenario suite
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct StressArgs {
    /// Path to a JSON file holding a full parameter set
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON file holding a custom shock to append to the suite
    #[arg(long)]
    pub shock: Option<String>,

    /// Additive delta on the growth rate (custom scenario)
    #[arg(long)]
    pub growth_delta: Option<Decimal>,

    /// Additive delta on the COGS percentage (custom scenario)
    #[arg(long)]
    pub cogs_delta: Option<Decimal>,

    /// Additive delta on the opex percentage (custom scenario)
    #[arg(long)]
    pub opex_delta: Option<Decimal>,

    /// Additive delta on the capex percentage (custom scenario)
    #[arg(long)]
    pub capex_delta: Option<Decimal>,

    /// Additive delta on every debt rate (custom scenario)
    #[arg(long)]
    pub rate_delta: Option<Decimal>,

    /// Additive delta on the WACC (custom scenario)
    #[arg(long)]
    pub wacc_delta: Option<Decimal>,

    /// Additive delta on the terminal growth rate (custom scenario)
    #[arg(long)]
    pub term_g_delta: Option<Decimal>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_params(&args)?;

    let shock = if let Some(ref name) = args.scenario {
        scenario::preset_shocks()
            .into_iter()
            .find(|p| p.name == *name)
            .map(|p| p.shock)
            .ok_or_else(|| format!("Unknown scenario preset: {}", name))?
    } else {
        ScenarioShock {
            growth_delta: args.growth_delta.unwrap_or_default(),
            cogs_delta: args.cogs_delta.unwrap_or_default(),
            opex_delta: args.opex_delta.unwrap_or_default(),
            capex_delta: args.capex_delta.unwrap_or_default(),
            rate_delta: args.rate_delta.unwrap_or_default(),
            wacc_delta: args.wacc_delta.unwrap_or_default(),
            term_g_delta: args.term_g_delta.unwrap_or_default(),
        }
    };

    let effective = if shock.is_zero() {
        params
    } else {
        scenario::apply_shocks(&params, &shock)
    };

    let result = projector::project(&effective)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params: ModelParameters = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file (or piped JSON) is required for stress testing".into());
    };

    let custom: Option<ScenarioShock> = if let Some(ref path) = args.shock {
        Some(input::file::read_json(path)?)
    } else {
        let flags = ScenarioShock {
            growth_delta: args.growth_delta.unwrap_or_default(),
            cogs_delta: args.cogs_delta.unwrap_or_default(),
            opex_delta: args.opex_delta.unwrap_or_default(),
            capex_delta: args.capex_delta.unwrap_or_default(),
            rate_delta: args.rate_delta.unwrap_or_default(),
            wacc_delta: args.wacc_delta.unwrap_or_default(),
            term_g_delta: args.term_g_delta.unwrap_or_default(),
        };
        if flags.is_zero() { None } else { Some(flags) }
    };

    let result = scenario::run_stress_suite(&params, custom.as_ref())?;
    Ok(serde_json::to_value(result)?)
}

/// Parameters come from a file, piped JSON, or individual flags
/// resolved through the builder's defaults.
fn resolve_params(args: &ProjectArgs) -> Result<ModelParameters, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return Ok(input::file::read_json(path)?);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }

    let base_revenue = args
        .base_revenue
        .ok_or("--base-revenue is required (or provide --input)")?;

    let mut builder = ModelParameters::builder().base_revenue(base_revenue);

    // Same fallbacks the builder itself resolves to
    if args.start_year.is_some() || args.years.is_some() {
        builder = builder.horizon(args.start_year.unwrap_or(2025), args.years.unwrap_or(5));
    }

    if let Some(v) = args.growth {
        builder = builder.growth(v);
    }
    if let Some(v) = args.cogs_pct {
        builder = builder.cogs_pct(v);
    }
    if let Some(v) = args.opex_pct {
        builder = builder.opex_pct(v);
    }
    if let Some(v) = args.capex_pct {
        builder = builder.capex_pct(v);
    }
    if let Some(v) = args.da_pct_of_ppe {
        builder = builder.da_pct_of_ppe(v);
    }
    if let Some(v) = args.wc_pct_of_rev {
        builder = builder.wc_pct_of_rev(v);
    }
    if let Some(v) = args.opening_debt {
        builder = builder.opening_debt(v);
    }
    if let Some(v) = args.opening_cash {
        builder = builder.opening_cash(v);
    }
    if let Some(v) = args.opening_ppe {
        builder = builder.opening_ppe(v);
    }
    if let Some(v) = args.interest_rate {
        builder = builder.interest_rate(v);
    }
    if let Some(v) = args.tax_rate {
        builder = builder.tax_rate(v);
    }
    if let Some(v) = args.wacc {
        builder = builder.wacc(v);
    }
    if let Some(v) = args.terminal_growth {
        builder = builder.terminal_growth(v);
    }
    if let Some(v) = args.facility_amount {
        builder = builder.facility_amount(v);
    }
    if let Some(v) = args.facility_rate {
        builder = builder.facility_rate(v);
    }
    if let Some(v) = args.facility_tenor {
        builder = builder.facility_tenor(v);
    }
    if let Some(v) = args.interest_only_years {
        builder = builder.interest_only_years(v);
    }
    if let Some(v) = args.min_dscr {
        builder = builder.min_dscr(v);
    }
    if let Some(v) = args.target_icr {
        builder = builder.target_icr(v);
    }
    if let Some(v) = args.max_nd_to_ebitda {
        builder = builder.max_nd_to_ebitda(v);
    }
    if let Some(v) = args.max_ltv {
        builder = builder.max_ltv(v);
    }

    Ok(builder.build()?)
}
