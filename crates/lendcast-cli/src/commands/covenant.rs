use clap::Args;
use rust_decimal_macros::dec;
use serde_json::{Map, Value};

use lendcast_core::covenants::{self, ComplianceRow};
use lendcast_core::params::ModelParameters;
use lendcast_core::projector;
use lendcast_core::types::Ratio;

use crate::input;

/// Arguments for the covenant compliance schedule
#[derive(Args)]
pub struct CovenantScheduleArgs {
    /// Path to a JSON file holding a full parameter set
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_covenant_schedule(
    args: CovenantScheduleArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let params: ModelParameters = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file (or piped JSON) is required for the covenant schedule".into());
    };

    let output = projector::project(&params)?;
    let rows = covenants::compliance_schedule(&output.result, &params.covenants);

    let rendered: Vec<Value> = rows.iter().map(render_row).collect();

    let mut envelope = Map::new();
    envelope.insert("result".into(), Value::Array(rendered));
    envelope.insert(
        "warnings".into(),
        serde_json::to_value(&output.warnings)?,
    );
    envelope.insert(
        "methodology".into(),
        Value::String(output.methodology.clone()),
    );
    Ok(Value::Object(envelope))
}

/// Fixed export column order; the CSV and table renderers preserve it.
fn render_row(row: &ComplianceRow) -> Value {
    let mut m = Map::new();
    m.insert("Year".into(), row.year.into());
    m.insert("DSCR".into(), ratio_cell(row.dscr));
    m.insert("DSCR Headroom".into(), ratio_cell(row.dscr_headroom));
    m.insert("DSCR Status".into(), row.dscr_status.to_string().into());
    m.insert("ICR".into(), ratio_cell(row.icr));
    m.insert("ICR Headroom".into(), ratio_cell(row.icr_headroom));
    m.insert("ICR Status".into(), row.icr_status.to_string().into());
    m.insert(
        "Net Debt / EBITDA".into(),
        ratio_cell(row.net_debt_to_ebitda),
    );
    m.insert(
        "Leverage Status".into(),
        row.leverage_status.to_string().into(),
    );
    m.insert("LTV %".into(), percent_cell(row.ltv_pct));
    m.insert("LTV Headroom".into(), percent_cell(row.ltv_headroom));
    m.insert(
        "Total Debt Service".into(),
        row.total_debt_service.to_string().into(),
    );
    m.insert(
        "Cash After Debt Service".into(),
        row.cash_after_debt_service.to_string().into(),
    );
    m.insert("Overall Status".into(), row.overall_status.to_string().into());
    Value::Object(m)
}

fn ratio_cell(ratio: Ratio) -> Value {
    match ratio {
        Ratio::Value(v) => v.to_string().into(),
        Ratio::NotApplicable => "N/A".into(),
    }
}

/// The engine reports LTV as a fraction; the export columns show percent.
fn percent_cell(ratio: Ratio) -> Value {
    match ratio {
        Ratio::Value(v) => (v * dec!(100)).round_dp(2).to_string().into(),
        Ratio::NotApplicable => "N/A".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendcast_core::covenants::CovenantStatus;

    fn sample_row() -> ComplianceRow {
        ComplianceRow {
            year: 2026,
            dscr: Ratio::Value(dec!(1.45)),
            dscr_headroom: Ratio::Value(dec!(0.25)),
            dscr_status: CovenantStatus::Pass,
            icr: Ratio::Value(dec!(2.8)),
            icr_headroom: Ratio::Value(dec!(0.8)),
            icr_status: CovenantStatus::Pass,
            net_debt_to_ebitda: Ratio::Value(dec!(3.1)),
            leverage_status: CovenantStatus::Pass,
            ltv_pct: Ratio::Value(dec!(0.62)),
            ltv_headroom: Ratio::Value(dec!(0.13)),
            total_debt_service: dec!(27_740_973),
            cash_after_debt_service: dec!(4_500_000),
            overall_status: CovenantStatus::Pass,
        }
    }

    #[test]
    fn test_ltv_columns_rendered_as_percent() {
        let rendered = render_row(&sample_row());
        assert_eq!(rendered["LTV %"], "62.00");
        assert_eq!(rendered["LTV Headroom"], "13.00");
        // Pure ratios stay as fractions
        assert_eq!(rendered["DSCR"], "1.45");
    }

    #[test]
    fn test_not_applicable_ltv_renders_na() {
        let mut row = sample_row();
        row.ltv_pct = Ratio::NotApplicable;
        let rendered = render_row(&row);
        assert_eq!(rendered["LTV %"], "N/A");
    }
}
