use clap::Args;
use serde_json::Value;

use lendcast_core::calibrate::{self, HistoricalYearRecord};

use crate::input;

/// Arguments for assumption calibration from historical financials
#[derive(Args)]
pub struct CalibrateArgs {
    /// Path to a JSON file holding an array of historical year records
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_calibrate(args: CalibrateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let records: Vec<HistoricalYearRecord> = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file (or piped JSON) is required for calibration".into());
    };

    let result = calibrate::calibrate_assumptions(&records)?;
    Ok(serde_json::to_value(result)?)
}
