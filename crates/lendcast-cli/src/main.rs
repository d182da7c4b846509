mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::calibrate::CalibrateArgs;
use commands::covenant::CovenantScheduleArgs;
use commands::debt::{BlendArgs, DebtServiceArgs};
use commands::project::{ProjectArgs, StressArgs};
use commands::solver::{IrrArgs, NpvArgs};
use commands::valuation::WaccArgs;

/// Financial projection and covenant stress-testing for lending analysis
#[derive(Parser)]
#[command(
    name = "lendcast",
    version,
    about = "Financial projection and covenant stress-testing for lending analysis",
    long_about = "Builds multi-year financial projections from assumptions and \
                  debt-facility terms, evaluates covenant compliance, applies \
                  stress shocks, and produces DCF valuations with IRR/MOIC \
                  equity returns. Decimal precision throughout."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive baseline assumptions from historical financials
    Calibrate(CalibrateArgs),
    /// Run a full projection for one parameter set (optionally shocked)
    Project(ProjectArgs),
    /// Run the preset stress-scenario suite
    Stress(StressArgs),
    /// Annual debt service for a single loan
    DebtService(DebtServiceArgs),
    /// Blend a multi-tranche debt stack
    Blend(BlendArgs),
    /// Year-by-year covenant compliance schedule
    CovenantSchedule(CovenantScheduleArgs),
    /// Internal rate of return for a cash flow series
    Irr(IrrArgs),
    /// Net present value for a cash flow series
    Npv(NpvArgs),
    /// Derive WACC from CAPM inputs
    Wacc(WaccArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calibrate(args) => commands::calibrate::run_calibrate(args),
        Commands::Project(args) => commands::project::run_project(args),
        Commands::Stress(args) => commands::project::run_stress(args),
        Commands::DebtService(args) => commands::debt::run_debt_service(args),
        Commands::Blend(args) => commands::debt::run_blend(args),
        Commands::CovenantSchedule(args) => commands::covenant::run_covenant_schedule(args),
        Commands::Irr(args) => commands::solver::run_irr(args),
        Commands::Npv(args) => commands::solver::run_npv(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Version => {
            println!("lendcast {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::render(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
