//! Financial projection and stress-testing engine for lending analysis.
//!
//! Turns calibrated operating assumptions and debt-facility terms into a
//! multi-year projection, evaluates covenant compliance, applies stress
//! shocks, and produces a DCF valuation with IRR/MOIC equity returns.
//! Every operation is a pure function over immutable inputs.

pub mod calibrate;
pub mod covenants;
pub mod debt;
pub mod error;
pub mod params;
pub mod projector;
pub mod scenario;
pub mod solver;
pub mod types;
pub mod valuation;

pub use error::EngineError;
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, EngineError>;
