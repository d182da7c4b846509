pub mod calibrate;
pub mod covenant;
pub mod debt;
pub mod project;
pub mod solver;
pub mod valuation;
