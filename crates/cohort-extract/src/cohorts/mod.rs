//! Per-cohort plans: roster location, source files, column positions, and
//! derived-term wiring for each supported dataset.

pub mod enki_rs;
pub mod gsp;
pub mod hcp_aging;
pub mod hcp_ya;

/// Reference level for binary sex indicators.
pub const FEMALE: &str = "F";
