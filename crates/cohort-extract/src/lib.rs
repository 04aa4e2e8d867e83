//! cohort-extract: aligned psychometric and confound tables for neuroimaging cohorts.
//!
//! Every supported cohort (GSP, HCP Young Adult, HCP-Aging, eNKI-RS) is described
//! by a declarative [`plan::CohortPlan`]: where its roster lives, how row keys are
//! built, which (file, column, type) tuples feed the psychometric and confound
//! tables, and which secondary terms are derived. A single generic
//! [`pipeline::Pipeline`] executes any plan.
//!
//! Each join returns a new [`table::Table`], so the row set can be inspected
//! after every step and only ever shrinks.
pub mod cohorts;
pub mod derive;
pub mod error;
pub mod io;
pub mod join;
pub mod key;
pub mod pipeline;
pub mod plan;
pub mod table;
pub mod value;

pub use error::ExtractError;
