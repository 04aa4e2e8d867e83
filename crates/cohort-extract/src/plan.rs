//! Declarative description of one cohort's extraction.
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::derive::DerivedSpec;
use crate::error::{ExtractError, Result};
use crate::io::TableSpec;
use crate::join::{KeyMatching, VariableSpec};
use crate::key::RosterFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cohort {
    #[serde(rename = "GSP")]
    Gsp,
    #[serde(rename = "HCP")]
    HcpYoungAdult,
    #[serde(rename = "HCP-A")]
    HcpAging,
    #[serde(rename = "eNKI-RS")]
    EnkiRs,
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Cohort::Gsp => "GSP",
            Cohort::HcpYoungAdult => "HCP",
            Cohort::HcpAging => "HCP-A",
            Cohort::EnkiRs => "eNKI-RS",
        };
        write!(f, "{}", name)
    }
}

/// Psychometric selector shared by HCP-Aging and eNKI-RS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PsychometricMode {
    #[default]
    FluidCog,
    Openness,
}

impl fmt::Display for PsychometricMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PsychometricMode::FluidCog => write!(f, "fluidcog"),
            PsychometricMode::Openness => write!(f, "openness"),
        }
    }
}

impl FromStr for PsychometricMode {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fluidcog" => Ok(PsychometricMode::FluidCog),
            "openness" => Ok(PsychometricMode::Openness),
            _ => Err(ExtractError::Config(format!(
                "Unknown psychometric variable: {}. Choose from 'fluidcog' and 'openness'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSpec {
    pub path: PathBuf,
    pub format: RosterFormat,
}

impl RosterSpec {
    pub fn new<P: Into<PathBuf>>(path: P, format: RosterFormat) -> Self {
        RosterSpec {
            path: path.into(),
            format,
        }
    }

    pub fn table_spec(&self) -> TableSpec {
        let spec = TableSpec::csv(self.path.clone());
        if self.format.has_header() {
            spec
        } else {
            spec.headerless()
        }
    }
}

/// Everything a pipeline needs to know about one cohort variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortPlan {
    pub cohort: Cohort,
    /// File stem of the outputs, e.g. `HCP-A_fluidcog`.
    pub output_prefix: String,
    pub roster: RosterSpec,
    /// Raw sources by id; variables refer to these ids.
    pub sources: BTreeMap<String, TableSpec>,
    pub matching: KeyMatching,
    /// Joined in order.
    pub psychometric: Vec<VariableSpec>,
    /// Joined in order.
    pub confounds: Vec<VariableSpec>,
    pub derived: DerivedSpec,
    /// Output column order of `<prefix>_y.csv`.
    pub psychometric_columns: Vec<String>,
    /// Output column order of `<prefix>_conf.csv`.
    pub confound_columns: Vec<String>,
}

impl CohortPlan {
    /// Check the plan is internally consistent before any file is read.
    pub fn validate(&self) -> Result<()> {
        if self.psychometric.is_empty() {
            return Err(ExtractError::Config(format!(
                "{} plan selects no psychometric variables",
                self.output_prefix
            )));
        }

        let mut available = HashSet::new();
        for var in self.psychometric.iter().chain(&self.confounds) {
            if !self.sources.contains_key(&var.source) {
                return Err(ExtractError::Config(format!(
                    "Variable '{}' refers to unknown source '{}'",
                    var.name, var.source
                )));
            }
            if !available.insert(var.name.as_str()) {
                return Err(ExtractError::DuplicateColumn(var.name.clone()));
            }
        }

        for indicator in &self.derived.indicators {
            if !available.contains(indicator.column.as_str()) {
                return Err(ExtractError::UnknownColumn(indicator.column.clone()));
            }
        }
        let it = &self.derived.interactions;
        for input in [&it.sex, &it.age] {
            if !available.contains(input.as_str()) {
                return Err(ExtractError::UnknownColumn(input.clone()));
            }
        }
        for name in it.derived_names() {
            if !available.insert(name) {
                return Err(ExtractError::DuplicateColumn(name.to_string()));
            }
        }

        for name in self.psychometric_columns.iter().chain(&self.confound_columns) {
            if !available.contains(name.as_str()) {
                return Err(ExtractError::UnknownColumn(name.clone()));
            }
        }
        Ok(())
    }

    pub fn variable_names(vars: &[VariableSpec]) -> Vec<String> {
        vars.iter().map(|v| v.name.clone()).collect()
    }
}
