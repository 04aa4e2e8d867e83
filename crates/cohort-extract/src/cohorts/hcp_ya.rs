//! HCP Young Adult: unrestricted and restricted behavioral exports, columns
//! selected by header name and keyed on `Subject`.
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cohorts::FEMALE;
use crate::derive::{DerivedSpec, Indicator, Interactions};
use crate::error::{ExtractError, Result};
use crate::io::TableSpec;
use crate::join::{KeyMatching, VariableSpec};
use crate::key::{ColumnRef, KeyRule, RosterFormat};
use crate::plan::{Cohort, CohortPlan, RosterSpec};
use crate::value::{Transform, ValueKind};

pub const SUBJECT_COLUMN: &str = "Subject";
const UNRESTRICTED: &str = "unrestricted";
const RESTRICTED: &str = "restricted";

/// Confound list in output order. Positions 6..9 name the derived terms.
pub const DEFAULT_CONFOUNDS: [&str; 9] = [
    "Age_in_Yrs",
    "Gender",
    "Handedness",
    "FS_BrainSeg_Vol",
    "FS_IntraCranial_Vol",
    "Acquisition",
    "age2",
    "sexAge",
    "sexAge2",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Space {
    #[default]
    #[serde(rename = "surf")]
    Surf,
    #[serde(rename = "MNI")]
    Mni,
}

impl Space {
    pub fn preprocessing_choices(&self) -> &'static [&'static str] {
        match self {
            Space::Surf => &["minimal", "fix", "gsr"],
            Space::Mni => &["fix", "fix_wmcsf", "fix_gsr"],
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Space::Surf => write!(f, "surf"),
            Space::Mni => write!(f, "MNI"),
        }
    }
}

impl FromStr for Space {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "surf" => Ok(Space::Surf),
            "MNI" => Ok(Space::Mni),
            _ => Err(ExtractError::Config(format!(
                "Unknown fMRI space: {}. Choose from 'surf' and 'MNI'",
                s
            ))),
        }
    }
}

/// Inputs of one HCP-YA run.
#[derive(Debug, Clone)]
pub struct HcpInputs {
    pub unrestricted: PathBuf,
    pub restricted: PathBuf,
    pub space: Space,
    pub preproc: String,
    /// Psychometric column names, in output order.
    pub psychometric: Vec<String>,
    /// Confound list shaped like [`DEFAULT_CONFOUNDS`].
    pub confounds: Vec<String>,
}

impl HcpInputs {
    pub fn new<P: Into<PathBuf>>(unrestricted: P, restricted: P, psychometric: Vec<String>) -> Self {
        HcpInputs {
            unrestricted: unrestricted.into(),
            restricted: restricted.into(),
            space: Space::Surf,
            preproc: "fix".to_string(),
            psychometric,
            confounds: DEFAULT_CONFOUNDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// `surf_fix`, `MNI_fix_gsr`, ...
    pub fn variant(&self) -> Result<String> {
        if !self.space.preprocessing_choices().contains(&self.preproc.as_str()) {
            return Err(ExtractError::Config(format!(
                "Preprocessing '{}' is not available for {} data. Choose from {:?}",
                self.preproc,
                self.space,
                self.space.preprocessing_choices()
            )));
        }
        Ok(format!("{}_{}", self.space, self.preproc))
    }
}

pub fn roster_file(variant: &str) -> String {
    format!("HCP_{}_allRun_sub.csv", variant)
}

fn var(name: &str, source: &str, kind: ValueKind) -> VariableSpec {
    VariableSpec::new(
        name,
        source,
        KeyRule::Subject {
            column: ColumnRef::Name(SUBJECT_COLUMN.to_string()),
        },
        ColumnRef::Name(name.to_string()),
        kind,
    )
}

pub fn plan<Q: AsRef<Path>>(inputs: &HcpInputs, sublist_dir: Q) -> Result<CohortPlan> {
    let variant = inputs.variant()?;
    let conf: &[String] = &inputs.confounds;
    if conf.len() != DEFAULT_CONFOUNDS.len() {
        return Err(ExtractError::Config(format!(
            "Confound list must name {} variables, found {}",
            DEFAULT_CONFOUNDS.len(),
            conf.len()
        )));
    }
    if inputs.psychometric.is_empty() {
        return Err(ExtractError::Config(
            "Psychometric variable list is empty".to_string(),
        ));
    }

    let psychometric: Vec<VariableSpec> = inputs
        .psychometric
        .iter()
        .map(|name| var(name, UNRESTRICTED, ValueKind::Float))
        .collect();

    let (age, sex, hand, brain_seg, icv, acquisition) =
        (&conf[0], &conf[1], &conf[2], &conf[3], &conf[4], &conf[5]);
    let confounds = vec![
        var(sex, UNRESTRICTED, ValueKind::Text),
        var(brain_seg, UNRESTRICTED, ValueKind::Float).with_transform(Transform::RoundThousandths),
        var(icv, UNRESTRICTED, ValueKind::Float),
        var(acquisition, UNRESTRICTED, ValueKind::Text).with_transform(Transform::QuarterToInt),
        var(age, RESTRICTED, ValueKind::Float),
        var(hand, RESTRICTED, ValueKind::Float),
    ];
    let derived = DerivedSpec {
        indicators: vec![Indicator::new(sex, FEMALE)],
        interactions: Interactions::new(sex, age, [conf[6].as_str(), conf[7].as_str(), conf[8].as_str()]),
    };

    Ok(CohortPlan {
        cohort: Cohort::HcpYoungAdult,
        output_prefix: format!("{}_{}", Cohort::HcpYoungAdult, variant),
        roster: RosterSpec::new(sublist_dir.as_ref().join(roster_file(&variant)), RosterFormat::Plain),
        sources: BTreeMap::from([
            (UNRESTRICTED.to_string(), TableSpec::csv(inputs.unrestricted.clone())),
            (RESTRICTED.to_string(), TableSpec::csv(inputs.restricted.clone())),
        ]),
        matching: KeyMatching::Exact,
        psychometric_columns: inputs.psychometric.clone(),
        psychometric,
        confounds,
        derived,
        confound_columns: conf.to_vec(),
    })
}
