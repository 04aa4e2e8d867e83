//! Brain Genomics Superstruct Project: one comma-delimited export, subjects
//! keyed on column 0.
use std::collections::BTreeMap;
use std::path::Path;

use crate::cohorts::FEMALE;
use crate::derive::{DerivedSpec, Indicator, Interactions};
use crate::io::TableSpec;
use crate::join::{KeyMatching, VariableSpec};
use crate::key::{ColumnRef, KeyRule, RosterFormat};
use crate::plan::{Cohort, CohortPlan, RosterSpec};
use crate::value::ValueKind;

pub const ROSTER_FILE: &str = "GSP_allRun_sub.csv";
const SOURCE: &str = "gsp";

pub const SUBJECT_COL: usize = 0;
pub const NEO_O_COL: usize = 94;
pub const ESTIQ_COL: usize = 125;
pub const SEX_COL: usize = 4;
pub const AGE_COL: usize = 5;
pub const HAND_COL: usize = 6;
pub const BRAIN_SEG_VOL_COL: usize = 49;
pub const ICV_COL: usize = 48;

/// Handedness level recoded to 1.
pub const LEFT_HANDED: &str = "LFT";

pub fn plan<P: AsRef<Path>, Q: AsRef<Path>>(input: P, sublist_dir: Q) -> CohortPlan {
    let var = |name: &str, col: usize, kind: ValueKind| {
        VariableSpec::new(
            name,
            SOURCE,
            KeyRule::Subject {
                column: ColumnRef::Index(SUBJECT_COL),
            },
            ColumnRef::Index(col),
            kind,
        )
    };

    let psychometric = vec![
        var("NEO_O", NEO_O_COL, ValueKind::Float),
        var("EstIQ_Shipley_Int_Bin", ESTIQ_COL, ValueKind::Float),
    ];
    let confounds = vec![
        var("Sex", SEX_COL, ValueKind::Text),
        var("Age_Bin", AGE_COL, ValueKind::Float),
        var("Hand", HAND_COL, ValueKind::Text),
        var("BrainSegVol", BRAIN_SEG_VOL_COL, ValueKind::Float),
        var("ICV", ICV_COL, ValueKind::Float),
    ];
    let derived = DerivedSpec {
        indicators: vec![
            Indicator::new("Sex", FEMALE),
            Indicator::new("Hand", LEFT_HANDED),
        ],
        interactions: Interactions::new("Sex", "Age_Bin", ["age2", "sexAge", "sexAge2"]),
    };

    let mut confound_columns = CohortPlan::variable_names(&confounds);
    confound_columns.extend(derived.interactions.derived_names().map(String::from));

    CohortPlan {
        cohort: Cohort::Gsp,
        output_prefix: Cohort::Gsp.to_string(),
        roster: RosterSpec::new(sublist_dir.as_ref().join(ROSTER_FILE), RosterFormat::GspNumeric),
        sources: BTreeMap::from([(SOURCE.to_string(), TableSpec::csv(input.as_ref()))]),
        matching: KeyMatching::Exact,
        psychometric_columns: CohortPlan::variable_names(&psychometric),
        psychometric,
        confounds,
        derived,
        confound_columns,
    }
}
