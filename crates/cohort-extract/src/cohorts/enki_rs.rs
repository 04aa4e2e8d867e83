//! Enhanced Nathan Kline Institute Rockland Sample: longitudinal, keyed on
//! (subject, visit). Every export starts with a descriptive line above the
//! header; ID is column 0 and VISIT column 4.
use std::collections::BTreeMap;
use std::path::Path;

use crate::derive::{DerivedSpec, Interactions};
use crate::io::TableSpec;
use crate::join::{KeyMatching, VariableSpec};
use crate::key::{ColumnRef, KeyRule, RosterFormat};
use crate::plan::{Cohort, CohortPlan, PsychometricMode, RosterSpec};
use crate::value::ValueKind;

pub const ID_COL: usize = 0;
pub const VISIT_COL: usize = 4;
pub const SUBJECT_PREFIX: &str = "sub-";
pub const SESSION_PREFIX: &str = "ses-";
/// Baseline visit used when the queried session has no record.
pub const BASELINE_SESSION: &str = "ses-V1";

const NEO_FFI: (&str, usize) = ("8100_NEO-FFI-3_20180806.csv", 75);
const WASI: (&str, usize) = ("8100_WASI-II_20180806.csv", 19);
const AGE: (&str, usize) = ("8100_Age_20180806.csv", 6);
const DEMOS: (&str, usize) = ("8100_Demos_20180806.csv", 7);
const EHQ: (&str, usize) = ("8100_EHQ_20180806.csv", 36);
const VITALS: (&str, usize) = ("8100_HT-WT,_Vitals_20180806.csv", 10);

pub fn roster_file(mode: PsychometricMode) -> String {
    format!("eNKI-RS_{}_allRun_sub.csv", mode)
}

pub fn key_rule() -> KeyRule {
    KeyRule::SubjectSession {
        subject: ColumnRef::Index(ID_COL),
        session: ColumnRef::Index(VISIT_COL),
        subject_prefix: SUBJECT_PREFIX.to_string(),
        session_prefix: SESSION_PREFIX.to_string(),
    }
}

fn var(name: &str, (file, col): (&str, usize)) -> VariableSpec {
    VariableSpec::new(name, file, key_rule(), ColumnRef::Index(col), ValueKind::Float)
}

pub fn plan<P: AsRef<Path>, Q: AsRef<Path>>(
    in_dir: P,
    mode: PsychometricMode,
    sublist_dir: Q,
) -> CohortPlan {
    let in_dir = in_dir.as_ref();
    let psy_source = match mode {
        PsychometricMode::Openness => NEO_FFI,
        PsychometricMode::FluidCog => WASI,
    };
    let psychometric = vec![var(&mode.to_string(), psy_source)];

    let confounds = vec![
        var("Age", AGE),
        var("Sex", DEMOS),
        var("Handedness", EHQ),
        var("BMI", VITALS),
    ];
    // Sex is already numerically coded in the Demos export.
    let derived = DerivedSpec {
        indicators: Vec::new(),
        interactions: Interactions::new("Sex", "Age", ["Age2", "SexAge", "SexAge2"]),
    };

    let sources = [psy_source, AGE, DEMOS, EHQ, VITALS]
        .into_iter()
        .map(|(file, _)| {
            let spec = TableSpec::csv(in_dir.join(file)).skip_before_header(1);
            (file.to_string(), spec)
        })
        .collect::<BTreeMap<_, _>>();

    let mut confound_columns = CohortPlan::variable_names(&confounds);
    confound_columns.extend(derived.interactions.derived_names().map(String::from));

    CohortPlan {
        cohort: Cohort::EnkiRs,
        output_prefix: format!("{}_{}", Cohort::EnkiRs, mode),
        roster: RosterSpec::new(
            sublist_dir.as_ref().join(roster_file(mode)),
            RosterFormat::SubjectSession,
        ),
        sources,
        matching: KeyMatching::SessionFallback {
            session: BASELINE_SESSION.to_string(),
        },
        psychometric_columns: CohortPlan::variable_names(&psychometric),
        psychometric,
        confounds,
        derived,
        confound_columns,
    }
}
