//! HCP-Aging: NDA-style tab-delimited structures, each with a units row under
//! the header.
use std::collections::BTreeMap;
use std::path::Path;

use crate::cohorts::FEMALE;
use crate::derive::{DerivedSpec, Indicator, Interactions};
use crate::io::TableSpec;
use crate::join::{KeyMatching, VariableSpec};
use crate::key::{ColumnRef, KeyRule, RosterFormat};
use crate::plan::{Cohort, CohortPlan, PsychometricMode, RosterSpec};
use crate::value::ValueKind;

/// One NDA structure file and the column holding its subject key.
struct Structure {
    file: &'static str,
    subject_col: usize,
}

const NFFI: Structure = Structure { file: "nffi01.txt", subject_col: 4 };
const COGCOMP: Structure = Structure { file: "cogcomp01.txt", subject_col: 4 };
const MOTOR: Structure = Structure { file: "tlbx_motor01.txt", subject_col: 4 };
const SSAGA: Structure = Structure { file: "ssaga_cover_demo01.txt", subject_col: 4 };
const EDINBURGH: Structure = Structure { file: "edinburgh_hand01.txt", subject_col: 5 };

pub const OPENNESS_COL: usize = 78;
pub const FLUIDCOG_COL: usize = 14;
pub const GRIP_DOM_COL: usize = 22;
pub const GRIP_NONDOM_COL: usize = 23;
pub const AGE_COL: usize = 5;
pub const SEX_COL: usize = 7;
pub const HANDEDNESS_COL: usize = 70;

pub fn roster_file(mode: PsychometricMode) -> String {
    format!("HCP-A_{}_allRun_sub.csv", mode)
}

fn var(structure: &Structure, name: &str, col: usize, kind: ValueKind) -> VariableSpec {
    VariableSpec::new(
        name,
        structure.file,
        KeyRule::Subject {
            column: ColumnRef::Index(structure.subject_col),
        },
        ColumnRef::Index(col),
        kind,
    )
}

pub fn plan<P: AsRef<Path>, Q: AsRef<Path>>(
    in_dir: P,
    mode: PsychometricMode,
    sublist_dir: Q,
) -> CohortPlan {
    let in_dir = in_dir.as_ref();

    let (psy_structure, psychometric) = match mode {
        PsychometricMode::Openness => (
            &NFFI,
            var(&NFFI, "neo2_score_op", OPENNESS_COL, ValueKind::Float),
        ),
        PsychometricMode::FluidCog => (
            &COGCOMP,
            var(&COGCOMP, "nih_fluidcogcomp_ageadjusted", FLUIDCOG_COL, ValueKind::Float),
        ),
    };
    let psychometric = vec![psychometric];

    let confounds = vec![
        var(&MOTOR, "grip_standardsc_dom", GRIP_DOM_COL, ValueKind::Float),
        var(&MOTOR, "grip_standardsc_nondom", GRIP_NONDOM_COL, ValueKind::Float),
        var(&SSAGA, "interview_age", AGE_COL, ValueKind::Float),
        var(&SSAGA, "sex", SEX_COL, ValueKind::Text),
        var(&EDINBURGH, "hcp_handedness_score", HANDEDNESS_COL, ValueKind::Float),
    ];
    let derived = DerivedSpec {
        indicators: vec![Indicator::new("sex", FEMALE)],
        interactions: Interactions::new("sex", "interview_age", ["age2", "sexAge", "sexAge2"]),
    };

    let sources = [psy_structure, &MOTOR, &SSAGA, &EDINBURGH]
        .into_iter()
        .map(|s| {
            let spec = TableSpec::tsv(in_dir.join(s.file)).skip_after_header(1);
            (s.file.to_string(), spec)
        })
        .collect::<BTreeMap<_, _>>();

    let mut confound_columns = CohortPlan::variable_names(&confounds);
    confound_columns.extend(derived.interactions.derived_names().map(String::from));

    CohortPlan {
        cohort: Cohort::HcpAging,
        output_prefix: format!("{}_{}", Cohort::HcpAging, mode),
        roster: RosterSpec::new(sublist_dir.as_ref().join(roster_file(mode)), RosterFormat::Plain),
        sources,
        matching: KeyMatching::Exact,
        psychometric_columns: CohortPlan::variable_names(&psychometric),
        psychometric,
        confounds,
        derived,
        confound_columns,
    }
}
