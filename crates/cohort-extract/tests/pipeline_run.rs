mod common;

use std::path::Path;

use cohort_extract::cohorts::{enki_rs, gsp, hcp_aging, hcp_ya};
use cohort_extract::io::{render_csv, write_outputs};
use cohort_extract::join::UnresolvedPolicy;
use cohort_extract::key::RowKey;
use cohort_extract::pipeline::{run_cohort, Pipeline, RunOptions};
use cohort_extract::plan::PsychometricMode;
use cohort_extract::table::Table;
use cohort_extract::value::Value;
use cohort_extract::ExtractError;

use common::{gsp_export, wide_header, wide_row, MemLoader};

fn csv_text(table: &Table) -> String {
    String::from_utf8(render_csv(table).unwrap()).unwrap()
}

fn gsp_loader(roster: &str, export: String) -> MemLoader {
    MemLoader::default()
        .with(Path::new("sub").join(gsp::ROSTER_FILE), roster)
        .with("gsp.csv", export)
}

#[test]
fn test_gsp_outputs_are_row_aligned() {
    let export = gsp_export(&[
        (1, "F", 20.0, "RGT", Some(30.0)),
        (2, "M", 25.0, "LFT", Some(40.0)),
        (3, "F", 30.0, "RGT", None),
    ]);
    let plan = gsp::plan("gsp.csv", "sub");
    let out = Pipeline::new(&plan, gsp_loader("2\n1\n3\n4\n", export))
        .run(&RunOptions::default())
        .unwrap();

    assert_eq!(out.output_prefix, "GSP");
    assert_eq!(out.psychometric.keys(), out.confounds.keys());
    assert_eq!(
        out.psychometric.keys(),
        &[RowKey::subject("Sub0002_S1"), RowKey::subject("Sub0001_S1")]
    );
    assert_eq!(csv_text(&out.psychometric), "40.0,110.0\n30.0,110.0\n");
    assert_eq!(
        csv_text(&out.confounds),
        "0,25.0,1,1100000.0,1500000.0,625.0,0.0,0.0\n\
         1,20.0,0,1100000.0,1500000.0,400.0,20.0,400.0\n"
    );
}

#[test]
fn test_every_join_narrows() {
    let export = gsp_export(&[(1, "F", 20.0, "RGT", Some(30.0)), (2, "M", 21.0, "RGT", None)]);
    let plan = gsp::plan("gsp.csv", "sub");
    let out = Pipeline::new(&plan, gsp_loader("1\n2\n3\n", export))
        .run(&RunOptions::default())
        .unwrap();

    assert_eq!(out.steps.len(), plan.psychometric.len() + plan.confounds.len());
    assert_eq!(out.steps[0].rows_before, 3);
    for step in &out.steps {
        assert!(step.rows_after <= step.rows_before, "{} grew the table", step.column);
    }
    for pair in out.steps.windows(2) {
        assert_eq!(pair[0].rows_after, pair[1].rows_before);
    }
    assert_eq!(out.table.len(), 1);
}

#[test]
fn test_truncation_is_a_prefix_of_the_full_run() {
    let rows: Vec<(u32, &str, f64, &str, Option<f64>)> = (1..=70)
        .map(|i| {
            let sex = if i % 2 == 0 { "F" } else { "M" };
            let neo = (i % 9 != 0).then_some(f64::from(i) / 4.0);
            (i, sex, 18.0 + f64::from(i % 30), "RGT", neo)
        })
        .collect();
    let roster: String = (1..=72).rev().map(|i| format!("{}\n", i)).collect();
    let plan = gsp::plan("gsp.csv", "sub");
    let loader = gsp_loader(&roster, gsp_export(&rows));

    let full = Pipeline::new(&plan, loader.clone())
        .run(&RunOptions::default())
        .unwrap();
    let truncated = Pipeline::new(&plan, loader).run(&RunOptions::unit_test()).unwrap();

    assert!(full.table.len() > 50);
    assert_eq!(truncated.table.len(), 50);
    assert_eq!(truncated.psychometric, full.psychometric.head(50));
    assert_eq!(truncated.confounds, full.confounds.head(50));
    assert_eq!(truncated.psychometric.keys()[0], RowKey::subject("Sub0070_S1"));
}

#[test]
fn test_truncation_keeps_short_tables_whole() {
    let export = gsp_export(&[(1, "F", 20.0, "RGT", Some(30.0))]);
    let plan = gsp::plan("gsp.csv", "sub");
    let out = Pipeline::new(&plan, gsp_loader("1\n", export))
        .run(&RunOptions::unit_test())
        .unwrap();
    assert_eq!(out.table.len(), 1);
}

#[test]
fn test_missing_roster_aborts() {
    let plan = gsp::plan("gsp.csv", "sub");
    let loader = MemLoader::default().with("gsp.csv", gsp_export(&[]));
    let err = Pipeline::new(&plan, loader)
        .run(&RunOptions::default())
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load roster"));
}

#[test]
fn test_empty_roster_is_rejected() {
    let plan = gsp::plan("gsp.csv", "sub");
    let err = Pipeline::new(&plan, gsp_loader("\n", gsp_export(&[])))
        .run(&RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExtractError>(),
        Some(ExtractError::Roster(_))
    ));
}

#[test]
fn test_short_source_is_a_schema_error() {
    let plan = gsp::plan("gsp.csv", "sub");
    let narrow = format!("{}\nSub0001_S1,1,2\n", wide_header(3, ","));
    let err = Pipeline::new(&plan, gsp_loader("1\n", narrow))
        .run(&RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExtractError>(),
        Some(ExtractError::MissingColumn { .. })
    ));
}

fn enki_file(width: usize, rows: &[(&str, &str, usize, &str)]) -> String {
    let mut lines = vec!["Rockland Sample export".to_string(), wide_header(width, ",")];
    for (id, visit, col, value) in rows {
        lines.push(wide_row(width, ",", &[(0, *id), (4, *visit), (*col, *value)]));
    }
    lines.join("\n") + "\n"
}

fn enki_loader() -> MemLoader {
    let dir = Path::new("enki");
    MemLoader::default()
        .with(
            Path::new("sub").join(enki_rs::roster_file(PsychometricMode::FluidCog)),
            "subject,session\nsub-A,ses-V2\nsub-B,ses-V1\nsub-C,ses-V2\n",
        )
        .with(
            dir.join("8100_WASI-II_20180806.csv"),
            enki_file(
                20,
                &[("A", "V2", 19, "100"), ("B", "V1", 19, "90"), ("C", "V2", 19, "80")],
            ),
        )
        .with(
            dir.join("8100_Age_20180806.csv"),
            enki_file(
                8,
                &[("A", "V1", 6, "20"), ("B", "V1", 6, "30"), ("C", "V2", 6, "40")],
            ),
        )
        .with(
            dir.join("8100_Demos_20180806.csv"),
            enki_file(8, &[("A", "V1", 7, "1"), ("B", "V1", 7, "2"), ("C", "V1", 7, "2")]),
        )
        .with(
            dir.join("8100_EHQ_20180806.csv"),
            enki_file(
                37,
                &[
                    ("A", "V2", 36, "50"),
                    ("A", "V1", 36, "60"),
                    ("B", "V1", 36, "70"),
                    ("C", "V1", 36, "80"),
                ],
            ),
        )
        .with(
            dir.join("8100_HT-WT,_Vitals_20180806.csv"),
            enki_file(
                11,
                &[("A", "V1", 10, "22.5"), ("B", "V1", 10, " "), ("C", "V2", 10, "25")],
            ),
        )
}

#[test]
fn test_enki_rs_resolves_sessions_with_baseline_fallback() {
    let plan = enki_rs::plan("enki", PsychometricMode::FluidCog, "sub");
    let out = Pipeline::new(&plan, enki_loader())
        .run(&RunOptions::default())
        .unwrap();

    assert_eq!(out.output_prefix, "eNKI-RS_fluidcog");
    assert_eq!(
        out.table.keys(),
        &[
            RowKey::session("sub-A", "ses-V2"),
            RowKey::session("sub-B", "ses-V1"),
            RowKey::session("sub-C", "ses-V2")
        ]
    );
    let b = RowKey::session("sub-B", "ses-V1");
    assert_eq!(out.table.value_for(&b, "BMI"), Some(&Value::Missing));
    assert_eq!(out.table.value_for(&b, "SexAge2"), Some(&Value::Float(1800.0)));
    assert_eq!(
        csv_text(&out.confounds),
        "20.0,1.0,50.0,22.5,400.0,20.0,400.0\n\
         30.0,2.0,70.0,,900.0,60.0,1800.0\n\
         40.0,2.0,80.0,25.0,1600.0,80.0,3200.0\n"
    );
    let bmi = out.steps.iter().find(|s| s.column == "BMI").unwrap();
    assert_eq!(bmi.unresolved, 1);
    assert_eq!(bmi.rows_after, 3);
}

#[test]
fn test_enki_rs_can_drop_unresolved_sessions() {
    let plan = enki_rs::plan("enki", PsychometricMode::FluidCog, "sub");
    let options = RunOptions {
        unresolved: UnresolvedPolicy::Drop,
        ..RunOptions::default()
    };
    let out = Pipeline::new(&plan, enki_loader()).run(&options).unwrap();

    assert_eq!(
        out.table.keys(),
        &[RowKey::session("sub-A", "ses-V2"), RowKey::session("sub-C", "ses-V2")]
    );
    assert_eq!(csv_text(&out.psychometric), "100.0\n80.0\n");
    assert_eq!(
        csv_text(&out.confounds),
        "20.0,1.0,50.0,22.5,400.0,20.0,400.0\n\
         40.0,2.0,80.0,25.0,1600.0,80.0,3200.0\n"
    );
}

#[test]
fn test_subject_cohorts_always_narrow_on_missing_source_rows() {
    let export = gsp_export(&[(1, "F", 20.0, "RGT", Some(30.0))]);
    let plan = gsp::plan("gsp.csv", "sub");
    let options = RunOptions {
        unresolved: UnresolvedPolicy::Keep,
        ..RunOptions::default()
    };
    let out = Pipeline::new(&plan, gsp_loader("1\n2\n3\n", export))
        .run(&options)
        .unwrap();

    assert_eq!(out.table.keys(), &[RowKey::subject("Sub0001_S1")]);
    assert_eq!(csv_text(&out.psychometric), "30.0,110.0\n");
    assert!(out.steps.iter().all(|s| s.unresolved == 0));
}

fn nda_file(subject_col: usize, width: usize, rows: &[(&str, Vec<(usize, &str)>)]) -> String {
    let mut lines = vec![wide_header(width, "\t"), wide_row(width, "\t", &[(0, "units")])];
    for (subject, cells) in rows {
        let mut all = vec![(subject_col, *subject)];
        all.extend_from_slice(cells.as_slice());
        lines.push(wide_row(width, "\t", &all));
    }
    lines.join("\n") + "\n"
}

#[test]
fn test_hcp_aging_outputs_selected_measure_only() {
    let dir = Path::new("hcpa");
    let loader = MemLoader::default()
        .with(
            Path::new("sub").join(hcp_aging::roster_file(PsychometricMode::FluidCog)),
            "HCA2\nHCA1\n",
        )
        .with(
            dir.join("cogcomp01.txt"),
            nda_file(4, 15, &[("HCA1", vec![(14, "101")]), ("HCA2", vec![(14, "99")])]),
        )
        .with(
            dir.join("tlbx_motor01.txt"),
            nda_file(
                4,
                24,
                &[("HCA1", vec![(22, "95"), (23, "90")]), ("HCA2", vec![(22, "105"), (23, "100")])],
            ),
        )
        .with(
            dir.join("ssaga_cover_demo01.txt"),
            nda_file(
                4,
                8,
                &[("HCA1", vec![(5, "600"), (7, "F")]), ("HCA2", vec![(5, "720"), (7, "M")])],
            ),
        )
        .with(
            dir.join("edinburgh_hand01.txt"),
            nda_file(5, 71, &[("HCA1", vec![(70, "80")]), ("HCA2", vec![(70, "-40")])]),
        );

    let plan = hcp_aging::plan("hcpa", PsychometricMode::FluidCog, "sub");
    let out = Pipeline::new(&plan, loader).run(&RunOptions::default()).unwrap();

    assert_eq!(out.output_prefix, "HCP-A_fluidcog");
    assert_eq!(out.psychometric.column_names(), vec!["nih_fluidcogcomp_ageadjusted"]);
    assert_eq!(csv_text(&out.psychometric), "99.0\n101.0\n");
    assert_eq!(
        csv_text(&out.confounds),
        "105.0,100.0,720.0,0,-40.0,518400.0,0.0,0.0\n\
         95.0,90.0,600.0,1,80.0,360000.0,600.0,360000.0\n"
    );
}

#[test]
fn test_hcp_ya_named_columns() {
    let unrestricted = "Subject,Gender,FS_BrainSeg_Vol,FS_IntraCranial_Vol,Acquisition,PMAT24_A_CR\n\
                        100206,M,1234.56789,1500000,Q03,20\n\
                        100307,F,1189472.0000000002,1400000,Q11,17\n";
    let restricted = "Subject,Age_in_Yrs,Handedness\n100206,26,75\n100307,30,-20\n";
    let loader = MemLoader::default()
        .with(Path::new("sub").join("HCP_surf_fix_allRun_sub.csv"), "100307\n100206\n")
        .with("unres.csv", unrestricted)
        .with("res.csv", restricted);

    let inputs = hcp_ya::HcpInputs::new("unres.csv", "res.csv", vec!["PMAT24_A_CR".to_string()]);
    let plan = hcp_ya::plan(&inputs, "sub").unwrap();
    let out = Pipeline::new(&plan, loader).run(&RunOptions::default()).unwrap();

    assert_eq!(out.output_prefix, "HCP_surf_fix");
    assert_eq!(csv_text(&out.psychometric), "17.0\n20.0\n");
    assert_eq!(
        csv_text(&out.confounds),
        "30.0,1,-20.0,1189472.0,1400000.0,11,900.0,30.0,900.0\n\
         26.0,0,75.0,1234.568,1500000.0,3,676.0,0.0,0.0\n"
    );
}

#[test]
fn test_run_cohort_writes_output_pair() {
    let dir = tempfile::tempdir().unwrap();
    let sublist = dir.path().join("sublist");
    std::fs::create_dir_all(&sublist).unwrap();
    std::fs::write(sublist.join(gsp::ROSTER_FILE), "1\n2\n").unwrap();
    let input = dir.path().join("gsp.csv");
    std::fs::write(
        &input,
        gsp_export(&[(1, "F", 20.0, "RGT", Some(30.0)), (2, "M", 25.0, "LFT", Some(40.0))]),
    )
    .unwrap();
    let out_dir = dir.path().join("out");

    let plan = gsp::plan(&input, &sublist);
    let (output, paths) = run_cohort(&plan, &RunOptions::default(), &out_dir).unwrap();

    assert_eq!(paths.psychometric, out_dir.join("GSP_y.csv"));
    assert_eq!(paths.confounds, out_dir.join("GSP_conf.csv"));
    let y = std::fs::read_to_string(&paths.psychometric).unwrap();
    let conf = std::fs::read_to_string(&paths.confounds).unwrap();
    assert_eq!(y, "30.0,110.0\n40.0,110.0\n");
    assert_eq!(y.lines().count(), conf.lines().count());
    assert_eq!(output.table.len(), 2);
}

#[test]
fn test_run_cohort_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let sublist = dir.path().join("sublist");
    std::fs::create_dir_all(&sublist).unwrap();
    std::fs::write(sublist.join(gsp::ROSTER_FILE), "1\n").unwrap();
    let input = dir.path().join("gsp.csv");
    std::fs::write(&input, format!("{}\nSub0001_S1,1\n", wide_header(2, ","))).unwrap();
    let out_dir = dir.path().join("out");

    let plan = gsp::plan(&input, &sublist);
    assert!(run_cohort(&plan, &RunOptions::default(), &out_dir).is_err());
    assert!(!out_dir.join("GSP_y.csv").exists());
    assert!(!out_dir.join("GSP_conf.csv").exists());
}

#[test]
fn test_write_outputs_leaves_no_half_pair() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(out_dir.join("GSP_conf.csv")).unwrap();

    let keys = vec![RowKey::subject("Sub0001_S1")];
    let y = Table::from_keys(keys.clone())
        .with_column("NEO", vec![Value::Float(30.0)])
        .unwrap();
    let conf = Table::from_keys(keys)
        .with_column("Age", vec![Value::Float(20.0)])
        .unwrap();

    assert!(write_outputs(&out_dir, "GSP", &y, &conf).is_err());
    assert!(!out_dir.join("GSP_y.csv").exists());
    let mut left: Vec<String> = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["GSP_conf.csv".to_string()]);
}
