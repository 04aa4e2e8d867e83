use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;

use cohort_extract::cohorts::hcp_ya::{self, HcpInputs, Space};
use cohort_extract::cohorts::{enki_rs, gsp, hcp_aging};
use cohort_extract::io::read_name_list;
use cohort_extract::pipeline::run_cohort;
use cohort_extract::plan::{CohortPlan, PsychometricMode};
use cohort_extract_cli::config::RunConfig;
use cohort_extract_cli::util::{validate_input_dir, validate_table_file};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(
            env_logger::Env::default()
                .filter_or("COHORT_EXTRACT_LOG", "error,cohort_extract=info,extract_cohort=info"),
        )
        .init();

    let matches = Command::new("extract-cohort")
        .version(clap::crate_version!())
        .about("Extract aligned psychometric and confounding variables for neuroimaging cohorts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            common_args(Command::new("gsp"))
                .about("Extract psychometric and confounding variables for GSP")
                .arg(
                    Arg::new("input")
                        .help("Path to the GSP behavioral export (csv)")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            common_args(Command::new("hcp"))
                .about("Extract psychometric and confounding variables for HCP Young Adults")
                .arg(
                    Arg::new("unres_file")
                        .help("Path to the unrestricted data csv file")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("res_file")
                        .help("Path to the restricted data csv file")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("space")
                        .long("space")
                        .help("Space of the fMRI data")
                        .value_parser(["surf", "MNI"])
                        .default_value("surf"),
                )
                .arg(
                    Arg::new("preproc")
                        .long("preproc")
                        .help(
                            "Preprocessing used for surface data ('minimal', 'fix', or 'gsr') \
                             or volumetric data ('fix', 'fix_wmcsf', or 'fix_gsr')",
                        )
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .default_value("fix"),
                )
                .arg(
                    Arg::new("psy_list")
                        .long("psy_list")
                        .help("Path to the psychometric variable list, one column name per line")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("HCP_psychometric_list.csv")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("conf_list")
                        .long("conf_list")
                        .help(
                            "Path to the confound variable list. Defaults to Age_in_Yrs, Gender, \
                             Handedness, FS_BrainSeg_Vol, FS_IntraCranial_Vol, Acquisition, \
                             age2, sexAge, sexAge2",
                        )
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            common_args(Command::new("hcp-aging"))
                .about("Extract psychometric and confounding variables for HCP-Aging")
                .arg(in_dir_arg())
                .arg(psy_arg()),
        )
        .subcommand(
            common_args(Command::new("enki-rs"))
                .about("Extract psychometric and confounding variables for eNKI-RS")
                .arg(in_dir_arg())
                .arg(psy_arg())
                .arg(
                    Arg::new("drop_unresolved")
                        .long("drop_unresolved")
                        .help(
                            "Drop sessions with no value at their own visit or at baseline \
                             instead of writing them with empty cells",
                        )
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("gsp", sub_m)) => handle_gsp(sub_m),
        Some(("hcp", sub_m)) => handle_hcp(sub_m),
        Some(("hcp-aging", sub_m)) => handle_hcp_aging(sub_m),
        Some(("enki-rs", sub_m)) => handle_enki_rs(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn common_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("out_dir")
                .long("out_dir")
                .help("Output directory. Overrides the directory in the configuration file.")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("sublist_dir")
                .long("sublist_dir")
                .help("Directory holding the subject lists (*_allRun_sub.csv)")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("unit_test")
                .long("unit_test")
                .help("Only keep the first 50 subjects for unit test")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a JSON run configuration")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("print_plan")
                .long("print_plan")
                .help("Print the resolved extraction plan as JSON and exit")
                .action(ArgAction::SetTrue),
        )
}

fn in_dir_arg() -> Arg {
    Arg::new("in_dir")
        .help("Path to the input directory")
        .required(true)
        .value_parser(clap::builder::NonEmptyStringValueParser::new())
        .value_hint(ValueHint::DirPath)
}

fn psy_arg() -> Arg {
    Arg::new("psy")
        .long("psy")
        .help("Psychometric variable to include")
        .value_parser(["fluidcog", "openness"])
        .default_value("fluidcog")
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(id)
        .with_context(|| format!("Missing required argument '{}'", id))
}

fn psychometric_mode(matches: &ArgMatches) -> Result<PsychometricMode> {
    let psy = required(matches, "psy")?;
    Ok(PsychometricMode::from_str(psy)?)
}

fn handle_gsp(matches: &ArgMatches) -> Result<()> {
    let config = RunConfig::from_arguments(matches)?;
    let input = required(matches, "input")?;
    log::info!("[CohortExtract::GSP] Extracting from: {:?}", input);

    let plan = gsp::plan(input, &config.sublist_dir);
    execute(plan, &config, matches, || validate_table_file(input))
}

fn handle_hcp(matches: &ArgMatches) -> Result<()> {
    let config = RunConfig::from_arguments(matches)?;
    let unres_file = required(matches, "unres_file")?;
    let res_file = required(matches, "res_file")?;
    log::info!(
        "[CohortExtract::HCP] Extracting from: {:?} and {:?}",
        unres_file,
        res_file
    );

    let psy_list: &PathBuf = matches
        .get_one("psy_list")
        .context("Missing psychometric variable list")?;
    let mut inputs = HcpInputs::new(unres_file, res_file, read_name_list(psy_list)?);
    inputs.space = Space::from_str(required(matches, "space")?)?;
    inputs.preproc = required(matches, "preproc")?.clone();
    if let Some(conf_list) = matches.get_one::<PathBuf>("conf_list") {
        inputs.confounds = read_name_list(conf_list)?;
    }

    let plan = hcp_ya::plan(&inputs, &config.sublist_dir)?;
    execute(plan, &config, matches, || {
        validate_table_file(unres_file)?;
        validate_table_file(res_file)
    })
}

fn handle_hcp_aging(matches: &ArgMatches) -> Result<()> {
    let config = RunConfig::from_arguments(matches)?;
    let in_dir = required(matches, "in_dir")?;
    let mode = psychometric_mode(matches)?;
    log::info!("[CohortExtract::HCP-A] Extracting {} from: {:?}", mode, in_dir);

    let plan = hcp_aging::plan(in_dir, mode, &config.sublist_dir);
    execute(plan, &config, matches, || validate_input_dir(in_dir))
}

fn handle_enki_rs(matches: &ArgMatches) -> Result<()> {
    let config = RunConfig::from_arguments(matches)?;
    let in_dir = required(matches, "in_dir")?;
    let mode = psychometric_mode(matches)?;
    log::info!("[CohortExtract::eNKI-RS] Extracting {} from: {:?}", mode, in_dir);

    let plan = enki_rs::plan(in_dir, mode, &config.sublist_dir);
    execute(plan, &config, matches, || validate_input_dir(in_dir))
}

fn execute<F>(plan: CohortPlan, config: &RunConfig, matches: &ArgMatches, check_inputs: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    if matches.get_flag("print_plan") {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    check_inputs()?;

    match run_cohort(&plan, &config.run_options(), &config.out_dir) {
        Ok((output, paths)) => {
            for step in &output.steps {
                log::info!(
                    "[CohortExtract::Join] {:<32} {:>6} -> {:>6} rows",
                    step.column,
                    step.rows_before,
                    step.rows_after
                );
            }
            log::info!(
                "[CohortExtract::Done] {} rows written to {:?} and {:?}",
                output.table.len(),
                paths.psychometric,
                paths.confounds
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Extraction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
