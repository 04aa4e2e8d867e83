use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use clap::ArgMatches;
use anyhow::{Context, Result};

use cohort_extract::join::UnresolvedPolicy;
use cohort_extract::pipeline::{RunOptions, UNIT_TEST_ROWS};

/// Settings shared by every cohort subcommand.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunConfig {
    pub version: String,
    /// Directory holding the `*_allRun_sub.csv` rosters.
    pub sublist_dir: String,
    pub out_dir: String,
    pub unit_test: bool,
    pub unit_test_rows: usize,
    pub drop_unresolved: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            version: clap::crate_version!().to_string(),
            sublist_dir: String::from("sublist"),
            out_dir: String::from("."),
            unit_test: false,
            unit_test_rows: UNIT_TEST_ROWS,
            drop_unresolved: false,
        }
    }
}

fn fallback_warning(reason: &str, field: &str, default: &dyn std::fmt::Debug) -> String {
    format!("Run config: {} '{}', using default: {:?}", reason, field, default)
}

impl RunConfig {
    /// Read a JSON config. Absent or malformed fields keep their defaults.
    pub fn from_file(config_path: &PathBuf) -> Result<Self> {
        let config_json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let partial: serde_json::Value = serde_json::from_str(&config_json)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
        let mut config = RunConfig::default();

        macro_rules! load_or_default {
            ($field:ident) => {
                if let Some(val) = partial.get(stringify!($field)) {
                    if let Ok(parsed) = serde_json::from_value(val.clone()) {
                        config.$field = parsed;
                    } else {
                        log::warn!(
                            "{}",
                            fallback_warning("invalid value for", stringify!($field), &config.$field)
                        );
                    }
                } else {
                    log::warn!(
                        "{}",
                        fallback_warning("missing field", stringify!($field), &config.$field)
                    );
                }
            };
        }

        load_or_default!(sublist_dir);
        load_or_default!(out_dir);
        load_or_default!(unit_test);
        load_or_default!(unit_test_rows);
        load_or_default!(drop_unresolved);

        Ok(config)
    }

    /// Defaults, then the `--config` file if given, then CLI flags.
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let mut config = match matches.get_one::<PathBuf>("config") {
            Some(config_path) => RunConfig::from_file(config_path)?,
            None => RunConfig::default(),
        };

        if let Some(sublist_dir) = matches.get_one::<String>("sublist_dir") {
            config.sublist_dir = sublist_dir.clone();
        }
        if let Some(out_dir) = matches.get_one::<String>("out_dir") {
            config.out_dir = out_dir.clone();
        }
        if matches.get_flag("unit_test") {
            config.unit_test = true;
        }
        // Only the longitudinal cohort exposes this flag.
        if let Ok(Some(&true)) = matches.try_get_one::<bool>("drop_unresolved") {
            config.drop_unresolved = true;
        }

        Ok(config)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            truncate_to: self.unit_test.then_some(self.unit_test_rows),
            unresolved: if self.drop_unresolved {
                UnresolvedPolicy::Drop
            } else {
                UnresolvedPolicy::Keep
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_warning_wording() {
        assert_eq!(
            fallback_warning("invalid value for", "unit_test_rows", &50usize),
            "Run config: invalid value for 'unit_test_rows', using default: 50"
        );
        assert_eq!(
            fallback_warning("missing field", "out_dir", &"."),
            "Run config: missing field 'out_dir', using default: \".\""
        );
    }
}
