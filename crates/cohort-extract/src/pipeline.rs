//! Generic cohort pipeline.
//!
//! `LoadRoster -> JoinPsychometric -> JoinConfounds -> DeriveSecondary ->
//! (TruncateForTest) -> SplitAndWrite -> Done`. Any error aborts the run before
//! anything is written.
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::derive::derive;
use crate::io::{read_table, write_outputs, OutputPaths, RawTable, TableSpec};
use crate::join::{join, ColumnLookup, JoinStep, UnresolvedPolicy, VariableSpec};
use crate::plan::CohortPlan;
use crate::table::Table;

/// Rows kept by the unit-test truncation.
pub const UNIT_TEST_ROWS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadRoster,
    JoinPsychometric,
    JoinConfounds,
    DeriveSecondary,
    TruncateForTest,
    SplitAndWrite,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::LoadRoster => "LoadRoster",
            Stage::JoinPsychometric => "JoinPsychometric",
            Stage::JoinConfounds => "JoinConfounds",
            Stage::DeriveSecondary => "DeriveSecondary",
            Stage::TruncateForTest => "TruncateForTest",
            Stage::SplitAndWrite => "SplitAndWrite",
            Stage::Done => "Done",
        };
        write!(f, "{}", name)
    }
}

/// Source of raw tables. The filesystem in production, memory in tests.
pub trait TableLoader {
    fn load(&self, spec: &TableSpec) -> Result<RawTable>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl TableLoader for FsLoader {
    fn load(&self, spec: &TableSpec) -> Result<RawTable> {
        read_table(spec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Keep only this many leading rows before the split.
    pub truncate_to: Option<usize>,
    pub unresolved: UnresolvedPolicy,
}

impl RunOptions {
    pub fn unit_test() -> Self {
        RunOptions {
            truncate_to: Some(UNIT_TEST_ROWS),
            ..RunOptions::default()
        }
    }
}

/// Result of a run, before anything is written.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub output_prefix: String,
    /// Final accumulator, all columns.
    pub table: Table,
    pub psychometric: Table,
    pub confounds: Table,
    /// One entry per join, in join order.
    pub steps: Vec<JoinStep>,
}

pub struct Pipeline<'a, L: TableLoader> {
    plan: &'a CohortPlan,
    loader: L,
    cache: HashMap<String, RawTable>,
}

impl<'a, L: TableLoader> Pipeline<'a, L> {
    pub fn new(plan: &'a CohortPlan, loader: L) -> Self {
        Pipeline {
            plan,
            loader,
            cache: HashMap::new(),
        }
    }

    /// Run every stage up to, but not including, writing.
    pub fn run(mut self, options: &RunOptions) -> Result<PipelineOutput> {
        let plan = self.plan;
        plan.validate()?;
        let tag = plan.output_prefix.as_str();

        log::info!("[CohortExtract::{}] {}: {:?}", Stage::LoadRoster, tag, plan.roster.path);
        let roster = self
            .loader
            .load(&plan.roster.table_spec())
            .with_context(|| format!("Failed to load roster: {:?}", plan.roster.path))?;
        let keys = plan
            .roster
            .format
            .keys(&roster)
            .with_context(|| format!("Invalid roster: {:?}", plan.roster.path))?;
        let mut table = Table::from_keys(keys);
        log::info!("[CohortExtract::{}] {}: {} roster rows", Stage::LoadRoster, tag, table.len());

        let mut steps = Vec::with_capacity(plan.psychometric.len() + plan.confounds.len());
        for (stage, variables) in [
            (Stage::JoinPsychometric, &plan.psychometric),
            (Stage::JoinConfounds, &plan.confounds),
        ] {
            for var in variables {
                let (joined, step) = self.join_variable(&table, var, options)?;
                table = joined;
                log::debug!(
                    "[CohortExtract::{}] {}: {} rows -> {} rows ({} source rows dropped, {} duplicates, {} fallbacks)",
                    stage,
                    step.column,
                    step.rows_before,
                    step.rows_after,
                    step.dropped_source_rows,
                    step.duplicates,
                    step.fallbacks
                );
                if step.unresolved > 0 {
                    log::warn!(
                        "[CohortExtract::{}] {}: {} rows had no value at their session or at baseline ({})",
                        stage,
                        step.column,
                        step.unresolved,
                        match options.unresolved {
                            UnresolvedPolicy::Drop => "dropped",
                            UnresolvedPolicy::Keep => "kept as missing",
                        }
                    );
                }
                steps.push(step);
            }
        }

        log::info!("[CohortExtract::{}] {}", Stage::DeriveSecondary, tag);
        table = derive(table, &plan.derived)
            .with_context(|| format!("Failed to derive secondary confounds for {}", tag))?;

        if let Some(n) = options.truncate_to {
            if table.len() < n {
                log::warn!(
                    "[CohortExtract::{}] Only {} rows available, fewer than the {} requested",
                    Stage::TruncateForTest,
                    table.len(),
                    n
                );
            }
            table = table.head(n);
        }

        let psychometric = table.project(plan.psychometric_columns.as_slice())?;
        let confounds = table.project(plan.confound_columns.as_slice())?;
        log::info!(
            "[CohortExtract::{}] {}: {} rows, {} psychometric and {} confound columns",
            Stage::SplitAndWrite,
            tag,
            table.len(),
            psychometric.columns().len(),
            confounds.columns().len()
        );

        Ok(PipelineOutput {
            output_prefix: plan.output_prefix.clone(),
            table,
            psychometric,
            confounds,
            steps,
        })
    }

    fn join_variable(
        &mut self,
        table: &Table,
        var: &VariableSpec,
        options: &RunOptions,
    ) -> Result<(Table, JoinStep)> {
        let plan = self.plan;
        let raw = self.source(&var.source)?;
        let lookup = ColumnLookup::extract(raw, var).with_context(|| {
            format!("Failed to extract '{}' from {:?}", var.name, plan.sources[&var.source].path)
        })?;
        let outcome = join(table, &lookup, &var.name, &plan.matching, options.unresolved)
            .with_context(|| format!("Failed to join '{}'", var.name))?;
        Ok((outcome.table, outcome.step))
    }

    /// Each source is read once per run.
    fn source(&mut self, id: &str) -> Result<&RawTable> {
        if !self.cache.contains_key(id) {
            let spec = self
                .plan
                .sources
                .get(id)
                .with_context(|| format!("Unknown source '{}'", id))?;
            let raw = self
                .loader
                .load(spec)
                .with_context(|| format!("Failed to load source: {:?}", spec.path))?;
            self.cache.insert(id.to_string(), raw);
        }
        Ok(&self.cache[id])
    }
}

/// Run `plan` against the filesystem and write the output pair to `out_dir`.
pub fn run_cohort<P: AsRef<Path>>(
    plan: &CohortPlan,
    options: &RunOptions,
    out_dir: P,
) -> Result<(PipelineOutput, OutputPaths)> {
    let output = Pipeline::new(plan, FsLoader).run(options)?;
    let paths = write_outputs(
        out_dir,
        &output.output_prefix,
        &output.psychometric,
        &output.confounds,
    )?;
    log::info!(
        "[CohortExtract::{}] Wrote {:?} and {:?}",
        Stage::Done,
        paths.psychometric,
        paths.confounds
    );
    Ok((output, paths))
}
