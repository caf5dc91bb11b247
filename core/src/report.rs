//! Per-step outcomes and the run summary built from them.

use crate::{error::SeedError, types::Table};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// What a step did. A fatal failure is an `Err` from the step instead.
#[derive(Debug)]
pub enum StepOutcome {
    /// Rows written, per table.
    Completed(Vec<(Table, usize)>),
    /// Nothing attempted (e.g. the target table is missing).
    Skipped { reason: String },
    /// A write failed and was rolled back; the run carries on.
    Recovered { error: SeedError },
}

impl StepOutcome {
    pub fn completed(table: Table, rows: usize) -> Self {
        Self::Completed(vec![(table, rows)])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped { reason: String },
    Recovered { error: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub seed: u64,
    #[serde(serialize_with = "table_counts")]
    pub counts: BTreeMap<Table, usize>,
    pub steps: Vec<StepReport>,
    pub elapsed_ms: u128,
    /// The error that aborted the run, if one did.
    #[serde(serialize_with = "fatal_message")]
    pub fatal: Option<SeedError>,
}

impl RunReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            counts: BTreeMap::new(),
            steps: Vec::new(),
            elapsed_ms: 0,
            fatal: None,
        }
    }

    /// Fold one step's outcome into the report.
    pub fn record(&mut self, step: &'static str, outcome: &StepOutcome) {
        let status = match outcome {
            StepOutcome::Completed(counts) => {
                for (table, rows) in counts {
                    *self.counts.entry(*table).or_default() += rows;
                }
                StepStatus::Completed
            }
            StepOutcome::Skipped { reason } => StepStatus::Skipped {
                reason: reason.clone(),
            },
            StepOutcome::Recovered { error } => StepStatus::Recovered {
                error: error.to_string(),
            },
        };
        self.steps.push(StepReport { step, status });
    }

    pub fn record_failure(&mut self, step: &'static str, error: &SeedError) {
        self.steps.push(StepReport {
            step,
            status: StepStatus::Failed {
                error: error.to_string(),
            },
        });
    }

    pub fn count(&self, table: Table) -> usize {
        self.counts.get(&table).copied().unwrap_or(0)
    }

    pub fn succeeded(&self) -> bool {
        self.fatal.is_none()
            && !self
            .steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed { .. }))
    }

    pub fn log_summary(&self) {
        log::info!("=== seed run {} finished in {} ms ===", self.run_id, self.elapsed_ms);
        for (table, rows) in &self.counts {
            log::info!("  {table}: {rows} rows");
        }
        for s in &self.steps {
            match &s.status {
                StepStatus::Completed => {}
                StepStatus::Skipped { reason } => log::warn!("  step {} skipped: {reason}", s.step),
                StepStatus::Recovered { error } => log::warn!("  step {} recovered: {error}", s.step),
                StepStatus::Failed { error } => log::error!("  step {} failed: {error}", s.step),
            }
        }
    }
}

fn table_counts<S: Serializer>(counts: &BTreeMap<Table, usize>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(counts.iter().map(|(t, n)| (t.as_str(), n)))
}

fn fatal_message<S: Serializer>(fatal: &Option<SeedError>, s: S) -> Result<S::Ok, S::Error> {
    match fatal {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}
