//! Measurements recorded by engine runs
//!
//! A [`Measurements`] value is owned by the caller and handed to whatever
//! should record into it (see `EogWorklist::with_measurements`). Nothing
//! is collected unless a context is supplied.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters of a single fixpoint computation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationStats {
    /// Work items popped from the worklist
    pub iterations: usize,
    /// Pushes that changed the worklist
    pub pushes: usize,
    /// Deep copies of a state
    pub duplications: usize,
    pub elapsed: Duration,
}

/// One recorded fixpoint run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub label: String,
    pub stats: IterationStats,
    /// False if the run was aborted by its timeout
    pub converged: bool,
}

/// Collects the runs of one or more analyses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    records: Vec<Measurement>,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a run
    pub fn record(&mut self, label: impl Into<String>, stats: IterationStats, converged: bool) {
        self.records.push(Measurement {
            label: label.into(),
            stats,
            converged,
        });
    }

    /// Runs in recording order
    pub fn records(&self) -> &[Measurement] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of iterations over all runs
    pub fn total_iterations(&self) -> usize {
        self.records.iter().map(|m| m.stats.iterations).sum()
    }

    /// Sum of wall time over all runs
    pub fn total_elapsed(&self) -> Duration {
        self.records.iter().map(|m| m.stats.elapsed).sum()
    }

    /// Runs stopped by their timeout
    pub fn aborted(&self) -> impl Iterator<Item = &Measurement> {
        self.records.iter().filter(|m| !m.converged)
    }

    /// Pretty-printed JSON of all runs
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
