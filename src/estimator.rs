use std::collections::BTreeMap;

use indicatif::ProgressBar;
use log::{debug, info};

pub(crate) mod readers;
use readers::AlignmentTable;

pub(crate) mod stats;

mod prior;
use prior::initial_prior;

pub(crate) mod posterior;
use posterior::update_posterior;

use crate::error::{EmError, Result};

/// Probability per target_id, ordered by target_id.
pub(crate) type TargetDistribution = BTreeMap<String, f64>;
pub(crate) type TargetPrior = TargetDistribution;
pub(crate) type TargetPosterior = TargetDistribution;

/// Observer of the EM iterations, for operator feedback only.
pub(crate) trait Progress {
    fn on_iteration(&mut self, iteration: usize, max_iter: usize);

    fn finish(&mut self) {}
}

pub(crate) struct NoProgress;

impl Progress for NoProgress {
    fn on_iteration(&mut self, _iteration: usize, _max_iter: usize) {}
}

impl Progress for ProgressBar {
    fn on_iteration(&mut self, iteration: usize, max_iter: usize) {
        self.set_length(max_iter as u64);
        self.set_position(iteration as u64);
    }

    fn finish(&mut self) {
        self.finish_and_clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EmStatus {
    /// the largest per-target change fell below the threshold
    Converged { iterations: usize },
    /// max_iter was reached, the last posterior is still used
    Exhausted { iterations: usize },
}

impl EmStatus {
    pub(crate) fn iterations(&self) -> usize {
        match self {
            EmStatus::Converged { iterations } | EmStatus::Exhausted { iterations } => *iterations,
        }
    }

    pub(crate) fn is_converged(&self) -> bool {
        matches!(self, EmStatus::Converged { .. })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct EmOutcome {
    pub(crate) posterior: TargetPosterior,
    pub(crate) status: EmStatus,
}

pub(crate) struct Estimator {
    /*
    table: the loaded alignments with a single row per (read_id, target_id)
    max_iter: maximum allowed iterations of EM
    convergence: stop once every target moves by less than this
    */
    table: AlignmentTable,
    max_iter: usize,
    convergence: f64,
}

impl Estimator {
    pub(crate) fn new(table: &AlignmentTable, max_iter: usize, convergence: f64) -> Estimator {
        Estimator { table: table.dedup_read_targets(), max_iter, convergence }
    }

    // the EM: start from the single mapper prior and replace it by the posterior until it stops moving
    pub(crate) fn run_em<P: Progress>(&self, progress: &mut P) -> Result<EmOutcome> {
        if self.max_iter == 0 {
            return Err(EmError::config("max_iter must be at least 1"));
        }
        let mut prior = initial_prior(&self.table)?;
        info!("Starting EM on {} targets ({} alignments), max_iter = {}, convergence = {}",
            prior.len(), self.table.len(), self.max_iter, self.convergence);

        for iteration in 1..=self.max_iter {
            progress.on_iteration(iteration, self.max_iter);
            let posterior = update_posterior(&self.table, &prior)?;
            let max_diff = max_abs_diff(&posterior, &prior);
            debug!("iteration {}: max change {:e}", iteration, max_diff);

            if max_diff < self.convergence {
                progress.finish();
                return Ok(EmOutcome { posterior, status: EmStatus::Converged { iterations: iteration } });
            }
            prior = posterior;
        }
        progress.finish();
        Ok(EmOutcome { posterior: prior, status: EmStatus::Exhausted { iterations: self.max_iter } })
    }
}

// largest absolute change over the targets present in both distributions
fn max_abs_diff(posterior: &TargetPosterior, prior: &TargetPrior) -> f64 {
    posterior.iter()
        .filter_map(|(target, p)| prior.get(target).map(|q| (p - q).abs()))
        .fold(0.0, f64::max)
}
