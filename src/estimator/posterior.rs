use std::collections::BTreeMap;

use crate::error::{EmError, Result};
use super::{TargetDistribution, TargetPosterior, TargetPrior};
use super::readers::AlignmentTable;

/*
P(t | r_all) is proportional to P(r_1 | t) * ... * P(r_n | t) * P(t), where every multi-mapped
alignment of a read with multiplicity m contributes P(r | t) = 1/m.
The product is kept as a sum of logarithms so that many small factors do not underflow.
*/
pub(crate) fn target_log_likelihoods(table: &AlignmentTable) -> BTreeMap<&str, f64> {
    let mut log_likelihoods = BTreeMap::new();
    for record in table.multi_mappers() {
        let entry = log_likelihoods.entry(record.target_id.as_str()).or_insert(0.0);
        *entry -= (record.multiplicity as f64).ln();
    }
    log_likelihoods
}

// one posterior update against the current prior. targets missing from either side are dropped
pub(crate) fn update_posterior(table: &AlignmentTable, prior: &TargetPrior) -> Result<TargetPosterior> {
    let log_likelihoods = target_log_likelihoods(table);
    if log_likelihoods.is_empty() {
        return Err(EmError::empty_input("no multi-mapped reads to update the prior with"));
    }

    let scores: Vec<(&str, f64)> = log_likelihoods.into_iter()
        .filter_map(|(target, log_likelihood)| prior.get(target).map(|p| (target, log_likelihood + p.ln())))
        .collect();
    if scores.is_empty() {
        return Err(EmError::empty_input("no multi-mapped target has a prior probability"));
    }

    let max_score = scores.iter().map(|(_, score)| *score).fold(f64::NEG_INFINITY, f64::max);
    if max_score == f64::NEG_INFINITY {
        return Err(EmError::empty_input("every candidate target has a prior probability of 0"));
    }

    // a zero prior gives -inf, which stays at 0 after exponentiation
    let posterior: TargetPosterior = scores.into_iter()
        .map(|(target, score)| (target.to_string(), (score - max_score).exp()))
        .collect();
    normalize(posterior)
}

// rescale so the values sum to 1, normalizing twice changes nothing
pub(crate) fn normalize(mut dist: TargetDistribution) -> Result<TargetDistribution> {
    let total: f64 = dist.values().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(EmError::empty_input("cannot normalize a distribution without probability mass"));
    }
    for value in dist.values_mut() {
        *value /= total;
    }
    Ok(dist)
}
