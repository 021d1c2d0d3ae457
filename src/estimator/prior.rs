use std::collections::BTreeMap;

use crate::error::{EmError, Result};
use super::TargetPrior;
use super::readers::AlignmentTable;

// share of single-mapped rows landing on each target
pub(crate) fn initial_prior(table: &AlignmentTable) -> Result<TargetPrior> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in table.single_mappers() {
        *counts.entry(record.target_id.as_str()).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return Err(EmError::empty_input("no single-mapped reads to derive the prior from"));
    }
    Ok(counts.into_iter()
        .map(|(target, cnt)| (target.to_string(), cnt as f64 / total as f64))
        .collect())
}
