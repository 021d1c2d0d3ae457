use std::collections::HashSet;

use log::info;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::estimator::TargetPosterior;
use crate::estimator::readers::{AlignmentRecord, AlignmentTable};

pub(crate) mod writers;

/// One line of the final table: the read and the single target it was given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Assignment {
    pub(crate) read_full_name: String,
    pub(crate) read_id: String,
    pub(crate) target_id: String,
}

impl From<&AlignmentRecord> for Assignment {
    fn from(record: &AlignmentRecord) -> Assignment {
        Assignment {
            read_full_name: record.read_full_name.to_string(),
            read_id: record.read_id.to_string(),
            target_id: record.target_id.to_string(),
        }
    }
}

/*
    assignments: one row per read, sorted by read_id
    multi_assigned: multi-mapped reads that received a target
    dropped_reads: multi-mapped reads whose best target has posterior 0
*/
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Resolution {
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) multi_assigned: usize,
    pub(crate) dropped_reads: usize,
}

// give every multi-mapped read its most probable target, equal posteriors are broken by the shuffle drawn from rng
pub(crate) fn resolve_assignments<R: Rng + ?Sized>(table: &AlignmentTable, posterior: &TargetPosterior, rng: &mut R) -> Resolution {
    let mut candidates: Vec<(&AlignmentRecord, f64)> = table.multi_mappers()
        .filter_map(|record| posterior.get(&record.target_id).map(|p| (record, *p)))
        .collect();
    candidates.shuffle(rng);
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut seen = HashSet::new();
    let mut multi_assignments = Vec::new();
    let mut dropped_reads = 0;
    for (record, probability) in candidates {
        if !seen.insert(record.read_id.as_str()) {
            continue;
        }
        if probability > 0.0 {
            multi_assignments.push(Assignment::from(record));
        } else {
            dropped_reads += 1;
        }
    }
    let multi_assigned = multi_assignments.len();

    let mut assignments: Vec<Assignment> = table.single_mappers().map(Assignment::from).collect();
    assignments.extend(multi_assignments);
    assignments.sort_by(|a, b| a.read_id.cmp(&b.read_id));
    assignments.dedup_by(|a, b| a.read_id == b.read_id);

    info!("assigned {} reads ({} multi-mapped, {} dropped with posterior 0)",
        assignments.len(), multi_assigned, dropped_reads);
    Resolution { assignments, multi_assigned, dropped_reads }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn record(full_name: &str, read_id: &str, target_id: &str, multiplicity: usize) -> AlignmentRecord {
        AlignmentRecord {
            read_full_name: full_name.to_string(),
            read_id: read_id.to_string(),
            target_id: target_id.to_string(),
            multiplicity,
        }
    }

    fn posterior(values: &[(&str, f64)]) -> TargetPosterior {
        values.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    fn targets(resolution: &Resolution) -> Vec<(&str, &str)> {
        resolution.assignments.iter().map(|a| (a.read_id.as_str(), a.target_id.as_str())).collect()
    }

    #[test]
    fn test_highest_posterior_wins() {
        let table = AlignmentTable::new(vec![
            record("r1", "r1", "t1", 1),
            record("r2_HI:1", "r2", "t1", 2),
            record("r2_HI:2", "r2", "t2", 2),
            record("r3_HI:1", "r3", "t2", 2),
            record("r3_HI:2", "r3", "t1", 2),
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        let resolution = resolve_assignments(&table, &posterior(&[("t1", 0.3), ("t2", 0.7)]), &mut rng);
        assert_eq!(targets(&resolution), vec![("r1", "t1"), ("r2", "t2"), ("r3", "t2")]);
        assert_eq!(resolution.assignments[1].read_full_name, "r2_HI:2");
        assert_eq!(resolution.multi_assigned, 2);
        assert_eq!(resolution.dropped_reads, 0);
    }

    #[test]
    fn test_zero_posterior_dropped() {
        let table = AlignmentTable::new(vec![
            record("r1", "r1", "t1", 1),
            record("r2_1", "r2", "t2", 2),
            record("r2_2", "r2", "t3", 2),
            record("r3_1", "r3", "t1", 2),
            record("r3_2", "r3", "t2", 2),
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        let resolution = resolve_assignments(&table, &posterior(&[("t1", 1.0), ("t2", 0.0), ("t3", 0.0)]), &mut rng);
        assert_eq!(targets(&resolution), vec![("r1", "t1"), ("r3", "t1")]);
        assert_eq!(resolution.dropped_reads, 1);
    }

    #[test]
    fn test_targets_outside_posterior_ignored() {
        let table = AlignmentTable::new(vec![
            record("r2_1", "r2", "t1", 2),
            record("r2_2", "r2", "t9", 2),
        ]);
        let mut rng = StdRng::seed_from_u64(5);
        let resolution = resolve_assignments(&table, &posterior(&[("t1", 0.01)]), &mut rng);
        assert_eq!(targets(&resolution), vec![("r2", "t1")]);
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut records = vec![record("s", "s", "t1", 1)];
        for i in 0..50 {
            let read_id = format!("r{:02}", i);
            records.push(record(&format!("{}_1", read_id), &read_id, "t1", 2));
            records.push(record(&format!("{}_2", read_id), &read_id, "t2", 2));
        }
        let table = AlignmentTable::new(records);
        let tied = posterior(&[("t1", 0.5), ("t2", 0.5)]);

        let first = resolve_assignments(&table, &tied, &mut StdRng::seed_from_u64(42));
        let second = resolve_assignments(&table, &tied, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_use_both_targets() {
        let mut records = Vec::new();
        for i in 0..400 {
            let read_id = format!("r{:03}", i);
            records.push(record(&read_id, &read_id, "t1", 2));
            records.push(record(&read_id, &read_id, "t2", 2));
        }
        let table = AlignmentTable::new(records);
        let resolution = resolve_assignments(&table, &posterior(&[("t1", 0.5), ("t2", 0.5)]), &mut StdRng::seed_from_u64(9));

        let mut per_target: HashMap<&str, usize> = HashMap::new();
        for assignment in &resolution.assignments {
            *per_target.entry(assignment.target_id.as_str()).or_insert(0) += 1;
        }
        assert_eq!(resolution.assignments.len(), 400);
        assert!(per_target["t1"] > 100);
        assert!(per_target["t2"] > 100);
    }

    #[test]
    fn test_each_read_once() {
        let table = AlignmentTable::new(vec![
            record("a", "a", "t1", 1),
            record("b_1", "b", "t1", 3),
            record("b_2", "b", "t1", 3),
            record("b_3", "b", "t2", 3),
            record("c_1", "c", "t2", 2),
            record("c_2", "c", "t2", 2),
        ]);
        let resolution = resolve_assignments(&table, &posterior(&[("t1", 0.5), ("t2", 0.5)]), &mut StdRng::seed_from_u64(0));
        let read_ids: Vec<&str> = resolution.assignments.iter().map(|a| a.read_id.as_str()).collect();
        assert_eq!(read_ids, vec!["a", "b", "c"]);
    }
}
