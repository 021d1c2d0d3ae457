use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use crate::error::{EmError, Result};
use super::stats::LoadStats;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AlignmentRecord {
    /*
    one row of the input table

    read_full_name: identifier emitted by the sequencer, may carry a multi-mapping index suffix
    read_id: the physical read this alignment belongs to
    target_id: the target (gene, locus) the read aligns to
    multiplicity: number of rows sharing read_id in the raw input, counted before any filtering or de-duplication
    */
    pub(crate) read_full_name: String,
    pub(crate) read_id: String,
    pub(crate) target_id: String,
    pub(crate) multiplicity: usize,
}

impl AlignmentRecord {
    pub(crate) fn is_single_mapper(&self) -> bool { self.multiplicity == 1 }

    pub(crate) fn is_multi_mapper(&self) -> bool { self.multiplicity > 1 }
}

/// Alignment rows restricted to the targets seen by both single and multi mappers,
/// sorted by (read_id, multiplicity).
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct AlignmentTable {
    pub(crate) records: Vec<AlignmentRecord>,
}

impl AlignmentTable {
    pub(crate) fn new(records: Vec<AlignmentRecord>) -> AlignmentTable {
        AlignmentTable { records }
    }

    pub(crate) fn len(&self) -> usize { self.records.len() }

    pub(crate) fn single_mappers(&self) -> impl Iterator<Item = &AlignmentRecord> {
        self.records.iter().filter(|record| record.is_single_mapper())
    }

    pub(crate) fn multi_mappers(&self) -> impl Iterator<Item = &AlignmentRecord> {
        self.records.iter().filter(|record| record.is_multi_mapper())
    }

    // keep the first row of every (read_id, target_id) pair. multiplicity is left as counted on the raw input
    pub(crate) fn dedup_read_targets(&self) -> AlignmentTable {
        let mut seen = HashSet::new();
        let records: Vec<AlignmentRecord> = self.records.iter()
            .filter(|record| seen.insert((record.read_id.as_str(), record.target_id.as_str())))
            .cloned()
            .collect();
        debug!("de-duplication removed {} (read_id, target_id) rows", self.records.len() - records.len());
        AlignmentTable { records }
    }
}

/*
Inputs:
path: tab separated file without header, columns read_full_name, read_id, target_id

Output:
(the filtered alignment table, statistics gathered while loading)
*/
pub(crate) fn read_alignments(path: &Path) -> Result<(AlignmentTable, LoadStats)> {
    let file = File::open(path).map_err(|e| EmError::io(path, e))?;
    load_alignments(BufReader::new(file)).map_err(|e| match e {
        EmError::Io { source, .. } => EmError::io(path, source),
        other => other,
    })
}

pub(crate) fn load_alignments<R: BufRead>(reader: R) -> Result<(AlignmentTable, LoadStats)> {
    let rows = parse_rows(reader)?;
    if rows.is_empty() {
        return Err(EmError::empty_input("the alignment table has no rows"));
    }

    let mut read_counts: HashMap<&str, usize> = HashMap::new();
    for (_, read_id, _) in &rows {
        *read_counts.entry(read_id.as_str()).or_insert(0) += 1;
    }
    let single_mapper_reads = read_counts.values().filter(|&&cnt| cnt == 1).count();
    let multi_mapper_reads = read_counts.len() - single_mapper_reads;
    let distinct_reads = read_counts.len();

    let records: Vec<AlignmentRecord> = rows.iter().map(|(full_name, read_id, target_id)| AlignmentRecord {
        read_full_name: full_name.to_string(),
        read_id: read_id.to_string(),
        target_id: target_id.to_string(),
        multiplicity: read_counts[read_id.as_str()],
    }).collect();
    let raw_rows = records.len();

    let (single, multi): (Vec<AlignmentRecord>, Vec<AlignmentRecord>) =
        records.into_iter().partition(|record| record.is_single_mapper());

    // mutual coverage: multi mappers on targets seen by single mappers, then single mappers on the remaining multi mapper targets
    let single_targets: HashSet<&str> = single.iter().map(|record| record.target_id.as_str()).collect();
    let multi: Vec<AlignmentRecord> = multi.iter()
        .filter(|record| single_targets.contains(record.target_id.as_str()))
        .cloned()
        .collect();
    let multi_targets: HashSet<&str> = multi.iter().map(|record| record.target_id.as_str()).collect();
    let mut kept: Vec<AlignmentRecord> = single.iter()
        .filter(|record| multi_targets.contains(record.target_id.as_str()))
        .cloned()
        .collect();
    let working_targets = multi_targets.len();
    kept.extend(multi.iter().cloned());

    if kept.is_empty() {
        return Err(EmError::empty_input("no target is covered by both single and multi mappers"));
    }

    kept.sort_by(|a, b| a.read_id.cmp(&b.read_id).then(a.multiplicity.cmp(&b.multiplicity)));

    let stats = LoadStats::new_with_stats(raw_rows, distinct_reads, single_mapper_reads,
        multi_mapper_reads, kept.len(), working_targets);
    Ok((AlignmentTable::new(kept), stats))
}

// split every non blank line into its three columns
fn parse_rows<R: BufRead>(reader: R) -> Result<Vec<(String, String, String)>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EmError::io("<input>", e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Vec<&str> = line.split('\t').collect();
        if chunk.len() != 3 {
            return Err(EmError::Schema { line: index + 1, found: chunk.len() });
        }
        rows.push((chunk[0].to_string(), chunk[1].to_string(), chunk[2].to_string()));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(content: &str) -> Result<(AlignmentTable, LoadStats)> {
        load_alignments(Cursor::new(content.to_string()))
    }

    fn ids(table: &AlignmentTable) -> Vec<(&str, &str, usize)> {
        table.records.iter()
            .map(|r| (r.read_id.as_str(), r.target_id.as_str(), r.multiplicity))
            .collect()
    }

    #[test]
    fn test_schema_error_reports_line() {
        let err = load("r1_HI:1\tr1\tt1\nr2_HI:1\tr2\n").unwrap_err();
        assert!(matches!(err, EmError::Schema { line: 2, found: 2 }));

        let err = load("a\tb\tc\td\n").unwrap_err();
        assert!(matches!(err, EmError::Schema { line: 1, found: 4 }));
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(load("").unwrap_err(), EmError::EmptyInput(_)));
        assert!(matches!(load("\n\n").unwrap_err(), EmError::EmptyInput(_)));
    }

    #[test]
    fn test_no_mutual_coverage() {
        // single mappers only on t1, multi mappers only on t2/t3
        let input = "a\tr1\tt1\nb\tr2\tt2\nc\tr2\tt3\n";
        assert!(matches!(load(input).unwrap_err(), EmError::EmptyInput(_)));
    }

    #[test]
    fn test_mutual_coverage_filter() {
        let input = "\
r1\tr1\tt1
r4\tr4\tt3
r2_1\tr2\tt1
r2_2\tr2\tt2
r3_1\tr3\tt1
r3_2\tr3\tt2
";
        let (table, stats) = load(input).unwrap();
        // t2 has no single mapper, t3 no multi mapper
        assert_eq!(ids(&table), vec![("r1", "t1", 1), ("r2", "t1", 2), ("r3", "t1", 2)]);
        assert_eq!(stats.get_raw_rows(), 6);
        assert_eq!(stats.get_kept_rows(), 3);
        assert_eq!(stats.get_working_targets(), 1);
        assert_eq!(stats.get_multi_mapper_reads(), 2);
        assert_eq!(stats.get_single_mapper_reads(), 2);
    }

    #[test]
    fn test_sorted_by_read_then_multiplicity() {
        let input = "\
b_1\tb\tt2
b_2\tb\tt1
a\ta\tt2
c\tc\tt1
";
        let (table, _) = load(input).unwrap();
        assert_eq!(ids(&table), vec![("a", "t2", 1), ("b", "t2", 2), ("b", "t1", 2), ("c", "t1", 1)]);
    }

    #[test]
    fn test_multiplicity_counted_before_dedup() {
        // r2 aligns twice to t1 and once to t2
        let input = "\
r1\tr1\tt1
r5\tr5\tt2
r2_1\tr2\tt1
r2_2\tr2\tt1
r2_3\tr2\tt2
";
        let (table, _) = load(input).unwrap();
        let deduped = table.dedup_read_targets();
        assert_eq!(table.len(), 5);
        assert_eq!(deduped.len(), 4);
        let r2: Vec<_> = deduped.records.iter().filter(|r| r.read_id == "r2").collect();
        assert_eq!(r2.len(), 2);
        assert!(r2.iter().all(|r| r.multiplicity == 3));
        assert_eq!(r2[0].read_full_name, "r2_1");
    }

    #[test]
    fn test_duplicate_pair_makes_a_multi_mapper() {
        // the same target twice still counts as two alignments
        let input = "r1\tr1\tt1\nr2_1\tr2\tt1\nr2_2\tr2\tt1\n";
        let (table, _) = load(input).unwrap();
        assert_eq!(table.multi_mappers().count(), 2);
        assert_eq!(table.dedup_read_targets().multi_mappers().count(), 1);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let input = "r1\tr1\tt1\r\n\r\nr2_1\tr2\tt1\r\nr2_2\tr2\tt2\r\n";
        let (table, _) = load(input).unwrap();
        assert_eq!(ids(&table), vec![("r1", "t1", 1), ("r2", "t1", 2)]);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_alignments(Path::new("/nonexistent/alignments.bedpe")).unwrap_err();
        assert!(matches!(err, EmError::Io { .. }));
    }
}
