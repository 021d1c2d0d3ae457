use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadStats {
    raw_rows: usize,
    distinct_reads: usize,
    single_mapper_reads: usize,
    multi_mapper_reads: usize,
    kept_rows: usize,
    working_targets: usize,
}

impl LoadStats {
    pub(crate) fn new_with_stats(raw_rows: usize, distinct_reads: usize, single_mapper_reads: usize,
        multi_mapper_reads: usize, kept_rows: usize, working_targets: usize) -> LoadStats {
        LoadStats { raw_rows, distinct_reads, single_mapper_reads,
            multi_mapper_reads, kept_rows, working_targets }
    }

    // logs the information gathered while loading the alignment table
    pub(crate) fn print_stats(&self) {
        info!("Stats:");
        info!("# of alignment rows: {}", self.raw_rows);
        info!("# of distinct reads: {}", self.distinct_reads);
        info!("# of single-mapped reads: {}", self.single_mapper_reads);
        info!("# of multi-mapped reads: {}", self.multi_mapper_reads);
        info!("# of rows dropped by the coverage filter: {}", self.raw_rows - self.kept_rows);
        info!("# of targets in the working set: {}", self.working_targets);
    }

    #[cfg(test)]
    pub(crate) fn get_raw_rows(&self) -> usize { self.raw_rows }

    #[cfg(test)]
    pub(crate) fn get_kept_rows(&self) -> usize { self.kept_rows }

    #[cfg(test)]
    pub(crate) fn get_single_mapper_reads(&self) -> usize { self.single_mapper_reads }

    #[cfg(test)]
    pub(crate) fn get_multi_mapper_reads(&self) -> usize { self.multi_mapper_reads }

    #[cfg(test)]
    pub(crate) fn get_working_targets(&self) -> usize { self.working_targets }
}
