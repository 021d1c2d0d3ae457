use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{EmError, Result};
use crate::estimator::TargetPosterior;
use super::Assignment;

pub(crate) const POSTERIOR_FILE: &str = "posterior_target_probabilities.txt";
pub(crate) const ASSIGNMENT_FILE: &str = "Final.bedpe";

pub(crate) fn create_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| EmError::io(dir, e))
}

// target_id    posterior, with a header line
pub(crate) fn write_posterior(dir: &Path, posterior: &TargetPosterior) -> Result<PathBuf> {
    let path = dir.join(POSTERIOR_FILE);
    info!("Write posterior probabilities into the file: {}", path.display());
    write_lines(&path, |out| {
        writeln!(out, "target_id\tposterior")?;
        for (target_id, probability) in posterior {
            writeln!(out, "{}\t{}", target_id, probability)?;
        }
        Ok(())
    })?;
    Ok(path)
}

// read_full_name    read_id    target_id, no header
pub(crate) fn write_assignments(dir: &Path, assignments: &[Assignment]) -> Result<PathBuf> {
    let path = dir.join(ASSIGNMENT_FILE);
    info!("Write {} assignments into the file: {}", assignments.len(), path.display());
    write_lines(&path, |out| {
        for assignment in assignments {
            writeln!(out, "{}\t{}\t{}", assignment.read_full_name, assignment.read_id, assignment.target_id)?;
        }
        Ok(())
    })?;
    Ok(path)
}

fn write_lines<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).map_err(|e| EmError::io(path, e))?;
    let mut out = BufWriter::new(file);
    body(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| EmError::io(path, e))
}
