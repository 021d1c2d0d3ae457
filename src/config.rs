use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EmError, Result};

/*
    max_iter: maximum number of EM iterations
    convergence: the EM stops once no target probability moves by this much or more
    seed: seed of the tie-break shuffle, drawn from entropy when missing
    processors: accepted for compatibility, the EM is single threaded
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct EmConfig {
    pub(crate) max_iter: usize,
    pub(crate) convergence: f64,
    pub(crate) seed: Option<u64>,
    pub(crate) processors: usize,
}

impl Default for EmConfig {
    fn default() -> Self {
        EmConfig { max_iter: 1000, convergence: 1e-6, seed: None, processors: 4 }
    }
}

impl EmConfig {
    // read the settings from an existing toml file, a missing file is an error
    pub(crate) fn from_file(path: &Path) -> Result<EmConfig> {
        if !path.is_file() {
            return Err(EmError::config(format!("config file {} does not exist", path.display())));
        }
        let config: EmConfig = confy::load_path(path)?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(EmError::config("max_iter must be at least 1"));
        }
        if !self.convergence.is_finite() || self.convergence <= 0.0 {
            return Err(EmError::config(format!(
                "convergence must be a positive number, got {}",
                self.convergence
            )));
        }
        Ok(())
    }
}
