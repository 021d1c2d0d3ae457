use std::path::PathBuf;
use thiserror::Error;

/// Hard failures of a run. Nothing is written to the output directory when one of these is raised.
#[derive(Error, Debug)]
pub(crate) enum EmError {
    /// the alignment table does not have exactly three columns
    #[error("schema error at line {line}: expected 3 tab-separated columns, found {found}")]
    Schema { line: usize, found: usize },

    /// nothing left to estimate from
    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("configuration file: {0}")]
    ConfigFile(#[from] confy::ConfyError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) type Result<T> = std::result::Result<T, EmError>;

impl EmError {
    pub(crate) fn empty_input(message: impl Into<String>) -> Self {
        EmError::EmptyInput(message.into())
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        EmError::Config(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EmError::Io { path: path.into(), source }
    }
}
