use std::io;
use std::path::PathBuf;

use crate::config::ConfigError;

/// Failures that end a run before or while the trace is replayed.
///
/// Malformed trace lines are not errors, they are skipped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}: {source}", path.display())]
    OpenTrace { path: PathBuf, source: io::Error },
    #[error("failed to read trace: {0}")]
    ReadTrace(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}
