use std::path::PathBuf;
use thiserror::Error;

/// Failure to open or read back a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{} does not start with the flat log header (found {found:?})", .path.display())]
    HeaderMismatch { path: PathBuf, found: String },
}
