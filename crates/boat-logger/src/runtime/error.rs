use boat_core::InvalidConfiguration;
use boat_io::SinkError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop the logger before or outside the sampling loop.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Model(#[from] InvalidConfiguration),
    #[error("cannot open {kind} sink at {}: {source}", .path.display())]
    SinkOpen {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: SinkError,
    },
    #[error("cannot open audit log at {}: {source}", .path.display())]
    Audit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("structured sink is disabled, nothing to dump")]
    NothingToDump,
    #[error("failed to read structured sink: {0}")]
    Read(#[source] SinkError),
    #[error("failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sampling thread panicked")]
    LoopPanicked,
}
