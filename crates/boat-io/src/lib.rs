pub mod csv_sink;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod sqlite_sink;

pub use csv_sink::{read_rows, FlatRow, FlatSink, LogFile};
pub use error::SinkError;
pub use metrics::{init_metrics, record_tick, serve_metrics};
pub use probe::{ProbeConfig, TcpProbe, DEFAULT_PROBE_ADDR};
pub use sqlite_sink::{StoredSample, StructuredSink};
