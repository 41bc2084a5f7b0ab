pub mod sample;
pub mod sample_loop;
pub mod signal;
mod signal_proptest;
pub mod sink;
pub mod tags;
pub mod timebase;

pub use sample::{Sample, TIMESTAMP_FORMAT};
pub use sample_loop::{LoopConfig, LoopStats, SampleLoop, TickOutcome};
pub use signal::{InvalidConfiguration, SignalConfig, SignalModel, SimulationState, UniformRange};
pub use sink::{
    ConnectivityProbe, Delivery, FixedProbe, PersistenceError, Recorder, Route, SinkRouter,
};
pub use timebase::{Clock, ManualClock, SystemClock};
