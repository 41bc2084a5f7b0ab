use crate::sample::Sample;
use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{sink} sink I/O failure: {source}")]
    Io {
        sink: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{sink} sink rejected sample: {message}")]
    Backend { sink: &'static str, message: String },
}

impl PersistenceError {
    pub fn backend(sink: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            sink,
            message: err.to_string(),
        }
    }

    pub fn sink(&self) -> &'static str {
        match self {
            Self::Io { sink, .. } | Self::Backend { sink, .. } => *sink,
        }
    }
}

/// Durable destination for samples.
pub trait Recorder: Send {
    fn name(&self) -> &'static str;

    /// Append one sample; returns only once the write is flushed.
    fn record(&mut self, sample: &Sample) -> Result<(), PersistenceError>;
}

impl<T: Recorder + ?Sized> Recorder for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn record(&mut self, sample: &Sample) -> Result<(), PersistenceError> {
        (**self).record(sample)
    }
}

pub trait ConnectivityProbe: Send {
    /// Never errors: any failure means unreachable.
    fn is_reachable(&mut self) -> bool;
}

/// Probe with a forced answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl ConnectivityProbe for FixedProbe {
    fn is_reachable(&mut self) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Remote,
    Local,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Remote => "remote",
            Route::Local => "local",
        }
    }
}

/// Where a sample actually landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub requested: Route,
    pub written: Route,
}

impl Delivery {
    pub fn fell_back(&self) -> bool {
        self.requested != self.written
    }
}

/// Routes each sample to the remote sink when reachable, else to the local one.
pub struct SinkRouter {
    remote: Option<Box<dyn Recorder>>,
    local: Box<dyn Recorder>,
}

impl SinkRouter {
    pub fn new(local: Box<dyn Recorder>) -> Self {
        Self {
            remote: None,
            local,
        }
    }

    pub fn with_remote(mut self, remote: Box<dyn Recorder>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn route(&self, reachable: bool) -> Route {
        if reachable && self.remote.is_some() {
            Route::Remote
        } else {
            Route::Local
        }
    }

    /// Write to the sink for `route`; a failed remote write falls back to local.
    pub fn record(
        &mut self,
        sample: &Sample,
        route: Route,
    ) -> Result<Delivery, PersistenceError> {
        if route == Route::Remote {
            if let Some(remote) = self.remote.as_mut() {
                match remote.record(sample) {
                    Ok(()) => {
                        return Ok(Delivery {
                            requested: route,
                            written: Route::Remote,
                        })
                    }
                    Err(e) => {
                        warn!(
                            "{} write failed, falling back to {}: {}",
                            remote.name(),
                            self.local.name(),
                            e
                        );
                    }
                }
            }
        }
        self.local.record(sample)?;
        Ok(Delivery {
            requested: route,
            written: Route::Local,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recorder that keeps samples in memory and can be told to fail.
    #[derive(Clone, Default)]
    pub struct MemoryRecorder {
        pub samples: Arc<Mutex<Vec<Sample>>>,
        pub failures_left: Arc<Mutex<u32>>,
        pub always_fail: bool,
    }

    impl MemoryRecorder {
        pub fn failing_once() -> Self {
            let rec = Self::default();
            *rec.failures_left.lock().unwrap() = 1;
            rec
        }

        pub fn broken() -> Self {
            Self {
                always_fail: true,
                ..Self::default()
            }
        }

        pub fn count(&self) -> usize {
            self.samples.lock().unwrap().len()
        }
    }

    impl Recorder for MemoryRecorder {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn record(&mut self, sample: &Sample) -> Result<(), PersistenceError> {
            let mut left = self.failures_left.lock().unwrap();
            if self.always_fail || *left > 0 {
                *left = left.saturating_sub(1);
                return Err(PersistenceError::backend("memory", "disk full"));
            }
            self.samples.lock().unwrap().push(*sample);
            Ok(())
        }
    }
}
