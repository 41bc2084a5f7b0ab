use crate::sample::Sample;
use crate::signal::{SignalModel, SimulationState};
use crate::sink::{ConnectivityProbe, Delivery, PersistenceError, Route, SinkRouter};
use crate::timebase::Clock;
use log::{debug, error, info};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct LoopConfig {
    pub tick_interval: Duration,
    /// Stop after this many ticks; `None` runs until the stop flag is raised.
    pub max_ticks: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            max_ticks: None,
        }
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub remote_writes: u64,
    pub local_writes: u64,
    pub fallbacks: u64,
    pub unreachable_ticks: u64,
    pub persistence_failures: u64,
}

/// Result of one tick, handed to the run observer.
#[derive(Debug)]
pub struct TickOutcome {
    pub tick: u64,
    pub sample: Sample,
    pub reachable: bool,
    pub reachability_changed: bool,
    pub route: Route,
    pub result: Result<Delivery, PersistenceError>,
}

pub struct SampleLoop<R, P, C> {
    model: SignalModel<R>,
    probe: P,
    router: SinkRouter,
    clock: C,
    config: LoopConfig,
    state: SimulationState,
    stats: LoopStats,
    last_reachable: Option<bool>,
}

impl<R, P, C> SampleLoop<R, P, C>
where
    R: Rng,
    P: ConnectivityProbe,
    C: Clock,
{
    pub fn new(
        model: SignalModel<R>,
        probe: P,
        router: SinkRouter,
        clock: C,
        config: LoopConfig,
    ) -> Self {
        let state = model.initial_state();
        Self {
            model,
            probe,
            router,
            clock,
            config,
            state,
            stats: LoopStats::default(),
            last_reachable: None,
        }
    }

    /// Generate, stamp, probe and record one sample.
    pub fn tick(&mut self) -> TickOutcome {
        let at = self.clock.now();
        let (next, sample) = self.model.next(&self.state, at);
        self.state = next;
        self.stats.ticks += 1;
        let tick = self.stats.ticks;

        let reachable = self.probe.is_reachable();
        let reachability_changed = self.last_reachable != Some(reachable);
        if reachability_changed {
            info!(
                "connectivity {} on tick {}",
                if reachable { "up" } else { "down" },
                tick
            );
        }
        self.last_reachable = Some(reachable);
        if !reachable {
            self.stats.unreachable_ticks += 1;
        }

        let route = self.router.route(reachable);
        let result = self.router.record(&sample, route);
        match &result {
            Ok(delivery) => {
                match delivery.written {
                    Route::Remote => self.stats.remote_writes += 1,
                    Route::Local => self.stats.local_writes += 1,
                }
                if delivery.fell_back() {
                    self.stats.fallbacks += 1;
                }
                debug!(
                    "tick {} -> {}: speed={:.1} rpm={:.0} battery={:.4}% voltage={:.2} wind={:.1} temp={:.1}",
                    tick,
                    delivery.written.as_str(),
                    sample.speed_kph,
                    sample.rpm,
                    sample.battery_percentage,
                    sample.battery_voltage,
                    sample.wind_speed,
                    sample.temperature
                );
            }
            Err(e) => {
                self.stats.persistence_failures += 1;
                error!("tick {}: sample {} dropped: {}", tick, sample.timestamp_text(), e);
            }
        }

        TickOutcome {
            tick,
            sample,
            reachable,
            reachability_changed,
            route,
            result,
        }
    }

    /// Tick until `stop` is raised or `max_ticks` is reached.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut observer: F)
    where
        F: FnMut(&TickOutcome),
    {
        while !stop.load(Ordering::Relaxed) {
            let outcome = self.tick();
            observer(&outcome);

            if let Some(max) = self.config.max_ticks {
                if self.stats.ticks >= max {
                    break;
                }
            }
            self.clock.sleep(self.config.tick_interval);
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
