use crate::sample::Sample;
use chrono::NaiveDateTime;
use rand::Rng;
use thiserror::Error;

/// Closed interval a stochastic step is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformRange {
    pub low: f64,
    pub high: f64,
}

impl UniformRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Degenerate range that always yields `value`.
    pub const fn fixed(value: f64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub const fn symmetric(amplitude: f64) -> Self {
        Self {
            low: -amplitude,
            high: amplitude,
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.low == self.high {
            self.low
        } else {
            rng.gen_range(self.low..=self.high)
        }
    }

    fn check(&self, field: &'static str) -> Result<(), InvalidConfiguration> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(InvalidConfiguration::NonFinite {
                field,
                value: if self.low.is_finite() {
                    self.high
                } else {
                    self.low
                },
            });
        }
        if self.low > self.high {
            return Err(InvalidConfiguration::InvertedRange {
                field,
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidConfiguration {
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} range is inverted: low {low} > high {high}")]
    InvertedRange {
        field: &'static str,
        low: f64,
        high: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalConfig {
    pub cruising_speed_kph: f64,
    /// Motor RPM reached at cruising speed.
    pub target_rpm: f64,
    pub min_voltage: f64,
    pub max_voltage: f64,
    pub target_temperature_c: f64,
    /// Battery percentage lost per second at cruising speed.
    pub drain_rate_per_s: f64,
    pub tick_seconds: f64,
    pub speed_step: UniformRange,
    pub warmup_step: UniformRange,
    pub temperature_jitter: UniformRange,
    pub wind_jitter: UniformRange,
    pub voltage_noise: UniformRange,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            cruising_speed_kph: 40.0,
            target_rpm: 3000.0,
            min_voltage: 330.0,
            max_voltage: 340.0,
            target_temperature_c: 30.0,
            // 0.1 % every three minutes at full load.
            drain_rate_per_s: 0.1 / 180.0,
            tick_seconds: 1.0,
            speed_step: UniformRange::new(0.5, 2.0),
            warmup_step: UniformRange::new(0.1, 0.5),
            temperature_jitter: UniformRange::symmetric(0.2),
            wind_jitter: UniformRange::symmetric(0.5),
            voltage_noise: UniformRange::symmetric(0.2),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        positive("cruising_speed_kph", self.cruising_speed_kph)?;
        non_negative("target_rpm", self.target_rpm)?;
        finite("min_voltage", self.min_voltage)?;
        finite("max_voltage", self.max_voltage)?;
        if self.min_voltage > self.max_voltage {
            return Err(InvalidConfiguration::InvertedRange {
                field: "voltage",
                low: self.min_voltage,
                high: self.max_voltage,
            });
        }
        finite("target_temperature_c", self.target_temperature_c)?;
        non_negative("drain_rate_per_s", self.drain_rate_per_s)?;
        positive("tick_seconds", self.tick_seconds)?;
        self.speed_step.check("speed_step")?;
        self.warmup_step.check("warmup_step")?;
        self.temperature_jitter.check("temperature_jitter")?;
        self.wind_jitter.check("wind_jitter")?;
        self.voltage_noise.check("voltage_noise")?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), InvalidConfiguration> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InvalidConfiguration::NonFinite { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), InvalidConfiguration> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(InvalidConfiguration::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), InvalidConfiguration> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(InvalidConfiguration::Negative { field, value })
    }
}

/// Physical state carried from one tick to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationState {
    pub speed_kph: f64,
    pub rpm: f64,
    pub temperature_c: f64,
    pub wind_speed: f64,
    pub battery_percent: f64,
    pub battery_voltage: f64,
}

impl SimulationState {
    /// Boat at rest on a full battery.
    pub fn at_rest(config: &SignalConfig) -> Self {
        Self {
            speed_kph: 0.0,
            rpm: 0.0,
            temperature_c: 20.0,
            wind_speed: 5.0,
            battery_percent: 100.0,
            battery_voltage: config.max_voltage,
        }
    }
}

/// Electric boat drivetrain and environment as bounded random walks.
#[derive(Debug, Clone)]
pub struct SignalModel<R> {
    config: SignalConfig,
    rng: R,
}

impl<R: Rng> SignalModel<R> {
    pub fn new(config: SignalConfig, rng: R) -> Result<Self, InvalidConfiguration> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn initial_state(&self) -> SimulationState {
        SimulationState::at_rest(&self.config)
    }

    /// Advance `state` by one tick and produce the sample stamped `at`.
    pub fn next(
        &mut self,
        state: &SimulationState,
        at: NaiveDateTime,
    ) -> (SimulationState, Sample) {
        let cfg = &self.config;
        let cruising = cfg.cruising_speed_kph;

        // Speed snaps to cruising once the battery is empty; only rpm reflects it.
        let speed = if state.speed_kph < cruising && state.battery_percent > 0.0 {
            (state.speed_kph + cfg.speed_step.sample(&mut self.rng)).clamp(0.0, cruising)
        } else {
            cruising
        };
        let load = speed / cruising;

        let drain = cfg.drain_rate_per_s * cfg.tick_seconds * load;
        let battery = (state.battery_percent - drain)
            .min(state.battery_percent)
            .max(0.0);

        let rpm = if battery > 0.0 {
            load * cfg.target_rpm
        } else {
            0.0
        };

        let temperature = if state.temperature_c < cfg.target_temperature_c {
            state.temperature_c + cfg.warmup_step.sample(&mut self.rng)
        } else {
            state.temperature_c + cfg.temperature_jitter.sample(&mut self.rng)
        };

        let wind = (state.wind_speed + cfg.wind_jitter.sample(&mut self.rng)).max(0.0);

        let nominal =
            cfg.min_voltage + (battery / 100.0) * (cfg.max_voltage - cfg.min_voltage);
        let voltage = nominal + cfg.voltage_noise.sample(&mut self.rng);

        let next = SimulationState {
            speed_kph: speed,
            rpm,
            temperature_c: temperature,
            wind_speed: wind,
            battery_percent: battery,
            battery_voltage: voltage,
        };
        let sample = Sample {
            timestamp: at,
            speed_kph: speed,
            rpm,
            battery_voltage: voltage,
            battery_percentage: battery,
            wind_speed: wind,
            temperature,
        };
        (next, sample)
    }
}
