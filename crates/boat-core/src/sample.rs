use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wall-clock format shared by the structured sink and the logs.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One telemetry reading, immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub speed_kph: f64,
    pub rpm: f64,
    pub battery_voltage: f64,
    pub battery_percentage: f64,
    pub wind_speed: f64,
    pub temperature: f64,
}

impl Sample {
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Charge as the whole percent persisted by the sinks.
    ///
    /// Truncated, except that any charge left reads as at least 1 so a stored
    /// 0 always means an empty battery and a stopped motor.
    pub fn whole_battery_percent(&self) -> i64 {
        if self.battery_percentage > 0.0 {
            self.battery_percentage.trunc().max(1.0) as i64
        } else {
            0
        }
    }
}
