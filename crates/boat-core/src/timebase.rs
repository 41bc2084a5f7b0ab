use chrono::{Local, NaiveDateTime};
use std::time::Duration;

/// Source of wall-clock stamps and of the pause between ticks.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
    fn sleep(&mut self, duration: Duration);
}

/// Local wall clock backed by `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock that advances only when slept on.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: NaiveDateTime,
    slept: Duration,
}

impl ManualClock {
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            now,
            slept: Duration::ZERO,
        }
    }

    /// Total virtual time spent sleeping.
    pub fn slept(&self) -> Duration {
        self.slept
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
        if let Ok(step) = chrono::Duration::from_std(duration) {
            self.now += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let start = NaiveDate::from_ymd_opt(2025, 2, 5)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let mut clock = ManualClock::starting_at(start);
        clock.sleep(Duration::from_secs(2));
        assert_eq!(clock.slept(), Duration::from_secs(2));
        assert_eq!(clock.now().to_string(), "2025-02-06 00:00:01");
    }
}
