#[cfg(test)]
mod proptest_signal {
    use crate::signal::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(
        config: SignalConfig,
        seed: u64,
        start: Option<SimulationState>,
        ticks: usize,
    ) -> Vec<(SimulationState, crate::Sample)> {
        let at = NaiveDate::from_ymd_opt(2025, 2, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut model = SignalModel::new(config, StdRng::seed_from_u64(seed)).unwrap();
        let mut state = start.unwrap_or_else(|| model.initial_state());
        let mut out = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            let (next, sample) = model.next(&state, at);
            out.push((state, sample));
            state = next;
        }
        out
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        // Property: battery never recharges and never goes negative
        #[test]
        fn battery_drains_monotonically(
            seed in any::<u64>(),
            drain in 0.0f64..=10.0,
            battery in 0.0f64..=100.0,
        ) {
            let config = SignalConfig { drain_rate_per_s: drain, ..SignalConfig::default() };
            let mut start = SimulationState::at_rest(&config);
            start.battery_percent = battery;
            let mut previous = battery;
            for (_, sample) in run(config, seed, Some(start), 100) {
                prop_assert!(sample.battery_percentage >= 0.0);
                prop_assert!(sample.battery_percentage <= previous,
                    "battery rose from {} to {}", previous, sample.battery_percentage);
                previous = sample.battery_percentage;
            }
        }

        // Property: an empty battery always reports a stopped motor
        #[test]
        fn empty_battery_means_zero_rpm(
            seed in any::<u64>(),
            drain in 0.0f64..=20.0,
            battery in 0.0f64..=5.0,
        ) {
            let config = SignalConfig { drain_rate_per_s: drain, ..SignalConfig::default() };
            let mut start = SimulationState::at_rest(&config);
            start.battery_percent = battery;
            for (_, sample) in run(config, seed, Some(start), 50) {
                if sample.battery_percentage == 0.0 {
                    prop_assert_eq!(sample.rpm, 0.0);
                }
                if sample.whole_battery_percent() == 0 {
                    prop_assert_eq!(sample.rpm, 0.0);
                }
            }
        }

        // Property: speed stays within [0, cruising] and wind never goes negative
        #[test]
        fn speed_and_wind_bounded(
            seed in any::<u64>(),
            cruising in 1.0f64..=120.0,
            wind_amplitude in 0.0f64..=5.0,
            start_wind in 0.0f64..=2.0,
        ) {
            let config = SignalConfig {
                cruising_speed_kph: cruising,
                wind_jitter: UniformRange::symmetric(wind_amplitude),
                ..SignalConfig::default()
            };
            let mut start = SimulationState::at_rest(&config);
            start.wind_speed = start_wind;
            for (_, sample) in run(config, seed, Some(start), 200) {
                prop_assert!(sample.speed_kph >= 0.0 && sample.speed_kph <= cruising);
                prop_assert!(sample.wind_speed >= 0.0);
            }
        }

        // Property: seeded runs are reproducible
        #[test]
        fn seeded_runs_repeat(seed in any::<u64>()) {
            let a = run(SignalConfig::default(), seed, None, 64);
            let b = run(SignalConfig::default(), seed, None, 64);
            prop_assert_eq!(a, b);
        }
    }
}
