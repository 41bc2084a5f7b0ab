use boat_core::{LoopConfig, SignalConfig};
use boat_io::{ProbeConfig, DEFAULT_PROBE_ADDR};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{flag} expects a value")]
    MissingValue { flag: String },
    #[error("invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("{flag} must be greater than zero")]
    NotPositive { flag: String },
    #[error("unknown option {0}")]
    UnknownFlag(String),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub dump: bool,
    pub run_seconds: Option<u64>,
    pub max_ticks: Option<u64>,
    pub tick_interval_secs: u64,
    pub csv_path: PathBuf,
    pub db_path: Option<PathBuf>,
    pub cruising_speed_kph: f64,
    pub target_rpm: f64,
    pub min_voltage: f64,
    pub max_voltage: f64,
    pub target_temperature_c: f64,
    pub probe_addr: String,
    pub probe_timeout_secs: u64,
    pub offline: bool,
    pub seed: Option<u64>,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub audit_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let signal = SignalConfig::default();
        Self {
            show_help: false,
            dump: false,
            run_seconds: None,
            max_ticks: None,
            tick_interval_secs: 1,
            csv_path: PathBuf::from("boat_log.csv"),
            db_path: Some(PathBuf::from("boat.db")),
            cruising_speed_kph: signal.cruising_speed_kph,
            target_rpm: signal.target_rpm,
            min_voltage: signal.min_voltage,
            max_voltage: signal.max_voltage,
            target_temperature_c: signal.target_temperature_c,
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout_secs: 3,
            offline: false,
            seed: None,
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            audit_path: None,
        }
    }
}

fn value<'a>(args: &'a [String], i: usize) -> Result<&'a str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue {
            flag: args[i].clone(),
        })
}

fn parse<T: FromStr>(args: &[String], i: usize) -> Result<T, ConfigError> {
    let raw = value(args, i)?;
    raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        flag: args[i].clone(),
        value: raw.to_string(),
    })
}

fn positive(flag: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        Err(ConfigError::NotPositive {
            flag: flag.to_string(),
        })
    } else {
        Ok(value)
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--interval" => {
                    cfg.tick_interval_secs = positive("--interval", parse(args, i)?)?;
                    i += 1;
                }
                "--run-seconds" => {
                    cfg.run_seconds = Some(parse(args, i)?);
                    i += 1;
                }
                "--max-ticks" => {
                    cfg.max_ticks = Some(positive("--max-ticks", parse(args, i)?)?);
                    i += 1;
                }
                "--csv" => {
                    cfg.csv_path = PathBuf::from(value(args, i)?);
                    i += 1;
                }
                "--db" => {
                    cfg.db_path = Some(PathBuf::from(value(args, i)?));
                    i += 1;
                }
                "--no-db" => {
                    cfg.db_path = None;
                }
                "--cruising-speed" => {
                    cfg.cruising_speed_kph = parse(args, i)?;
                    i += 1;
                }
                "--target-rpm" => {
                    cfg.target_rpm = parse(args, i)?;
                    i += 1;
                }
                "--min-voltage" => {
                    cfg.min_voltage = parse(args, i)?;
                    i += 1;
                }
                "--max-voltage" => {
                    cfg.max_voltage = parse(args, i)?;
                    i += 1;
                }
                "--target-temp" => {
                    cfg.target_temperature_c = parse(args, i)?;
                    i += 1;
                }
                "--probe-addr" => {
                    cfg.probe_addr = value(args, i)?.to_string();
                    i += 1;
                }
                "--probe-timeout" => {
                    cfg.probe_timeout_secs = positive("--probe-timeout", parse(args, i)?)?;
                    i += 1;
                }
                "--offline" => {
                    cfg.offline = true;
                }
                "--seed" => {
                    cfg.seed = Some(parse(args, i)?);
                    i += 1;
                }
                "--dump" => {
                    cfg.dump = true;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-dir" => {
                    cfg.log_dir = Some(PathBuf::from(value(args, i)?));
                    i += 1;
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(value(args, i)?.to_string());
                    i += 1;
                }
                "--audit-log" => {
                    cfg.audit_path = Some(PathBuf::from(value(args, i)?));
                    i += 1;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                other => return Err(ConfigError::UnknownFlag(other.to_string())),
            }
            i += 1;
        }
        Ok(cfg)
    }

    /// Simulation parameters; validated when the model is built.
    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            cruising_speed_kph: self.cruising_speed_kph,
            target_rpm: self.target_rpm,
            min_voltage: self.min_voltage,
            max_voltage: self.max_voltage,
            target_temperature_c: self.target_temperature_c,
            tick_seconds: self.tick_interval_secs as f64,
            ..SignalConfig::default()
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            max_ticks: self.max_ticks,
        }
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            target: self.probe_addr.clone(),
            timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }

    pub fn print_help() {
        println!(
            r#"boat-logger - Electric boat telemetry simulator and logger

USAGE:
    boat-logger [OPTIONS]

OPTIONS:
    --interval <SECS>         Seconds between samples [default: 1]
    --csv <PATH>              Flat CSV log (local sink) [default: boat_log.csv]
    --db <PATH>               SQLite database (structured sink) [default: boat.db]
    --no-db                   Disable the structured sink; every sample goes to the CSV log
    --cruising-speed <KPH>    Cruising speed [default: 40]
    --target-rpm <RPM>        Motor RPM at cruising speed [default: 3000]
    --min-voltage <V>         Battery voltage when empty [default: 330]
    --max-voltage <V>         Battery voltage when full [default: 340]
    --target-temp <C>         Temperature the boat warms up to [default: 30]
    --probe-addr <HOST:PORT>  Address used for the connectivity check [default: 8.8.8.8:53]
    --probe-timeout <SECS>    Connectivity check timeout [default: 3]
    --offline                 Skip the connectivity check and write locally
    --seed <N>                Seed the simulation for reproducible runs
    --run-seconds <SECS>      Run for a fixed duration then exit
    --max-ticks <N>           Stop after N samples
    --dump                    Print every row of the structured sink as JSON and exit
    --json-logs               Output logs in JSON format (for log aggregation)
    --log-dir <DIR>           Also write daily-rolled log files to DIR
    --metrics-addr <ADDR>     Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --audit-log <PATH>        Enable lifecycle audit logging to specified JSONL file
    -h, --help                Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                  Set log filter (e.g., RUST_LOG=debug,boat_core=trace)

EXAMPLES:
    # Log forever, one sample per second
    boat-logger

    # Offline bench run with a fixed seed
    boat-logger --offline --seed 7 --max-ticks 60 --csv /tmp/boat_log.csv

    # Inspect what reached the structured sink
    boat-logger --dump --db boat.db
"#
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("boat-logger")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_without_flags() {
        let cfg = RuntimeConfig::from_args(&args(&[])).unwrap();
        assert_eq!(cfg.tick_interval_secs, 1);
        assert_eq!(cfg.csv_path, PathBuf::from("boat_log.csv"));
        assert_eq!(cfg.db_path, Some(PathBuf::from("boat.db")));
        assert_eq!(cfg.probe_addr, "8.8.8.8:53");
        assert!(!cfg.offline);
    }

    #[test]
    fn parses_simulation_and_sink_flags() {
        let cfg = RuntimeConfig::from_args(&args(&[
            "--interval",
            "2",
            "--csv",
            "/tmp/log.csv",
            "--no-db",
            "--cruising-speed",
            "35.5",
            "--target-rpm",
            "2800",
            "--seed",
            "9",
            "--offline",
            "--max-ticks",
            "10",
        ]))
        .unwrap();

        assert_eq!(cfg.tick_interval_secs, 2);
        assert_eq!(cfg.csv_path, PathBuf::from("/tmp/log.csv"));
        assert_eq!(cfg.db_path, None);
        assert_eq!(cfg.seed, Some(9));
        assert!(cfg.offline);

        let signal = cfg.signal_config();
        assert_eq!(signal.cruising_speed_kph, 35.5);
        assert_eq!(signal.target_rpm, 2800.0);
        assert_eq!(signal.tick_seconds, 2.0);

        let loop_config = cfg.loop_config();
        assert_eq!(loop_config.tick_interval, Duration::from_secs(2));
        assert_eq!(loop_config.max_ticks, Some(10));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            RuntimeConfig::from_args(&args(&["--interval", "0"])).unwrap_err(),
            ConfigError::NotPositive {
                flag: "--interval".into()
            }
        );
        assert_eq!(
            RuntimeConfig::from_args(&args(&["--cruising-speed", "fast"])).unwrap_err(),
            ConfigError::InvalidValue {
                flag: "--cruising-speed".into(),
                value: "fast".into()
            }
        );
        assert_eq!(
            RuntimeConfig::from_args(&args(&["--csv"])).unwrap_err(),
            ConfigError::MissingValue {
                flag: "--csv".into()
            }
        );
        assert_eq!(
            RuntimeConfig::from_args(&args(&["--turbo"])).unwrap_err(),
            ConfigError::UnknownFlag("--turbo".into())
        );
    }

    #[test]
    fn help_stops_parsing() {
        let cfg = RuntimeConfig::from_args(&args(&["-h", "--turbo"])).unwrap();
        assert!(cfg.show_help);
    }
}
