use crate::infra::audit::{AuditEventType, AuditLogger};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::error::AppError;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use boat_core::{
    ConnectivityProbe, FixedProbe, LoopStats, Recorder, SampleLoop, SignalModel, SinkRouter,
    SystemClock, TickOutcome,
};
use boat_io::{FlatSink, StructuredSink, TcpProbe};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

enum LinkProbe {
    Tcp(TcpProbe),
    Fixed(FixedProbe),
}

impl ConnectivityProbe for LinkProbe {
    fn is_reachable(&mut self) -> bool {
        match self {
            Self::Tcp(p) => p.is_reachable(),
            Self::Fixed(p) => p.is_reachable(),
        }
    }
}

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("boat-logger: {e}");
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }

    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref());

    let result = if config.dump {
        dump(&config)
    } else {
        run(config).map(|_| ())
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "boat-logger stopped");
            ExitCode::FAILURE
        }
    }
}

/// Open sinks, start the sampling loop and block until it stops.
pub fn run(config: RuntimeConfig) -> Result<LoopStats, AppError> {
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let model = SignalModel::new(config.signal_config(), rng)?;

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let audit_logger = init_audit_logger(config.audit_path.as_ref())?;

    let router = build_router(&config, audit_logger.as_deref())?;

    let probe = if config.offline {
        info!("Offline mode, connectivity check disabled");
        LinkProbe::Fixed(FixedProbe(false))
    } else {
        let probe_config = config.probe_config();
        info!(
            addr = %probe_config.target,
            timeout_s = probe_config.timeout.as_secs(),
            "Connectivity probe configured"
        );
        LinkProbe::Tcp(TcpProbe::new(probe_config))
    };

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            None,
            AuditEventType::SystemStart,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "interval_s": config.tick_interval_secs,
                "cruising_speed_kph": config.cruising_speed_kph,
                "target_rpm": config.target_rpm,
                "offline": config.offline,
                "seed": config.seed,
                "structured_sink": router.has_remote(),
            }),
        );
    }

    info!(
        interval_s = config.tick_interval_secs,
        cruising_speed_kph = config.cruising_speed_kph,
        target_rpm = config.target_rpm,
        "Starting sampling loop"
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_loop = Arc::clone(&stop);
    let audit_loop = audit_logger.clone();
    let mut sampler = SampleLoop::new(model, probe, router, SystemClock, config.loop_config());

    let loop_handle = thread::spawn(move || {
        sampler.run(&stop_loop, |outcome| {
            telemetry::observe(outcome);
            if let Some(ref logger) = audit_loop {
                audit_tick(logger, outcome);
            }
        });
        sampler.stats().clone()
    });

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        let deadline = std::time::Instant::now() + Duration::from_secs(seconds);
        while !loop_handle.is_finished() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(50));
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    let stats = loop_handle.join().map_err(|_| AppError::LoopPanicked)?;

    info!(
        ticks = stats.ticks,
        remote_writes = stats.remote_writes,
        local_writes = stats.local_writes,
        fallbacks = stats.fallbacks,
        persistence_failures = stats.persistence_failures,
        "Run complete"
    );

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            Some(stats.ticks),
            AuditEventType::SystemShutdown,
            serde_json::json!({
                "ticks": stats.ticks,
                "remote_writes": stats.remote_writes,
                "local_writes": stats.local_writes,
                "fallbacks": stats.fallbacks,
                "unreachable_ticks": stats.unreachable_ticks,
                "persistence_failures": stats.persistence_failures,
            }),
        );
    }

    Ok(stats)
}

fn build_router(
    config: &RuntimeConfig,
    audit: Option<&AuditLogger>,
) -> Result<SinkRouter, AppError> {
    let flat = FlatSink::open(&config.csv_path).map_err(|source| AppError::SinkOpen {
        kind: "flat",
        path: config.csv_path.clone(),
        source,
    })?;
    note_sink_opened(audit, &flat, flat.path().display().to_string());
    let mut router = SinkRouter::new(Box::new(flat));

    if let Some(ref db_path) = config.db_path {
        let structured = StructuredSink::open(db_path).map_err(|source| AppError::SinkOpen {
            kind: "structured",
            path: db_path.clone(),
            source,
        })?;
        note_sink_opened(audit, &structured, structured.path().display().to_string());
        router = router.with_remote(Box::new(structured));
    } else {
        info!("Structured sink disabled, all samples go to the flat sink");
    }
    Ok(router)
}

fn note_sink_opened(audit: Option<&AuditLogger>, sink: &dyn Recorder, path: String) {
    if let Some(logger) = audit {
        let _ = logger.log_event(
            None,
            AuditEventType::SinkOpened,
            serde_json::json!({ "sink": sink.name(), "path": path }),
        );
    }
}

fn audit_tick(logger: &AuditLogger, outcome: &TickOutcome) {
    let tick = Some(outcome.tick);
    if outcome.reachability_changed {
        let _ = logger.log_event(
            tick,
            AuditEventType::ConnectivityChanged,
            serde_json::json!({ "reachable": outcome.reachable }),
        );
    }
    match &outcome.result {
        Ok(delivery) if delivery.fell_back() => {
            let _ = logger.log_event(
                tick,
                AuditEventType::SinkFallback,
                serde_json::json!({
                    "requested": delivery.requested.as_str(),
                    "written": delivery.written.as_str(),
                }),
            );
        }
        Ok(_) => {}
        Err(e) => {
            let _ = logger.log_event(
                tick,
                AuditEventType::PersistenceFailure,
                serde_json::json!({
                    "sink": e.sink(),
                    "error": e.to_string(),
                    "timestamp": outcome.sample.timestamp_text(),
                }),
            );
        }
    }
}

fn dump(config: &RuntimeConfig) -> Result<(), AppError> {
    let db_path = config.db_path.as_ref().ok_or(AppError::NothingToDump)?;
    let sink = StructuredSink::open(db_path).map_err(|source| AppError::SinkOpen {
        kind: "structured",
        path: db_path.clone(),
        source,
    })?;
    let rows = sink.read_all().map_err(AppError::Read)?;
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    info!(rows = rows.len(), path = %db_path.display(), "Dumped structured sink");
    Ok(())
}

fn init_audit_logger(audit_path: Option<&PathBuf>) -> Result<Option<Arc<AuditLogger>>, AppError> {
    audit_path
        .map(|path| match AuditLogger::new(path) {
            Ok(logger) => {
                info!(path = %path.display(), "Audit logging enabled");
                Ok(Arc::new(logger))
            }
            Err(source) => {
                warn!(error = %source, path = %path.display(), "Failed to initialize audit logger");
                Err(AppError::Audit {
                    path: path.clone(),
                    source,
                })
            }
        })
        .transpose()
}
