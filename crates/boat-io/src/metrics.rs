//! Prometheus metrics for the boat telemetry logger.
//!
//! Counters follow the sampling loop (ticks, writes per sink, failures);
//! gauges mirror the latest sample using the channel tag names.

use boat_core::{tags, Route, TickOutcome};
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Loop Metrics
// ============================================================================

/// Total sampling ticks executed
pub static TICKS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("boat_ticks_total", "Total sampling ticks executed").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Ticks where the connectivity probe failed
pub static UNREACHABLE_TICKS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "boat_unreachable_ticks_total",
        "Ticks where the remote sink was unreachable",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Connectivity status (1 = reachable, 0 = unreachable)
pub static LINK_UP: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        "boat_link_up",
        "Connectivity probe result on the last tick (1=reachable, 0=unreachable)",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Persistence Metrics
// ============================================================================

/// Samples written to the remote/structured sink
pub static REMOTE_WRITES: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "boat_remote_writes_total",
        "Samples written to the structured sink",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Samples written to the local flat sink
pub static LOCAL_WRITES: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("boat_local_writes_total", "Samples written to the flat sink")
        .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Remote writes that failed over to the local sink
pub static SINK_FALLBACKS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "boat_sink_fallbacks_total",
        "Remote writes that failed and were stored locally instead",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Samples no sink accepted
pub static PERSISTENCE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "boat_persistence_failures_total",
        "Samples dropped because no sink accepted the write",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Sample Metrics
// ============================================================================

fn channel_gauge(tag: tags::Tag, help: &str) -> Gauge {
    let gauge = Gauge::new(tag.metric, help).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
}

pub static SPEED_KPH: LazyLock<Gauge> =
    LazyLock::new(|| channel_gauge(tags::SPEED_KPH, "Boat speed in km/h"));

pub static MOTOR_RPM: LazyLock<Gauge> =
    LazyLock::new(|| channel_gauge(tags::RPM, "Motor speed in RPM"));

pub static BATTERY_VOLTAGE: LazyLock<Gauge> =
    LazyLock::new(|| channel_gauge(tags::BATTERY_VOLTAGE, "Battery pack voltage"));

pub static BATTERY_PERCENT: LazyLock<Gauge> = LazyLock::new(|| {
    channel_gauge(tags::BATTERY_PERCENTAGE, "Battery state of charge in percent")
});

pub static WIND_SPEED: LazyLock<Gauge> =
    LazyLock::new(|| channel_gauge(tags::WIND_SPEED, "Wind speed"));

pub static TEMPERATURE_C: LazyLock<Gauge> =
    LazyLock::new(|| channel_gauge(tags::TEMPERATURE, "Temperature in Celsius"));

/// Fold one tick into the metrics.
pub fn record_tick(outcome: &TickOutcome) {
    TICKS_TOTAL.inc();
    LINK_UP.set(if outcome.reachable { 1.0 } else { 0.0 });
    if !outcome.reachable {
        UNREACHABLE_TICKS.inc();
    }

    match &outcome.result {
        Ok(delivery) => {
            match delivery.written {
                Route::Remote => REMOTE_WRITES.inc(),
                Route::Local => LOCAL_WRITES.inc(),
            }
            if delivery.fell_back() {
                SINK_FALLBACKS.inc();
            }
        }
        Err(_) => PERSISTENCE_FAILURES.inc(),
    }

    let sample = &outcome.sample;
    SPEED_KPH.set(sample.speed_kph);
    MOTOR_RPM.set(sample.rpm);
    BATTERY_VOLTAGE.set(sample.battery_voltage);
    BATTERY_PERCENT.set(sample.battery_percentage);
    WIND_SPEED.set(sample.wind_speed);
    TEMPERATURE_C.set(sample.temperature);
}

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let mut buffer = Vec::new();
                    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        let _ = request.respond(
                            Response::from_string("Internal Server Error").with_status_code(500),
                        );
                        continue;
                    }

                    let mut response = Response::from_data(buffer);
                    if let Ok(header) = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        encoder.format_type().as_bytes(),
                    ) {
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the first sample has been taken
                    if TICKS_TOTAL.get() > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = TICKS_TOTAL.get();
    let _ = UNREACHABLE_TICKS.get();
    let _ = LINK_UP.get();
    let _ = REMOTE_WRITES.get();
    let _ = LOCAL_WRITES.get();
    let _ = SINK_FALLBACKS.get();
    let _ = PERSISTENCE_FAILURES.get();
    let _ = SPEED_KPH.get();
    let _ = MOTOR_RPM.get();
    let _ = BATTERY_VOLTAGE.get();
    let _ = BATTERY_PERCENT.get();
    let _ = WIND_SPEED.get();
    let _ = TEMPERATURE_C.get();
}

#[cfg(test)]
mod tests {
    use super::*;
    use boat_core::{Delivery, PersistenceError, Sample};
    use chrono::NaiveDate;

    fn outcome(reachable: bool, result: Result<Delivery, PersistenceError>) -> TickOutcome {
        TickOutcome {
            tick: 1,
            sample: Sample {
                timestamp: NaiveDate::from_ymd_opt(2025, 2, 5)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                speed_kph: 22.0,
                rpm: 1650.0,
                battery_voltage: 338.1,
                battery_percentage: 81.0,
                wind_speed: 3.5,
                temperature: 26.0,
            },
            reachable,
            reachability_changed: false,
            route: if reachable { Route::Remote } else { Route::Local },
            result,
        }
    }

    #[test]
    fn tick_outcomes_move_counters() {
        init_metrics();
        let local_before = LOCAL_WRITES.get();
        let fallback_before = SINK_FALLBACKS.get();
        let failures_before = PERSISTENCE_FAILURES.get();

        record_tick(&outcome(
            true,
            Ok(Delivery {
                requested: Route::Remote,
                written: Route::Local,
            }),
        ));
        record_tick(&outcome(
            false,
            Err(PersistenceError::backend("flat", "disk full")),
        ));

        assert!(LOCAL_WRITES.get() > local_before);
        assert!(SINK_FALLBACKS.get() > fallback_before);
        assert!(PERSISTENCE_FAILURES.get() > failures_before);
        assert!(TICKS_TOTAL.get() >= 2);
    }

    #[test]
    fn gauges_use_channel_tag_names() {
        init_metrics();
        let names: Vec<String> = REGISTRY
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        for tag in tags::CHANNELS {
            assert!(names.iter().any(|n| n == tag.metric), "missing {}", tag.metric);
        }
    }
}
