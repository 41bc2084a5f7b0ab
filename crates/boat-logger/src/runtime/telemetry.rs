use boat_core::TickOutcome;
use boat_io::metrics::{init_metrics, record_tick, serve_metrics};
use std::thread;
use tracing::info;

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

pub fn observe(outcome: &TickOutcome) {
    record_tick(outcome);
}
