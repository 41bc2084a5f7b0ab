//! Network reachability check used to pick the sink for each tick.

use boat_core::ConnectivityProbe;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// Public DNS resolver; answering TCP on port 53 is a good proxy for uplink.
pub const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub target: String,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_PROBE_ADDR.to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

/// TCP connect probe against a well-known address.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    config: ProbeConfig,
}

impl TcpProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn resolve(&self) -> Vec<SocketAddr> {
        match self.config.target.to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                debug!(probe_target = %self.config.target, error = %e, "Probe target did not resolve");
                Vec::new()
            }
        }
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_reachable(&mut self) -> bool {
        for addr in self.resolve() {
            match TcpStream::connect_timeout(&addr, self.config.timeout) {
                Ok(_) => {
                    trace!(%addr, "Probe connected");
                    return true;
                }
                Err(e) => {
                    debug!(%addr, error = %e, "Probe connect failed");
                }
            }
        }
        false
    }
}
