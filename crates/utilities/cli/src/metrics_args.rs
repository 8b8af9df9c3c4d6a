//! Prometheus metrics CLI arguments.

use crate::{PrometheusError, init_prometheus_server};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default port the Prometheus exporter listens on.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Configuration for the Prometheus exporter.
#[derive(Parser, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serve Prometheus metrics over HTTP.
    #[arg(long = "metrics.enabled", global = true, env = "VIGIL_METRICS_ENABLED")]
    pub enabled: bool,

    /// Address the metrics server binds to.
    #[arg(
        long = "metrics.addr",
        global = true,
        default_value = "0.0.0.0",
        env = "VIGIL_METRICS_ADDR"
    )]
    pub addr: IpAddr,

    /// Port the metrics server listens on. 0 picks a free port.
    #[arg(
        long = "metrics.port",
        global = true,
        default_value_t = DEFAULT_METRICS_PORT,
        env = "VIGIL_METRICS_PORT"
    )]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: DEFAULT_METRICS_PORT }
    }
}

impl MetricsArgs {
    /// Starts the Prometheus exporter if enabled, returning the address it listens on.
    pub fn init_metrics(&self) -> Result<Option<SocketAddr>, PrometheusError> {
        if !self.enabled {
            return Ok(None);
        }
        init_prometheus_server(self.addr, self.port).map(Some)
    }
}
