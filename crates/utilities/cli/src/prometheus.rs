//! Utilities for spinning up a prometheus metrics server.

use crate::PrometheusError;
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_process::Collector;
use std::{
    net::{IpAddr, SocketAddr, TcpListener},
    thread::{self, sleep},
    time::Duration,
};
use tracing::info;

/// Start a Prometheus metrics server on the given address and port.
///
/// A port of 0 lets the OS pick a free one. Returns the address the server listens on.
pub fn init_prometheus_server(
    addr: IpAddr,
    metrics_port: u16,
) -> Result<SocketAddr, PrometheusError> {
    let listen_addr = resolve_listen_addr(addr, metrics_port)?;

    PrometheusBuilder::new().with_http_listener(listen_addr).install()?;

    // Process metrics, e.g. CPU and memory.
    let collector = Collector::default();
    collector.describe();

    thread::spawn(move || {
        loop {
            collector.collect();
            sleep(Duration::from_secs(60));
        }
    });

    info!(target: "prometheus", "Serving metrics at: http://{}", listen_addr);

    Ok(listen_addr)
}

/// Resolves port 0 into a concrete free port by binding a throwaway listener.
fn resolve_listen_addr(addr: IpAddr, port: u16) -> Result<SocketAddr, PrometheusError> {
    if port != 0 {
        return Ok(SocketAddr::from((addr, port)));
    }
    let listener = TcpListener::bind((addr, 0))?;
    Ok(listener.local_addr()?)
}
