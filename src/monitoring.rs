// file: src/monitoring.rs
// description: prometheus exporter and the counters the client reports into

use crate::{error::SignalError, types::SignalMessage};
use anyhow::Result;
use chrono::Utc;
use metrics::{Counter, Gauge, Histogram, counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

pub static MESSAGES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("signal_messages_received_total"));
pub static PARSE_ERROR_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("signal_parse_errors_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("signal_reconnects_total"));
pub static HEARTBEAT_TIMEOUT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("signal_heartbeat_timeouts_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!("signal_connected"));
/// Seconds between the server stamping a message and the client decoding it.
pub static MESSAGE_LAG_HISTOGRAM: LazyLock<Histogram> =
    LazyLock::new(|| histogram!("signal_message_lag_seconds"));

pub fn record_message(message: &SignalMessage) {
    MESSAGES_RECEIVED_COUNTER.increment(1);
    let lag = (Utc::now() - message.timestamp).num_milliseconds().max(0);
    MESSAGE_LAG_HISTOGRAM.record(lag as f64 / 1000.0);
}

pub fn record_parse_error() {
    PARSE_ERROR_COUNTER.increment(1);
}

pub fn record_reconnect() {
    RECONNECT_COUNTER.increment(1);
}

pub fn record_heartbeat_timeout() {
    HEARTBEAT_TIMEOUT_COUNTER.increment(1);
}

pub fn set_connected(connected: bool) {
    CONNECTED_GAUGE.set(if connected { 1.0 } else { 0.0 });
}

/// Serve `/metrics` on `port` for the rest of the process.
pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "signal-stream")
        .add_global_label("version", env!("CARGO_PKG_VERSION"))
        .install()
        .map_err(|e| {
            error!("Failed to start metrics server: {}", e);
            SignalError::MetricsError(e.to_string())
        })?;
    info!("Prometheus metrics server started on http://{}/metrics", addr);

    // export every series from the first scrape
    MESSAGES_RECEIVED_COUNTER.absolute(0);
    PARSE_ERROR_COUNTER.absolute(0);
    RECONNECT_COUNTER.absolute(0);
    HEARTBEAT_TIMEOUT_COUNTER.absolute(0);
    set_connected(false);

    Ok(())
}
