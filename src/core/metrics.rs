// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    /// The number of clients currently connected to the server.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("protoserver_connected_clients", "Number of currently connected clients.").unwrap();

    /// The total number of connections accepted by the server since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("protoserver_connections_received_total", "Total number of connections received.").unwrap();
    /// Commands dispatched to the engine, labeled by command name.
    pub static ref COMMANDS_PROCESSED_TOTAL: CounterVec =
        register_counter_vec!("protoserver_commands_processed_total", "Total number of commands processed, labeled by command.", &["command"]).unwrap();
    /// Protocol and command errors, labeled by error kind.
    pub static ref PROTOCOL_ERRORS_TOTAL: CounterVec =
        register_counter_vec!("protoserver_protocol_errors_total", "Total number of protocol errors, labeled by kind.", &["kind"]).unwrap();
    /// Connections closed because the client went quiet.
    pub static ref IDLE_TIMEOUTS_TOTAL: Counter =
        register_counter!("protoserver_idle_timeouts_total", "Total number of connections closed by the idle timeout.").unwrap();
    /// Priority registrations announced to the engine.
    pub static ref REGISTRATIONS_TOTAL: Counter =
        register_counter!("protoserver_registrations_total", "Total number of priority registrations sent to the engine.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
