//! Metrics collection and exposition.
//!
//! # Metrics
//! - `zipper_tries_total` (counter): tries by group and outcome
//! - `zipper_queries_total` (counter): dispatch calls by group and result
//! - `zipper_query_duration_seconds` (histogram): whole-call latency
//! - `zipper_slot_wait_seconds` (histogram): time spent waiting for a limiter slot

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_try(group: &str, outcome: &'static str) {
    counter!("zipper_tries_total", "group" => group.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_query(group: &str, result: &'static str, started: Instant) {
    counter!("zipper_queries_total", "group" => group.to_string(), "result" => result).increment(1);
    histogram!("zipper_query_duration_seconds", "group" => group.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_slot_wait(group: &str, started: Instant) {
    histogram!("zipper_slot_wait_seconds", "group" => group.to_string())
        .record(started.elapsed().as_secs_f64());
}
