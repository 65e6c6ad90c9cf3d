//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_commands_total` (counter): operator commands by command, outcome
//! - `relay_pending_confirmations` (gauge): live first-step confirmations
//! - `relay_partial_failures_total` (counter): payouts marked success whose wallet write failed
//! - `relay_telegram_send_total` (counter): outbound messages by outcome

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_command(command: &'static str, outcome: &'static str) {
    metrics::counter!("relay_commands_total", "command" => command, "outcome" => outcome)
        .increment(1);
}

pub fn record_pending_confirmations(count: usize) {
    metrics::gauge!("relay_pending_confirmations").set(count as f64);
}

pub fn record_partial_failure() {
    metrics::counter!("relay_partial_failures_total").increment(1);
}

pub fn record_telegram_send(outcome: &'static str) {
    metrics::counter!("relay_telegram_send_total", "outcome" => outcome).increment(1);
}
