//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_values_written_total` (counter): value writes by section
//! - `config_notifications_total` (counter): refresh deliveries by outcome
//! - `config_merge_values_added_total` (counter): values adopted from imports
//! - `config_queue_depth` (gauge): tasks per queue state
//! - `config_diff_warnings_total` (counter): peers excluded from a diff
//! - `config_stale_registrations_removed_total` (counter): sweep removals

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::model::QueueStats;

/// Install the Prometheus exporter and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_value_written(section: &str) {
    counter!("config_values_written_total", "section" => section.to_string()).increment(1);
}

/// `outcome` is one of `delivered`, `failed`.
pub fn record_notification(outcome: &'static str) {
    counter!("config_notifications_total", "outcome" => outcome).increment(1);
}

pub fn record_merge(values_added: usize) {
    counter!("config_merge_values_added_total").increment(values_added as u64);
}

pub fn record_queue_depth(stats: &QueueStats) {
    gauge!("config_queue_depth", "state" => "pending").set(stats.pending as f64);
    gauge!("config_queue_depth", "state" => "in_flight").set(stats.in_flight as f64);
    gauge!("config_queue_depth", "state" => "completed").set(stats.completed as f64);
}

pub fn record_diff_warning() {
    counter!("config_diff_warnings_total").increment(1);
}

pub fn record_stale_removed(count: usize) {
    counter!("config_stale_registrations_removed_total").increment(count as u64);
}
