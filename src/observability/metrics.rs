//! Metrics collection and exposition.
//!
//! # Metrics
//! - `composition_responses_total` (counter): composed responses by outcome
//! - `composition_fetch_total` (counter): upstream fetches by status
//! - `composition_fetch_duration_seconds` (histogram): upstream fetch latency
//! - `composition_cache_purged_total` (counter): cache entries dropped after a failed render
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Status labels are the numeric code, `timeout` or `error`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Serve Prometheus metrics on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one upstream fetch that started at `start`.
pub fn record_fetch(status: &str, start: Instant) {
    let status = status.to_string();
    counter!("composition_fetch_total", "status" => status.clone()).increment(1);
    histogram!("composition_fetch_duration_seconds", "status" => status).record(start.elapsed().as_secs_f64());
}

/// Record the terminal outcome of one composition.
pub fn record_composition(outcome: &'static str) {
    counter!("composition_responses_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_purge(count: usize) {
    counter!("composition_cache_purged_total").increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        record_fetch("200", Instant::now());
        record_composition("composed");
        record_cache_purge(3);
    }
}
