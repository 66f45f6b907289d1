//! Prometheus metrics for jwt-sso

use std::sync::OnceLock;

use metrics::{counter, describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const METRIC_INFO: &str = "jwt_sso_info";
const METRIC_LOGINS: &str = "jwt_sso_logins_total";
const METRIC_CACHE_LOOKUPS: &str = "jwt_sso_cache_lookups_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_counter!(METRIC_LOGINS, "JWT logins by outcome (cached, success, failure)");
    describe_counter!(
        METRIC_CACHE_LOOKUPS,
        "Token cache lookups by result (hit, miss, error)"
    );

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a finished login.
pub fn record_login(outcome: &str) {
    counter!(METRIC_LOGINS, "outcome" => outcome.to_owned()).increment(1);
}

/// Record a token cache lookup.
pub fn record_cache_lookup(result: &str) {
    counter!(METRIC_CACHE_LOOKUPS, "result" => result.to_owned()).increment(1);
}
