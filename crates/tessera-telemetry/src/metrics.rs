//! Prometheus metrics for Tessera.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `tessera_requests_total` | Counter | `route`, `status` | Completed requests |
//! | `tessera_request_duration_seconds` | Histogram | `route` | Request latency |
//! | `tessera_bind_failures_total` | Counter | `kind` | Requests rejected while binding |
//! | `tessera_background_tasks_total` | Counter | `outcome` | Background tasks run |
//! | `tessera_teardown_failures_total` | Counter | - | Scoped dependency releases that failed |
//!
//! The last two are emitted by `tessera-tasks` and `tessera-core`; this module
//! only describes them.
//!
//! Without an installed recorder every call here is a no-op.

use crate::error::{TelemetryError, TelemetryResult};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use tessera_core::BindErrorKind;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Histogram buckets for request duration.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

fn builder(config: &MetricsConfig) -> TelemetryResult<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Installs a Prometheus recorder with an HTTP scrape listener.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    builder(config)?
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    describe();
    Ok(())
}

/// Installs a render-only Prometheus recorder and returns its handle.
///
/// Useful when the metrics are exposed through an application route rather
/// than a dedicated listener.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn install_recorder(config: &MetricsConfig) -> TelemetryResult<&'static PrometheusHandle> {
    let handle = builder(config)?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    describe();
    Ok(METRICS_HANDLE.get_or_init(|| handle))
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` unless [`install_recorder`] was called.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for the standard metrics.
pub fn describe() {
    describe_counter!("tessera_requests_total", "Total number of requests handled");
    describe_histogram!(
        "tessera_request_duration_seconds",
        "Request duration in seconds, binding and teardown included"
    );
    describe_counter!(
        "tessera_bind_failures_total",
        "Requests rejected before or by the handler, by failure kind"
    );
    describe_counter!(
        "tessera_background_tasks_total",
        "Background tasks run after a response, by outcome"
    );
    describe_counter!(
        "tessera_teardown_failures_total",
        "Scoped dependency releases that failed or panicked"
    );
}

/// Records a completed request.
pub fn record_request(route: &str, status_code: u16, duration: Duration) {
    counter!(
        "tessera_requests_total",
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "tessera_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a request that ended in a binding or handler failure.
pub fn record_bind_failure(kind: BindErrorKind) {
    counter!("tessera_bind_failures_total", "kind" => kind.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_disabled_metrics_skip_install() {
        let config = MetricsConfig {
            enabled: false,
            addr: "not an address".to_string(),
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            addr: "not an address".to_string(),
            ..MetricsConfig::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_request("read_item", 200, Duration::from_millis(10));
        record_bind_failure(BindErrorKind::MissingQueryParam);
        describe();
    }
}
