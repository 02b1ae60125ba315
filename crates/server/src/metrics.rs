//! Prometheus metrics for the depot server.
//!
//! Registry operations are counted and timed through [`MetricsObserver`].
//! Upload volume is recorded by the upload handlers.
//!
//! The `/metrics` endpoint is unauthenticated so Prometheus can scrape it.
//! Restrict it at the network level when the server is public.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use depot_registry::{OperationKind, OperationObserver};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{LazyLock, Once};
use std::time::Duration;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_operations_total",
            "Total number of registry operations by kind and outcome",
        ),
        &["operation", "success"],
    )
    .expect("metric creation failed")
});

pub static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "depot_operation_duration_seconds",
            "Registry operation duration by kind",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["operation"],
    )
    .expect("metric creation failed")
});

pub static UPLOAD_BYTES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_upload_bytes_total",
            "Total bytes received in upload bodies by package type",
        ),
        &["type"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests can build many routers in one process.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(OPERATIONS_TOTAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(OPERATION_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_BYTES.clone()))
            .expect("metric registration failed");
    });
}

/// Records registry operations as Prometheus metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsObserver;

impl OperationObserver for MetricsObserver {
    fn on_operation(&self, kind: OperationKind, success: bool, duration: Duration) {
        let success = if success { "true" } else { "false" };
        OPERATIONS_TOTAL
            .with_label_values(&[kind.as_str(), success])
            .inc();
        OPERATION_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(duration.as_secs_f64());
    }
}

/// Helper to record the size of an upload body.
pub fn record_upload(package_type: &str, bytes: usize) {
    UPLOAD_BYTES
        .with_label_values(&[package_type])
        .inc_by(bytes as u64);
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
