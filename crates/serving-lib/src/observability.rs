//! Observability infrastructure for the dispatch service
//!
//! Provides:
//! - Prometheus metrics (dispatch latency, predictions and errors per label,
//!   training latency, artifact loads)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for dispatch latency (in seconds). Retraining requests
/// sit in the upper buckets.
const DISPATCH_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

const TRAINING_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<Option<DispatchMetricsInner>> = OnceLock::new();

struct DispatchMetricsInner {
    dispatch_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    dispatch_errors_total: IntCounterVec,
    training_latency_seconds: Histogram,
    artifact_loads_total: IntCounter,
}

impl DispatchMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            dispatch_latency_seconds: register_histogram_vec!(
                "covtype_dispatch_latency_seconds",
                "End-to-end time spent serving one dispatch",
                &["option"],
                DISPATCH_BUCKETS.to_vec()
            )?,
            predictions_total: register_int_counter_vec!(
                "covtype_predictions_total",
                "Predictions served per option",
                &["option"]
            )?,
            dispatch_errors_total: register_int_counter_vec!(
                "covtype_dispatch_errors_total",
                "Failed dispatches per error kind",
                &["kind"]
            )?,
            training_latency_seconds: register_histogram!(
                "covtype_training_latency_seconds",
                "Time spent fitting the statistical models",
                TRAINING_BUCKETS.to_vec()
            )?,
            artifact_loads_total: register_int_counter!(
                "covtype_artifact_loads_total",
                "Model artifacts read from disk"
            )?,
        })
    }
}

/// Dispatch metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance. Multiple clones share
/// the same underlying metrics. If registration failed the handle is inert.
#[derive(Clone)]
pub struct DispatchMetrics {
    _private: (),
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchMetrics {
    /// Create a new metrics handle (registers global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match DispatchMetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register dispatch metrics");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&DispatchMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_dispatch(&self, option: &str, duration_secs: f64) {
        if let Some(inner) = self.inner() {
            inner
                .dispatch_latency_seconds
                .with_label_values(&[option])
                .observe(duration_secs);
        }
    }

    pub fn inc_predictions(&self, option: &str) {
        if let Some(inner) = self.inner() {
            inner.predictions_total.with_label_values(&[option]).inc();
        }
    }

    pub fn inc_errors(&self, kind: &str) {
        if let Some(inner) = self.inner() {
            inner.dispatch_errors_total.with_label_values(&[kind]).inc();
        }
    }

    pub fn observe_training(&self, duration_secs: f64) {
        if let Some(inner) = self.inner() {
            inner.training_latency_seconds.observe(duration_secs);
        }
    }

    pub fn inc_artifact_loads(&self) {
        if let Some(inner) = self.inner() {
            inner.artifact_loads_total.inc();
        }
    }
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> String {
    use prometheus::Encoder;

    let mut buffer = Vec::new();
    let encoder = prometheus::TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Structured logger for dispatch events
///
/// Provides consistent JSON-formatted logging for served predictions,
/// failures, and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_prediction(&self, option: &str, label: u32, elapsed_ms: u128) {
        info!(
            event = "prediction_served",
            service = %self.service,
            option = %option,
            label = label,
            elapsed_ms = elapsed_ms,
            "Prediction served"
        );
    }

    /// Client errors are logged at info, server errors at warn
    pub fn log_dispatch_failure(&self, option: Option<&str>, kind: &str, client_error: bool, details: &str) {
        if client_error {
            info!(
                event = "dispatch_failed",
                service = %self.service,
                option = ?option,
                kind = %kind,
                details = %details,
                "Dispatch rejected"
            );
        } else {
            warn!(
                event = "dispatch_failed",
                service = %self.service,
                option = ?option,
                kind = %kind,
                details = %details,
                "Dispatch failed"
            );
        }
    }

    pub fn log_model_loaded(&self, path: &str, elapsed_ms: u128) {
        info!(
            event = "model_loaded",
            service = %self.service,
            path = %path,
            elapsed_ms = elapsed_ms,
            "Model artifact loaded"
        );
    }

    pub fn log_models_trained(&self, dataset_digest: Option<&str>, training_ms: u128, fresh: bool) {
        info!(
            event = "models_trained",
            service = %self.service,
            dataset_digest = ?dataset_digest,
            training_ms = training_ms,
            fresh = fresh,
            "Statistical models ready"
        );
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            port = port,
            "Cover type service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Cover type service shutting down"
        );
    }
}
