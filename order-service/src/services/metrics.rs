//! Prometheus metrics for order-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Histogram, HistogramVec, TextEncoder,
};

/// Backend request counter by operation and outcome.
pub static API_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_api_requests_total",
        "Total number of backend API requests",
        &["operation", "outcome"]
    )
    .expect("Failed to register api_requests_total")
});

/// Backend request duration histogram by operation, retries included.
pub static API_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "order_api_request_duration_seconds",
        "Backend API request duration in seconds",
        &["operation"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register api_request_duration")
});

/// Retried attempts by operation.
pub static API_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_api_retries_total",
        "Total number of retried backend API attempts",
        &["operation"]
    )
    .expect("Failed to register api_retries_total")
});

/// Order submissions by mode and outcome.
pub static SUBMISSIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_submissions_total",
        "Total number of order submissions",
        &["mode", "outcome"] // create/update; persisted, offline, error code
    )
    .expect("Failed to register submissions_total")
});

/// Drafts written to the offline store.
pub static OFFLINE_SAVES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "order_offline_saves_total",
        "Total number of drafts saved for later sync"
    )
    .expect("Failed to register offline_saves_total")
});

/// PDF render duration.
pub static PDF_RENDER_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "order_pdf_render_duration_seconds",
        "PDF render duration in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register pdf_render_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&API_REQUESTS_TOTAL);
    Lazy::force(&API_REQUEST_DURATION);
    Lazy::force(&API_RETRIES_TOTAL);
    Lazy::force(&SUBMISSIONS_TOTAL);
    Lazy::force(&OFFLINE_SAVES_TOTAL);
    Lazy::force(&PDF_RENDER_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
