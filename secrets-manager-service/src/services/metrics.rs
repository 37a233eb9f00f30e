//! Prometheus metrics for secrets-manager-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by route and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sm_http_requests_total",
        "Total number of HTTP requests handled",
        &["route", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// Records written by imports (no organization label to keep cardinality low).
pub static IMPORT_RECORDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sm_import_records_total",
        "Total number of records created by imports",
        &["kind"] // project, secret
    )
    .expect("Failed to register import_records_total")
});

/// Export outcomes.
pub static EXPORTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sm_exports_total",
        "Total number of exports",
        &["status"] // ok, not_found, error
    )
    .expect("Failed to register exports_total")
});

/// Sweep invocations by target and outcome.
pub static SWEEP_RUNS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sm_sweep_runs_total",
        "Total number of retention sweep runs",
        &["target", "status"]
    )
    .expect("Failed to register sweep_runs_total")
});

/// Records permanently removed by sweeps.
pub static SWEEP_REMOVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sm_sweep_removed_total",
        "Total number of records removed by retention sweeps",
        &["target"]
    )
    .expect("Failed to register sweep_removed_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sm_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sm_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&IMPORT_RECORDS_TOTAL);
    Lazy::force(&EXPORTS_TOTAL);
    Lazy::force(&SWEEP_RUNS_TOTAL);
    Lazy::force(&SWEEP_REMOVED_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn record_http_request(route: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[route, &status.to_string()])
        .inc();
}

pub fn record_import(projects: usize, secrets: usize) {
    IMPORT_RECORDS_TOTAL
        .with_label_values(&["project"])
        .inc_by(projects as f64);
    IMPORT_RECORDS_TOTAL
        .with_label_values(&["secret"])
        .inc_by(secrets as f64);
}

pub fn record_export(status: &str) {
    EXPORTS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_sweep(target: &str, removed: Option<u64>) {
    match removed {
        Some(count) => {
            SWEEP_RUNS_TOTAL.with_label_values(&[target, "ok"]).inc();
            SWEEP_REMOVED_TOTAL
                .with_label_values(&[target])
                .inc_by(count as f64);
        }
        None => {
            SWEEP_RUNS_TOTAL.with_label_values(&[target, "error"]).inc();
        }
    }
}
