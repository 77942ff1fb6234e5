//! Prometheus metrics for the DocAuth client.
//!
//! All metrics follow the naming convention: `docauth_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: exchanges by outcome, engine events by kind, listener failures
//! - **Gauge**: exchanges in flight, open sessions
//! - **Histogram**: exchange duration

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Crate-local metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EXCHANGE METRICS
    // =========================================================================

    /// Finished exchanges by outcome
    pub static ref EXCHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("docauth_exchanges_total", "Finished request/response exchanges"),
        &["outcome"]  // completed/engine_failed/timeout/cancelled/transport/disposed
    ).expect("metric creation failed");

    /// Time from submission to resolution
    pub static ref EXCHANGE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "docauth_exchange_duration_seconds",
            "Time from request submission to response, failure, timeout or cancellation"
        ).buckets(exponential_buckets(0.01, 2.0, 14).expect("metric creation failed"))
    ).expect("metric creation failed");

    /// Exchanges waiting on the engine
    pub static ref EXCHANGES_IN_FLIGHT: IntGauge = IntGauge::new(
        "docauth_exchanges_in_flight",
        "Requests submitted to the engine and not yet resolved"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT METRICS
    // =========================================================================

    /// Notifications received from the engine
    pub static ref ENGINE_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("docauth_engine_events_total", "Stage and error notifications from the engine"),
        &["kind"]  // stage/error
    ).expect("metric creation failed");

    /// Listener callbacks that panicked
    pub static ref LISTENER_FAILURES: IntCounter = IntCounter::new(
        "docauth_listener_failures_total",
        "Event listener callbacks that panicked and were isolated"
    ).expect("metric creation failed");

    // =========================================================================
    // SESSION METRICS
    // =========================================================================

    /// Sessions holding an open engine channel
    pub static ref SESSIONS_OPEN: IntGauge = IntGauge::new(
        "docauth_sessions_open",
        "Sessions currently holding an engine channel"
    ).expect("metric creation failed");
}

/// Exchange outcome label values.
pub mod outcome {
    pub const COMPLETED: &str = "completed";
    pub const ENGINE_FAILED: &str = "engine_failed";
    pub const TIMEOUT: &str = "timeout";
    pub const CANCELLED: &str = "cancelled";
    pub const TRANSPORT: &str = "transport";
    pub const DISPOSED: &str = "disposed";
}

/// Handle onto the registered metrics.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    /// Render every registered metric in the Prometheus text format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Register all metrics with the crate registry.
///
/// Safe to call more than once; collectors already registered are skipped.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Exchanges
        Box::new(EXCHANGES_TOTAL.clone()),
        Box::new(EXCHANGE_DURATION.clone()),
        Box::new(EXCHANGES_IN_FLIGHT.clone()),
        // Events
        Box::new(ENGINE_EVENTS_TOTAL.clone()),
        Box::new(LISTENER_FAILURES.clone()),
        // Sessions
        Box::new(SESSIONS_OPEN.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}
