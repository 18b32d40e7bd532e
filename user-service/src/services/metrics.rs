use once_cell::sync::OnceCell;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct Metrics {
    pub registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub user_provisioning_total: IntCounterVec,
    pub user_rollbacks_total: IntCounterVec,
}

static METRICS: OnceCell<Metrics> = OnceCell::new();

impl Metrics {
    fn build() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "path", "status"],
        )?;
        let user_provisioning_total = IntCounterVec::new(
            Opts::new(
                "user_provisioning_total",
                "User creation attempts by outcome",
            ),
            &["outcome"],
        )?;
        let user_rollbacks_total = IntCounterVec::new(
            Opts::new(
                "user_rollbacks_total",
                "Compensating identity deletes by result",
            ),
            &["result"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(user_provisioning_total.clone()))?;
        registry.register(Box::new(user_rollbacks_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            user_provisioning_total,
            user_rollbacks_total,
        })
    }
}

/// Registers every collector. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    METRICS.get_or_try_init(Metrics::build).map(|_| ())
}

/// Collectors, if [`init_metrics`] has run. Recording is skipped otherwise.
pub fn metrics() -> Option<&'static Metrics> {
    METRICS.get()
}

pub fn record_provisioning(outcome: &str) {
    if let Some(m) = metrics() {
        m.user_provisioning_total.with_label_values(&[outcome]).inc();
    }
}

pub fn record_rollback(result: &str) {
    if let Some(m) = metrics() {
        m.user_rollbacks_total.with_label_values(&[result]).inc();
    }
}

pub fn get_metrics() -> String {
    let Some(m) = metrics() else {
        tracing::error!("Metrics registry not initialized");
        return "# Metrics registry not initialized\n".to_string();
    };

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&m.registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}
