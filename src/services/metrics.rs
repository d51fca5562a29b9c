use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or rendering metrics
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

const LATENCY_BUCKETS: [f64; 10] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// HTTP request metrics backed by an owned registry
///
/// Each instance registers its collectors in its own `Registry`, so several
/// apps (or tests) can live in one process without name clashes.
pub struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    in_flight: IntGaugeVec,
}

impl HttpMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests processed"),
            &["method", "endpoint", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency in seconds")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "endpoint", "status"],
        )?;
        let in_flight = IntGaugeVec::new(
            Opts::new("http_requests_in_flight", "In-flight HTTP requests"),
            &["method", "endpoint"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            in_flight,
        })
    }

    /// Record that a request has started so concurrent requests can be counted.
    ///
    /// The in-flight slot is held by the returned guard and released either by
    /// [`HttpMetrics::track_request_result`] or when the guard is dropped, so a
    /// request future that never completes still gives its slot back.
    pub fn track_request_start(&self, method: &str, endpoint: &str) -> InFlightGuard {
        let gauge = self.in_flight.with_label_values(&[method, endpoint]);
        gauge.inc();
        InFlightGuard { gauge: Some(gauge) }
    }

    /// Record request completion (counter, latency histogram, in-flight gauge)
    pub fn track_request_result(
        &self,
        in_flight: InFlightGuard,
        method: &str,
        endpoint: &str,
        status: u16,
        duration: Duration,
    ) {
        let status_label = status.to_string();

        in_flight.finish();
        self.requests_total
            .with_label_values(&[method, endpoint, &status_label])
            .inc();
        self.request_duration
            .with_label_values(&[method, endpoint, &status_label])
            .observe(duration.as_secs_f64());
    }

    /// Encode every collected metric in the Prometheus text format
    pub fn render(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::with_capacity(8192);
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// One slot of the `http_requests_in_flight` gauge
#[must_use = "dropping the guard releases the in-flight slot immediately"]
pub struct InFlightGuard {
    gauge: Option<IntGauge>,
}

impl InFlightGuard {
    fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(gauge) = self.gauge.take() {
            gauge.dec();
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.release();
    }
}
