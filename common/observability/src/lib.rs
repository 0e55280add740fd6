use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric handles shared by the enrollment service. Cloning shares the
/// underlying collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    pub registry: Registry,
    pub submissions_total: IntCounterVec,
    pub gateway_requests_total: IntCounterVec,
    pub gateway_request_seconds: HistogramVec,
    pub payment_outcomes_total: IntCounterVec,
    pub ledger_write_failures_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let submissions_total = IntCounterVec::new(
            Opts::new("enrollment_submissions_total", "Form submissions grouped by kind and result"),
            &["kind", "result"],
        )?;
        let gateway_requests_total = IntCounterVec::new(
            Opts::new("payment_gateway_requests_total", "Outbound gateway calls grouped by operation and result"),
            &["operation", "result"],
        )?;
        let gateway_request_seconds = HistogramVec::new(
            HistogramOpts::new("payment_gateway_request_seconds", "Latency of outbound gateway calls")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["operation"],
        )?;
        let payment_outcomes_total = IntCounterVec::new(
            Opts::new("payment_outcomes_total", "Verified payment outcomes"),
            &["outcome"],
        )?;
        let ledger_write_failures_total = IntCounterVec::new(
            Opts::new("payment_ledger_write_failures_total", "Payment ledger writes that failed"),
            &["operation"],
        )?;
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(gateway_requests_total.clone()))?;
        registry.register(Box::new(gateway_request_seconds.clone()))?;
        registry.register(Box::new(payment_outcomes_total.clone()))?;
        registry.register(Box::new(ledger_write_failures_total.clone()))?;
        Ok(Self {
            registry,
            submissions_total,
            gateway_requests_total,
            gateway_request_seconds,
            payment_outcomes_total,
            ledger_write_failures_total,
        })
    }

    pub fn record_submission(&self, kind: &str, ok: bool) {
        let result = if ok { "stored" } else { "failed" };
        self.submissions_total.with_label_values(&[kind, result]).inc();
    }

    pub fn record_gateway_call(&self, operation: &str, ok: bool, elapsed: Duration) {
        let result = if ok { "ok" } else { "error" };
        self.gateway_requests_total.with_label_values(&[operation, result]).inc();
        self.gateway_request_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_payment_outcome(&self, outcome: &str) {
        self.payment_outcomes_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_ledger_failure(&self, operation: &str) {
        self.ledger_write_failures_total.with_label_values(&[operation]).inc();
    }

    /// Text exposition of this registry followed by the process-wide default
    /// registry (where shared middleware counters live).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut families = self.registry.gather();
        families.extend(prometheus::gather());
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
