use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the ledger. Recording is a no-op until a recorder
/// is installed.
#[derive(Debug, Clone)]
pub struct Metrics {
    initialized: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self { initialized: true }
    }

    pub fn record_deposit(&self, amount: Decimal) {
        counter!("ledger_deposits_total").increment(1);
        histogram!("ledger_deposit_amount").record(amount.to_f64().unwrap_or_default());
    }

    pub fn record_job_payment(&self, amount: Decimal) {
        counter!("ledger_job_payments_total").increment(1);
        histogram!("ledger_settled_amount").record(amount.to_f64().unwrap_or_default());
    }

    pub fn record_settlement_failed(&self, operation: &str, kind: &str) {
        counter!("ledger_settlement_failures_total", "operation" => operation.to_string(), "kind" => kind.to_string()).increment(1);
    }

    pub fn record_settlement_latency(&self, operation: &str, duration_ms: f64) {
        histogram!("ledger_settlement_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }

    pub fn record_report_latency(&self, report: &str, duration_ms: f64, rows: usize) {
        histogram!("ledger_report_duration_ms", "report" => report.to_string()).record(duration_ms);
        histogram!("ledger_report_rows", "report" => report.to_string()).record(rows as f64);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder and returns its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    METRICS.get_or_init(Metrics::new);

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

/// Installs the Prometheus recorder behind its own scrape listener.
/// Must be called from within a tokio runtime.
pub fn serve_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    METRICS.get_or_init(Metrics::new);
    Ok(())
}

fn describe_metrics() {
    describe_counter!("ledger_deposits_total", Unit::Count, "Total number of accepted deposits");
    describe_histogram!("ledger_deposit_amount", Unit::Count, "Deposited amounts");
    describe_counter!("ledger_job_payments_total", Unit::Count, "Total number of paid jobs");
    describe_histogram!("ledger_settled_amount", Unit::Count, "Amounts moved by job payments");
    describe_counter!("ledger_settlement_failures_total", Unit::Count, "Rejected or failed settlement operations");
    describe_histogram!("ledger_settlement_duration_ms", Unit::Milliseconds, "Settlement latency in milliseconds");

    describe_histogram!("ledger_report_duration_ms", Unit::Milliseconds, "Report latency in milliseconds");
    describe_histogram!("ledger_report_rows", Unit::Count, "Rows returned per report");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
