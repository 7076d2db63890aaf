use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

use super::billing::ProviderOperation;
use crate::models::Cents;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INVOICE_METRICS: OnceLock<InvoiceMetrics> = OnceLock::new();

struct InvoiceMetrics {
    registry: Registry,
    invoices_created: IntCounter,
    invoice_failures: IntCounterVec,
    amount_cents: IntCounter,
}

impl InvoiceMetrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let invoices_created = IntCounter::new(
            "invoices_created_total",
            "Invoices created, finalized and sent",
        )?;

        // Failures labelled by the billing call that failed
        let invoice_failures = IntCounterVec::new(
            Opts::new(
                "invoice_failures_total",
                "Invoice runs aborted by a billing provider error",
            ),
            &["operation"],
        )?;

        let amount_cents = IntCounter::new(
            "invoice_amount_cents_total",
            "Total amount invoiced, in cents",
        )?;

        registry.register(Box::new(invoices_created.clone()))?;
        registry.register(Box::new(invoice_failures.clone()))?;
        registry.register(Box::new(amount_cents.clone()))?;

        Ok(Self {
            registry,
            invoices_created,
            invoice_failures,
            amount_cents,
        })
    }
}

/// Install the Prometheus recorder and the invoice counters.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_none() {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = METRICS_HANDLE.set(handle);
            }
            Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
        }
    }

    if INVOICE_METRICS.get().is_none() {
        match InvoiceMetrics::new() {
            Ok(metrics) => {
                let _ = INVOICE_METRICS.set(metrics);
            }
            Err(e) => tracing::error!(error = %e, "Failed to register invoice metrics"),
        }
    }
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(metrics) = INVOICE_METRICS.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metrics.registry.gather(), &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_invoice_sent(amount: Cents) {
    if let Some(metrics) = INVOICE_METRICS.get() {
        metrics.invoices_created.inc();
        metrics.amount_cents.inc_by(amount.get());
    }
}

pub fn record_failure(operation: ProviderOperation) {
    if let Some(metrics) = INVOICE_METRICS.get() {
        metrics
            .invoice_failures
            .with_label_values(&[operation.as_str()])
            .inc();
    }
}
