//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters relevant to the transfer gateway.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across the gateway services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    bytes_received_total: IntCounter,
    bytes_sent_total: IntCounter,
    transfer_rejections_total: IntCounterVec,
    archive_entries_total: IntCounterVec,
    batch_upload_files_total: IntCounterVec,
}

/// Snapshot of selected counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total payload bytes accepted by write operations.
    pub bytes_received_total: u64,
    /// Total payload bytes streamed out by read and archive operations.
    pub bytes_sent_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )?;
        let bytes_received_total = IntCounter::with_opts(Opts::new(
            "transfer_bytes_received_total",
            "Payload bytes accepted by write operations",
        ))?;
        let bytes_sent_total = IntCounter::with_opts(Opts::new(
            "transfer_bytes_sent_total",
            "Payload bytes streamed out by read and archive operations",
        ))?;
        let transfer_rejections_total = IntCounterVec::new(
            Opts::new(
                "transfer_rejections_total",
                "Requests rejected before touching the filesystem, by reason",
            ),
            &["reason"],
        )?;
        let archive_entries_total = IntCounterVec::new(
            Opts::new(
                "archive_entries_total",
                "Entries encoded into archive downloads, by format",
            ),
            &["format"],
        )?;
        let batch_upload_files_total = IntCounterVec::new(
            Opts::new(
                "batch_upload_files_total",
                "Files processed by batch uploads, by outcome",
            ),
            &["status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(bytes_received_total.clone()))?;
        registry.register(Box::new(bytes_sent_total.clone()))?;
        registry.register(Box::new(transfer_rejections_total.clone()))?;
        registry.register(Box::new(archive_entries_total.clone()))?;
        registry.register(Box::new(batch_upload_files_total.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                http_requests_total,
                bytes_received_total,
                bytes_sent_total,
                transfer_rejections_total,
                archive_entries_total,
                batch_upload_files_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, code: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &code.to_string()])
            .inc();
    }

    /// Record payload bytes accepted by a write operation.
    pub fn add_bytes_received(&self, bytes: u64) {
        self.inner.bytes_received_total.inc_by(bytes);
    }

    /// Record payload bytes streamed out to a client.
    pub fn add_bytes_sent(&self, bytes: u64) {
        self.inner.bytes_sent_total.inc_by(bytes);
    }

    /// Record a request rejected before any filesystem mutation.
    pub fn inc_rejection(&self, reason: &str) {
        self.inner
            .transfer_rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record entries encoded into an archive download.
    pub fn add_archive_entries(&self, format: &str, entries: u64) {
        self.inner
            .archive_entries_total
            .with_label_values(&[format])
            .inc_by(entries);
    }

    /// Record the outcome of one file within a batch upload.
    pub fn inc_batch_file(&self, status: &str) {
        self.inner
            .batch_upload_files_total
            .with_label_values(&[status])
            .inc();
    }

    /// Capture the health-facing counter snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received_total: self.inner.bytes_received_total.get(),
            bytes_sent_total: self.inner.bytes_sent_total.get(),
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding the metric families fails or the output is
    /// not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&self.inner.registry.gather(), &mut buffer)
            .context("failed to encode prometheus metrics")?;
        String::from_utf8(buffer).context("prometheus output was not valid utf-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_counters_accumulate() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/v1/files", 200);
        metrics.add_bytes_received(64);
        metrics.add_bytes_sent(128);
        metrics.inc_rejection("size_limit");
        metrics.add_archive_entries("tar.gz", 3);
        metrics.inc_batch_file("ok");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bytes_received_total, 64);
        assert_eq!(snapshot.bytes_sent_total, 128);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("transfer_rejections_total"));
        Ok(())
    }

    #[test]
    fn snapshot_serialises_to_json() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.add_bytes_sent(42);
        let value = serde_json::to_value(metrics.snapshot())?;
        assert_eq!(value["bytes_sent_total"], 42);
        Ok(())
    }
}
