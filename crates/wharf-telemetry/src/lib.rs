#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Telemetry primitives shared across the Wharf workspace.
//!
//! This crate centralises logging, metrics, and request-id plumbing so the
//! gateway surfaces adopt a consistent observability story.
//! Layout: `init.rs` (tracing subscriber), `metrics.rs` (Prometheus registry),
//! `layers.rs` (tower request-id layers).

/// Tracing subscriber installation and logging configuration.
pub mod init;
/// Tower layers for `x-request-id` generation and propagation.
pub mod layers;
/// Prometheus registry and gateway collectors.
pub mod metrics;

pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{propagate_request_id_layer, set_request_id_layer};
pub use metrics::{Metrics, MetricsSnapshot};
