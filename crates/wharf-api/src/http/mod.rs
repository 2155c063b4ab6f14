//! HTTP surface modules (router, handlers, middleware).

/// Shared constants and header names for HTTP surfaces.
pub mod constants;
/// Archive download handlers.
pub mod download;
/// Problem response helpers and error types.
pub mod errors;
/// Single-file and mutation handlers.
pub mod files;
/// Health and diagnostics endpoints.
pub mod health;
/// Download format negotiation.
pub mod negotiate;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
/// Write adapters and batch upload decoding.
pub mod upload;
