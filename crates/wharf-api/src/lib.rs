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

//! HTTP delivery surface for the Wharf transfer gateway.
//!
//! Layout: `models.rs` (wire DTOs), `http/` (router, handlers, error
//! mapping), `app/` (shared request state).

/// Shared HTTP DTOs for the Wharf public API.
pub mod models;

pub(crate) mod app;

/// HTTP surface modules (router, handlers, middleware).
pub mod http;

pub use http::router::{ApiServer, ApiServerError};
