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

//! Identity and configuration provider for the Wharf gateway.
//!
//! The gateway treats configuration as an external, read-only collaborator:
//! everything here is loaded once at bootstrap and handed to the services as
//! immutable values. Layout: `error.rs` (structured failures), `profile.rs`
//! (environment-backed gateway profile).

/// Structured configuration errors.
pub mod error;
/// Environment-backed gateway profile.
pub mod profile;

pub use error::{ConfigError, ConfigResult};
pub use profile::{
    DEFAULT_BIND_ADDR, DEFAULT_HTTP_PORT, DEFAULT_MAX_FILE_SIZE, DEFAULT_WORKSPACE_ROOT,
    GatewayProfile,
};
