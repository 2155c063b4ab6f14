//! Environment-backed gateway profile.
//!
//! # Design
//! - Load once at bootstrap; every field is immutable afterwards.
//! - Canonicalize the workspace root so path validation downstream can rely on
//!   a stable, absolute base.
//! - Accept an injected variable lookup so tests never mutate process state.

use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};

/// Default workspace subtree served by the gateway.
pub const DEFAULT_WORKSPACE_ROOT: &str = "/workspace";
/// Default upper bound for a single file transfer, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
/// Default HTTP listen port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;
/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

const ENV_INSTANCE_NAME: &str = "WHARF_INSTANCE_NAME";
const ENV_BIND_ADDR: &str = "WHARF_BIND_ADDR";
const ENV_HTTP_PORT: &str = "WHARF_HTTP_PORT";
const ENV_WORKSPACE_ROOT: &str = "WHARF_WORKSPACE_ROOT";
const ENV_MAX_FILE_SIZE: &str = "WHARF_MAX_FILE_SIZE";
const ENV_LOG_FORMAT: &str = "WHARF_LOG_FORMAT";

/// Immutable identity and limits for one gateway instance.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayProfile {
    /// Human-readable instance name surfaced via health reporting.
    pub instance_name: String,
    /// Address the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the HTTP listener binds to.
    pub http_port: u16,
    /// Canonical workspace root; every client path resolves under it.
    pub workspace_root: PathBuf,
    /// Maximum accepted size for a single file, in bytes.
    pub max_file_size: u64,
    /// Requested log output format (`json` or `pretty`), when configured.
    pub log_format: Option<String>,
}

impl GatewayProfile {
    /// Load the profile from `WHARF_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable fails to parse, the size limit is zero,
    /// or the workspace root cannot be created and canonicalized.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the profile from an injected variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let instance_name =
            lookup(ENV_INSTANCE_NAME).unwrap_or_else(|| "wharf-gateway".to_string());

        let bind_addr = lookup(ENV_BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::invalid_value(
                    "bind_addr",
                    "not a valid ip address",
                    lookup(ENV_BIND_ADDR),
                )
            })?;

        let http_port = match lookup(ENV_HTTP_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                ConfigError::invalid_value("http_port", "not a valid port", Some(raw))
            })?,
            None => DEFAULT_HTTP_PORT,
        };

        let max_file_size = match lookup(ENV_MAX_FILE_SIZE) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::invalid_value("max_file_size", "not a valid byte count", Some(raw))
            })?,
            None => DEFAULT_MAX_FILE_SIZE,
        };
        if max_file_size == 0 {
            return Err(ConfigError::invalid_value(
                "max_file_size",
                "must be non-zero",
                Some("0".to_string()),
            ));
        }

        let requested_root = PathBuf::from(
            lookup(ENV_WORKSPACE_ROOT).unwrap_or_else(|| DEFAULT_WORKSPACE_ROOT.to_string()),
        );
        let workspace_root = prepare_workspace_root(requested_root)?;

        Ok(Self {
            instance_name,
            bind_addr,
            http_port,
            workspace_root,
            max_file_size,
            log_format: lookup(ENV_LOG_FORMAT),
        })
    }
}

fn prepare_workspace_root(requested: PathBuf) -> ConfigResult<PathBuf> {
    fs::create_dir_all(&requested)
        .map_err(|err| ConfigError::io("workspace_root.create", &requested, err))?;
    let canonical = requested
        .canonicalize()
        .map_err(|err| ConfigError::io("workspace_root.canonicalize", &requested, err))?;
    tracing::debug!(root = %canonical.display(), "workspace root prepared");
    Ok(canonical)
}
