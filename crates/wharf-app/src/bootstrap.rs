//! Application bootstrap and environment loading.

use std::net::SocketAddr;

use tracing::info;

use crate::error::{AppError, AppResult};
use wharf_api::ApiServer;
use wharf_config::GatewayProfile;
use wharf_telemetry::{LogFormat, LoggingConfig, Metrics};
use wharf_transfer::{TransferLimits, TransferService, WorkspaceRoot};

/// Dependencies required to bootstrap the gateway.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    profile: GatewayProfile,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary
    /// entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let profile = GatewayProfile::from_env()
            .map_err(|err| AppError::config("profile.from_env", err))?;
        Self::from_profile(profile)
    }

    pub(crate) fn from_profile(profile: GatewayProfile) -> AppResult<Self> {
        let mut logging = LoggingConfig::default();
        if let Some(name) = profile.log_format.as_deref() {
            logging.format = LogFormat::from_name(name);
        }
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            logging,
            profile,
            telemetry,
        })
    }
}

/// Entry point for the gateway boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify
/// testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    wharf_telemetry::init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!("Wharf gateway bootstrap starting");

    let BootstrapDependencies {
        logging: _,
        profile,
        telemetry,
    } = dependencies;

    let root = WorkspaceRoot::open(&profile.workspace_root)
        .map_err(|err| AppError::transfer("workspace_root.open", err))?;
    let limits = TransferLimits::new(profile.max_file_size);
    let transfer = TransferService::new(root, limits, telemetry.clone());

    let addr = SocketAddr::new(profile.bind_addr, profile.http_port);
    info!(
        addr = %addr,
        root = %profile.workspace_root.display(),
        max_file_size = profile.max_file_size,
        "gateway configured"
    );

    let server = ApiServer::new(profile, transfer, telemetry);
    server
        .serve(addr)
        .await
        .map_err(|err| AppError::api_server("api.serve", err))
}
