//! API application state and health tracking.

use std::sync::{Mutex, MutexGuard};

use tracing::warn;
use wharf_config::GatewayProfile;
use wharf_telemetry::Metrics;
use wharf_transfer::TransferService;

/// Shared, request-independent state handed to every handler.
///
/// The gateway is stateless across requests; everything here is either
/// immutable configuration or the health-degradation scratchpad.
pub(crate) struct ApiState {
    pub(crate) transfer: TransferService,
    pub(crate) telemetry: Metrics,
    pub(crate) profile: GatewayProfile,
    health_status: Mutex<Vec<String>>,
}

impl ApiState {
    pub(crate) fn new(
        profile: GatewayProfile,
        transfer: TransferService,
        telemetry: Metrics,
    ) -> Self {
        Self {
            transfer,
            telemetry,
            profile,
            health_status: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add_degraded_component(&self, component: &str) -> bool {
        let mut guard = Self::lock_guard(&self.health_status, "health_status");
        if guard.iter().any(|entry| entry == component) {
            return false;
        }
        guard.push(component.to_string());
        guard.sort();
        drop(guard);
        warn!(component, "component marked degraded");
        true
    }

    pub(crate) fn remove_degraded_component(&self, component: &str) -> bool {
        let mut guard = Self::lock_guard(&self.health_status, "health_status");
        let previous = guard.len();
        guard.retain(|entry| entry != component);
        guard.len() != previous
    }

    pub(crate) fn current_health_degraded(&self) -> Vec<String> {
        Self::lock_guard(&self.health_status, "health_status").clone()
    }

    fn lock_guard<'a, T>(mutex: &'a Mutex<T>, name: &'a str) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|err| {
            panic!("failed to lock {name}: {err}");
        })
    }
}
