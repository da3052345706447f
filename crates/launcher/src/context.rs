// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process context: the shared bus connection, the config
//! resolver and the controller registry.
//!
//! One context per OS process, constructed once at program entry and
//! passed to every component. The singleton property is a program
//! structure contract, not a global static.

use crate::controller::Controller;
use crate::error::LauncherError;
use crate::registry::ServiceRegistry;
use crate::STOP_GRACE;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tcs_bus::{BusError, BusHandle};
use tcs_config::{BusConfig, ConfigResolver, JsonMap};
use tcs_core::{Clock, ServiceId, SystemClock};

/// Opens a connection to the concrete bus. The framework never links a
/// broker client itself; deployments inject one here.
pub type BusConnector =
    Arc<dyn Fn(BusConfig) -> BoxFuture<'static, Result<BusHandle, BusError>> + Send + Sync>;

/// Subject the context queries for dynamic, bus-sourced configuration.
pub const BUS_CONFIG_SUBJECT: &str = "svc.config.get";

/// Connector serving a fresh process-local in-memory bus. The
/// reference binaries use it; deployments inject a broker-backed
/// connector instead.
pub fn memory_bus_connector() -> BusConnector {
    Arc::new(|_config: BusConfig| {
        Box::pin(async { Ok(Arc::new(tcs_bus::InMemoryBus::new()) as BusHandle) })
    })
}

const BUS_CONFIG_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything needed to bootstrap a [`ProcessContext`].
pub struct BootstrapOptions<C: Clock> {
    pub config_path: PathBuf,
    pub args: JsonMap,
    pub registry: Arc<ServiceRegistry<C>>,
    /// `None` runs the process without a bus; monitors degrade to
    /// no-ops.
    pub connector: Option<BusConnector>,
    pub clock: C,
}

/// Per-process singleton.
pub struct ProcessContext<C: Clock = SystemClock> {
    resolver: Mutex<ConfigResolver>,
    bus: Option<BusHandle>,
    registry: Arc<ServiceRegistry<C>>,
    controllers: Mutex<HashMap<ServiceId, Arc<Controller<C>>>>,
    launcher_id: String,
    host: String,
    pid: u32,
    clock: C,
}

impl<C: Clock> std::fmt::Debug for ProcessContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessContext")
            .field("launcher_id", &self.launcher_id)
            .field("host", &self.host)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl<C: Clock + 'static> ProcessContext<C> {
    /// Two-phase bootstrap.
    ///
    /// Phase one resolves the bus endpoint from file, env and args.
    /// Phase two connects and stacks the bus-sourced config layer on
    /// top, so later lookups see dynamic values. A connect failure is
    /// not fatal: the process runs with monitors in degraded no-op
    /// mode and the bus reconnects on its own schedule.
    pub async fn bootstrap(opts: BootstrapOptions<C>) -> Result<Arc<Self>, LauncherError> {
        let mut resolver = ConfigResolver::load(&opts.config_path, opts.args)?;
        let bus_config = resolver.bus_config()?;

        let bus = match &opts.connector {
            Some(connector) => match connector(bus_config.clone()).await {
                Ok(bus) => Some(bus),
                Err(e) => {
                    tracing::warn!(
                        host = bus_config.host,
                        port = bus_config.port,
                        error = %e,
                        "bus connect failed, running degraded"
                    );
                    None
                }
            },
            None => None,
        };

        if let Some(bus) = &bus {
            if let Some(layer) = fetch_bus_layer(bus).await {
                resolver.attach_bus_layer(layer);
            }
        }

        Ok(Arc::new(Self {
            resolver: Mutex::new(resolver),
            bus,
            registry: opts.registry,
            controllers: Mutex::new(HashMap::new()),
            launcher_id: tcs_core::short_id("ln"),
            host: local_hostname(),
            pid: std::process::id(),
            clock: opts.clock,
        }))
    }

    /// Context for tests and embedded setups with everything prebuilt.
    pub fn assemble(
        resolver: ConfigResolver,
        bus: Option<BusHandle>,
        registry: Arc<ServiceRegistry<C>>,
        clock: C,
    ) -> Arc<Self> {
        Arc::new(Self {
            resolver: Mutex::new(resolver),
            bus,
            registry,
            controllers: Mutex::new(HashMap::new()),
            launcher_id: tcs_core::short_id("ln"),
            host: local_hostname(),
            pid: std::process::id(),
            clock,
        })
    }

    pub fn bus(&self) -> Option<BusHandle> {
        self.bus.clone()
    }

    pub fn registry(&self) -> &ServiceRegistry<C> {
        &self.registry
    }

    /// Point-in-time copy of the resolver; layers do not change after
    /// bootstrap, so copies stay consistent.
    pub fn resolver_snapshot(&self) -> ConfigResolver {
        self.resolver.lock().clone()
    }

    pub fn launcher_id(&self) -> &str {
        &self.launcher_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn register_controller(&self, controller: Arc<Controller<C>>) {
        self.controllers
            .lock()
            .insert(controller.service_id().clone(), controller);
    }

    pub fn remove_controller(&self, service_id: &ServiceId) -> Option<Arc<Controller<C>>> {
        self.controllers.lock().remove(service_id)
    }

    pub fn controller(&self, service_id: &ServiceId) -> Option<Arc<Controller<C>>> {
        self.controllers.lock().get(service_id).cloned()
    }

    pub fn controllers(&self) -> Vec<Arc<Controller<C>>> {
        self.controllers.lock().values().cloned().collect()
    }

    /// Graceful teardown: stop every owned controller, then flush the
    /// bus so final events reach the wire.
    pub async fn shutdown(&self) {
        let controllers = self.controllers();
        let stops = controllers
            .iter()
            .map(|controller| controller.stop(STOP_GRACE));
        for result in futures_util::future::join_all(stops).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "controller stop during shutdown failed");
            }
        }
        if let Some(bus) = &self.bus {
            if let Err(e) = bus.flush().await {
                tracing::warn!(error = %e, "bus flush on shutdown failed");
            }
        }
    }
}

/// Fetch the dynamic config layer. Absence of a config responder is
/// normal and silently skipped.
async fn fetch_bus_layer(bus: &BusHandle) -> Option<JsonMap> {
    match bus.request(BUS_CONFIG_SUBJECT, Vec::new(), BUS_CONFIG_TIMEOUT).await {
        Ok(payload) => match serde_json::from_slice::<JsonMap>(&payload) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::warn!(error = %e, "bus config layer decode failed, skipping");
                None
            }
        },
        Err(e) => {
            tracing::debug!(error = %e, "no bus-sourced config layer");
            None
        }
    }
}

fn local_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
