// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance lifecycle controller.
//!
//! One controller per service instance, living in the same process as
//! the service. It owns the service object, its monitor and the bus
//! binding, and maps every hook failure into the framework taxonomy:
//! initialization and startup failures are terminal (`FAILED`), a
//! runtime error marks `ERROR` and is re-raised to the supervisor, a
//! shutdown error still publishes `stop` with a `failed`
//! classification.

use crate::error::{ControllerError, ServiceError};
use crate::registry::ServiceRegistry;
use crate::service::{BoxedService, ServiceContext, ServiceExit};
use crate::STOP_GRACE;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tcs_bus::BusHandle;
use tcs_config::{ConfigResolver, JsonMap};
use tcs_core::{Clock, ServiceDescriptor, ServiceId, Status, SystemClock};
use tcs_monitor::{
    spawn_healthcheck_loop, BusMonitor, Monitor, MonitorContext, HEALTHCHECK_PERIOD,
};
use tcs_wire::ExitClass;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Controller lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Uninitialized => "uninitialized",
            ControllerState::Initialized => "initialized",
            ControllerState::Starting => "starting",
            ControllerState::Running => "running",
            ControllerState::Stopping => "stopping",
            ControllerState::Stopped => "stopped",
            ControllerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Identity context handed down by the launcher or the standalone
/// entry.
#[derive(Debug, Clone, Default)]
pub struct ControllerIds {
    pub launcher_id: Option<String>,
    pub runner_id: Option<String>,
    pub parent_name: Option<String>,
    pub host: String,
    pub pid: u32,
}

/// Lifecycle controller for one service instance.
pub struct Controller<C: Clock = SystemClock> {
    descriptor: ServiceDescriptor,
    service_id: ServiceId,
    bus_monitor: Arc<BusMonitor<C>>,
    state: Mutex<ControllerState>,
    service: tokio::sync::Mutex<Option<BoxedService<C>>>,
    ctx: ServiceContext<C>,
    exit_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ServiceExit>>,
    loops: Mutex<Vec<JoinHandle<()>>>,
    loop_cancel: CancellationToken,
    init_error: Mutex<Option<String>>,
    healthcheck_period: Duration,
}

/// Optional period override from a service entry, in seconds.
fn period_option(descriptor: &ServiceDescriptor, key: &str, default: Duration) -> Duration {
    descriptor
        .options
        .get(key)
        .and_then(serde_json::Value::as_f64)
        .filter(|seconds| *seconds > 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(default)
}

impl<C: Clock + 'static> Controller<C> {
    /// Discover, configure and wire one instance.
    ///
    /// Fails only for an unusable identity. Discovery and configuration
    /// failures return a controller in `FAILED` state that stays
    /// addressable on the bus and has published its failure.
    pub async fn initialize(
        descriptor: ServiceDescriptor,
        registry: &ServiceRegistry<C>,
        resolver: &ConfigResolver,
        bus: Option<BusHandle>,
        ids: ControllerIds,
        clock: C,
    ) -> Result<Arc<Controller<C>>, ControllerError> {
        let service_id = descriptor.service_id()?;
        let module_path = resolver.module_path_for(service_id.service_type());

        let mut monitor = Monitor::new(service_id.to_string(), clock.clone());
        if let Some(parent) = &ids.parent_name {
            monitor = monitor.with_parent_name(parent);
        }

        let mut monitor_ctx = MonitorContext::new(service_id.clone(), ids.host.clone(), ids.pid);
        monitor_ctx.launcher_id = ids.launcher_id.clone();
        monitor_ctx.runner_id = ids.runner_id.clone();

        let prepared: Result<(BoxedService<C>, JsonMap), ControllerError> = registry
            .create(service_id.service_type())
            .ok_or_else(|| ControllerError::Discovery {
                service_type: service_id.service_type().to_string(),
                module_path: module_path.clone(),
            })
            .and_then(|service| {
                let schema = registry.schema(service_id.service_type()).unwrap_or_default();
                let config = resolver.resolve_instance(
                    service_id.service_type(),
                    service_id.variant(),
                    &schema,
                )?;
                Ok((service, config))
            });

        let (service, config, init_error) = match prepared {
            Ok((service, config)) => (Some(service), config, None),
            Err(e) => (None, JsonMap::new(), Some(e.to_string())),
        };

        let heartbeat_period =
            period_option(&descriptor, "heartbeat_sec", tcs_monitor::HEARTBEAT_PERIOD);
        let healthcheck_period = period_option(&descriptor, "healthcheck_sec", HEALTHCHECK_PERIOD);

        let (ctx, exit_rx) = ServiceContext::new(service_id.clone(), config, monitor.clone());
        let bus_monitor = Arc::new(
            BusMonitor::new(monitor, bus, monitor_ctx, clock)
                .with_heartbeat_period(heartbeat_period),
        );

        let controller = Arc::new(Controller {
            descriptor,
            service_id,
            bus_monitor,
            state: Mutex::new(ControllerState::Uninitialized),
            service: tokio::sync::Mutex::new(service),
            ctx,
            exit_rx: tokio::sync::Mutex::new(exit_rx),
            loops: Mutex::new(Vec::new()),
            loop_cancel: CancellationToken::new(),
            init_error: Mutex::new(init_error.clone()),
            healthcheck_period,
        });
        controller.spawn_ambient_loops().await;

        match init_error {
            None => {
                *controller.state.lock() = ControllerState::Initialized;
                controller.bus_monitor.publish_start().await;
                controller.ctx.monitor.set_status(Status::Startup, "initializing");
                controller.bus_monitor.publish_status().await;
            }
            Some(reason) => {
                tracing::error!(
                    service_id = %controller.service_id,
                    module_path,
                    reason,
                    "service initialization failed"
                );
                *controller.state.lock() = ControllerState::Failed;
                controller.ctx.monitor.set_status(Status::Failed, reason.clone());
                controller.bus_monitor.publish_status().await;
                controller.bus_monitor.publish_failed(reason).await;
            }
        }
        Ok(controller)
    }

    async fn spawn_ambient_loops(self: &Arc<Self>) {
        let mut loops = Vec::new();
        loops.push(self.bus_monitor.spawn_status_publisher(self.loop_cancel.child_token()));
        loops.push(self.bus_monitor.spawn_rpc_server(self.loop_cancel.child_token()).await);
        loops.push(spawn_healthcheck_loop(
            self.ctx.monitor.clone(),
            self.healthcheck_period,
            self.loop_cancel.child_token(),
        ));
        self.loops.lock().extend(loops);
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn monitor(&self) -> &Monitor<C> {
        &self.ctx.monitor
    }

    pub fn bus_monitor(&self) -> &Arc<BusMonitor<C>> {
        &self.bus_monitor
    }

    pub fn init_error(&self) -> Option<String> {
        self.init_error.lock().clone()
    }

    /// Invoke the service's start hook and go `RUNNING`.
    pub async fn start(self: &Arc<Self>) -> Result<(), ControllerError> {
        {
            let mut state = self.state.lock();
            match *state {
                ControllerState::Initialized => *state = ControllerState::Starting,
                other => return Err(ControllerError::InvalidState(other, "start")),
            }
        }

        let start_result = {
            let mut guard = self.service.lock().await;
            match guard.as_mut() {
                Some(service) => service.start(&self.ctx).await,
                None => Err(ServiceError::new("no service instance")),
            }
        };

        match start_result {
            Ok(()) => {
                *self.state.lock() = ControllerState::Running;
                self.ctx.monitor.set_status(Status::Ok, "running");
                self.bus_monitor.publish_status().await;
                self.bus_monitor.publish_ready().await;
                let heartbeat =
                    self.bus_monitor.spawn_heartbeat_loop(self.loop_cancel.child_token());
                self.loops.lock().push(heartbeat);
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = ControllerState::Failed;
                self.ctx.monitor.set_status(Status::Failed, e.to_string());
                self.bus_monitor.publish_status().await;
                self.bus_monitor.publish_failed(e.to_string()).await;
                Err(ControllerError::Startup(e))
            }
        }
    }

    /// Wait for the service to finish of its own accord and close out
    /// the lifecycle. Returns the runtime error for the supervisor to
    /// apply its restart policy.
    pub async fn wait(&self) -> Result<(), ControllerError> {
        let exit = self.exit_rx.lock().await.recv().await;
        match exit {
            Some(exit) => self.handle_service_exit(exit).await,
            // Channel closed without an exit report: context dropped.
            None => Ok(()),
        }
    }

    async fn handle_service_exit(&self, exit: ServiceExit) -> Result<(), ControllerError> {
        {
            let mut state = self.state.lock();
            if *state != ControllerState::Running {
                return Ok(());
            }
            *state = ControllerState::Stopping;
        }

        match exit.result {
            Ok(()) => {
                self.bus_monitor.publish_stopping().await;
                self.ctx.monitor.set_status(Status::Shutdown, "finished");
                self.bus_monitor.publish_status().await;
                self.join_service().await;
                self.bus_monitor.publish_stop(ExitClass::Clean).await;
                *self.state.lock() = ControllerState::Stopped;
                self.stop_loops();
                Ok(())
            }
            Err(e) => {
                self.ctx.monitor.set_status(Status::Error, e.to_string());
                self.bus_monitor.publish_status().await;
                self.bus_monitor.publish_stopping().await;
                self.join_service().await;
                self.bus_monitor.publish_stop(ExitClass::Failed).await;
                *self.state.lock() = ControllerState::Failed;
                self.stop_loops();
                Err(ControllerError::Runtime(e))
            }
        }
    }

    /// External stop: `stopping` bracket, stop hook under the grace
    /// window, `stop` with exit classification.
    pub async fn stop(&self, grace: Duration) -> Result<(), ControllerError> {
        {
            let mut state = self.state.lock();
            match *state {
                ControllerState::Initialized
                | ControllerState::Starting
                | ControllerState::Running => *state = ControllerState::Stopping,
                _ => return Ok(()),
            }
        }

        self.bus_monitor.publish_stopping().await;
        self.ctx.monitor.set_status(Status::Shutdown, "stopping");
        self.bus_monitor.publish_status().await;
        self.ctx.cancel.cancel();

        let stop_result = {
            let mut guard = self.service.lock().await;
            match guard.take() {
                Some(mut service) => {
                    match tokio::time::timeout(grace, service.stop()).await {
                        Ok(result) => result,
                        Err(_) => Err(ServiceError::new(format!(
                            "stop hook exceeded grace of {}s, abandoning",
                            grace.as_secs()
                        ))),
                    }
                }
                None => Ok(()),
            }
        };

        match stop_result {
            Ok(()) => {
                self.bus_monitor.publish_stop(ExitClass::Clean).await;
                *self.state.lock() = ControllerState::Stopped;
                self.stop_loops();
                Ok(())
            }
            Err(e) => {
                self.ctx.monitor.set_status(Status::Error, e.to_string());
                self.bus_monitor.publish_status().await;
                self.bus_monitor.publish_stop(ExitClass::Failed).await;
                *self.state.lock() = ControllerState::Failed;
                self.stop_loops();
                Err(ControllerError::Shutdown(e))
            }
        }
    }

    /// Convenience for external stop with the default grace window.
    pub async fn stop_with_default_grace(&self) -> Result<(), ControllerError> {
        self.stop(STOP_GRACE).await
    }

    async fn join_service(&self) {
        if let Some(mut service) = self.service.lock().await.take() {
            // Result already surfaced via the exit report.
            let _ = service.stop().await;
        }
    }

    fn stop_loops(&self) {
        self.loop_cancel.cancel();
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
