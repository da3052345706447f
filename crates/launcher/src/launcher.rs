// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outer supervisor.
//!
//! Declares every configured instance on the registry stream before
//! anything starts, runs one runner per enabled instance, aggregates
//! runner health under its own monitor and serves `list`,
//! `start.<id>` and `stop.<id>` over RPC.

use crate::context::ProcessContext;
use crate::error::LauncherError;
use crate::runner::{LaunchMode, Runner, RunnerState};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tcs_core::{Clock, ServiceDescriptor, ServiceId, Status, SystemClock};
use tcs_monitor::{BusMonitor, Monitor, MonitorContext};
use tcs_wire::{ExitClass, RegistryEvent, RegistryEventKind, RpcRequest, RpcResponse};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Where runners execute.
#[derive(Debug, Clone)]
pub enum LaunchKind {
    /// Controllers share this process's scheduler.
    InProcess,
    /// One child process per service, hosting the standalone entry.
    Subprocess { program: PathBuf },
}

type RunnerMap<C> = Arc<Mutex<BTreeMap<ServiceId, Arc<Runner<C>>>>>;

/// Supervisor of all configured service instances.
pub struct Launcher<C: Clock + 'static = SystemClock> {
    context: Arc<ProcessContext<C>>,
    bus_monitor: Arc<BusMonitor<C>>,
    runners: RunnerMap<C>,
    runner_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    ambient_tasks: Mutex<Vec<JoinHandle<()>>>,
    kind: LaunchKind,
    config_path: PathBuf,
    loop_cancel: CancellationToken,
}

impl<C: Clock + 'static> Launcher<C> {
    pub fn new(
        context: Arc<ProcessContext<C>>,
        kind: LaunchKind,
        config_path: PathBuf,
    ) -> Result<Self, LauncherError> {
        let variant = sanitize_variant(context.host());
        let service_id = ServiceId::new("launcher", variant)?;

        let monitor = Monitor::new(service_id.to_string(), context.clock().clone());
        let monitor_ctx =
            MonitorContext::new(service_id, context.host().to_string(), context.pid())
                .with_launcher_id(context.launcher_id().to_string());
        let bus_monitor = Arc::new(BusMonitor::new(
            monitor,
            context.bus(),
            monitor_ctx,
            context.clock().clone(),
        ));

        Ok(Self {
            context,
            bus_monitor,
            runners: Arc::new(Mutex::new(BTreeMap::new())),
            runner_tasks: Arc::new(Mutex::new(Vec::new())),
            ambient_tasks: Mutex::new(Vec::new()),
            kind,
            config_path,
            loop_cancel: CancellationToken::new(),
        })
    }

    pub fn context(&self) -> &Arc<ProcessContext<C>> {
        &self.context
    }

    /// The launcher's own monitor; children are the runners.
    pub fn monitor(&self) -> &Monitor<C> {
        self.bus_monitor.monitor()
    }

    pub fn runner(&self, service_id: &ServiceId) -> Option<Arc<Runner<C>>> {
        self.runners.lock().get(service_id).cloned()
    }

    pub fn runner_states(&self) -> BTreeMap<ServiceId, RunnerState> {
        self.runners
            .lock()
            .iter()
            .map(|(id, runner)| (id.clone(), runner.state()))
            .collect()
    }

    /// Bring the fleet up.
    ///
    /// Every configured instance is declared first, disabled ones
    /// included, so discovery sees the full roster before any
    /// lifecycle traffic. Runners then start in parallel.
    pub async fn start(&self) -> Result<(), LauncherError> {
        let descriptors: Vec<ServiceDescriptor> =
            self.context.resolver_snapshot().descriptors().to_vec();

        self.spawn_ambient_loops().await;
        self.bus_monitor.publish_start().await;
        self.monitor().set_status(Status::Startup, "declaring services");
        self.bus_monitor.publish_status().await;

        for descriptor in &descriptors {
            self.publish_declared(descriptor).await?;
        }

        for descriptor in &descriptors {
            let runner = self.build_runner(descriptor)?;
            if descriptor.enabled {
                self.launch(&runner);
            } else {
                runner.mark_disabled();
            }
        }

        self.monitor().set_status(Status::Ok, "running");
        self.bus_monitor.publish_status().await;
        self.bus_monitor.publish_ready().await;
        Ok(())
    }

    async fn publish_declared(&self, descriptor: &ServiceDescriptor) -> Result<(), LauncherError> {
        let service_id = descriptor.service_id()?;
        let mut event = RegistryEvent::new(
            RegistryEventKind::Declared,
            service_id,
            self.context.clock().wall(),
            self.context.host().to_string(),
            self.context.pid(),
        );
        event.launcher_id = Some(self.context.launcher_id().to_string());
        self.bus_monitor.publish_registry(event).await;
        Ok(())
    }

    fn build_runner(&self, descriptor: &ServiceDescriptor) -> Result<Arc<Runner<C>>, LauncherError> {
        let mode = match &self.kind {
            LaunchKind::InProcess => LaunchMode::InProcess { context: self.context.clone() },
            LaunchKind::Subprocess { program } => LaunchMode::Subprocess {
                program: program.clone(),
                config_path: self.config_path.clone(),
                parent_name: Some(self.monitor().name().to_string()),
            },
        };
        let runner = Runner::new(
            descriptor.clone(),
            mode,
            self.context.bus(),
            Some(self.context.launcher_id().to_string()),
            self.context.host().to_string(),
            self.context.pid(),
            self.context.clock().clone(),
        )?;

        let name = runner.monitor().name().to_string();
        let parent = self.monitor();
        parent.remove_child(&name);
        if let Err(e) = parent.add_child(runner.monitor().clone()) {
            tracing::warn!(service_id = name, error = %e, "runner monitor not attached");
        }

        self.runners.lock().insert(runner.service_id().clone(), runner.clone());
        Ok(runner)
    }

    fn launch(&self, runner: &Arc<Runner<C>>) {
        let task = tokio::spawn(runner.clone().run());
        self.runner_tasks.lock().push(task);
    }

    async fn spawn_ambient_loops(&self) {
        let mut tasks = vec![
            self.bus_monitor.spawn_status_publisher(self.loop_cancel.child_token()),
            self.bus_monitor.spawn_heartbeat_loop(self.loop_cancel.child_token()),
        ];

        self.register_commands();
        tasks.push(self.bus_monitor.spawn_rpc_server(self.loop_cancel.child_token()).await);
        self.ambient_tasks.lock().extend(tasks);
    }

    /// `list`, `start.<id>`, `stop.<id>` on the launcher's RPC
    /// surface. Handlers are synchronous; start/stop acknowledge and
    /// let the runner react on its own task.
    fn register_commands(&self) {
        let runners = Arc::clone(&self.runners);
        self.bus_monitor.register_rpc(
            "list",
            Arc::new(move |_req: &RpcRequest| {
                let listing: Vec<serde_json::Value> = runners
                    .lock()
                    .iter()
                    .map(|(id, runner)| {
                        serde_json::json!({
                            "service_id": id.to_string(),
                            "state": runner.state().to_string(),
                            "restart": runner.descriptor().restart.to_string(),
                            "enabled": runner.descriptor().enabled,
                        })
                    })
                    .collect();
                RpcResponse::ok(&listing)
            }),
        );

        let runners = Arc::clone(&self.runners);
        self.bus_monitor.register_rpc(
            "stop",
            Arc::new(move |req: &RpcRequest| match target_runner(&runners, &req.command, "stop.") {
                Ok(runner) => {
                    runner.request_stop();
                    RpcResponse::ok(&serde_json::json!({"stopping": runner.service_id().to_string()}))
                }
                Err(resp) => resp,
            }),
        );

        let runners = Arc::clone(&self.runners);
        self.bus_monitor.register_rpc(
            "start",
            Arc::new(move |req: &RpcRequest| match target_runner(&runners, &req.command, "start.") {
                Ok(runner) => {
                    if !runner.is_finished() {
                        return RpcResponse::error(
                            "already_running",
                            format!("{} is {}", runner.service_id(), runner.state()),
                        );
                    }
                    runner.rearm();
                    tokio::spawn(runner.clone().run());
                    RpcResponse::ok(&serde_json::json!({"starting": runner.service_id().to_string()}))
                }
                Err(resp) => resp,
            }),
        );
    }

    /// Stop every runner in parallel; force-quit whatever exceeds the
    /// grace window.
    pub async fn shutdown(&self, grace: Duration) {
        tracing::info!(grace_s = grace.as_secs(), "launcher shutdown");
        self.bus_monitor.publish_stopping().await;
        self.monitor().set_status(Status::Shutdown, "stopping services");
        self.bus_monitor.publish_status().await;

        for runner in self.runners.lock().values() {
            runner.request_stop();
        }

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.runner_tasks.lock());
        let drain = futures_util::future::join_all(tasks.into_iter().map(|task| async {
            let _ = task.await;
        }));
        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!("runners exceeded shutdown grace, abandoning");
        }

        self.bus_monitor.publish_stop(ExitClass::Clean).await;
        self.context.shutdown().await;
        self.loop_cancel.cancel();
    }
}

fn target_runner<C: Clock + 'static>(
    runners: &RunnerMap<C>,
    command: &str,
    prefix: &str,
) -> Result<Arc<Runner<C>>, RpcResponse> {
    let Some(raw_id) = command.strip_prefix(prefix) else {
        return Err(RpcResponse::error("bad_command", format!("expected {prefix}<service_id>")));
    };
    let Ok(service_id) = raw_id.parse::<ServiceId>() else {
        return Err(RpcResponse::error("bad_service_id", raw_id.to_string()));
    };
    runners
        .lock()
        .get(&service_id)
        .cloned()
        .ok_or_else(|| RpcResponse::error("unknown_service", service_id.to_string()))
}

fn sanitize_variant(host: &str) -> String {
    let cleaned: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "main".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
