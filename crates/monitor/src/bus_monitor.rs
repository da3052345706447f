// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus-attached monitor: registry, status and heartbeat publishing
//! plus the per-service RPC server.
//!
//! Publishing is best-effort everywhere: a transport error is logged
//! and swallowed, and a monitor constructed without a bus degrades to
//! a silent no-op. Reconnection is the bus implementation's problem.

use crate::monitor::Monitor;
use crate::HEARTBEAT_PERIOD;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tcs_bus::BusHandle;
use tcs_core::{ChildSummary, Clock, ServiceId, Status, SystemClock};
use tcs_wire::{
    heartbeat_subject, registry_subject, rpc_subject, status_subject, ExitClass, HealthCheck,
    HealthReply, HeartbeatEvent, RegistryEvent, RegistryEventKind, RpcRequest, RpcResponse,
    StatsReply, StatusEvent, RPC_VERSION,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Extension RPC command handler. Handlers run on the server task and
/// must not block; long work goes through channels.
pub type RpcHandler = Arc<dyn Fn(&RpcRequest) -> RpcResponse + Send + Sync>;

/// Descriptor context carried on every published event.
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub service_id: ServiceId,
    pub launcher_id: Option<String>,
    pub runner_id: Option<String>,
    pub host: String,
    pub pid: u32,
}

impl MonitorContext {
    pub fn new(service_id: ServiceId, host: impl Into<String>, pid: u32) -> Self {
        Self { service_id, launcher_id: None, runner_id: None, host: host.into(), pid }
    }

    pub fn with_launcher_id(mut self, id: impl Into<String>) -> Self {
        self.launcher_id = Some(id.into());
        self
    }

    pub fn with_runner_id(mut self, id: impl Into<String>) -> Self {
        self.runner_id = Some(id.into());
        self
    }
}

/// A [`Monitor`] bound to the bus.
pub struct BusMonitor<C: Clock = SystemClock> {
    monitor: Monitor<C>,
    bus: Option<BusHandle>,
    ctx: MonitorContext,
    clock: C,
    heartbeat_period: Duration,
    rpc_handlers: Mutex<HashMap<String, RpcHandler>>,
    last_status: Mutex<Option<(Status, String, Vec<ChildSummary>)>>,
}

impl<C: Clock + 'static> BusMonitor<C> {
    pub fn new(monitor: Monitor<C>, bus: Option<BusHandle>, ctx: MonitorContext, clock: C) -> Self {
        if bus.is_none() {
            tracing::warn!(
                service_id = %ctx.service_id,
                "no bus connection, monitor publishes are no-ops"
            );
        }
        Self {
            monitor,
            bus,
            ctx,
            clock,
            heartbeat_period: HEARTBEAT_PERIOD,
            rpc_handlers: Mutex::new(HashMap::new()),
            last_status: Mutex::new(None),
        }
    }

    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    pub fn monitor(&self) -> &Monitor<C> {
        &self.monitor
    }

    pub fn context(&self) -> &MonitorContext {
        &self.ctx
    }

    pub fn heartbeat_period(&self) -> Duration {
        self.heartbeat_period
    }

    /// Register an extension RPC command. `command` matches either the
    /// full command string or its first dot-segment (`"start"` serves
    /// `start.echo.t1`).
    pub fn register_rpc(&self, command: impl Into<String>, handler: RpcHandler) {
        self.rpc_handlers.lock().insert(command.into(), handler);
    }

    fn base_event(&self, kind: RegistryEventKind) -> RegistryEvent {
        let mut event = RegistryEvent::new(
            kind,
            self.ctx.service_id.clone(),
            self.clock.wall(),
            self.ctx.host.clone(),
            self.ctx.pid,
        );
        event.launcher_id = self.ctx.launcher_id.clone();
        event.runner_id = self.ctx.runner_id.clone();
        event
    }

    async fn publish_best_effort(&self, subject: String, payload: Result<Vec<u8>, tcs_wire::WireError>) {
        let Some(bus) = &self.bus else {
            return;
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(subject, error = %e, "event encode failed, dropping");
                return;
            }
        };
        if let Err(e) = bus.publish(&subject, payload).await {
            tracing::warn!(subject, error = %e, "publish failed, continuing");
        }
    }

    pub async fn publish_registry(&self, event: RegistryEvent) {
        let subject = registry_subject(event.event, &event.service_id);
        self.publish_best_effort(subject, tcs_wire::encode(&event)).await;
    }

    pub async fn publish_declared(&self) {
        self.publish_registry(self.base_event(RegistryEventKind::Declared)).await;
    }

    /// Emit `start`: resets the heartbeat sequence and the uptime base.
    pub async fn publish_start(&self) {
        self.monitor.mark_started();
        self.publish_registry(self.base_event(RegistryEventKind::Start)).await;
    }

    pub async fn publish_ready(&self) {
        self.publish_registry(self.base_event(RegistryEventKind::Ready)).await;
    }

    pub async fn publish_stopping(&self) {
        self.publish_registry(self.base_event(RegistryEventKind::Stopping)).await;
    }

    pub async fn publish_stop(&self, exit: ExitClass) {
        let mut event = self.base_event(RegistryEventKind::Stop);
        event.uptime_s = Some(self.monitor.uptime_s());
        event.exit = Some(exit);
        self.publish_registry(event).await;
    }

    pub async fn publish_crashed(&self, reason: impl Into<String>) {
        let mut event = self.base_event(RegistryEventKind::Crashed);
        event.reason = Some(reason.into());
        self.publish_registry(event).await;
    }

    pub async fn publish_restarting(&self, attempt: u32) {
        let mut event = self.base_event(RegistryEventKind::Restarting);
        event.attempt = Some(attempt);
        self.publish_registry(event).await;
    }

    pub async fn publish_failed(&self, reason: impl Into<String>) {
        let mut event = self.base_event(RegistryEventKind::Failed);
        event.reason = Some(reason.into());
        self.publish_registry(event).await;
    }

    /// Publish the current effective status if it differs from the
    /// last published one.
    pub async fn publish_status(&self) {
        let (report, children) = self.monitor.snapshot();
        {
            let mut last = self.last_status.lock();
            let key = (report.status, report.message.clone(), children.clone());
            if last.as_ref() == Some(&key) {
                return;
            }
            *last = Some(key);
        }
        let event = StatusEvent::from_report(self.ctx.service_id.clone(), report, children);
        let subject = status_subject(&self.ctx.service_id);
        self.publish_best_effort(subject, tcs_wire::encode(&event)).await;
    }

    pub async fn publish_heartbeat(&self) {
        let sequence = self.monitor.bump_heartbeat();
        let now = self.clock.wall();
        let event = HeartbeatEvent {
            service_id: self.ctx.service_id.clone(),
            sequence,
            uptime_s: self.monitor.uptime_s(),
            status: self.monitor.effective_status(),
            timestamp: now,
            next_heartbeat_expected: tcs_core::UtcStamp::from_epoch_ms(
                now.epoch_ms() + self.heartbeat_period.as_millis() as u64,
            ),
            metrics: tcs_core::MetricMap::new(),
        };
        let subject = heartbeat_subject(&self.ctx.service_id);
        self.publish_best_effort(subject, tcs_wire::encode(&event)).await;
    }

    /// Heartbeats on a fixed period until cancelled.
    pub fn spawn_heartbeat_loop(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(this.heartbeat_period) => {
                        this.publish_heartbeat().await;
                    }
                }
            }
        })
    }

    /// Re-publish status whenever anything in the monitor tree changes.
    pub fn spawn_status_publisher(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut rx = self.monitor.subscribe_changes();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.recv() => {
                        if changed.is_none() {
                            break;
                        }
                        // Coalesce bursts before publishing.
                        while rx.try_recv().is_ok() {}
                        this.publish_status().await;
                    }
                }
            }
        })
    }

    /// Serve `svc.rpc.<service_id>.v1.>` until cancelled. Without a
    /// bus this is a no-op task.
    pub async fn spawn_rpc_server(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let Some(bus) = self.bus.clone() else {
            return tokio::spawn(async {});
        };
        let filter = format!("svc.rpc.{}.{}.>", self.ctx.service_id, RPC_VERSION);
        let mut requests = match bus.serve(&filter).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(filter, error = %e, "rpc serve registration failed");
                return tokio::spawn(async {});
            }
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let prefix = rpc_subject(&this.ctx.service_id, "");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    request = requests.next() => {
                        let Some(request) = request else { break };
                        let command = request
                            .subject
                            .strip_prefix(&prefix)
                            .unwrap_or(&request.subject)
                            .to_string();
                        let rpc_request = tcs_wire::decode::<RpcRequest>(&request.payload)
                            .unwrap_or_else(|_| RpcRequest::new(command.clone()));
                        let response = this.handle_rpc(&command, &rpc_request);
                        match tcs_wire::encode(&response) {
                            Ok(payload) => request.respond(payload),
                            Err(e) => {
                                tracing::warn!(command, error = %e, "rpc response encode failed");
                            }
                        }
                    }
                }
            }
        })
    }

    fn handle_rpc(&self, command: &str, request: &RpcRequest) -> RpcResponse {
        match command {
            "health" => RpcResponse::ok(&self.health_reply()),
            "stats" => RpcResponse::ok(&self.stats_reply()),
            _ => {
                let handler = {
                    let handlers = self.rpc_handlers.lock();
                    handlers
                        .get(command)
                        .or_else(|| {
                            command.split_once('.').and_then(|(head, _)| handlers.get(head))
                        })
                        .cloned()
                };
                match handler {
                    Some(handler) => handler(request),
                    None => RpcResponse::error("unknown_command", format!("no such command: {command}")),
                }
            }
        }
    }

    fn health_reply(&self) -> HealthReply {
        let mut checks = vec![HealthCheck {
            name: self.monitor.name().to_string(),
            status: self.monitor.own_status(),
            message: self.monitor.message(),
        }];
        for child in self.monitor.child_summaries() {
            checks.push(HealthCheck {
                name: child.name,
                status: child.status,
                message: child.message,
            });
        }
        HealthReply { status: self.monitor.effective_status(), checks }
    }

    fn stats_reply(&self) -> StatsReply {
        let (report, _) = self.monitor.snapshot();
        StatsReply {
            uptime_s: self.monitor.uptime_s(),
            heartbeat_sequence: self.monitor.heartbeat_sequence(),
            metrics: report.metrics,
        }
    }
}

#[cfg(test)]
#[path = "bus_monitor_tests.rs"]
mod tests;
