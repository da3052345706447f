// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-descriptor supervision: launch, watch, restart.
//!
//! A runner owns the restart accounting for one service instance and
//! either drives a controller in-process or supervises a child
//! process. Restart decisions never block event publishing; the
//! back-off sleep is cancellable by shutdown.

use crate::context::ProcessContext;
use crate::controller::{Controller, ControllerIds, ControllerState};
use crate::error::LauncherError;
use crate::subprocess::{self, SubprocessSpec};
use crate::STOP_GRACE;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tcs_bus::BusHandle;
use tcs_core::{Clock, RestartPolicy, ServiceDescriptor, ServiceId, Status, SystemClock};
use tcs_monitor::{BusMonitor, Monitor, MonitorContext};
use tcs_wire::ExitClass;
use tokio_util::sync::CancellationToken;

/// Reason the supervisor reports when the restart budget is exhausted.
pub const RESTART_LIMIT_REASON: &str = "restart_limit";

/// Supervision states of one runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Starting,
    Running,
    Exited,
    Crashed,
    Restarting,
    GivenUp,
    Stopped,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Starting => "starting",
            RunnerState::Running => "running",
            RunnerState::Exited => "exited",
            RunnerState::Crashed => "crashed",
            RunnerState::Restarting => "restarting",
            RunnerState::GivenUp => "given_up",
            RunnerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How one launch ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub error: Option<String>,
    /// Stopped by the supervisor or an operator; never restarted.
    pub external: bool,
}

impl ExitInfo {
    pub fn clean() -> Self {
        Self { code: Some(0), ..Self::default() }
    }

    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code), ..Self::default() }
    }

    pub fn from_signal(signal: i32) -> Self {
        Self { signal: Some(signal), ..Self::default() }
    }

    pub fn from_error(error: impl ToString) -> Self {
        Self { error: Some(error.to_string()), ..Self::default() }
    }

    pub fn external() -> Self {
        Self { external: true, ..Self::default() }
    }

    pub fn is_failure(&self) -> bool {
        self.signal.is_some() || self.error.is_some() || self.code.is_some_and(|c| c != 0)
    }

    /// Signal death or an exit code above 128.
    pub fn is_abnormal(&self) -> bool {
        self.signal.is_some() || self.code.is_some_and(|c| c > 128)
    }

    pub fn classify(&self) -> ExitClass {
        if self.signal.is_some() {
            ExitClass::Crashed
        } else if self.is_failure() {
            ExitClass::Failed
        } else {
            ExitClass::Clean
        }
    }

    pub fn describe(&self) -> String {
        if let Some(signal) = self.signal {
            format!("terminated by signal {signal}")
        } else if let Some(error) = &self.error {
            error.clone()
        } else if let Some(code) = self.code {
            format!("exit code {code}")
        } else {
            "exited".to_string()
        }
    }
}

/// Whether the policy asks for a relaunch after this exit.
pub fn should_restart(policy: RestartPolicy, exit: &ExitInfo) -> bool {
    if exit.external {
        return false;
    }
    match policy {
        RestartPolicy::No => false,
        RestartPolicy::OnFailure => exit.is_failure(),
        RestartPolicy::OnAbnormal => exit.is_abnormal(),
        RestartPolicy::Always => true,
    }
}

/// Outcome of consulting the restart budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    Restart { attempt: u32 },
    GiveUp,
}

/// Sliding-window restart accounting.
///
/// Holds the instants of past restarts; entries older than the window
/// are dropped before each decision. With `restart_max = 0` the budget
/// is unbounded.
#[derive(Debug)]
pub struct RestartTracker {
    history: VecDeque<Instant>,
    window: Duration,
    max: u32,
    attempt: u32,
}

impl RestartTracker {
    pub fn new(restart_window_s: f64, restart_max: u32) -> Self {
        Self {
            history: VecDeque::new(),
            window: Duration::from_secs_f64(restart_window_s.max(0.0)),
            max: restart_max,
            attempt: 0,
        }
    }

    pub fn for_descriptor(descriptor: &ServiceDescriptor) -> Self {
        Self::new(descriptor.restart_window, descriptor.restart_max)
    }

    /// Decide and account for one restart at `now`.
    pub fn decide(&mut self, now: Instant) -> RestartDecision {
        while let Some(front) = self.history.front() {
            if now.duration_since(*front) > self.window {
                self.history.pop_front();
            } else {
                break;
            }
        }
        if self.max > 0 && self.history.len() as u32 >= self.max {
            return RestartDecision::GiveUp;
        }
        self.history.push_back(now);
        self.attempt += 1;
        RestartDecision::Restart { attempt: self.attempt }
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

/// Execution mode of a runner.
pub enum LaunchMode<C: Clock + 'static> {
    /// Controller driven on this process's scheduler.
    InProcess { context: Arc<ProcessContext<C>> },
    /// Child process hosting its own controller.
    Subprocess {
        /// The standalone entry binary.
        program: std::path::PathBuf,
        config_path: std::path::PathBuf,
        parent_name: Option<String>,
    },
}

/// Supervision record for one configured service instance.
pub struct Runner<C: Clock + 'static = SystemClock> {
    descriptor: ServiceDescriptor,
    service_id: ServiceId,
    runner_id: String,
    mode: LaunchMode<C>,
    monitor: Monitor<C>,
    bus_monitor: Arc<BusMonitor<C>>,
    state: Mutex<RunnerState>,
    tracker: Mutex<RestartTracker>,
    shutdown: Mutex<CancellationToken>,
    clock: C,
}

impl<C: Clock + 'static> Runner<C> {
    pub fn new(
        descriptor: ServiceDescriptor,
        mode: LaunchMode<C>,
        bus: Option<BusHandle>,
        launcher_id: Option<String>,
        host: String,
        pid: u32,
        clock: C,
    ) -> Result<Arc<Self>, LauncherError> {
        let service_id = descriptor.service_id()?;
        let runner_id = tcs_core::short_id("rnr");
        let monitor = Monitor::new(service_id.to_string(), clock.clone());

        let mut monitor_ctx = MonitorContext::new(service_id.clone(), host, pid)
            .with_runner_id(runner_id.clone());
        monitor_ctx.launcher_id = launcher_id;
        let bus_monitor =
            Arc::new(BusMonitor::new(monitor.clone(), bus, monitor_ctx, clock.clone()));

        let tracker = RestartTracker::for_descriptor(&descriptor);
        Ok(Arc::new(Self {
            descriptor,
            service_id,
            runner_id,
            mode,
            monitor,
            bus_monitor,
            state: Mutex::new(RunnerState::Starting),
            tracker: Mutex::new(tracker),
            shutdown: Mutex::new(CancellationToken::new()),
            clock,
        }))
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn runner_id(&self) -> &str {
        &self.runner_id
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// The runner's node in the launcher's monitor tree.
    pub fn monitor(&self) -> &Monitor<C> {
        &self.monitor
    }

    pub fn state(&self) -> RunnerState {
        *self.state.lock()
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state(),
            RunnerState::Stopped | RunnerState::GivenUp
        )
    }

    /// Ask the current launch to stop; the supervision loop then ends.
    pub fn request_stop(&self) {
        self.shutdown.lock().cancel();
    }

    /// Replace a used shutdown token so a finished runner can be
    /// relaunched by the operator.
    pub fn rearm(&self) {
        let mut token = self.shutdown.lock();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.lock().clone()
    }

    fn set_state(&self, state: RunnerState, status: Status, message: impl Into<String>) {
        *self.state.lock() = state;
        self.monitor.set_status(status, message);
    }

    /// The supervision loop: launch, wait for exit, apply the restart
    /// policy, repeat.
    pub async fn run(self: Arc<Self>) {
        loop {
            let shutdown = self.shutdown_token();
            self.set_state(RunnerState::Starting, Status::Startup, "starting");
            let exit = match &self.mode {
                LaunchMode::InProcess { context } => {
                    self.launch_in_process(context, &shutdown).await
                }
                LaunchMode::Subprocess { program, config_path, parent_name } => {
                    let mut spec = SubprocessSpec::new(
                        program.clone(),
                        config_path.clone(),
                        self.service_id.clone(),
                        self.runner_id.clone(),
                    );
                    spec.parent_name = parent_name.clone();
                    self.launch_subprocess(spec, &shutdown).await
                }
            };

            if shutdown.is_cancelled() || exit.external {
                self.set_state(RunnerState::Stopped, Status::Idle, "stopped");
                return;
            }

            if exit.classify() == ExitClass::Crashed {
                self.set_state(RunnerState::Crashed, Status::Error, exit.describe());
                self.bus_monitor.publish_crashed(exit.describe()).await;
            } else {
                let status = if exit.is_failure() { Status::Error } else { Status::Idle };
                self.set_state(RunnerState::Exited, status, exit.describe());
            }

            if !should_restart(self.descriptor.restart, &exit) {
                let status = if exit.is_failure() { Status::Failed } else { Status::Idle };
                self.set_state(RunnerState::Stopped, status, exit.describe());
                return;
            }

            let decision = self.tracker.lock().decide(self.clock.now());
            match decision {
                RestartDecision::GiveUp => {
                    tracing::error!(
                        service_id = %self.service_id,
                        window_s = self.descriptor.restart_window,
                        max = self.descriptor.restart_max,
                        "restart budget exhausted, giving up"
                    );
                    self.bus_monitor.publish_failed(RESTART_LIMIT_REASON).await;
                    self.set_state(RunnerState::GivenUp, Status::Failed, "restart limit reached");
                    return;
                }
                RestartDecision::Restart { attempt } => {
                    tracing::warn!(
                        service_id = %self.service_id,
                        attempt,
                        backoff_s = self.descriptor.restart_sec,
                        "restarting service"
                    );
                    self.set_state(
                        RunnerState::Restarting,
                        Status::Warning,
                        format!("restarting (attempt {attempt})"),
                    );
                    self.bus_monitor.publish_restarting(attempt).await;

                    let backoff = Duration::from_secs_f64(self.descriptor.restart_sec.max(0.0));
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            self.set_state(RunnerState::Stopped, Status::Idle, "stopped");
                            return;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }

    async fn launch_in_process(
        &self,
        context: &Arc<ProcessContext<C>>,
        shutdown: &CancellationToken,
    ) -> ExitInfo {
        let resolver = context.resolver_snapshot();
        let ids = ControllerIds {
            launcher_id: Some(context.launcher_id().to_string()),
            runner_id: Some(self.runner_id.clone()),
            parent_name: None,
            host: context.host().to_string(),
            pid: context.pid(),
        };
        let controller = match Controller::initialize(
            self.descriptor.clone(),
            context.registry(),
            &resolver,
            context.bus(),
            ids,
            self.clock.clone(),
        )
        .await
        {
            Ok(controller) => controller,
            Err(e) => return ExitInfo::from_error(e),
        };
        context.register_controller(controller.clone());

        let exit = self.drive_controller(&controller, shutdown).await;
        context.remove_controller(&self.service_id);
        exit
    }

    async fn drive_controller(
        &self,
        controller: &Arc<Controller<C>>,
        shutdown: &CancellationToken,
    ) -> ExitInfo {
        if controller.state() == ControllerState::Failed {
            let reason = controller
                .init_error()
                .unwrap_or_else(|| "initialization failed".to_string());
            return ExitInfo::from_error(reason);
        }
        if let Err(e) = controller.start().await {
            return ExitInfo::from_error(e);
        }
        self.set_state(RunnerState::Running, Status::Ok, "running");

        tokio::select! {
            result = controller.wait() => match result {
                Ok(()) => ExitInfo::clean(),
                Err(e) => ExitInfo::from_error(e),
            },
            _ = shutdown.cancelled() => {
                if let Err(e) = controller.stop(STOP_GRACE).await {
                    tracing::warn!(service_id = %self.service_id, error = %e, "stop on shutdown failed");
                }
                ExitInfo::external()
            }
        }
    }

    async fn launch_subprocess(
        &self,
        spec: SubprocessSpec,
        shutdown: &CancellationToken,
    ) -> ExitInfo {
        self.set_state(RunnerState::Running, Status::Ok, "running");
        subprocess::supervise(&spec, shutdown).await
    }

    /// A declared-but-disabled instance: never launched, visible in
    /// the launcher's tree.
    pub fn mark_disabled(&self) {
        self.set_state(RunnerState::Stopped, Status::Idle, "disabled");
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
