// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process supervision for subprocess mode.
//!
//! The child runs the standalone service entry; coordination happens
//! solely over the bus, so the parent only watches the process handle.
//! Exit is detected by polling; stop escalates SIGTERM → SIGKILL after
//! the grace window.

use crate::runner::ExitInfo;
use crate::{EXIT_POLL_INTERVAL, STOP_GRACE};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tcs_core::ServiceId;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// How to launch one service child.
#[derive(Debug, Clone)]
pub struct SubprocessSpec {
    /// The standalone entry binary.
    pub program: PathBuf,
    pub config_path: PathBuf,
    pub service_id: ServiceId,
    pub runner_id: String,
    /// Display hint forwarded to the child's monitor.
    pub parent_name: Option<String>,
    pub stop_grace: Duration,
}

impl SubprocessSpec {
    pub fn new(
        program: PathBuf,
        config_path: PathBuf,
        service_id: ServiceId,
        runner_id: impl Into<String>,
    ) -> Self {
        Self {
            program,
            config_path,
            service_id,
            runner_id: runner_id.into(),
            parent_name: None,
            stop_grace: STOP_GRACE,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.config_path)
            .arg(self.service_id.to_string())
            .arg("--runner-id")
            .arg(&self.runner_id);
        if let Some(parent) = &self.parent_name {
            cmd.arg("--parent-name").arg(parent);
        }
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Launch one child and wait for it to exit, polling the handle.
/// Shutdown terminates the child and reports an external exit.
pub async fn supervise(spec: &SubprocessSpec, shutdown: &CancellationToken) -> ExitInfo {
    let mut child = match spec.command().spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(
                program = %spec.program.display(),
                service_id = %spec.service_id,
                error = %e,
                "spawn failed"
            );
            return ExitInfo::from_error(format!("spawn failed: {e}"));
        }
    };
    tracing::info!(
        service_id = %spec.service_id,
        pid = child.id().unwrap_or_default(),
        "child started"
    );

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return classify_exit(status),
            Ok(None) => {}
            Err(e) => return ExitInfo::from_error(format!("wait failed: {e}")),
        }
        tokio::select! {
            _ = shutdown.cancelled() => return terminate(&mut child, spec.stop_grace).await,
            _ = tokio::time::sleep(EXIT_POLL_INTERVAL) => {}
        }
    }
}

/// SIGTERM, wait out the grace window, then SIGKILL.
async fn terminate(child: &mut Child, grace: Duration) -> ExitInfo {
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!(pid, error = %e, "SIGTERM failed");
        }
    }

    let graceful = tokio::time::timeout(grace, child.wait()).await;
    match graceful {
        Ok(Ok(status)) => {
            tracing::info!(status = %status, "child stopped on SIGTERM");
            ExitInfo::external()
        }
        Ok(Err(e)) => ExitInfo::from_error(format!("wait failed: {e}")),
        Err(_) => {
            tracing::warn!("grace expired, sending SIGKILL");
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "SIGKILL failed");
            }
            let _ = child.wait().await;
            ExitInfo::external()
        }
    }
}

fn classify_exit(status: ExitStatus) -> ExitInfo {
    match status.code() {
        Some(code) => ExitInfo::from_code(code),
        None => match status.signal() {
            Some(signal) => ExitInfo::from_signal(signal),
            None => ExitInfo::from_error("exit without code or signal"),
        },
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
