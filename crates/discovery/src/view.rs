// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure projection of one service's event history.

use serde::Serialize;
use std::fmt;
use tcs_core::{ChildSummary, ServiceId, Status, UtcStamp};
use tcs_wire::{ExitClass, HeartbeatEvent, RegistryEvent, RegistryEventKind, StatusEvent};

/// Lifecycle as observed from the registry stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Declared,
    Running,
    Stopping,
    Stopped,
    Failed,
    Crashed,
    Restarting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Declared => "declared",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
            LifecycleState::Crashed => "crashed",
            LifecycleState::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

/// Current knowledge about one service instance.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub service_id: ServiceId,
    pub lifecycle: LifecycleState,
    pub status: Status,
    pub message: String,
    pub children: Vec<ChildSummary>,
    pub host: String,
    pub pid: u32,
    pub launcher_id: Option<String>,
    pub runner_id: Option<String>,
    pub last_event: UtcStamp,
    pub uptime_s: Option<f64>,
    pub restart_attempt: Option<u32>,
    pub heartbeat_sequence: u64,
    pub last_heartbeat: Option<UtcStamp>,
    pub next_heartbeat_expected: Option<UtcStamp>,
    /// Heartbeat lapsed while `RUNNING`. Display-only; the lifecycle
    /// state is untouched.
    pub heartbeat_dead: bool,
}

impl ServiceView {
    pub fn new(service_id: ServiceId) -> Self {
        Self {
            service_id,
            lifecycle: LifecycleState::Declared,
            status: Status::Unknown,
            message: String::new(),
            children: Vec::new(),
            host: String::new(),
            pid: 0,
            launcher_id: None,
            runner_id: None,
            last_event: UtcStamp::EPOCH,
            uptime_s: None,
            restart_attempt: None,
            heartbeat_sequence: 0,
            last_heartbeat: None,
            next_heartbeat_expected: None,
            heartbeat_dead: false,
        }
    }

    pub fn apply_registry(&mut self, event: &RegistryEvent) {
        self.host = event.host.clone();
        self.pid = event.pid;
        if event.launcher_id.is_some() {
            self.launcher_id = event.launcher_id.clone();
        }
        if event.runner_id.is_some() {
            self.runner_id = event.runner_id.clone();
        }
        self.last_event = event.timestamp;

        match event.event {
            RegistryEventKind::Declared => self.lifecycle = LifecycleState::Declared,
            RegistryEventKind::Start => {
                self.lifecycle = LifecycleState::Running;
                self.heartbeat_sequence = 0;
                self.last_heartbeat = None;
                self.next_heartbeat_expected = None;
                self.heartbeat_dead = false;
                self.uptime_s = None;
            }
            RegistryEventKind::Ready => self.lifecycle = LifecycleState::Running,
            RegistryEventKind::Stopping => self.lifecycle = LifecycleState::Stopping,
            RegistryEventKind::Stop => {
                self.uptime_s = event.uptime_s;
                self.lifecycle = match event.exit {
                    Some(ExitClass::Clean) | None => LifecycleState::Stopped,
                    Some(ExitClass::Failed) => LifecycleState::Failed,
                    Some(ExitClass::Crashed) => LifecycleState::Crashed,
                };
            }
            RegistryEventKind::Crashed => {
                self.lifecycle = LifecycleState::Crashed;
                if let Some(reason) = &event.reason {
                    self.message = reason.clone();
                }
            }
            RegistryEventKind::Restarting => {
                self.lifecycle = LifecycleState::Restarting;
                self.restart_attempt = event.attempt;
            }
            RegistryEventKind::Failed => {
                self.lifecycle = LifecycleState::Failed;
                if let Some(reason) = &event.reason {
                    self.message = reason.clone();
                }
            }
        }
    }

    /// Latest status replaces status, message and children.
    pub fn apply_status(&mut self, event: &StatusEvent) {
        self.status = event.status;
        self.message = event.message.clone();
        self.children = event.children.clone();
        self.last_event = event.timestamp;
    }

    pub fn apply_heartbeat(&mut self, event: &HeartbeatEvent) {
        self.heartbeat_sequence = event.sequence;
        self.last_heartbeat = Some(event.timestamp);
        self.next_heartbeat_expected = Some(event.next_heartbeat_expected);
        self.status = event.status;
        self.uptime_s = Some(event.uptime_s);
        self.heartbeat_dead = false;
    }

    /// Mark the view dead when the wall clock has passed
    /// `next_heartbeat_expected + grace` while `RUNNING`. Returns true
    /// when the flag flipped.
    pub fn check_zombie(&mut self, now_ms: u64, grace_ms: u64) -> bool {
        if self.heartbeat_dead || self.lifecycle != LifecycleState::Running {
            return false;
        }
        let Some(expected) = self.next_heartbeat_expected else {
            return false;
        };
        if now_ms > expected.epoch_ms().saturating_add(grace_ms) {
            self.heartbeat_dead = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
