// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events on the registry stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use tcs_core::{ServiceId, UtcStamp};

/// Kind of lifecycle event.
///
/// The per-service sequence is `declared → start → ready → stopping →
/// stop`; the supervisor interleaves `crashed`, `restarting` and
/// `failed` between brackets when it handles restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryEventKind {
    Declared,
    Start,
    Ready,
    Stopping,
    Stop,
    Crashed,
    Restarting,
    Failed,
}

impl fmt::Display for RegistryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistryEventKind::Declared => "declared",
            RegistryEventKind::Start => "start",
            RegistryEventKind::Ready => "ready",
            RegistryEventKind::Stopping => "stopping",
            RegistryEventKind::Stop => "stop",
            RegistryEventKind::Crashed => "crashed",
            RegistryEventKind::Restarting => "restarting",
            RegistryEventKind::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Exit classification carried on `stop` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitClass {
    /// Stop hook completed without error
    Clean,
    /// Service raised during run or stop
    Failed,
    /// Process died without a stop bracket
    Crashed,
}

/// One registry stream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEvent {
    pub event: RegistryEventKind,
    pub service_id: ServiceId,
    pub timestamp: UtcStamp,
    pub host: String,
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_id: Option<String>,
    /// Seconds since `start`; set on `stop`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_s: Option<f64>,
    /// Exit classification; set on `stop`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitClass>,
    /// Failure reason; set on supervisor `failed` events (e.g.
    /// `restart_limit`) and on startup failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Restart attempt counter; set on `restarting`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

impl RegistryEvent {
    pub fn new(
        event: RegistryEventKind,
        service_id: ServiceId,
        timestamp: UtcStamp,
        host: impl Into<String>,
        pid: u32,
    ) -> Self {
        Self {
            event,
            service_id,
            timestamp,
            host: host.into(),
            pid,
            launcher_id: None,
            runner_id: None,
            uptime_s: None,
            exit: None,
            reason: None,
            attempt: None,
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
