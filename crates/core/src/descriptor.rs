// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declared service instances and their restart policy.

use crate::service::{ServiceId, ServiceIdError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default back-off before a restart attempt, seconds.
pub const DEFAULT_RESTART_SEC: f64 = 5.0;
/// Default sliding window for restart accounting, seconds.
pub const DEFAULT_RESTART_WINDOW: f64 = 60.0;

/// When the supervisor relaunches an exited service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    /// Never restart
    #[default]
    #[serde(rename = "no")]
    No,
    /// Restart on nonzero exit / service error
    #[serde(rename = "on-failure")]
    OnFailure,
    /// Restart only on signal death or exit code > 128
    #[serde(rename = "on-abnormal")]
    OnAbnormal,
    /// Restart on every exit
    #[serde(rename = "always")]
    Always,
}

#[derive(Debug, Error)]
#[error("unknown restart policy: {0} (expected no|on-failure|on-abnormal|always)")]
pub struct ParseRestartPolicyError(String);

impl FromStr for RestartPolicy {
    type Err = ParseRestartPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(RestartPolicy::No),
            "on-failure" => Ok(RestartPolicy::OnFailure),
            "on-abnormal" => Ok(RestartPolicy::OnAbnormal),
            "always" => Ok(RestartPolicy::Always),
            other => Err(ParseRestartPolicyError(other.to_string())),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestartPolicy::No => "no",
            RestartPolicy::OnFailure => "on-failure",
            RestartPolicy::OnAbnormal => "on-abnormal",
            RestartPolicy::Always => "always",
        };
        f.write_str(name)
    }
}

/// One configured service instance: identity, loader hint, restart
/// policy and the service-specific option map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub service_type: String,
    pub variant: String,
    /// Loader namespace for the service implementation. Resolved
    /// against the constructor registry; carried for diagnostics.
    pub module_path: String,
    #[serde(default)]
    pub restart: RestartPolicy,
    #[serde(default = "default_restart_sec")]
    pub restart_sec: f64,
    /// 0 means unbounded.
    #[serde(default)]
    pub restart_max: u32,
    #[serde(default = "default_restart_window")]
    pub restart_window: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Service-specific configuration fields, passed through untyped.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: serde_json::Map<String, serde_json::Value>,
}

fn default_restart_sec() -> f64 {
    DEFAULT_RESTART_SEC
}

fn default_restart_window() -> f64 {
    DEFAULT_RESTART_WINDOW
}

fn default_enabled() -> bool {
    true
}

impl ServiceDescriptor {
    pub fn new(service_type: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            variant: variant.into(),
            module_path: String::new(),
            restart: RestartPolicy::No,
            restart_sec: DEFAULT_RESTART_SEC,
            restart_max: 0,
            restart_window: DEFAULT_RESTART_WINDOW,
            log_level: None,
            enabled: true,
            options: serde_json::Map::new(),
        }
    }

    pub fn service_id(&self) -> Result<ServiceId, ServiceIdError> {
        ServiceId::new(&self.service_type, &self.variant)
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
