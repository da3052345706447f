// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status report value types.

use crate::metrics::MetricMap;
use crate::stamp::UtcStamp;
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// A point-in-time health report for one monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: Status,
    pub message: String,
    pub timestamp: UtcStamp,
    #[serde(default, skip_serializing_if = "MetricMap::is_empty")]
    pub metrics: MetricMap,
}

impl StatusReport {
    pub fn new(status: Status, message: impl Into<String>, timestamp: UtcStamp) -> Self {
        Self { status, message: message.into(), timestamp, metrics: MetricMap::new() }
    }
}

impl Default for StatusReport {
    fn default() -> Self {
        Self::new(Status::Unknown, "", UtcStamp::EPOCH)
    }
}

/// One-line summary of a child monitor, carried inside the parent's
/// published report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSummary {
    pub name: String,
    pub status: Status,
    pub message: String,
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
