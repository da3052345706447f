// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health status levels and worst-wins aggregation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Health level of a monitored service or sub-monitor.
///
/// The declaration order is the aggregation order: a larger variant is
/// "worse" and wins during aggregation. Transitional states
/// ([`Status::Startup`], [`Status::Shutdown`]) rank below the error band
/// so a starting child never masks a failing sibling.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No information yet
    #[default]
    Unknown,
    /// Healthy
    Ok,
    /// Healthy, no work in progress
    Idle,
    /// Healthy, actively working
    Busy,
    /// Starting up
    Startup,
    /// Shutting down
    Shutdown,
    /// Operational with a non-fatal anomaly
    Warning,
    /// Partially operational
    Degraded,
    /// Not operational, recoverable
    Error,
    /// Not operational, terminal
    Failed,
}

impl Status {
    /// Worst-wins aggregate of a set of statuses.
    ///
    /// Returns [`Status::Unknown`] for an empty set. This is the only
    /// place the ordering is consumed; all comparisons elsewhere go
    /// through this function or the derived `Ord`.
    pub fn aggregate(statuses: impl IntoIterator<Item = Status>) -> Status {
        statuses.into_iter().max().unwrap_or(Status::Unknown)
    }

    /// True for the error band: `Error`, `Degraded`, `Failed`.
    pub fn is_error(self) -> bool {
        matches!(self, Status::Error | Status::Degraded | Status::Failed)
    }

    /// True for the transitional states `Startup` and `Shutdown`.
    pub fn is_transitional(self) -> bool {
        matches!(self, Status::Startup | Status::Shutdown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Ok => "ok",
            Status::Idle => "idle",
            Status::Busy => "busy",
            Status::Startup => "startup",
            Status::Shutdown => "shutdown",
            Status::Warning => "warning",
            Status::Degraded => "degraded",
            Status::Error => "error",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a status name.
#[derive(Debug, Error)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Status::Unknown),
            "ok" => Ok(Status::Ok),
            "idle" => Ok(Status::Idle),
            "busy" => Ok(Status::Busy),
            "startup" => Ok(Status::Startup),
            "shutdown" => Ok(Status::Shutdown),
            "warning" => Ok(Status::Warning),
            "degraded" => Ok(Status::Degraded),
            "error" => Ok(Status::Error),
            "failed" => Ok(Status::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
