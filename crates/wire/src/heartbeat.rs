// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat stream payload.

use serde::{Deserialize, Serialize};
use tcs_core::{MetricMap, ServiceId, Status, UtcStamp};

/// Periodic liveness record on `svc.heartbeat.<service_id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    pub service_id: ServiceId,
    /// Strictly increasing within one monitor lifetime; resets on a new
    /// `start` registry event.
    pub sequence: u64,
    pub uptime_s: f64,
    pub status: Status,
    pub timestamp: UtcStamp,
    /// Publish time plus the heartbeat period. Observers treat the
    /// service as a zombie once this passes by more than one grace
    /// period without a newer heartbeat.
    pub next_heartbeat_expected: UtcStamp,
    #[serde(default, skip_serializing_if = "MetricMap::is_empty")]
    pub metrics: MetricMap,
}
