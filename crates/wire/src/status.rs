// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status stream payload.

use serde::{Deserialize, Serialize};
use tcs_core::{ChildSummary, MetricMap, ServiceId, Status, StatusReport, UtcStamp};

/// Published on `svc.status.<service_id>` whenever the effective status
/// of a monitor changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub service_id: ServiceId,
    /// Effective (aggregated) status.
    pub status: Status,
    pub message: String,
    pub timestamp: UtcStamp,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildSummary>,
    #[serde(default, skip_serializing_if = "MetricMap::is_empty")]
    pub metrics: MetricMap,
}

impl StatusEvent {
    pub fn from_report(
        service_id: ServiceId,
        report: StatusReport,
        children: Vec<ChildSummary>,
    ) -> Self {
        Self {
            service_id,
            status: report.status,
            message: report.message,
            timestamp: report.timestamp,
            children,
            metrics: report.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_summaries_on_wire() {
        let event = StatusEvent {
            service_id: ServiceId::new("telescope", "zb08").unwrap(),
            status: Status::Degraded,
            message: "dome offline".into(),
            timestamp: UtcStamp::from_epoch_ms(5_000),
            children: vec![
                ChildSummary { name: "mount".into(), status: Status::Ok, message: String::new() },
                ChildSummary {
                    name: "dome".into(),
                    status: Status::Degraded,
                    message: "dome offline".into(),
                },
            ],
            metrics: MetricMap::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["children"][1]["status"], "degraded");
        assert!(json.get("metrics").is_none());
    }
}
