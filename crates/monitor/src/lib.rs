// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Hierarchical health monitors and their bus binding.
//!
//! A [`Monitor`] is one node in the monitored tree: it owns a status,
//! children, healthcheck and metric callbacks. A [`BusMonitor`] binds a
//! monitor to the bus and publishes registry, status and heartbeat
//! events for it.

mod bus_monitor;
mod health;
mod monitor;

pub use bus_monitor::{BusMonitor, MonitorContext, RpcHandler};
pub use health::spawn_healthcheck_loop;
pub use monitor::{HealthcheckFn, MetricFn, Monitor, MonitorError, TaskGuard};

use std::time::Duration;

/// Default healthcheck period.
pub const HEALTHCHECK_PERIOD: Duration = Duration::from_secs(30);

/// Default heartbeat period.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Delay before a monitor with no active tasks reverts BUSY → IDLE.
pub const IDLE_REVERT_DELAY: Duration = Duration::from_secs(1);
