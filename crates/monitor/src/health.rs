// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic healthcheck driver.

use crate::monitor::Monitor;
use std::time::Duration;
use tcs_core::Clock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run the monitor's healthcheck callbacks on a fixed period until
/// cancelled.
pub fn spawn_healthcheck_loop<C: Clock + 'static>(
    monitor: Monitor<C>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(period) => monitor.run_healthchecks(),
            }
        }
    })
}
