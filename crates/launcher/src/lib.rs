// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Service lifecycle and supervision: process context, controllers,
//! service kinds, runners and the launcher.

pub mod context;
pub mod controller;
pub mod entry;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod service;
pub mod signal;
pub mod subprocess;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{memory_bus_connector, BootstrapOptions, BusConnector, ProcessContext};
pub use entry::{resolve_descriptor, run_service};
pub use controller::{Controller, ControllerIds, ControllerState};
pub use error::{ControllerError, LauncherError, ServiceError};
pub use launcher::{LaunchKind, Launcher};
pub use registry::{ServiceCtor, ServiceRegistration, ServiceRegistry};
pub use runner::{ExitInfo, RestartDecision, RestartTracker, Runner, RunnerState};
pub use service::{
    BoxedService, LoopDriver, LoopService, Service, ServiceContext, ServiceExit, ShotDriver,
    ShotService,
};

use std::time::Duration;

/// Grace window for a service's stop hook before force-termination.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

/// Poll interval for subprocess exit detection.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Process exit codes of the two binaries.
pub mod exit_code {
    /// Normal stop.
    pub const OK: i32 = 0;
    /// Generic failure.
    pub const FAILURE: i32 = 1;
    /// Configuration error before bootstrap completed.
    pub const CONFIG: i32 = 2;
}
