// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture helpers and proptest strategies for other crates' tests.

use crate::descriptor::{RestartPolicy, ServiceDescriptor};
use crate::status::Status;

/// All status levels in aggregation order.
pub const ALL_STATUSES: [Status; 10] = [
    Status::Unknown,
    Status::Ok,
    Status::Idle,
    Status::Busy,
    Status::Startup,
    Status::Shutdown,
    Status::Warning,
    Status::Degraded,
    Status::Error,
    Status::Failed,
];

/// Descriptor fixture with an `on-failure` restart policy.
pub fn restartable_descriptor(service_type: &str, variant: &str) -> ServiceDescriptor {
    let mut desc = ServiceDescriptor::new(service_type, variant);
    desc.restart = RestartPolicy::OnFailure;
    desc.restart_sec = 0.0;
    desc
}

#[cfg(any(test, feature = "proptest"))]
pub mod strategies {
    use super::*;
    use proptest::prelude::*;

    /// Any status level.
    pub fn arb_status() -> impl Strategy<Value = Status> {
        proptest::sample::select(ALL_STATUSES.to_vec())
    }
}
