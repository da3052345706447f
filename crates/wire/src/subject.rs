// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subject grammar for the three event families and RPC.
//!
//! Subjects are dot-separated tokens. Filters use `*` for exactly one
//! token and a trailing `>` for one-or-more.

use crate::registry::RegistryEventKind;
use tcs_core::ServiceId;

pub const REGISTRY_PREFIX: &str = "svc.registry";
pub const STATUS_PREFIX: &str = "svc.status";
pub const HEARTBEAT_PREFIX: &str = "svc.heartbeat";
pub const RPC_PREFIX: &str = "svc.rpc";

/// RPC command namespace version segment.
pub const RPC_VERSION: &str = "v1";

pub const REGISTRY_WILDCARD: &str = "svc.registry.>";
pub const STATUS_WILDCARD: &str = "svc.status.>";
pub const HEARTBEAT_WILDCARD: &str = "svc.heartbeat.>";

/// `svc.registry.<event>.<service_id>`
pub fn registry_subject(event: RegistryEventKind, service_id: &ServiceId) -> String {
    format!("{REGISTRY_PREFIX}.{event}.{service_id}")
}

/// `svc.status.<service_id>`
pub fn status_subject(service_id: &ServiceId) -> String {
    format!("{STATUS_PREFIX}.{service_id}")
}

/// `svc.heartbeat.<service_id>`
pub fn heartbeat_subject(service_id: &ServiceId) -> String {
    format!("{HEARTBEAT_PREFIX}.{service_id}")
}

/// `svc.rpc.<service_id>.v1.<command>`
pub fn rpc_subject(service_id: &ServiceId, command: &str) -> String {
    format!("{RPC_PREFIX}.{service_id}.{RPC_VERSION}.{command}")
}

/// Token-wise filter match. `*` matches one token; a trailing `>`
/// matches one or more remaining tokens.
pub fn subject_matches(filter: &str, subject: &str) -> bool {
    let mut filter_tokens = filter.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (filter_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(f), Some(s)) if f == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
#[path = "subject_tests.rs"]
mod tests;
