// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus wire protocol: subjects, event payloads, RPC envelopes.
//!
//! All payloads are JSON; timestamps are UTC 7-tuples.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod heartbeat;
mod registry;
mod retention;
mod rpc;
mod status;
mod subject;

pub use heartbeat::HeartbeatEvent;
pub use registry::{ExitClass, RegistryEvent, RegistryEventKind};
pub use retention::{RetentionClass, RetentionConfig, StreamSpec};
pub use rpc::{HealthCheck, HealthReply, RpcError, RpcRequest, RpcResponse, StatsReply};
pub use status::StatusEvent;
pub use subject::{
    heartbeat_subject, registry_subject, rpc_subject, status_subject, subject_matches,
    HEARTBEAT_PREFIX, HEARTBEAT_WILDCARD, REGISTRY_PREFIX, REGISTRY_WILDCARD, RPC_PREFIX,
    RPC_VERSION, STATUS_PREFIX, STATUS_WILDCARD,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors encoding or decoding bus payloads.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("payload encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("payload decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode a payload record to JSON bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(value).map_err(WireError::Encode)
}

/// Decode JSON bytes into a payload record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    serde_json::from_slice(bytes).map_err(WireError::Decode)
}
