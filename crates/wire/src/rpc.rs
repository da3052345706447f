// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response envelopes for `svc.rpc.<service_id>.v1.<command>`.

use serde::{Deserialize, Serialize};
use tcs_core::{MetricMap, Status};

/// RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub command: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub args: serde_json::Value,
}

impl RpcRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), args: serde_json::Value::Null }
    }
}

/// RPC response envelope: `ok` with data, or `error` with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum RpcResponse {
    Ok {
        #[serde(default)]
        data: serde_json::Value,
    },
    Error {
        error: RpcError,
    },
}

impl RpcResponse {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => RpcResponse::Ok { data },
            Err(e) => RpcResponse::error("encode", e.to_string()),
        }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        RpcResponse::Error { error: RpcError { kind: kind.into(), message: message.into() } }
    }
}

/// Structured RPC error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub kind: String,
    pub message: String,
}

/// Reply payload of the mandatory `health` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: Status,
    #[serde(default)]
    pub checks: Vec<HealthCheck>,
}

/// One healthcheck result inside a [`HealthReply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Reply payload of the mandatory `stats` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReply {
    pub uptime_s: f64,
    pub heartbeat_sequence: u64,
    pub metrics: MetricMap,
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
