// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-service config schemas: typed field declarations applied after
//! layering.

use crate::error::ConfigError;
use serde_json::Value;
use tcs_core::ServiceId;

/// Expected scalar type of a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
}

/// One declared config field.
#[derive(Debug, Clone)]
pub struct ConfigField {
    pub name: String,
    pub kind: FieldKind,
    pub default: Option<Value>,
    pub required: bool,
}

impl ConfigField {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, default: None, required: true }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind, default: impl Into<Value>) -> Self {
        Self { name: name.into(), kind, default: Some(default.into()), required: false }
    }

    /// Coerce a raw layered value into this field's type.
    ///
    /// JSON values of the right type pass through; strings parse into
    /// numerics and bools (covers env-sourced values); integers widen
    /// to floats.
    pub fn coerce(&self, id: &ServiceId, value: &Value) -> Result<Value, ConfigError> {
        let coerced = match (self.kind, value) {
            (FieldKind::Str, Value::String(_)) => Some(value.clone()),
            (FieldKind::Str, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldKind::Str, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (FieldKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
            (FieldKind::Int, Value::String(s)) => s.parse::<i64>().ok().map(Value::from),
            (FieldKind::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (FieldKind::Float, Value::String(s)) => s.parse::<f64>().ok().map(Value::from),
            (FieldKind::Bool, Value::Bool(_)) => Some(value.clone()),
            (FieldKind::Bool, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        };
        coerced.ok_or_else(|| ConfigError::InvalidValue {
            service_id: id.to_string(),
            key: self.name.clone(),
            detail: format!("expected {:?}, got {value}", self.kind),
        })
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
