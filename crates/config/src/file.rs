// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The services file: bus endpoint, loader registry, service list and
//! per-type config sections.

use crate::error::ConfigError;
use crate::expand::expand_tree;
use crate::{JsonMap, INTERNAL_MODULE_NS};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tcs_core::{RestartPolicy, ServiceDescriptor, ServiceId};

/// Default config file location for the standalone entry.
pub const DEFAULT_CONFIG_PATH: &str = "./config/services.yaml";

const LEVEL_NAMES: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// `bus:` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusSection {
    pub host: String,
    pub port: u16,
}

impl Default for BusSection {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 4222 }
    }
}

/// Parsed services file after env expansion.
#[derive(Debug, Clone, Default)]
pub struct ServicesFile {
    pub bus: BusSection,
    /// `service_type → module_path`; `~` requests the internal fallback.
    pub registry: BTreeMap<String, Option<String>>,
    pub services: Vec<ServiceDescriptor>,
    /// Top-level `defaults:` mapping, lowest file layer.
    pub defaults: JsonMap,
    /// Remaining top-level mappings, keyed by `service_type` or
    /// `service_type.variant`.
    pub sections: BTreeMap<String, JsonMap>,
}

impl ServicesFile {
    pub fn load(
        path: &Path,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text, env)
    }

    pub fn parse(text: &str, env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        let mut root: Value = serde_json::to_value(yaml)
            .map_err(|e| ConfigError::Structure(e.to_string()))?;
        expand_tree(&mut root, env);

        let Value::Object(map) = root else {
            return Err(ConfigError::Structure("top level must be a mapping".to_string()));
        };

        let mut file = ServicesFile::default();
        let mut seen = BTreeSet::new();

        for (key, value) in map {
            match key.as_str() {
                "bus" => file.bus = parse_bus(&value)?,
                "registry" => file.registry = parse_registry(&value)?,
                "services" => {
                    let Value::Array(entries) = value else {
                        return Err(ConfigError::Structure(
                            "'services' must be a list".to_string(),
                        ));
                    };
                    for (index, entry) in entries.into_iter().enumerate() {
                        let desc = parse_service_entry(index, entry)?;
                        let id = desc.service_id()?;
                        if !seen.insert(id.to_string()) {
                            return Err(ConfigError::DuplicateService(id.to_string()));
                        }
                        file.services.push(desc);
                    }
                }
                "defaults" => {
                    if let Value::Object(obj) = value {
                        file.defaults = obj;
                    }
                }
                other => {
                    if let Value::Object(obj) = value {
                        file.sections.insert(other.to_string(), obj);
                    } else {
                        tracing::warn!(key = other, "ignoring non-mapping top-level config key");
                    }
                }
            }
        }
        Ok(file)
    }

    /// Loader namespace for a service type: registry entry, or the
    /// conventional internal namespace when absent or `~`.
    pub fn module_path_for(&self, service_type: &str) -> String {
        match self.registry.get(service_type) {
            Some(Some(path)) => path.clone(),
            _ => format!("{INTERNAL_MODULE_NS}.{service_type}"),
        }
    }

    pub fn section(&self, name: &str) -> Option<&JsonMap> {
        self.sections.get(name)
    }

    pub fn descriptor(&self, service_type: &str, variant: &str) -> Option<&ServiceDescriptor> {
        self.services
            .iter()
            .find(|d| d.service_type == service_type && d.variant == variant)
    }
}

fn parse_bus(value: &Value) -> Result<BusSection, ConfigError> {
    let mut bus = BusSection::default();
    let Value::Object(obj) = value else {
        return Err(ConfigError::Structure("'bus' must be a mapping".to_string()));
    };
    if let Some(host) = obj.get("host").and_then(Value::as_str) {
        bus.host = host.to_string();
    }
    if let Some(port) = obj.get("port") {
        bus.port = port
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| ConfigError::Structure(format!("invalid bus port: {port}")))?;
    }
    Ok(bus)
}

fn parse_registry(value: &Value) -> Result<BTreeMap<String, Option<String>>, ConfigError> {
    let Value::Object(obj) = value else {
        return Err(ConfigError::Structure("'registry' must be a mapping".to_string()));
    };
    let mut registry = BTreeMap::new();
    for (service_type, path) in obj {
        let entry = match path {
            Value::Null => None,
            Value::String(s) if s == "~" => None,
            Value::String(s) => Some(s.clone()),
            other => {
                return Err(ConfigError::Structure(format!(
                    "registry entry for '{service_type}' must be a string or ~, got {other}"
                )))
            }
        };
        registry.insert(service_type.clone(), entry);
    }
    Ok(registry)
}

fn parse_service_entry(index: usize, entry: Value) -> Result<ServiceDescriptor, ConfigError> {
    let Value::Object(mut obj) = entry else {
        return Err(ConfigError::Structure(format!("service entry {index} must be a mapping")));
    };

    let service_type = obj
        .remove("type")
        .as_ref()
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ConfigError::MissingType { index })?;

    let variant = match obj.remove("variant") {
        Some(v) => value_to_string(&v),
        None => match obj.remove("instance_context") {
            Some(v) => {
                tracing::warn!(
                    service_type,
                    "'instance_context' is deprecated, use 'variant'"
                );
                value_to_string(&v)
            }
            None => "default".to_string(),
        },
    };

    // Reject dotted variants and normalize before anything else.
    let id = ServiceId::new(&service_type, &variant)?;
    let mut desc = ServiceDescriptor::new(id.service_type(), id.variant());

    if let Some(value) = obj.remove("restart") {
        let text = value_to_string(&value);
        desc.restart = text.parse::<RestartPolicy>().map_err(|e| ConfigError::InvalidValue {
            service_id: id.to_string(),
            key: "restart".to_string(),
            detail: e.to_string(),
        })?;
    }
    if let Some(value) = obj.remove("restart_sec") {
        desc.restart_sec = non_negative_f64(&id, "restart_sec", &value)?;
    }
    if let Some(value) = obj.remove("restart_max") {
        desc.restart_max = value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| invalid(&id, "restart_max", "expected integer ≥ 0"))?;
    }
    if let Some(value) = obj.remove("restart_window") {
        let window = non_negative_f64(&id, "restart_window", &value)?;
        if window <= 0.0 {
            return Err(invalid(&id, "restart_window", "must be > 0"));
        }
        desc.restart_window = window;
    }
    if let Some(value) = obj.remove("log_level") {
        let level = value_to_string(&value).to_ascii_lowercase();
        if !LEVEL_NAMES.contains(&level.as_str()) {
            return Err(invalid(&id, "log_level", "expected trace|debug|info|warn|error"));
        }
        desc.log_level = Some(level);
    }
    if let Some(value) = obj.remove("enabled") {
        desc.enabled = value
            .as_bool()
            .ok_or_else(|| invalid(&id, "enabled", "expected bool"))?;
    }

    desc.options = obj;
    Ok(desc)
}

fn invalid(id: &ServiceId, key: &str, detail: &str) -> ConfigError {
    ConfigError::InvalidValue {
        service_id: id.to_string(),
        key: key.to_string(),
        detail: detail.to_string(),
    }
}

fn non_negative_f64(id: &ServiceId, key: &str, value: &Value) -> Result<f64, ConfigError> {
    let v = value.as_f64().ok_or_else(|| invalid(id, key, "expected number"))?;
    if v < 0.0 {
        return Err(invalid(id, key, "must be ≥ 0"));
    }
    Ok(v)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
