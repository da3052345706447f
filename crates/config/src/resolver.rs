// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance configuration resolution.

use crate::error::ConfigError;
use crate::file::ServicesFile;
use crate::layers::{ConfigLayer, LayerSource, LayerStack};
use crate::schema::ConfigField;
use crate::JsonMap;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tcs_core::{ServiceDescriptor, ServiceId};

/// Environment access, injectable for tests.
pub type EnvSource = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Bootstrap endpoint for the bus connection (phase one of the
/// two-phase bootstrap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
}

/// Resolves effective configuration maps for service instances from
/// the layered sources.
#[derive(Clone)]
pub struct ConfigResolver {
    file: ServicesFile,
    args: JsonMap,
    bus_layer: Option<JsonMap>,
    env: EnvSource,
}

impl ConfigResolver {
    /// Load from a file path using the process environment.
    pub fn load(path: &Path, args: JsonMap) -> Result<Self, ConfigError> {
        let env: EnvSource = Arc::new(|name: &str| std::env::var(name).ok());
        let file = ServicesFile::load(path, &|name| env(name))?;
        Ok(Self::new(file, args, env))
    }

    pub fn new(file: ServicesFile, args: JsonMap, env: EnvSource) -> Self {
        Self { file, args, bus_layer: None, env }
    }

    pub fn file(&self) -> &ServicesFile {
        &self.file
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.file.services
    }

    pub fn descriptor(&self, service_type: &str, variant: &str) -> Option<&ServiceDescriptor> {
        self.file.descriptor(service_type, variant)
    }

    pub fn module_path_for(&self, service_type: &str) -> String {
        self.file.module_path_for(service_type)
    }

    /// Phase one: the bus endpoint from file, `BUS_HOST`/`BUS_PORT`
    /// env and `bus_host`/`bus_port` args.
    pub fn bus_config(&self) -> Result<BusConfig, ConfigError> {
        let mut host = self.file.bus.host.clone();
        let mut port = self.file.bus.port;

        if let Some(h) = (self.env)("BUS_HOST") {
            host = h;
        }
        if let Some(p) = (self.env)("BUS_PORT") {
            port = p
                .parse::<u16>()
                .map_err(|_| ConfigError::Structure(format!("invalid BUS_PORT: {p}")))?;
        }
        if let Some(h) = self.args.get("bus_host").and_then(Value::as_str) {
            host = h.to_string();
        }
        if let Some(p) = self.args.get("bus_port") {
            port = p
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .or_else(|| p.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| ConfigError::Structure(format!("invalid bus_port arg: {p}")))?;
        }
        Ok(BusConfig { host, port })
    }

    /// Phase two: install dynamic values fetched over the bus. Later
    /// lookups see this layer above env and file.
    pub fn attach_bus_layer(&mut self, values: JsonMap) {
        self.bus_layer = Some(values);
    }

    /// Assemble the effective config map for one instance.
    ///
    /// Layering, lowest first: schema defaults → file `defaults` →
    /// `service_type` section → `service_type.variant` section → the
    /// service entry's own fields → env overrides → bus layer → args.
    pub fn resolve_instance(
        &self,
        service_type: &str,
        variant: &str,
        schema: &[ConfigField],
    ) -> Result<JsonMap, ConfigError> {
        let id = ServiceId::new(service_type, variant)?;
        let mut stack = LayerStack::new();

        let mut defaults = JsonMap::new();
        for field in schema {
            if let Some(default) = &field.default {
                defaults.insert(field.name.clone(), default.clone());
            }
        }
        stack.push(ConfigLayer::new(LayerSource::Defaults, defaults));

        stack.push(ConfigLayer::new(LayerSource::File, self.file.defaults.clone()));
        if let Some(section) = self.file.section(id.service_type()) {
            stack.push(ConfigLayer::new(LayerSource::File, section.clone()));
        }
        if let Some(section) = self.file.section(&id.to_string()) {
            stack.push(ConfigLayer::new(LayerSource::File, section.clone()));
        }
        if let Some(desc) = self.file.descriptor(id.service_type(), id.variant()) {
            stack.push(ConfigLayer::new(LayerSource::File, desc.options.clone()));
        }

        stack.push(ConfigLayer::new(LayerSource::Env, self.env_overrides(&id, schema, &stack)));

        if let Some(bus_layer) = &self.bus_layer {
            stack.push(ConfigLayer::new(LayerSource::Bus, bus_layer.clone()));
        }
        stack.push(ConfigLayer::new(LayerSource::Args, self.args.clone()));

        let mut resolved = stack.merged();
        for field in schema {
            match resolved.get(&field.name) {
                Some(value) => {
                    let coerced = field.coerce(&id, value)?;
                    resolved.insert(field.name.clone(), coerced);
                }
                None if field.required => {
                    return Err(ConfigError::MissingField {
                        service_id: id.to_string(),
                        field: field.name.clone(),
                    });
                }
                None => {}
            }
        }
        Ok(resolved)
    }

    /// Env overrides keyed `{TYPE}_{VARIANT}_{FIELD}` or
    /// `{TYPE}_{FIELD}`, the more specific key winning. Candidate
    /// fields are the schema names plus every key the file layers
    /// already define.
    fn env_overrides(&self, id: &ServiceId, schema: &[ConfigField], stack: &LayerStack) -> JsonMap {
        let mut fields: Vec<String> = schema.iter().map(|f| f.name.clone()).collect();
        for key in stack.merged().keys() {
            if !fields.iter().any(|f| f == key) {
                fields.push(key.clone());
            }
        }

        let mut overrides = JsonMap::new();
        for field in fields {
            let specific = env_key(&[id.service_type(), id.variant(), &field]);
            let general = env_key(&[id.service_type(), &field]);
            let value = (self.env)(&specific).or_else(|| (self.env)(&general));
            if let Some(raw) = value {
                overrides.insert(field, crate::expand::retype(&raw));
            }
        }
        overrides
    }
}

fn env_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.replace('.', "_").to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
