// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered configuration layers.

use crate::JsonMap;
use serde_json::Value;
use std::fmt;

/// Where a layer came from. Declaration order is precedence order,
/// lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerSource {
    Defaults,
    File,
    Env,
    Bus,
    Args,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerSource::Defaults => "defaults",
            LayerSource::File => "file",
            LayerSource::Env => "env",
            LayerSource::Bus => "bus",
            LayerSource::Args => "args",
        };
        f.write_str(name)
    }
}

/// One layer of key/value pairs.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: LayerSource,
    pub values: JsonMap,
}

impl ConfigLayer {
    pub fn new(source: LayerSource, values: JsonMap) -> Self {
        Self { source, values }
    }
}

/// A stack of layers, kept sorted lowest-precedence first.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<ConfigLayer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a layer; insertion keeps precedence order stable, so pushes
    /// may happen in any order.
    pub fn push(&mut self, layer: ConfigLayer) {
        let at = self.layers.partition_point(|l| l.source <= layer.source);
        self.layers.insert(at, layer);
    }

    /// Resolve one key, highest layer wins.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.layers.iter().rev().find_map(|layer| layer.values.get(key))
    }

    /// Source of the winning layer for a key. Diagnostics.
    pub fn provenance(&self, key: &str) -> Option<LayerSource> {
        self.layers
            .iter()
            .rev()
            .find(|layer| layer.values.contains_key(key))
            .map(|layer| layer.source)
    }

    /// Merge all layers into one map, highest wins per key.
    pub fn merged(&self) -> JsonMap {
        let mut out = JsonMap::new();
        for layer in &self.layers {
            for (key, value) in &layer.values {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "layers_tests.rs"]
mod tests;
