// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Layered configuration for service instances.
//!
//! Precedence, highest first: CLI args → bus-sourced values → env
//! overrides → file sections → schema defaults. The file is YAML;
//! `${NAME}` tokens are expanded from the environment at load time.

mod error;
mod expand;
mod file;
mod layers;
mod resolver;
mod schema;

pub use error::ConfigError;
pub use expand::expand_tree;
pub use file::{BusSection, ServicesFile, DEFAULT_CONFIG_PATH};
pub use layers::{ConfigLayer, LayerSource, LayerStack};
pub use resolver::{BusConfig, ConfigResolver, EnvSource};
pub use schema::{ConfigField, FieldKind};

/// String-keyed JSON object, the working currency of every layer.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Conventional loader namespace for built-in service types.
pub const INTERNAL_MODULE_NS: &str = "ocabox_tcs.services";
