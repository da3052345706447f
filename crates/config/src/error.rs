// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration error taxonomy. Fatal at startup: the launcher maps
//! these to exit code 2.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file parse failed: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config file structure: {0}")]
    Structure(String),

    #[error("service entry {index}: missing 'type'")]
    MissingType { index: usize },

    #[error("service {service_id}: invalid value for '{key}': {detail}")]
    InvalidValue { service_id: String, key: String, detail: String },

    #[error("service {service_id}: required field '{field}' has no value and no default")]
    MissingField { service_id: String, field: String },

    #[error("duplicate service instance: {0}")]
    DuplicateService(String),

    #[error("invalid service identity: {0}")]
    Identity(#[from] tcs_core::ServiceIdError),
}
