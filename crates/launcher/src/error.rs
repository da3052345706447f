// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framework error taxonomy at the lifecycle boundaries.
//!
//! Services may fail however they like inside their hooks; the
//! controller catches at the boundary and maps into these kinds.

use tcs_core::ServiceIdError;
use thiserror::Error;

/// An error raised by a service hook. Carried as a message so the
/// framework can clone and republish it; services wrap their own error
/// types via [`ServiceError::from_source`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn from_source(source: impl std::error::Error) -> Self {
        Self(source.to_string())
    }
}

impl From<String> for ServiceError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ServiceError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Controller-level failures.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// No constructor registered for the requested service type.
    #[error("service type not registered: {service_type} (module {module_path})")]
    Discovery { service_type: String, module_path: String },

    #[error(transparent)]
    Config(#[from] tcs_config::ConfigError),

    #[error(transparent)]
    Identity(#[from] ServiceIdError),

    #[error("startup failed: {0}")]
    Startup(#[source] ServiceError),

    #[error("service error: {0}")]
    Runtime(#[source] ServiceError),

    #[error("shutdown failed: {0}")]
    Shutdown(#[source] ServiceError),

    #[error("controller is {0}, cannot {1}")]
    InvalidState(crate::controller::ControllerState, &'static str),
}

/// Launcher-level failures.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error(transparent)]
    Config(#[from] tcs_config::ConfigError),

    #[error(transparent)]
    Identity(#[from] ServiceIdError),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("ambiguous variant '{0}': matches {1}")]
    AmbiguousVariant(String, String),

    #[error("spawn failed: {0}")]
    Spawn(String),
}
