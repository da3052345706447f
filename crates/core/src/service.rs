// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service identity: `"{service_type}.{variant}"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors constructing a [`ServiceId`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceIdError {
    #[error("service type must not be empty")]
    EmptyType,
    #[error("variant must not be empty")]
    EmptyVariant,
    #[error("variant must not contain '.': {0}")]
    DottedVariant(String),
}

/// Identity of a service instance.
///
/// The type segment is dot-namespaced with arbitrary depth; the variant
/// is the final segment and never contains a dot, so the full id parses
/// unambiguously by splitting on the last dot. Ids are lowercase on the
/// wire; constructors normalize.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceId {
    service_type: String,
    variant: String,
}

impl ServiceId {
    pub fn new(
        service_type: impl Into<String>,
        variant: impl Into<String>,
    ) -> Result<Self, ServiceIdError> {
        let service_type = service_type.into().to_ascii_lowercase();
        let variant = variant.into().to_ascii_lowercase();
        if service_type.is_empty() {
            return Err(ServiceIdError::EmptyType);
        }
        if variant.is_empty() {
            return Err(ServiceIdError::EmptyVariant);
        }
        if variant.contains('.') {
            return Err(ServiceIdError::DottedVariant(variant));
        }
        Ok(Self { service_type, variant })
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service_type, self.variant)
    }
}

impl FromStr for ServiceId {
    type Err = ServiceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((service_type, variant)) => Self::new(service_type, variant),
            None => Err(ServiceIdError::EmptyVariant),
        }
    }
}

impl TryFrom<String> for ServiceId {
    type Error = ServiceIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ServiceId> for String {
    fn from(id: ServiceId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
