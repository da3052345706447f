// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service constructor registry.
//!
//! Modules contribute entries by calling [`ServiceRegistry::register`]
//! at program assembly time; the config file's `registry:` section
//! supplies loader namespaces for diagnostics only. There is no
//! import-time magic: a type the registry does not know is a discovery
//! failure.

use crate::service::BoxedService;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tcs_config::ConfigField;
use tcs_core::{Clock, SystemClock};

/// Builds a fresh, unstarted service instance.
pub type ServiceCtor<C> = Arc<dyn Fn() -> BoxedService<C> + Send + Sync>;

/// One registered service type.
pub struct ServiceRegistration<C: Clock> {
    pub schema: Vec<ConfigField>,
    pub ctor: ServiceCtor<C>,
}

/// `service_type → constructor` map shared by a process.
pub struct ServiceRegistry<C: Clock = SystemClock> {
    entries: Mutex<HashMap<String, ServiceRegistration<C>>>,
}

impl<C: Clock> Default for ServiceRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ServiceRegistry<C> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Register a constructor for a service type. Later registrations
    /// replace earlier ones.
    pub fn register(
        &self,
        service_type: impl Into<String>,
        schema: Vec<ConfigField>,
        ctor: ServiceCtor<C>,
    ) {
        let service_type = service_type.into();
        let replaced = self
            .entries
            .lock()
            .insert(service_type.clone(), ServiceRegistration { schema, ctor })
            .is_some();
        if replaced {
            tracing::warn!(service_type, "service registration replaced");
        }
    }

    pub fn contains(&self, service_type: &str) -> bool {
        self.entries.lock().contains_key(service_type)
    }

    pub fn schema(&self, service_type: &str) -> Option<Vec<ConfigField>> {
        self.entries.lock().get(service_type).map(|r| r.schema.clone())
    }

    /// Instantiate a service of the given type.
    pub fn create(&self, service_type: &str) -> Option<BoxedService<C>> {
        let ctor = self.entries.lock().get(service_type).map(|r| Arc::clone(&r.ctor))?;
        Some(ctor())
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.lock().keys().cloned().collect();
        types.sort();
        types
    }
}
