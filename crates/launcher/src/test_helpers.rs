// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for controller, runner and launcher tests.

use crate::error::ServiceError;
use crate::registry::ServiceRegistry;
use crate::service::{LoopDriver, LoopService, Service, ServiceContext, ShotDriver, ShotService};
use async_trait::async_trait;
use std::sync::Arc;
use tcs_bus::{Bus, InMemoryBus};
use tcs_config::{ConfigResolver, EnvSource, JsonMap, ServicesFile};
use tcs_core::FakeClock;
use tcs_wire::{RegistryEvent, RegistryEventKind};

pub(crate) fn parse_resolver(yaml: &str) -> ConfigResolver {
    let env: EnvSource = Arc::new(|_| None);
    let file = ServicesFile::parse(yaml, &|_| None).expect("fixture yaml parses");
    ConfigResolver::new(file, JsonMap::new(), env)
}

pub(crate) async fn registry_kinds(
    bus: &InMemoryBus<FakeClock>,
    filter: &str,
) -> Vec<RegistryEventKind> {
    bus.replay(filter)
        .await
        .expect("replay")
        .iter()
        .map(|m| tcs_wire::decode::<RegistryEvent>(&m.payload).expect("decode").event)
        .collect()
}

pub(crate) async fn registry_events(
    bus: &InMemoryBus<FakeClock>,
    filter: &str,
) -> Vec<RegistryEvent> {
    bus.replay(filter)
        .await
        .expect("replay")
        .iter()
        .map(|m| tcs_wire::decode::<RegistryEvent>(&m.payload).expect("decode"))
        .collect()
}

/// Loop service that idles until cancelled.
pub(crate) struct EchoLoop;

#[async_trait]
impl LoopService<FakeClock> for EchoLoop {
    async fn run(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Loop service that fails its run immediately.
pub(crate) struct CrashingLoop;

#[async_trait]
impl LoopService<FakeClock> for CrashingLoop {
    async fn run(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        Err(ServiceError::new("boom"))
    }
}

/// Permanent service whose start hook raises.
pub(crate) struct FailingStart;

#[async_trait]
impl Service<FakeClock> for FailingStart {
    async fn start(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        Err(ServiceError::new("boom"))
    }

    async fn stop(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Permanent service whose stop hook never returns.
pub(crate) struct HangingStop;

#[async_trait]
impl Service<FakeClock> for HangingStop {
    async fn start(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ServiceError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Single-shot service that completes immediately.
pub(crate) struct OneShot {
    pub(crate) fail: bool,
}

#[async_trait]
impl ShotService<FakeClock> for OneShot {
    async fn execute(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        if self.fail {
            Err(ServiceError::new("shot failed"))
        } else {
            Ok(())
        }
    }
}

pub(crate) fn test_registry() -> ServiceRegistry<FakeClock> {
    let registry = ServiceRegistry::new();
    registry.register("echo", Vec::new(), Arc::new(|| Box::new(LoopDriver::new(EchoLoop))));
    registry.register(
        "crash",
        Vec::new(),
        Arc::new(|| Box::new(LoopDriver::new(CrashingLoop))),
    );
    registry.register("failstart", Vec::new(), Arc::new(|| Box::new(FailingStart)));
    registry.register("hangstop", Vec::new(), Arc::new(|| Box::new(HangingStop)));
    registry.register(
        "shot",
        Vec::new(),
        Arc::new(|| Box::new(ShotDriver::new(OneShot { fail: false }))),
    );
    registry.register(
        "shotfail",
        Vec::new(),
        Arc::new(|| Box::new(ShotDriver::new(OneShot { fail: true }))),
    );
    registry
}
