// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario specs.

pub use std::sync::Arc;
pub use std::time::Duration;
pub use tcs_bus::{Bus, BusHandle, InMemoryBus};
pub use tcs_core::{FakeClock, ServiceId, Status};
pub use tcs_discovery::{DiscoveryClient, LifecycleState};
pub use tcs_launcher::{LaunchKind, Launcher, ProcessContext, RunnerState, ServiceRegistry};
pub use tcs_wire::{ExitClass, RegistryEvent, RegistryEventKind};

use async_trait::async_trait;
use tcs_config::{ConfigResolver, EnvSource, JsonMap, ServicesFile};
use tcs_launcher::{
    LoopDriver, LoopService, Service, ServiceContext, ServiceError, ShotDriver, ShotService,
};

/// Loop service that idles until cancelled.
struct EchoLoop;

#[async_trait]
impl LoopService<FakeClock> for EchoLoop {
    async fn run(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Loop service whose run raises immediately.
struct CrashingLoop;

#[async_trait]
impl LoopService<FakeClock> for CrashingLoop {
    async fn run(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        Err(ServiceError::new("crash loop exited with code 1"))
    }
}

/// Single-shot service that completes immediately.
struct QuickShot;

#[async_trait]
impl ShotService<FakeClock> for QuickShot {
    async fn execute(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Permanent service whose start hook raises.
struct FailingStart;

#[async_trait]
impl Service<FakeClock> for FailingStart {
    async fn start(&mut self, _ctx: &ServiceContext<FakeClock>) -> Result<(), ServiceError> {
        Err(ServiceError::new("ValueError: boom"))
    }

    async fn stop(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

pub fn spec_registry() -> ServiceRegistry<FakeClock> {
    let registry = ServiceRegistry::new();
    registry.register("echo", Vec::new(), Arc::new(|| Box::new(LoopDriver::new(EchoLoop))));
    registry.register(
        "crash",
        Vec::new(),
        Arc::new(|| Box::new(LoopDriver::new(CrashingLoop))),
    );
    registry.register("failstart", Vec::new(), Arc::new(|| Box::new(FailingStart)));
    registry.register(
        "shot",
        Vec::new(),
        Arc::new(|| Box::new(ShotDriver::new(QuickShot))),
    );
    registry
}

pub fn spec_resolver(yaml: &str) -> ConfigResolver {
    let env: EnvSource = Arc::new(|_| None);
    let file = ServicesFile::parse(yaml, &|_| None).expect("spec yaml parses");
    ConfigResolver::new(file, JsonMap::new(), env)
}

/// The whole in-process stack on one in-memory bus.
pub struct Stack {
    pub clock: FakeClock,
    pub bus: Arc<InMemoryBus<FakeClock>>,
    pub launcher: Launcher<FakeClock>,
}

pub fn stack(yaml: &str) -> Stack {
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let bus = Arc::new(InMemoryBus::with_clock(clock.clone()));
    let context = ProcessContext::assemble(
        spec_resolver(yaml),
        Some(bus.clone() as BusHandle),
        Arc::new(spec_registry()),
        clock.clone(),
    );
    let launcher = Launcher::new(
        context,
        LaunchKind::InProcess,
        std::path::PathBuf::from("services.yaml"),
    )
    .expect("launcher assembles");
    Stack { clock, bus, launcher }
}

pub async fn registry_events(bus: &InMemoryBus<FakeClock>, filter: &str) -> Vec<RegistryEvent> {
    bus.replay(filter)
        .await
        .expect("replay")
        .iter()
        .map(|m| tcs_wire::decode::<RegistryEvent>(&m.payload).expect("decode registry event"))
        .collect()
}

pub async fn wait_for_runner(stack: &Stack, service: &str, state: RunnerState) {
    let id: ServiceId = service.parse().expect("service id");
    loop {
        if stack.launcher.runner(&id).is_some_and(|r| r.state() == state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
