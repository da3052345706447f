// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clean and failing lifecycles observed on the registry stream.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn clean_lifecycle_produces_the_full_bracket() {
    let s = stack("services:\n  - type: echo\n    variant: t1\n");
    s.launcher.start().await.unwrap();
    wait_for_runner(&s, "echo.t1", RunnerState::Running).await;
    s.launcher.shutdown(Duration::from_secs(5)).await;

    let events = registry_events(&s.bus, "svc.registry.>").await;
    let echo: Vec<&RegistryEvent> =
        events.iter().filter(|e| e.service_id.to_string() == "echo.t1").collect();
    let kinds: Vec<RegistryEventKind> = echo.iter().map(|e| e.event).collect();
    assert_eq!(
        kinds,
        vec![
            RegistryEventKind::Declared,
            RegistryEventKind::Start,
            RegistryEventKind::Ready,
            RegistryEventKind::Stopping,
            RegistryEventKind::Stop,
        ]
    );
    let stop = echo.last().unwrap();
    assert_eq!(stop.exit, Some(ExitClass::Clean));
    assert!(stop.uptime_s.is_some());
}

#[tokio::test(start_paused = true)]
async fn startup_failure_publishes_failed_with_the_message() {
    let s = stack("services:\n  - type: failstart\n    variant: t1\n");
    s.launcher.start().await.unwrap();
    wait_for_runner(&s, "failstart.t1", RunnerState::Stopped).await;

    let kinds: Vec<RegistryEventKind> = registry_events(&s.bus, "svc.registry.>")
        .await
        .iter()
        .filter(|e| e.service_id.to_string() == "failstart.t1")
        .map(|e| e.event)
        .collect();
    assert_eq!(
        kinds,
        vec![
            RegistryEventKind::Declared,
            RegistryEventKind::Start,
            RegistryEventKind::Failed,
        ]
    );
    let failed = registry_events(&s.bus, "svc.registry.failed.failstart.t1").await;
    assert!(failed[0].reason.as_deref().unwrap_or_default().contains("boom"));

    let statuses = s.bus.replay("svc.status.failstart.t1").await.unwrap();
    let last: tcs_wire::StatusEvent =
        tcs_wire::decode(&statuses.last().unwrap().payload).unwrap();
    assert_eq!(last.status, Status::Failed);

    s.launcher.shutdown(Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn discovery_tracks_the_whole_fleet() {
    let yaml = r#"
services:
  - type: echo
    variant: t1
  - type: echo
    variant: spare
    enabled: false
"#;
    let s = stack(yaml);
    s.launcher.start().await.unwrap();
    wait_for_runner(&s, "echo.t1", RunnerState::Running).await;

    let client = DiscoveryClient::connect(s.bus.clone() as BusHandle, s.clock.clone())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Warm start sees both declared instances without prior knowledge.
    let echo: ServiceId = "echo.t1".parse().unwrap();
    let spare: ServiceId = "echo.spare".parse().unwrap();
    assert_eq!(client.view(&echo).unwrap().lifecycle, LifecycleState::Running);
    assert_eq!(client.view(&spare).unwrap().lifecycle, LifecycleState::Declared);

    s.launcher.shutdown(Duration::from_secs(5)).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.view(&echo).unwrap().lifecycle, LifecycleState::Stopped);
    assert_eq!(client.view(&spare).unwrap().lifecycle, LifecycleState::Declared);
}
