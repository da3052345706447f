// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-and-restart supervision up to the restart limit.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn repeated_crashes_exhaust_the_restart_budget() {
    let yaml = r#"
services:
  - type: crash
    variant: t1
    restart: on-failure
    restart_sec: 1
    restart_max: 2
    restart_window: 60
"#;
    let s = stack(yaml);
    s.launcher.start().await.unwrap();
    wait_for_runner(&s, "crash.t1", RunnerState::GivenUp).await;

    let starts = registry_events(&s.bus, "svc.registry.start.crash.t1").await;
    assert_eq!(starts.len(), 3, "initial launch plus two restarts");

    let restarting = registry_events(&s.bus, "svc.registry.restarting.crash.t1").await;
    let attempts: Vec<u32> = restarting.iter().filter_map(|e| e.attempt).collect();
    assert_eq!(attempts, vec![1, 2]);

    let failed = registry_events(&s.bus, "svc.registry.failed.crash.t1").await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].reason.as_deref(), Some("restart_limit"));

    // Nothing starts after the budget is gone.
    let all: Vec<RegistryEvent> = registry_events(&s.bus, "svc.registry.>")
        .await
        .into_iter()
        .filter(|e| e.service_id.to_string() == "crash.t1")
        .collect();
    let failed_at = all
        .iter()
        .position(|e| e.event == RegistryEventKind::Failed && e.reason.as_deref() == Some("restart_limit"))
        .unwrap();
    assert!(
        all[failed_at..].iter().all(|e| e.event != RegistryEventKind::Start),
        "no start after restart_limit"
    );

    s.launcher.shutdown(Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn every_restart_bracket_reports_a_failed_stop() {
    let yaml = r#"
services:
  - type: crash
    variant: t1
    restart: on-failure
    restart_sec: 1
    restart_max: 1
    restart_window: 60
"#;
    let s = stack(yaml);
    s.launcher.start().await.unwrap();
    wait_for_runner(&s, "crash.t1", RunnerState::GivenUp).await;

    let stops = registry_events(&s.bus, "svc.registry.stop.crash.t1").await;
    assert_eq!(stops.len(), 2);
    assert!(stops.iter().all(|e| e.exit == Some(ExitClass::Failed)));

    s.launcher.shutdown(Duration::from_secs(5)).await;
}
