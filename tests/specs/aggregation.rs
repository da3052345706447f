// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worst-wins aggregation as published on the status stream.

use crate::prelude::*;
use tcs_monitor::{BusMonitor, Monitor, MonitorContext};

#[tokio::test]
async fn parent_reports_worst_child_with_both_summaries() {
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let bus = Arc::new(InMemoryBus::with_clock(clock.clone()));

    let root = Monitor::new("root", clock.clone());
    root.set_status(Status::Ok, "fine");
    let a = Monitor::new("a", clock.clone());
    a.set_status(Status::Ok, "camera idle");
    let b = Monitor::new("b", clock.clone());
    b.set_status(Status::Degraded, "focuser stuck");
    root.add_child(a).unwrap();
    root.add_child(b).unwrap();

    assert_eq!(root.effective_status(), Status::Degraded);

    let ctx = MonitorContext::new("root.main".parse().unwrap(), "oca-host", 1);
    let bus_monitor = BusMonitor::new(root, Some(bus.clone() as BusHandle), ctx, clock);
    bus_monitor.publish_status().await;

    let published = bus.replay("svc.status.>").await.unwrap();
    let event: tcs_wire::StatusEvent = tcs_wire::decode(&published[0].payload).unwrap();
    assert_eq!(event.status, Status::Degraded);
    assert_eq!(event.children.len(), 2);
    assert_eq!(event.children[0].name, "a");
    assert_eq!(event.children[0].status, Status::Ok);
    assert_eq!(event.children[1].name, "b");
    assert_eq!(event.children[1].status, Status::Degraded);
    assert_eq!(event.children[1].message, "focuser stuck");
}

#[tokio::test(start_paused = true)]
async fn launcher_aggregate_follows_worst_runner() {
    let yaml = r#"
services:
  - type: echo
    variant: t1
  - type: crash
    variant: t1
"#;
    let s = stack(yaml);
    s.launcher.start().await.unwrap();
    wait_for_runner(&s, "echo.t1", RunnerState::Running).await;
    wait_for_runner(&s, "crash.t1", RunnerState::Stopped).await;

    assert_eq!(s.launcher.monitor().effective_status(), Status::Failed);

    s.launcher.shutdown(Duration::from_secs(5)).await;
}
