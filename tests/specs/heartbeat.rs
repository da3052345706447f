// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat cadence and zombie detection.

use crate::prelude::*;
use tcs_monitor::{BusMonitor, Monitor, MonitorContext};
use tcs_wire::HeartbeatEvent;

fn heartbeat_publisher(
    clock: &FakeClock,
    bus: &Arc<InMemoryBus<FakeClock>>,
) -> Arc<BusMonitor<FakeClock>> {
    let monitor = Monitor::new("echo.t1", clock.clone());
    monitor.set_status(Status::Ok, "running");
    let ctx = MonitorContext::new("echo.t1".parse().unwrap(), "oca-host", 11);
    Arc::new(BusMonitor::new(
        monitor,
        Some(bus.clone() as BusHandle),
        ctx,
        clock.clone(),
    ))
}

#[tokio::test(start_paused = true)]
async fn missed_heartbeat_marks_zombie_while_registry_says_running() {
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let bus = Arc::new(InMemoryBus::with_clock(clock.clone()));

    let publisher = heartbeat_publisher(&clock, &bus);
    publisher.publish_start().await;
    publisher.publish_heartbeat().await;

    let client = DiscoveryClient::connect(bus.clone() as BusHandle, clock.clone())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let echo: ServiceId = "echo.t1".parse().unwrap();
    let view = client.view(&echo).unwrap();
    assert_eq!(view.heartbeat_sequence, 1);
    assert!(!view.heartbeat_dead);

    // Wall clock passes next_heartbeat_expected (t0 + 30s) with no
    // further heartbeat by t0 + 31s.
    clock.advance(Duration::from_secs(31));
    tokio::time::sleep(Duration::from_secs(2)).await;

    let view = client.view(&echo).unwrap();
    assert!(view.heartbeat_dead);
    assert_eq!(view.lifecycle, LifecycleState::Running, "registry still says RUNNING");
}

#[tokio::test]
async fn sequences_increase_and_schedules_are_non_decreasing() {
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let bus = Arc::new(InMemoryBus::with_clock(clock.clone()));
    let publisher = heartbeat_publisher(&clock, &bus);
    publisher.publish_start().await;

    for _ in 0..3 {
        publisher.publish_heartbeat().await;
        clock.advance(Duration::from_secs(30));
    }

    let beats: Vec<HeartbeatEvent> = bus
        .replay("svc.heartbeat.>")
        .await
        .unwrap()
        .iter()
        .map(|m| tcs_wire::decode(&m.payload).unwrap())
        .collect();
    let sequences: Vec<u64> = beats.iter().map(|b| b.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    for pair in beats.windows(2) {
        assert!(pair[0].next_heartbeat_expected <= pair[1].next_heartbeat_expected);
    }
    for beat in &beats {
        assert!(beat.timestamp < beat.next_heartbeat_expected);
    }

    // A new start bracket resets the sequence.
    publisher.publish_start().await;
    publisher.publish_heartbeat().await;
    let beats = bus.replay("svc.heartbeat.>").await.unwrap();
    let last: HeartbeatEvent = tcs_wire::decode(&beats.last().unwrap().payload).unwrap();
    assert_eq!(last.sequence, 1);
}
