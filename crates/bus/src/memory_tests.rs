// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tcs_core::FakeClock;

fn payload(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

#[tokio::test]
async fn subscribers_receive_matching_subjects_only() {
    let bus = InMemoryBus::new();
    let mut registry = bus.subscribe("svc.registry.>").await.unwrap();
    let mut status = bus.subscribe("svc.status.>").await.unwrap();

    bus.publish("svc.registry.start.echo.t1", payload("a")).await.unwrap();
    bus.publish("svc.status.echo.t1", payload("b")).await.unwrap();

    let msg = registry.recv().await.unwrap();
    assert_eq!(msg.subject, "svc.registry.start.echo.t1");
    assert!(registry.try_recv().is_none());

    let msg = status.recv().await.unwrap();
    assert_eq!(msg.payload, payload("b"));
}

#[tokio::test]
async fn replay_returns_retained_history_oldest_first() {
    let clock = FakeClock::new();
    let bus = InMemoryBus::with_clock(clock.clone());

    bus.publish("svc.registry.declared.echo.t1", payload("1")).await.unwrap();
    clock.advance(Duration::from_secs(1));
    bus.publish("svc.registry.start.echo.t1", payload("2")).await.unwrap();
    clock.advance(Duration::from_secs(1));
    bus.publish("svc.rpc.echo.t1.v1.health", payload("not retained")).await.unwrap();

    let history = bus.replay("svc.registry.>").await.unwrap();
    let subjects: Vec<&str> = history.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(
        subjects,
        vec!["svc.registry.declared.echo.t1", "svc.registry.start.echo.t1"]
    );

    assert!(bus.replay("svc.rpc.>").await.unwrap().is_empty());
}

#[tokio::test]
async fn registry_capped_per_subject() {
    let clock = FakeClock::new();
    let retention = RetentionConfig { registry_max_msgs: 2, ..RetentionConfig::default() };
    let bus = InMemoryBus::with_retention(clock.clone(), retention);

    for i in 0..5 {
        clock.advance(Duration::from_secs(1));
        bus.publish("svc.registry.status.echo.t1", payload(&i.to_string())).await.unwrap();
    }
    // Another subject is unaffected by the first one's cap.
    bus.publish("svc.registry.start.echo.t2", payload("x")).await.unwrap();

    let history = bus.replay("svc.registry.status.echo.t1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].payload, payload("3"));
    assert_eq!(history[1].payload, payload("4"));
    assert_eq!(bus.replay("svc.registry.start.echo.t2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn heartbeats_age_out() {
    let clock = FakeClock::new();
    let bus = InMemoryBus::with_clock(clock.clone());

    bus.publish("svc.heartbeat.echo.t1", payload("old")).await.unwrap();
    clock.advance(Duration::from_secs(25 * 3600));
    bus.publish("svc.heartbeat.echo.t1", payload("new")).await.unwrap();

    let history = bus.replay("svc.heartbeat.>").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].payload, payload("new"));
}

#[tokio::test]
async fn registry_history_survives_age() {
    let clock = FakeClock::new();
    let bus = InMemoryBus::with_clock(clock.clone());

    bus.publish("svc.registry.declared.echo.t1", payload("d")).await.unwrap();
    clock.advance(Duration::from_secs(365 * 24 * 3600));
    assert_eq!(bus.replay("svc.registry.>").await.unwrap().len(), 1);
}

#[tokio::test]
async fn request_reaches_responder() {
    let bus = InMemoryBus::new();
    let mut server = bus.serve("svc.rpc.echo.t1.v1.>").await.unwrap();

    let server_task = tokio::spawn(async move {
        let req = server.next().await.unwrap();
        assert_eq!(req.subject, "svc.rpc.echo.t1.v1.health");
        req.respond(payload("healthy"));
    });

    let response = bus
        .request("svc.rpc.echo.t1.v1.health", payload("{}"), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(response, payload("healthy"));
    server_task.await.unwrap();
}

#[tokio::test]
async fn request_without_responder_errors() {
    let bus = InMemoryBus::new();
    let err = bus
        .request("svc.rpc.ghost.t1.v1.health", payload("{}"), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, BusError::NoResponder(_)));
}

#[tokio::test(start_paused = true)]
async fn request_times_out_when_responder_stays_silent() {
    let bus = InMemoryBus::new();
    // Responder exists but never answers.
    let _server = bus.serve("svc.rpc.echo.t1.v1.>").await.unwrap();

    let err = bus
        .request("svc.rpc.echo.t1.v1.stats", payload("{}"), Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(matches!(err, BusError::Timeout(_)));
}

#[tokio::test]
async fn dropped_subscribers_are_pruned() {
    let bus = InMemoryBus::new();
    let sub = bus.subscribe("svc.status.>").await.unwrap();
    drop(sub);

    bus.publish("svc.status.echo.t1", payload("x")).await.unwrap();
    bus.publish("svc.status.echo.t1", payload("y")).await.unwrap();
    assert_eq!(bus.retained_len(RetentionClass::Status), 2);
}
