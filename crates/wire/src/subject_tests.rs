// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn echo_t1() -> ServiceId {
    ServiceId::new("echo", "t1").unwrap()
}

#[test]
fn subject_builders() {
    let id = echo_t1();
    assert_eq!(
        registry_subject(RegistryEventKind::Declared, &id),
        "svc.registry.declared.echo.t1"
    );
    assert_eq!(status_subject(&id), "svc.status.echo.t1");
    assert_eq!(heartbeat_subject(&id), "svc.heartbeat.echo.t1");
    assert_eq!(rpc_subject(&id, "health"), "svc.rpc.echo.t1.v1.health");
}

#[yare::parameterized(
    exact            = { "svc.status.echo.t1", "svc.status.echo.t1", true },
    tail_wildcard    = { "svc.registry.>", "svc.registry.start.echo.t1", true },
    tail_needs_token = { "svc.registry.>", "svc.registry", false },
    star_one_token   = { "svc.status.*.t1", "svc.status.echo.t1", true },
    star_not_two     = { "svc.status.*", "svc.status.echo.t1", false },
    prefix_mismatch  = { "svc.heartbeat.>", "svc.status.echo.t1", false },
    shorter_subject  = { "svc.status.echo.t1", "svc.status.echo", false },
    longer_subject   = { "svc.status.echo", "svc.status.echo.t1", false },
)]
fn filter_matching(filter: &str, subject: &str, expected: bool) {
    assert_eq!(subject_matches(filter, subject), expected, "{filter} vs {subject}");
}

#[test]
fn rpc_wildcard_serves_all_versioned_commands() {
    let id = echo_t1();
    let serve_filter = format!("svc.rpc.{id}.{RPC_VERSION}.>");
    assert!(subject_matches(&serve_filter, &rpc_subject(&id, "health")));
    assert!(subject_matches(&serve_filter, &rpc_subject(&id, "stop.echo.t1")));
}
