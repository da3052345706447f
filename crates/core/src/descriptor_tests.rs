// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    no          = { "no", RestartPolicy::No },
    on_failure  = { "on-failure", RestartPolicy::OnFailure },
    on_abnormal = { "on-abnormal", RestartPolicy::OnAbnormal },
    always      = { "always", RestartPolicy::Always },
)]
fn restart_policy_parses(input: &str, expected: RestartPolicy) {
    assert_eq!(input.parse::<RestartPolicy>().unwrap(), expected);
    assert_eq!(expected.to_string(), input);
}

#[test]
fn restart_policy_rejects_unknown() {
    assert!("sometimes".parse::<RestartPolicy>().is_err());
}

#[test]
fn descriptor_defaults() {
    let desc = ServiceDescriptor::new("echo", "t1");
    assert_eq!(desc.restart, RestartPolicy::No);
    assert_eq!(desc.restart_sec, DEFAULT_RESTART_SEC);
    assert_eq!(desc.restart_max, 0);
    assert_eq!(desc.restart_window, DEFAULT_RESTART_WINDOW);
    assert!(desc.enabled);
    assert_eq!(desc.service_id().unwrap().to_string(), "echo.t1");
}

#[test]
fn descriptor_deserializes_with_defaults() {
    let json = r#"{"service_type": "echo", "variant": "t1", "module_path": ""}"#;
    let desc: ServiceDescriptor = serde_json::from_str(json).unwrap();
    assert_eq!(desc.restart, RestartPolicy::No);
    assert!(desc.enabled);
    assert!(desc.options.is_empty());
}
