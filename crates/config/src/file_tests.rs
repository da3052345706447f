// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

const SAMPLE: &str = r#"
bus:
  host: nats.oca.lan
  port: 4223

registry:
  echo: ~
  guider: plugins.guiding

defaults:
  timeout: 5

telescope:
  focal_length: 13500

telescope.zb08:
  focal_length: 13520

services:
  - type: echo
    variant: t1
    restart: on-failure
    restart_sec: 1
    restart_max: 2
    restart_window: 60
    timeout: 10
  - type: telescope
    variant: zb08
    enabled: false
"#;

#[test]
fn parses_all_sections() {
    let file = ServicesFile::parse(SAMPLE, &no_env).unwrap();

    assert_eq!(file.bus, BusSection { host: "nats.oca.lan".into(), port: 4223 });
    assert_eq!(file.registry.get("echo"), Some(&None));
    assert_eq!(file.registry.get("guider"), Some(&Some("plugins.guiding".to_string())));
    assert_eq!(file.defaults.get("timeout"), Some(&serde_json::json!(5)));
    assert_eq!(
        file.section("telescope.zb08").and_then(|s| s.get("focal_length")),
        Some(&serde_json::json!(13520))
    );

    let echo = file.descriptor("echo", "t1").unwrap();
    assert_eq!(echo.restart, tcs_core::RestartPolicy::OnFailure);
    assert_eq!(echo.restart_sec, 1.0);
    assert_eq!(echo.restart_max, 2);
    assert_eq!(echo.options.get("timeout"), Some(&serde_json::json!(10)));
    assert!(echo.enabled);

    let telescope = file.descriptor("telescope", "zb08").unwrap();
    assert!(!telescope.enabled);
}

#[test]
fn module_path_fallback() {
    let file = ServicesFile::parse(SAMPLE, &no_env).unwrap();
    assert_eq!(file.module_path_for("echo"), "ocabox_tcs.services.echo");
    assert_eq!(file.module_path_for("guider"), "plugins.guiding");
    assert_eq!(file.module_path_for("unlisted"), "ocabox_tcs.services.unlisted");
}

#[test]
fn variant_defaults_to_default() {
    let file = ServicesFile::parse("services:\n  - type: echo\n", &no_env).unwrap();
    assert_eq!(file.services[0].variant, "default");
}

#[test]
fn instance_context_is_accepted_as_variant() {
    let file =
        ServicesFile::parse("services:\n  - type: echo\n    instance_context: old\n", &no_env)
            .unwrap();
    assert_eq!(file.services[0].variant, "old");
}

#[test]
fn env_expansion_applies_before_typing() {
    let vars: HashMap<String, String> =
        [("BUS_PORT_CFG".to_string(), "4224".to_string())].into();
    let file = ServicesFile::parse(
        "bus:\n  host: localhost\n  port: ${BUS_PORT_CFG}\n",
        &|name| vars.get(name).cloned(),
    )
    .unwrap();
    assert_eq!(file.bus.port, 4224);
}

#[yare::parameterized(
    bad_restart = { "services:\n  - type: e\n    restart: maybe\n" },
    bad_level   = { "services:\n  - type: e\n    log_level: loud\n" },
    bad_window  = { "services:\n  - type: e\n    restart_window: 0\n" },
    dotted      = { "services:\n  - type: e\n    variant: a.b\n" },
    no_type     = { "services:\n  - variant: t1\n" },
)]
fn rejects_invalid_entries(yaml: &str) {
    assert!(ServicesFile::parse(yaml, &no_env).is_err());
}

#[test]
fn rejects_duplicate_instances() {
    let yaml = "services:\n  - type: echo\n    variant: t1\n  - type: echo\n    variant: t1\n";
    assert!(matches!(
        ServicesFile::parse(yaml, &no_env).unwrap_err(),
        ConfigError::DuplicateService(_)
    ));
}

#[test]
fn load_reports_unreadable_file() {
    let err = ServicesFile::load(std::path::Path::new("/nonexistent/services.yaml"), &no_env)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
