// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer precedence: CLI args over env over file over defaults.

use crate::prelude::*;
use std::collections::HashMap;
use tcs_config::{ConfigField, ConfigResolver, EnvSource, FieldKind, JsonMap, ServicesFile};

const FILE_WITH_TIMEOUT: &str = r#"
echo.t1:
  timeout: 10
services:
  - type: echo
    variant: t1
"#;

const FILE_WITHOUT_TIMEOUT: &str = r#"
services:
  - type: echo
    variant: t1
"#;

fn resolver(yaml: &str, env_pairs: &[(&str, &str)], cli_timeout: Option<i64>) -> ConfigResolver {
    let env_map: HashMap<String, String> =
        env_pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let env: EnvSource = Arc::new(move |name: &str| env_map.get(name).cloned());
    let file = ServicesFile::parse(yaml, &|name| env(name)).unwrap();

    let mut args = JsonMap::new();
    if let Some(timeout) = cli_timeout {
        args.insert("timeout".to_string(), serde_json::json!(timeout));
    }
    ConfigResolver::new(file, args, env)
}

fn resolved_timeout(resolver: &ConfigResolver) -> i64 {
    let schema = vec![ConfigField::optional("timeout", FieldKind::Int, 1)];
    resolver
        .resolve_instance("echo", "t1", &schema)
        .unwrap()
        .get("timeout")
        .and_then(serde_json::Value::as_i64)
        .unwrap()
}

#[test]
fn precedence_peels_off_layer_by_layer() {
    let env = [("ECHO_T1_TIMEOUT", "30")];

    // All layers present: CLI wins.
    assert_eq!(resolved_timeout(&resolver(FILE_WITH_TIMEOUT, &env, Some(50))), 50);

    // Remove CLI: env wins.
    assert_eq!(resolved_timeout(&resolver(FILE_WITH_TIMEOUT, &env, None)), 30);

    // Remove env: file wins.
    assert_eq!(resolved_timeout(&resolver(FILE_WITH_TIMEOUT, &[], None)), 10);

    // Remove file: schema default remains.
    assert_eq!(resolved_timeout(&resolver(FILE_WITHOUT_TIMEOUT, &[], None)), 1);
}

#[test]
fn resolution_is_deterministic_across_repeated_calls() {
    let r = resolver(FILE_WITH_TIMEOUT, &[("ECHO_T1_TIMEOUT", "30")], Some(50));
    let schema = vec![ConfigField::optional("timeout", FieldKind::Int, 1)];
    let first = r.resolve_instance("echo", "t1", &schema).unwrap();
    let second = r.resolve_instance("echo", "t1", &schema).unwrap();
    assert_eq!(first, second);
}
