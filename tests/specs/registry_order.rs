// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry stream grammar.
//!
//! For every service instance, the sequence on its registry subject
//! must stay a prefix of `declared → start → ready → stopping → stop`;
//! supervisor events (`crashed`, `restarting`, `failed`) and repeated
//! `declared` may only appear between start/stop brackets. Randomized
//! fleets exercise the supervisor across policies and budgets.

use crate::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Validate one service's registry event sequence against the grammar.
fn check_registry_grammar(kinds: &[RegistryEventKind]) -> Result<(), String> {
    const BRACKET: [RegistryEventKind; 4] = [
        RegistryEventKind::Start,
        RegistryEventKind::Ready,
        RegistryEventKind::Stopping,
        RegistryEventKind::Stop,
    ];

    let mut in_bracket = false;
    let mut position = 0;
    for (index, kind) in kinds.iter().enumerate() {
        match kind {
            RegistryEventKind::Declared
            | RegistryEventKind::Crashed
            | RegistryEventKind::Restarting
            | RegistryEventKind::Failed => {
                // Supervisor-originated; closes any open bracket.
                in_bracket = false;
            }
            RegistryEventKind::Start => {
                in_bracket = true;
                position = 0;
            }
            other => {
                if !in_bracket {
                    return Err(format!("{other} at {index} outside a start bracket"));
                }
                let Some(next) = BRACKET.iter().position(|k| k == other) else {
                    return Err(format!("{other} at {index} is not a bracket event"));
                };
                if next <= position {
                    return Err(format!("{other} at {index} out of bracket order"));
                }
                position = next;
                if *other == RegistryEventKind::Stop {
                    in_bracket = false;
                }
            }
        }
    }
    Ok(())
}

#[test]
fn grammar_accepts_a_full_restart_cycle() {
    use RegistryEventKind::*;
    let trace = [
        Declared, Start, Ready, Stopping, Stop, Restarting, Start, Ready, Stopping, Stop, Failed,
    ];
    assert!(check_registry_grammar(&trace).is_ok());
}

#[test]
fn grammar_accepts_a_startup_failure_prefix() {
    use RegistryEventKind::*;
    assert!(check_registry_grammar(&[Declared, Start, Failed]).is_ok());
}

#[test]
fn grammar_rejects_bracket_events_without_start() {
    use RegistryEventKind::*;
    assert!(check_registry_grammar(&[Declared, Ready]).is_err());
    assert!(check_registry_grammar(&[Stop]).is_err());
    assert!(check_registry_grammar(&[Declared, Start, Stop, Stopping]).is_err());
}

#[test]
fn grammar_rejects_out_of_order_brackets() {
    use RegistryEventKind::*;
    assert!(check_registry_grammar(&[Start, Stopping, Ready]).is_err());
    assert!(check_registry_grammar(&[Start, Ready, Ready]).is_err());
}

const SERVICE_TYPES: [&str; 4] = ["echo", "crash", "failstart", "shot"];
const POLICIES: [&str; 3] = ["no", "on-failure", "always"];

fn service_entry(index: usize, type_idx: usize, policy_idx: usize, restart_max: u32) -> String {
    format!(
        "  - type: {}\n    variant: s{index}\n    restart: {}\n    restart_sec: 1\n    restart_max: {restart_max}\n    restart_window: 60\n",
        SERVICE_TYPES[type_idx], POLICIES[policy_idx],
    )
}

/// Run one fleet to quiescence and collect the per-service traces.
fn run_scenario(yaml: &str) -> BTreeMap<String, Vec<RegistryEventKind>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("runtime builds");
    runtime.block_on(async {
        let s = stack(yaml);
        s.launcher.start().await.expect("launcher starts");
        // Let crashes, back-offs and restart budgets play out.
        tokio::time::sleep(Duration::from_secs(10)).await;
        s.launcher.shutdown(Duration::from_secs(5)).await;

        let mut traces: BTreeMap<String, Vec<RegistryEventKind>> = BTreeMap::new();
        for event in registry_events(&s.bus, "svc.registry.>").await {
            traces.entry(event.service_id.to_string()).or_default().push(event.event);
        }
        traces
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    // Invariant: whatever mix of behaviors, policies and budgets the
    // supervisor runs, no subject ever violates the grammar.
    #[test]
    fn registry_streams_stay_within_the_grammar(
        services in proptest::collection::vec((0usize..4, 0usize..3, 0u32..3), 1..4),
    ) {
        let mut yaml = String::from("services:\n");
        for (index, (type_idx, policy_idx, restart_max)) in services.iter().enumerate() {
            yaml.push_str(&service_entry(index, *type_idx, *policy_idx, *restart_max));
        }

        let traces = run_scenario(&yaml);
        prop_assert!(!traces.is_empty());
        for (service_id, kinds) in traces {
            let verdict = check_registry_grammar(&kinds);
            prop_assert!(
                verdict.is_ok(),
                "{}: {} in {:?}",
                service_id,
                verdict.unwrap_err(),
                kinds
            );
        }
    }
}
