// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn layer(source: LayerSource, pairs: &[(&str, Value)]) -> ConfigLayer {
    let mut values = JsonMap::new();
    for (k, v) in pairs {
        values.insert(k.to_string(), v.clone());
    }
    ConfigLayer::new(source, values)
}

#[test]
fn higher_layer_wins() {
    let mut stack = LayerStack::new();
    stack.push(layer(LayerSource::Defaults, &[("timeout", json!(5))]));
    stack.push(layer(LayerSource::File, &[("timeout", json!(10))]));
    stack.push(layer(LayerSource::Env, &[("timeout", json!(30))]));
    stack.push(layer(LayerSource::Args, &[("timeout", json!(50))]));

    assert_eq!(stack.lookup("timeout"), Some(&json!(50)));
    assert_eq!(stack.provenance("timeout"), Some(LayerSource::Args));
}

#[test]
fn push_order_does_not_matter() {
    let mut forward = LayerStack::new();
    forward.push(layer(LayerSource::File, &[("a", json!(1))]));
    forward.push(layer(LayerSource::Args, &[("a", json!(2))]));

    let mut reversed = LayerStack::new();
    reversed.push(layer(LayerSource::Args, &[("a", json!(2))]));
    reversed.push(layer(LayerSource::File, &[("a", json!(1))]));

    assert_eq!(forward.lookup("a"), reversed.lookup("a"));
    assert_eq!(forward.merged(), reversed.merged());
}

#[test]
fn lookup_falls_through_missing_layers() {
    let mut stack = LayerStack::new();
    stack.push(layer(LayerSource::Defaults, &[("a", json!("low"))]));
    stack.push(layer(LayerSource::Args, &[("b", json!("high"))]));

    assert_eq!(stack.lookup("a"), Some(&json!("low")));
    assert_eq!(stack.lookup("b"), Some(&json!("high")));
    assert_eq!(stack.lookup("missing"), None);
}

#[test]
fn merged_combines_disjoint_keys() {
    let mut stack = LayerStack::new();
    stack.push(layer(LayerSource::File, &[("a", json!(1)), ("b", json!(2))]));
    stack.push(layer(LayerSource::Bus, &[("b", json!(3)), ("c", json!(4))]));

    let merged = stack.merged();
    assert_eq!(merged.get("a"), Some(&json!(1)));
    assert_eq!(merged.get("b"), Some(&json!(3)));
    assert_eq!(merged.get("c"), Some(&json!(4)));
}

#[test]
fn same_source_layers_stack_in_push_order() {
    let mut stack = LayerStack::new();
    stack.push(layer(LayerSource::File, &[("a", json!("type-section"))]));
    stack.push(layer(LayerSource::File, &[("a", json!("variant-section"))]));

    assert_eq!(stack.lookup("a"), Some(&json!("variant-section")));
}
