// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${NAME}` environment expansion over a parsed config tree.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static ENV_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// Expand `${NAME}` tokens in every string scalar of the tree.
///
/// A scalar that is exactly one token (`"${PORT}"`) is re-typed when
/// the resolved value parses as integer, float or bool; mixed-content
/// strings stay strings. Undefined names are left as the literal
/// placeholder and produce a warning.
pub fn expand_tree(value: &mut Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) => {
            if let Some(expanded) = expand_scalar(s, lookup) {
                *value = expanded;
            }
        }
        Value::Array(items) => {
            for item in items {
                expand_tree(item, lookup);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                expand_tree(item, lookup);
            }
        }
        _ => {}
    }
}

fn expand_scalar(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Option<Value> {
    if !s.contains("${") {
        return None;
    }

    // Pure token: the whole scalar is one placeholder.
    if let Some(caps) = ENV_TOKEN.captures(s) {
        if caps.get(0).map(|m| m.as_str()) == Some(s) {
            let name = &caps[1];
            return match lookup(name) {
                Some(resolved) => Some(retype(&resolved)),
                None => {
                    tracing::warn!(name, "undefined environment variable in config");
                    None
                }
            };
        }
    }

    let replaced = ENV_TOKEN.replace_all(s, |caps: &regex::Captures| {
        let name = &caps[1];
        match lookup(name) {
            Some(resolved) => resolved,
            None => {
                tracing::warn!(name, "undefined environment variable in config");
                caps[0].to_string()
            }
        }
    });
    match replaced {
        std::borrow::Cow::Borrowed(_) => None,
        std::borrow::Cow::Owned(out) => Some(Value::String(out)),
    }
}

/// Best-effort scalar typing for pure-token expansions and env
/// override values.
pub(crate) fn retype(s: &str) -> Value {
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::from(f);
    }
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
