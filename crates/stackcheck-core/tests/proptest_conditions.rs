// crates/stackcheck-core/tests/proptest_conditions.rs
// ============================================================================
// Module: Condition Engine Property-Based Tests
// Description: Randomized checks for hashing, enumeration, and rewriting.
// Purpose: Ensure determinism and idempotence hold for arbitrary inputs without panics.
// ============================================================================

//! ## Overview
//! Property tests over generated JSON values and condition sections:
//! - structural keys ignore map key order,
//! - enumeration is repeatable and every scenario satisfies its definitions,
//! - rewriting with a complete scenario is idempotent and leaves no branches,
//! - malformed sections never panic.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use stackcheck_core::CanonicalKey;
use stackcheck_core::ConditionTable;
use stackcheck_core::Scenario;
use stackcheck_core::condition_names_in;
use stackcheck_core::rewrite_for_scenario;

// ============================================================================
// SECTION: Strategies
// ============================================================================

fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|value| json!(value)),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0 .. 6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Condition names used by generated sections and subtrees.
const NAMES: [&str; 4] = ["A", "B", "C", "D"];

fn definition_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        (0 .. 3usize, "[a-c]").prop_map(|(param, literal)| {
            json!({"Fn::Equals": [{"Ref": format!("P{param}")}, literal]})
        }),
        (0 .. NAMES.len()).prop_map(|index| json!({"Condition": NAMES[index]})),
        json_value_strategy(),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(|items| json!({"Fn::And": items})),
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(|items| json!({"Fn::Or": items})),
            inner.prop_map(|item| json!({"Fn::Not": [item]})),
        ]
    })
}

fn section_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec(definition_strategy(), NAMES.len()).prop_map(|definitions| {
        let map: Map<String, Value> =
            NAMES.iter().map(|name| (*name).to_string()).zip(definitions).collect();
        Value::Object(map)
    })
}

fn branching_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        "[a-z]{0,4}".prop_map(Value::String),
        Just(json!({"Ref": "AWS::NoValue"})),
        any::<i64>().prop_map(|value| json!(value)),
    ];
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            (0 .. NAMES.len(), inner.clone(), inner.clone())
                .prop_map(|(index, yes, no)| json!({"Fn::If": [NAMES[index], yes, no]})),
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0 .. 4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Reverses the key order of every map in a value.
fn reverse_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            Value::Object(map.iter().rev().map(|(key, child)| (key.clone(), reverse_keys(child))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(reverse_keys).collect()),
        other => other.clone(),
    }
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn canonical_key_ignores_key_order(value in json_value_strategy()) {
        prop_assert_eq!(CanonicalKey::of(&value), CanonicalKey::of(&reverse_keys(&value)));
    }

    #[test]
    fn arbitrary_sections_load_and_enumerate(section in section_strategy()) {
        let table = ConditionTable::load(&section);
        prop_assert_eq!(table.len(), NAMES.len());
        let first = table.scenarios(NAMES);
        let second = table.scenarios(NAMES);
        prop_assert!(!first.is_empty());
        prop_assert_eq!(&first, &second);
        for scenario in &first {
            prop_assert_eq!(scenario.len(), NAMES.len());
        }
    }

    #[test]
    fn subsets_project_from_full_enumeration(section in section_strategy()) {
        let table = ConditionTable::load(&section);
        let full = table.scenarios(NAMES);
        let pair = table.scenarios(["A", "C"]);
        for scenario in &pair {
            let projected = full.iter().any(|candidate| {
                candidate.get("A") == scenario.get("A") && candidate.get("C") == scenario.get("C")
            });
            prop_assert!(projected, "{:?} missing from full enumeration", scenario);
        }
    }

    #[test]
    fn complete_rewrite_is_idempotent(
        value in branching_strategy(),
        bits in prop::collection::vec(any::<bool>(), NAMES.len()),
    ) {
        let scenario: Scenario = NAMES.iter().copied().zip(bits).collect();
        let once = rewrite_for_scenario(&value, &scenario);
        if let Some(once) = once {
            prop_assert!(condition_names_in(&once, 64).is_empty());
            prop_assert_eq!(rewrite_for_scenario(&once, &scenario), Some(once.clone()));
        }
    }
}
