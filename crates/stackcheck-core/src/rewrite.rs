// crates/stackcheck-core/src/rewrite.rs
// ============================================================================
// Module: Scenario Rewriting
// Description: Resolve `Fn::If` branches in a subtree under a fixed scenario.
// Purpose: Produce the concrete shapes a conditional subtree can take.
// Dependencies: crate::{conditions, identifiers, limits, tree}, serde, serde_json
// ============================================================================

//! ## Overview
//! Rewriting replaces each `Fn::If` whose condition the scenario assigns with
//! the selected arm, and drops `{"Ref": "AWS::NoValue"}` together with the
//! map entry or list element holding it. Branches on conditions the scenario
//! does not mention, malformed branch nodes, and anything below the depth
//! limit are returned unchanged, so rewriting never fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::conditions::Scenario;
use crate::conditions::ScenarioEnumerator;
use crate::identifiers::ConditionName;
use crate::limits::DEFAULT_MAX_TREE_DEPTH;
use crate::tree::FN_IF;
use crate::tree::if_branch;
use crate::tree::if_condition_name;
use crate::tree::is_no_value;

// ============================================================================
// SECTION: Rewrite
// ============================================================================

/// Rewrites a subtree under a scenario with the default depth limit.
///
/// Returns `None` when the whole subtree resolves to no value.
#[must_use]
pub fn rewrite_for_scenario(value: &Value, scenario: &Scenario) -> Option<Value> {
    rewrite_for_scenario_bounded(value, scenario, DEFAULT_MAX_TREE_DEPTH)
}

/// Rewrites a subtree under a scenario, descending at most `max_depth` levels.
#[must_use]
pub fn rewrite_for_scenario_bounded(
    value: &Value,
    scenario: &Scenario,
    max_depth: usize,
) -> Option<Value> {
    if is_no_value(value) {
        return None;
    }
    if max_depth == 0 {
        return Some(value.clone());
    }
    if let Some(branch) = if_branch(value) {
        return match scenario.get(branch.condition) {
            Some(true) => rewrite_for_scenario_bounded(branch.when_true, scenario, max_depth - 1),
            Some(false) => rewrite_for_scenario_bounded(branch.when_false, scenario, max_depth - 1),
            None => Some(value.clone()),
        };
    }
    match value {
        Value::Object(map) => {
            if map.len() == 1 && map.contains_key(FN_IF) {
                return Some(value.clone());
            }
            let rewritten: Map<String, Value> = map
                .iter()
                .filter_map(|(key, child)| {
                    rewrite_for_scenario_bounded(child, scenario, max_depth - 1)
                        .map(|child| (key.clone(), child))
                })
                .collect();
            Some(Value::Object(rewritten))
        }
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| rewrite_for_scenario_bounded(item, scenario, max_depth - 1))
                .collect(),
        )),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(value.clone()),
    }
}

// ============================================================================
// SECTION: Condition Discovery
// ============================================================================

/// Returns the condition names used by `Fn::If` nodes in a subtree.
///
/// Names are deduplicated and listed in pre-order discovery order. Nodes
/// deeper than `max_depth` are not inspected.
#[must_use]
pub fn condition_names_in(value: &Value, max_depth: usize) -> Vec<ConditionName> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<(&Value, usize)> = vec![(value, 0)];
    while let Some((node, depth)) = stack.pop() {
        if depth >= max_depth {
            continue;
        }
        match node {
            Value::Object(map) => {
                if let Some(args) = map.get(FN_IF)
                    && let Some(name) = if_condition_name(args)
                    && seen.insert(name)
                {
                    names.push(ConditionName::new(name));
                }
                stack.extend(map.values().rev().map(|child| (child, depth + 1)));
            }
            Value::Array(items) => {
                stack.extend(items.iter().rev().map(|item| (item, depth + 1)));
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }
    names
}

// ============================================================================
// SECTION: Concrete Shapes
// ============================================================================

/// One concrete shape of a conditional subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioValue {
    /// Assignment the shape was produced under.
    pub scenario: Scenario,
    /// Rewritten subtree, or `None` when it resolves to no value.
    pub value: Option<Value>,
}

/// Returns the rewritten subtree for every scenario over its own conditions.
///
/// A subtree without branches yields a single pair with the empty scenario.
#[must_use]
pub fn object_without_conditions(
    enumerator: &ScenarioEnumerator<'_>,
    value: &Value,
) -> Vec<ScenarioValue> {
    let max_depth = enumerator.limits().max_tree_depth;
    let names = condition_names_in(value, max_depth);
    enumerator
        .enumerate(names)
        .into_iter()
        .map(|scenario| {
            let value = rewrite_for_scenario_bounded(value, &scenario, max_depth);
            ScenarioValue {
                scenario,
                value,
            }
        })
        .collect()
}
