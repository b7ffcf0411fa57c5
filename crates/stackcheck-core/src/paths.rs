// crates/stackcheck-core/src/paths.rs
// ============================================================================
// Module: Path Condition Extraction
// Description: Derive condition constraints implied by walking a path into a document.
// Purpose: Tell rules which condition values must hold for a location to exist.
// Dependencies: crate::{identifiers, tree}, serde, serde_json
// ============================================================================

//! ## Overview
//! Reaching `.../Fn::If/1` means the branch condition was true; reaching
//! `.../Fn::If/2` means it was false. A path into a resource or output is
//! also governed by that entity's own `Condition` attribute. Extraction walks
//! the path once, without recursion, and stops contributing constraints at the
//! first structural mismatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::ConditionName;
use crate::tree::CONDITION;
use crate::tree::FN_IF;
use crate::tree::OUTPUTS_SECTION;
use crate::tree::PathSegment;
use crate::tree::RESOURCES_SECTION;
use crate::tree::if_condition_name;
use crate::tree::is_non_branch_function;
use crate::tree::step;

// ============================================================================
// SECTION: Branch Sets
// ============================================================================

/// Set of truth values a condition may take at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchSet {
    /// The condition may be true.
    pub when_true: bool,
    /// The condition may be false.
    pub when_false: bool,
}

impl BranchSet {
    /// Only the true branch.
    pub const TRUE: Self = Self {
        when_true: true,
        when_false: false,
    };
    /// Only the false branch.
    pub const FALSE: Self = Self {
        when_true: false,
        when_false: true,
    };
    /// Either branch.
    pub const BOTH: Self = Self {
        when_true: true,
        when_false: true,
    };

    /// Returns the set holding exactly `value`.
    #[must_use]
    pub const fn only(value: bool) -> Self {
        if value { Self::TRUE } else { Self::FALSE }
    }

    /// Returns true when `value` is admissible.
    #[must_use]
    pub const fn contains(self, value: bool) -> bool {
        if value { self.when_true } else { self.when_false }
    }

    /// Returns the union of two sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            when_true: self.when_true || other.when_true,
            when_false: self.when_false || other.when_false,
        }
    }

    /// Returns true when both values are admissible.
    #[must_use]
    pub const fn is_both(self) -> bool {
        self.when_true && self.when_false
    }
}

// ============================================================================
// SECTION: Path Conditions
// ============================================================================

/// Constraints implied by a path, keyed by condition name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathConditions(BTreeMap<ConditionName, BranchSet>);

impl PathConditions {
    /// Returns the admissible values for a condition, if it is constrained.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<BranchSet> {
        self.0.get(name).copied()
    }

    /// Returns constrained condition names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &ConditionName> {
        self.0.keys()
    }

    /// Iterates over constraints in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, ConditionName, BranchSet> {
        self.0.iter()
    }

    /// Returns the number of constrained conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no constraint was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when `value` is admissible for `name`; unconstrained names admit anything.
    #[must_use]
    pub fn admits(&self, name: &str, value: bool) -> bool {
        self.get(name).is_none_or(|branches| branches.contains(value))
    }

    /// Merges a constraint into the set.
    fn record(&mut self, name: &str, branches: BranchSet) {
        self.0
            .entry(ConditionName::new(name))
            .and_modify(|existing| *existing = existing.union(branches))
            .or_insert(branches);
    }
}

impl FromIterator<(ConditionName, BranchSet)> for PathConditions {
    fn from_iter<I: IntoIterator<Item = (ConditionName, BranchSet)>>(iter: I) -> Self {
        let mut conditions = Self::default();
        for (name, branches) in iter {
            conditions.record(name.as_str(), branches);
        }
        conditions
    }
}

impl<'a> IntoIterator for &'a PathConditions {
    type IntoIter = btree_map::Iter<'a, ConditionName, BranchSet>;
    type Item = (&'a ConditionName, &'a BranchSet);

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Switches controlling path condition extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathConditionOptions {
    /// Add the addressed resource's or output's own `Condition` as true.
    pub include_resource_conditions: bool,
    /// Keep descending into `Fn::If` nodes nested inside other functions.
    pub include_if_in_function: bool,
    /// Record only a branch at the end of the path.
    pub only_last: bool,
}

impl Default for PathConditionOptions {
    fn default() -> Self {
        Self {
            include_resource_conditions: true,
            include_if_in_function: true,
            only_last: false,
        }
    }
}

/// Extracts the condition constraints implied by reaching `path`.
///
/// Never fails: a path that leaves the document simply stops contributing.
#[must_use]
pub fn extract_path_conditions(
    document: &Value,
    path: &[PathSegment],
    options: PathConditionOptions,
) -> PathConditions {
    let mut conditions = PathConditions::default();

    if options.include_resource_conditions
        && let Some(name) = entity_condition(document, path)
    {
        conditions.record(name, BranchSet::TRUE);
    }

    let mut node = document;
    for (position, segment) in path.iter().enumerate() {
        if let PathSegment::Key(key) = segment {
            if key == FN_IF {
                let Some(args) = step(node, segment) else {
                    break;
                };
                let at_end = position + 2 >= path.len();
                if (!options.only_last || at_end)
                    && let Some(name) = if_condition_name(args)
                {
                    conditions.record(name, selected_branch(path.get(position + 1)));
                }
            } else if !options.include_if_in_function && is_non_branch_function(key) {
                break;
            }
        }
        match step(node, segment) {
            Some(next) => node = next,
            None => break,
        }
    }
    conditions
}

/// Maps the segment following `Fn::If` to the branch it selects.
const fn selected_branch(next: Option<&PathSegment>) -> BranchSet {
    match next {
        Some(PathSegment::Index(1)) => BranchSet::TRUE,
        Some(PathSegment::Index(2)) => BranchSet::FALSE,
        _ => BranchSet::BOTH,
    }
}

/// Returns the `Condition` attribute of the resource or output the path starts in.
fn entity_condition<'a>(document: &'a Value, path: &[PathSegment]) -> Option<&'a str> {
    let [PathSegment::Key(section), PathSegment::Key(name), ..] = path else {
        return None;
    };
    if section != RESOURCES_SECTION && section != OUTPUTS_SECTION {
        return None;
    }
    document.get(section)?.get(name)?.get(CONDITION)?.as_str()
}
