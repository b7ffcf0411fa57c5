// crates/stackcheck-core/src/tree.rs
// ============================================================================
// Module: Document Tree Helpers
// Description: Marker keys, path types, and node recognizers for parsed documents.
// Purpose: Give every traversal one shared vocabulary for branches and sentinels.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Documents arrive already decoded as [`serde_json::Value`] trees. This module
//! names the keys the condition engine cares about and recognizes the two
//! special node shapes: the ternary branch `{"Fn::If": [name, a, b]}` and the
//! no-value sentinel `{"Ref": "AWS::NoValue"}`. Recognizers are total: any
//! shape that does not match exactly is simply not a branch or sentinel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Marker Keys
// ============================================================================

/// Ternary branch function key.
pub const FN_IF: &str = "Fn::If";
/// Equality connective key.
pub const FN_EQUALS: &str = "Fn::Equals";
/// Conjunction connective key.
pub const FN_AND: &str = "Fn::And";
/// Disjunction connective key.
pub const FN_OR: &str = "Fn::Or";
/// Negation connective key.
pub const FN_NOT: &str = "Fn::Not";
/// Prefix shared by every intrinsic function key.
pub const FUNCTION_PREFIX: &str = "Fn::";
/// Reference key.
pub const REF: &str = "Ref";
/// Condition reference key, also the entity-level condition attribute.
pub const CONDITION: &str = "Condition";
/// Top-level section holding named conditions.
pub const CONDITIONS_SECTION: &str = "Conditions";
/// Top-level section holding resources.
pub const RESOURCES_SECTION: &str = "Resources";
/// Top-level section holding outputs.
pub const OUTPUTS_SECTION: &str = "Outputs";
/// Pseudo parameter denoting "no value".
pub const NO_VALUE: &str = "AWS::NoValue";
/// Pseudo parameter holding the deployment region.
pub const REGION: &str = "AWS::Region";

// ============================================================================
// SECTION: Paths
// ============================================================================

/// One step into a document: a map key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Sequence position.
    Index(usize),
    /// Map key.
    Key(String),
}

impl PathSegment {
    /// Returns the key when this segment addresses a map entry.
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    /// Returns the index when this segment addresses a sequence element.
    #[must_use]
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => key.fmt(f),
            Self::Index(index) => index.fmt(f),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Ordered location inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplatePath(Vec<PathSegment>);

impl TemplatePath {
    /// Creates an empty path addressing the document root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns the number of segments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the path addresses the root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TemplatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str("/")?;
            }
            segment.fmt(f)?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for TemplatePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<PathSegment>> for TemplatePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl AsRef<[PathSegment]> for TemplatePath {
    fn as_ref(&self) -> &[PathSegment] {
        &self.0
    }
}

/// Builds a [`TemplatePath`] from keys and indices.
///
/// ```
/// use stackcheck_core::template_path;
///
/// let path = template_path!["Resources", "Bucket", "Properties", "Fn::If", 1];
/// assert_eq!(path.len(), 5);
/// ```
#[macro_export]
macro_rules! template_path {
    ($($segment:expr),* $(,)?) => {
        <$crate::tree::TemplatePath as ::std::iter::FromIterator<$crate::tree::PathSegment>>::from_iter(
            [$($crate::tree::PathSegment::from($segment)),*]
        )
    };
}

// ============================================================================
// SECTION: Node Recognizers
// ============================================================================

/// A well-formed ternary branch node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfBranch<'a> {
    /// Name of the condition selecting the arm.
    pub condition: &'a str,
    /// Value taken when the condition holds.
    pub when_true: &'a Value,
    /// Value taken when the condition does not hold.
    pub when_false: &'a Value,
}

/// Recognizes `{"Fn::If": [name, when_true, when_false]}`.
#[must_use]
pub fn if_branch(value: &Value) -> Option<IfBranch<'_>> {
    let args = single_entry(value, FN_IF)?.as_array()?;
    match args.as_slice() {
        [Value::String(condition), when_true, when_false] => Some(IfBranch {
            condition,
            when_true,
            when_false,
        }),
        _ => None,
    }
}

/// Returns the condition name of an `Fn::If` argument list, if it has one.
///
/// Unlike [`if_branch`], this accepts lists of the wrong length so that
/// traversal can still attribute a partially written branch to its condition.
#[must_use]
pub fn if_condition_name(args: &Value) -> Option<&str> {
    args.as_array()?.first()?.as_str()
}

/// Returns true for the no-value sentinel `{"Ref": "AWS::NoValue"}`.
#[must_use]
pub fn is_no_value(value: &Value) -> bool {
    ref_target(value) == Some(NO_VALUE)
}

/// Returns the target of a `{"Ref": target}` node.
#[must_use]
pub fn ref_target(value: &Value) -> Option<&str> {
    single_entry(value, REF)?.as_str()
}

/// Returns true for intrinsic function keys other than `Fn::If`.
#[must_use]
pub fn is_non_branch_function(key: &str) -> bool {
    key.starts_with(FUNCTION_PREFIX) && key != FN_IF
}

/// Returns true when the value contains no intrinsic function or reference.
///
/// Values nested deeper than `max_depth` are conservatively reported as
/// non-literal.
#[must_use]
pub fn is_literal(value: &Value, max_depth: usize) -> bool {
    if max_depth == 0 {
        return false;
    }
    match value {
        Value::Array(items) => items.iter().all(|item| is_literal(item, max_depth - 1)),
        Value::Object(map) => map.iter().all(|(key, child)| {
            !key.starts_with(FUNCTION_PREFIX)
                && key != REF
                && key != CONDITION
                && is_literal(child, max_depth - 1)
        }),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
    }
}

/// Resolves a path against a document.
#[must_use]
pub fn value_at<'a>(document: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(document, |node, segment| step(node, segment))
}

/// Descends one segment, returning `None` on any structural mismatch.
#[must_use]
pub fn step<'a>(node: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get(key),
        (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
        _ => None,
    }
}

/// Returns the value of a single-entry map whose only key is `key`.
fn single_entry<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get(key)
}
