// crates/stackcheck-core/src/limits.rs
// ============================================================================
// Module: Engine Limits
// Description: Hard bounds on enumeration width and traversal depth.
// Purpose: Keep pathological documents from exhausting time or stack.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every recursive walk in the engine carries a depth budget and every
//! enumeration carries a width budget. When a budget runs out the engine
//! falls back to the conservative answer (ambiguous, unchanged, or
//! unconstrained) instead of failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default number of variables enumerated exhaustively.
pub const DEFAULT_MAX_VARIABLES: usize = 16;
/// Hard ceiling on exhaustively enumerated variables.
pub const MAX_VARIABLES_CEILING: usize = 24;
/// Default maximum number of scenarios returned by one enumeration.
pub const DEFAULT_MAX_SCENARIOS: usize = 4_096;
/// Hard ceiling on scenarios returned by one enumeration.
pub const MAX_SCENARIOS_CEILING: usize = 65_536;
/// Default maximum nesting depth of a condition expression.
pub const DEFAULT_MAX_EXPRESSION_DEPTH: usize = 32;
/// Hard ceiling on condition expression nesting depth.
pub const MAX_EXPRESSION_DEPTH_CEILING: usize = 128;
/// Default maximum depth walked inside a document tree.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 256;
/// Hard ceiling on document tree walk depth.
pub const MAX_TREE_DEPTH_CEILING: usize = 1_024;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Bounds applied by table loading, enumeration, extraction, and rewriting.
///
/// # Invariants
/// - Every field is non-zero and at most its ceiling once [`EngineLimits::validate`] passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLimits {
    /// Variables enumerated exhaustively before the remainder is left unbound.
    pub max_variables: usize,
    /// Maximum scenarios returned by one enumeration.
    pub max_scenarios: usize,
    /// Maximum nesting of a single condition definition.
    pub max_expression_depth: usize,
    /// Maximum depth walked inside a document subtree.
    pub max_tree_depth: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_variables: DEFAULT_MAX_VARIABLES,
            max_scenarios: DEFAULT_MAX_SCENARIOS,
            max_expression_depth: DEFAULT_MAX_EXPRESSION_DEPTH,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }
}

impl EngineLimits {
    /// Checks every bound against its hard ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`LimitsError`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<(), LimitsError> {
        check_range("max_variables", self.max_variables, MAX_VARIABLES_CEILING)?;
        check_range("max_scenarios", self.max_scenarios, MAX_SCENARIOS_CEILING)?;
        check_range(
            "max_expression_depth",
            self.max_expression_depth,
            MAX_EXPRESSION_DEPTH_CEILING,
        )?;
        check_range("max_tree_depth", self.max_tree_depth, MAX_TREE_DEPTH_CEILING)?;
        Ok(())
    }

    /// Returns these limits with every field pulled into `1..=ceiling`.
    ///
    /// The engine applies this to every limit it receives, so unvalidated
    /// values cannot widen enumeration past the ceilings.
    #[must_use]
    pub const fn clamped(self) -> Self {
        Self {
            max_variables: clamp_range(self.max_variables, MAX_VARIABLES_CEILING),
            max_scenarios: clamp_range(self.max_scenarios, MAX_SCENARIOS_CEILING),
            max_expression_depth: clamp_range(
                self.max_expression_depth,
                MAX_EXPRESSION_DEPTH_CEILING,
            ),
            max_tree_depth: clamp_range(self.max_tree_depth, MAX_TREE_DEPTH_CEILING),
        }
    }
}

/// Errors raised when limits fall outside their allowed range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitsError {
    /// A limit was zero or above its ceiling.
    #[error("{field} must be between 1 and {max} (got {actual})")]
    OutOfRange {
        /// Limit field name.
        field: &'static str,
        /// Inclusive ceiling.
        max: usize,
        /// Rejected value.
        actual: usize,
    },
}

/// Validates that `value` lies within `1..=max`.
const fn check_range(field: &'static str, value: usize, max: usize) -> Result<(), LimitsError> {
    if value == 0 || value > max {
        return Err(LimitsError::OutOfRange {
            field,
            max,
            actual: value,
        });
    }
    Ok(())
}

/// Pulls `value` into `1..=max`.
const fn clamp_range(value: usize, max: usize) -> usize {
    if value == 0 {
        1
    } else if value > max {
        max
    } else {
        value
    }
}
