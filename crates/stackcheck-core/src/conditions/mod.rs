// crates/stackcheck-core/src/conditions/mod.rs
// ============================================================================
// Module: Conditions
// Description: Condition table, expression algebra, and scenario enumeration.
// Purpose: Group the pieces that turn a `Conditions` section into scenarios.
// Dependencies: crate::{audit, hashing, identifiers, limits, paths, tree}
// ============================================================================

//! ## Overview
//! Parsing lives in `parse`, the immutable registry in [`table`], and the
//! satisfiability search in [`scenarios`]. Callers normally use
//! [`ConditionTable`] and [`ScenarioEnumerator`] through the crate root.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod expression;
mod parse;
pub mod scenarios;
pub mod table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use expression::AmbiguityReason;
pub use expression::Atom;
pub use expression::AtomId;
pub use expression::Expression;
pub use expression::ReferenceEquality;
pub use scenarios::Scenario;
pub use scenarios::ScenarioEnumerator;
pub use table::ConditionTable;
