// crates/stackcheck-core/src/lib.rs
// ============================================================================
// Module: Stackcheck Core
// Description: Condition-aware reasoning over infrastructure templates.
// Purpose: Public API surface for condition tables, scenarios, and rewriting.
// Dependencies: crate::{audit, conditions, hashing, identifiers, limits, paths, rewrite,
//              template, tree}
// ============================================================================

//! ## Overview
//! Templates declare named Boolean conditions and then gate resources,
//! outputs, and individual property values on them. This crate answers the
//! questions a validator needs before it can check such a document:
//! - which combinations of condition values are actually possible,
//! - which condition values are implied by reaching a given location,
//! - and what a conditional subtree looks like once a combination is fixed.
//!
//! The engine never fails on malformed input. Unparseable definitions become
//! unconstrained, traversal mismatches stop contributing, and depth or width
//! limits fall back to the conservative answer.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod audit;
pub mod conditions;
pub mod hashing;
pub mod identifiers;
pub mod limits;
pub mod paths;
pub mod rewrite;
pub mod template;
pub mod tree;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ConditionAuditEvent;
pub use audit::ConditionAuditKind;
pub use audit::ConditionAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use conditions::AmbiguityReason;
pub use conditions::Atom;
pub use conditions::AtomId;
pub use conditions::ConditionTable;
pub use conditions::Expression;
pub use conditions::ReferenceEquality;
pub use conditions::Scenario;
pub use conditions::ScenarioEnumerator;
pub use hashing::CanonicalKey;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use identifiers::ConditionName;
pub use limits::EngineLimits;
pub use limits::LimitsError;
pub use paths::BranchSet;
pub use paths::PathConditionOptions;
pub use paths::PathConditions;
pub use paths::extract_path_conditions;
pub use rewrite::ScenarioValue;
pub use rewrite::condition_names_in;
pub use rewrite::object_without_conditions;
pub use rewrite::rewrite_for_scenario;
pub use rewrite::rewrite_for_scenario_bounded;
pub use template::Template;
pub use tree::IfBranch;
pub use tree::PathSegment;
pub use tree::TemplatePath;
pub use tree::if_branch;
pub use tree::is_no_value;
pub use tree::value_at;
