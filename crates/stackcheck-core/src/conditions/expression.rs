// crates/stackcheck-core/src/conditions/expression.rs
// ============================================================================
// Module: Condition Expressions
// Description: Closed Boolean algebra over equality atoms and named conditions.
// Purpose: Define `Expression`, `Atom`, and the ambiguity reasons for malformed input.
// Dependencies: serde, serde_json, smallvec
// ============================================================================

//! ## Overview
//! A named condition is parsed once into an [`Expression`]. The connectives
//! are universal (`And`, `Or`, `Not`); the leaves are equality [`Atom`]s,
//! folded constants, and references to other named conditions. Malformed
//! definitions become [`Expression::Ambiguous`] so the rest of the table
//! still loads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use crate::hashing::CanonicalKey;
use crate::identifiers::ConditionName;

// ============================================================================
// SECTION: Atoms
// ============================================================================

/// Index of an atom inside its condition table, in first-discovered order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomId(usize);

impl AtomId {
    /// Creates an atom id from a table position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the table position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// An equality test between two operands; the indivisible unit of truth.
///
/// # Invariants
/// - `key` is derived from the unordered pair of operand keys, so swapping the
///   operands yields the same atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Identity used for deduplication.
    key: CanonicalKey,
    /// First operand in source order.
    left: Value,
    /// Second operand in source order.
    right: Value,
    /// Set when the atom compares a reference against a string literal.
    reference: Option<ReferenceEquality>,
}

/// An atom of the shape `Equals({"Ref": target}, "literal")`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEquality {
    /// Referenced parameter or pseudo parameter.
    pub target: String,
    /// String literal the reference is compared against.
    pub literal: String,
}

impl Atom {
    /// Builds an atom from two operands.
    #[must_use]
    pub fn new(left: Value, right: Value) -> Self {
        let key = CanonicalKey::unordered_pair(CanonicalKey::of(&left), CanonicalKey::of(&right));
        let reference = ReferenceEquality::detect(&left, &right)
            .or_else(|| ReferenceEquality::detect(&right, &left));
        Self {
            key,
            left,
            right,
            reference,
        }
    }

    /// Returns the atom identity.
    #[must_use]
    pub const fn key(&self) -> CanonicalKey {
        self.key
    }

    /// Returns both operands in source order.
    #[must_use]
    pub const fn operands(&self) -> (&Value, &Value) {
        (&self.left, &self.right)
    }

    /// Returns the reference-versus-literal shape when the atom has one.
    #[must_use]
    pub const fn reference(&self) -> Option<&ReferenceEquality> {
        self.reference.as_ref()
    }
}

impl ReferenceEquality {
    /// Matches `reference` = `{"Ref": target}` and `literal` = string.
    ///
    /// Numbers are left out: a parameter can equal both `"1"` and `1`.
    fn detect(reference: &Value, literal: &Value) -> Option<Self> {
        let target = crate::tree::ref_target(reference)?;
        let literal = literal.as_str()?;
        Some(Self {
            target: target.to_string(),
            literal: literal.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Ambiguity
// ============================================================================

/// Why a condition definition could not be parsed into a precise expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguityReason {
    /// The definition was not a single-key connective map.
    NotAConnective,
    /// The connective key is not part of the condition algebra.
    UnknownConnective {
        /// The unrecognized key.
        connective: String,
    },
    /// The connective operand was not a list.
    NotAList {
        /// Connective key.
        connective: String,
    },
    /// The connective received the wrong number of operands.
    WrongArity {
        /// Connective key.
        connective: String,
        /// Minimum accepted operand count.
        min: usize,
        /// Maximum accepted operand count.
        max: usize,
        /// Operand count found.
        found: usize,
    },
    /// A `Condition` reference was not a string.
    InvalidReference,
    /// A `Condition` reference names no defined condition.
    UnknownReference {
        /// The unresolved name.
        condition: ConditionName,
    },
    /// The definition nests deeper than the configured limit.
    TooDeep {
        /// Maximum allowed depth.
        max_depth: usize,
    },
    /// The condition takes part in a reference cycle.
    ReferenceCycle,
}

impl fmt::Display for AmbiguityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAConnective => write!(f, "definition is not a single-key connective"),
            Self::UnknownConnective {
                connective,
            } => write!(f, "unknown connective `{connective}`"),
            Self::NotAList {
                connective,
            } => write!(f, "`{connective}` expects a list"),
            Self::WrongArity {
                connective,
                min,
                max,
                found,
            } => {
                if min == max {
                    write!(f, "`{connective}` expects {min} operands, found {found}")
                } else {
                    write!(f, "`{connective}` expects {min} to {max} operands, found {found}")
                }
            }
            Self::InvalidReference => write!(f, "condition reference must be a string"),
            Self::UnknownReference {
                condition,
            } => write!(f, "reference to undefined condition `{condition}`"),
            Self::TooDeep {
                max_depth,
            } => write!(f, "definition nests deeper than {max_depth}"),
            Self::ReferenceCycle => write!(f, "condition is part of a reference cycle"),
        }
    }
}

// ============================================================================
// SECTION: Expression Definition
// ============================================================================

/// Parsed condition definition.
///
/// Empty `And` is true and empty `Or` is false, although the parser never
/// produces either.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Equality test resolved to a table atom.
    Equals(AtomId),
    /// Equality between two literals, decided at load time.
    Constant(bool),
    /// All operands must hold.
    And(SmallVec<[Box<Self>; 4]>),
    /// At least one operand must hold.
    Or(SmallVec<[Box<Self>; 4]>),
    /// Inverts the operand.
    Not(Box<Self>),
    /// Takes the value of another named condition.
    Reference(ConditionName),
    /// Malformed definition; unconstrained during enumeration.
    Ambiguous(AmbiguityReason),
}

/// Truth source consulted while evaluating an expression.
pub(crate) trait Valuation {
    /// Returns the value assigned to an atom.
    fn atom(&self, id: AtomId) -> bool;

    /// Returns the already-evaluated value of a named condition.
    fn condition(&self, name: &ConditionName) -> Option<bool>;
}

impl Expression {
    /// Returns true when the expression is the ambiguous fallback.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }

    /// Evaluates the expression; `None` means the value is undetermined.
    pub(crate) fn evaluate(&self, valuation: &impl Valuation) -> Option<bool> {
        match self {
            Self::Equals(id) => Some(valuation.atom(*id)),
            Self::Constant(value) => Some(*value),
            Self::Not(inner) => inner.evaluate(valuation).map(|value| !value),
            Self::Reference(name) => valuation.condition(name),
            Self::Ambiguous(_) => None,
            Self::And(operands) => {
                let mut result = Some(true);
                for operand in operands {
                    match operand.evaluate(valuation) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => result = None,
                    }
                }
                result
            }
            Self::Or(operands) => {
                let mut result = Some(false);
                for operand in operands {
                    match operand.evaluate(valuation) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => result = None,
                    }
                }
                result
            }
        }
    }

    /// Visits every atom and reference leaf in source order.
    pub(crate) fn visit_leaves<'s>(&'s self, visit: &mut impl FnMut(Leaf<'s>)) {
        match self {
            Self::Equals(id) => visit(Leaf::Atom(*id)),
            Self::Reference(name) => visit(Leaf::Reference(name)),
            Self::Not(inner) => inner.visit_leaves(visit),
            Self::And(operands) | Self::Or(operands) => {
                for operand in operands {
                    operand.visit_leaves(visit);
                }
            }
            Self::Constant(_) | Self::Ambiguous(_) => {}
        }
    }
}

/// Leaf of an expression tree that carries a truth dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Leaf<'a> {
    /// Equality atom.
    Atom(AtomId),
    /// Named condition reference.
    Reference(&'a ConditionName),
}
