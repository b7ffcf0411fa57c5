// crates/stackcheck-core/src/conditions/parse.rs
// ============================================================================
// Module: Condition Definition Parser
// Description: Structural parsing of `Fn::Equals/And/Or/Not` and `Condition` nodes.
// Purpose: Turn raw definitions into expressions while interning shared atoms.
// Dependencies: crate::{conditions::expression, hashing, tree}, serde_json, smallvec
// ============================================================================

//! ## Overview
//! The parser is strict about shape and lenient about outcome: any arity or
//! type violation anywhere inside a definition makes the whole definition
//! [`Expression::Ambiguous`]. Equality operands are interned by canonical key
//! so two conditions testing the same equality share one [`AtomId`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde_json::Value;
use smallvec::SmallVec;

use crate::conditions::expression::AmbiguityReason;
use crate::conditions::expression::Atom;
use crate::conditions::expression::AtomId;
use crate::conditions::expression::Expression;
use crate::hashing::CanonicalKey;
use crate::identifiers::ConditionName;
use crate::tree::CONDITION;
use crate::tree::FN_AND;
use crate::tree::FN_EQUALS;
use crate::tree::FN_NOT;
use crate::tree::FN_OR;
use crate::tree::is_literal;

// ============================================================================
// SECTION: Arity
// ============================================================================

/// Operand count accepted by `Fn::Equals`.
const EQUALS_ARITY: usize = 2;
/// Minimum operand count accepted by `Fn::And` and `Fn::Or`.
const MIN_JUNCTION_ARITY: usize = 2;
/// Maximum operand count accepted by `Fn::And` and `Fn::Or`.
const MAX_JUNCTION_ARITY: usize = 10;
/// Operand count accepted by `Fn::Not`.
const NOT_ARITY: usize = 1;

// ============================================================================
// SECTION: Atom Registry
// ============================================================================

/// Interns atoms by canonical key in first-discovered order.
#[derive(Debug, Default)]
pub(crate) struct AtomRegistry {
    /// Atoms indexed by [`AtomId`].
    atoms: Vec<Atom>,
    /// Lookup from canonical key to id.
    by_key: HashMap<CanonicalKey, AtomId>,
}

impl AtomRegistry {
    /// Returns the id of an equivalent atom, registering it when new.
    fn intern(&mut self, atom: Atom) -> AtomId {
        if let Some(id) = self.by_key.get(&atom.key()) {
            return *id;
        }
        let id = AtomId::new(self.atoms.len());
        self.by_key.insert(atom.key(), id);
        self.atoms.push(atom);
        id
    }

    /// Consumes the registry, returning atoms in id order.
    pub(crate) fn into_atoms(self) -> Vec<Atom> {
        self.atoms
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Parses condition definitions against a shared atom registry.
pub(crate) struct ExpressionParser<'a> {
    /// Registry receiving every equality atom.
    atoms: &'a mut AtomRegistry,
    /// Maximum connective nesting.
    max_depth: usize,
    /// Depth budget used when deciding whether operands are literals.
    max_operand_depth: usize,
}

impl<'a> ExpressionParser<'a> {
    /// Creates a parser writing into `atoms`.
    pub(crate) const fn new(
        atoms: &'a mut AtomRegistry,
        max_depth: usize,
        max_operand_depth: usize,
    ) -> Self {
        Self {
            atoms,
            max_depth,
            max_operand_depth,
        }
    }

    /// Parses one named definition, falling back to [`Expression::Ambiguous`].
    pub(crate) fn parse_definition(&mut self, definition: &Value) -> Expression {
        self.parse(definition, 0).unwrap_or_else(Expression::Ambiguous)
    }

    /// Parses a connective node at the given depth.
    fn parse(&mut self, node: &Value, depth: usize) -> Result<Expression, AmbiguityReason> {
        if depth >= self.max_depth {
            return Err(AmbiguityReason::TooDeep {
                max_depth: self.max_depth,
            });
        }
        let map = node.as_object().ok_or(AmbiguityReason::NotAConnective)?;
        let mut entries = map.iter();
        let (Some((connective, operand)), None) = (entries.next(), entries.next()) else {
            return Err(AmbiguityReason::NotAConnective);
        };

        match connective.as_str() {
            FN_EQUALS => {
                let operands = operand_list(connective, operand, EQUALS_ARITY, EQUALS_ARITY)?;
                Ok(self.equality(&operands[0], &operands[1]))
            }
            FN_AND | FN_OR => {
                let operands =
                    operand_list(connective, operand, MIN_JUNCTION_ARITY, MAX_JUNCTION_ARITY)?;
                let mut parsed: SmallVec<[Box<Expression>; 4]> = SmallVec::new();
                for item in operands {
                    parsed.push(Box::new(self.parse(item, depth + 1)?));
                }
                if connective == FN_AND {
                    Ok(Expression::And(parsed))
                } else {
                    Ok(Expression::Or(parsed))
                }
            }
            FN_NOT => {
                let operands = operand_list(connective, operand, NOT_ARITY, NOT_ARITY)?;
                Ok(Expression::Not(Box::new(self.parse(&operands[0], depth + 1)?)))
            }
            CONDITION => operand
                .as_str()
                .map(|name| Expression::Reference(ConditionName::new(name)))
                .ok_or(AmbiguityReason::InvalidReference),
            other => Err(AmbiguityReason::UnknownConnective {
                connective: other.to_string(),
            }),
        }
    }

    /// Builds an equality leaf, folding literal-only comparisons.
    fn equality(&mut self, left: &Value, right: &Value) -> Expression {
        if is_literal(left, self.max_operand_depth) && is_literal(right, self.max_operand_depth) {
            return Expression::Constant(CanonicalKey::of(left) == CanonicalKey::of(right));
        }
        let id = self.atoms.intern(Atom::new(left.clone(), right.clone()));
        Expression::Equals(id)
    }
}

/// Returns the operand list of a connective after checking its arity.
fn operand_list<'v>(
    connective: &str,
    operand: &'v Value,
    min: usize,
    max: usize,
) -> Result<&'v [Value], AmbiguityReason> {
    let items = operand.as_array().ok_or_else(|| AmbiguityReason::NotAList {
        connective: connective.to_string(),
    })?;
    if items.len() < min || items.len() > max {
        return Err(AmbiguityReason::WrongArity {
            connective: connective.to_string(),
            min,
            max,
            found: items.len(),
        });
    }
    Ok(items)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only output and panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::*;

    fn parse(definition: &Value) -> (Expression, Vec<Atom>) {
        let mut registry = AtomRegistry::default();
        let expression = ExpressionParser::new(&mut registry, 4, 16).parse_definition(definition);
        (expression, registry.into_atoms())
    }

    #[test]
    fn swapped_operands_share_one_atom() {
        let mut registry = AtomRegistry::default();
        let mut parser = ExpressionParser::new(&mut registry, 8, 16);
        let first = parser.parse_definition(&json!({"Fn::Equals": [{"Ref": "Env"}, "prod"]}));
        let second = parser.parse_definition(&json!({"Fn::Equals": ["prod", {"Ref": "Env"}]}));
        assert_eq!(first, second);
        assert_eq!(registry.into_atoms().len(), 1);
    }

    #[test]
    fn literal_equality_folds_to_constant() {
        let (same, atoms) = parse(&json!({"Fn::Equals": [{"a": 1, "b": 2}, {"b": 2, "a": 1}]}));
        assert_eq!(same, Expression::Constant(true));
        assert!(atoms.is_empty());
        let (different, _) = parse(&json!({"Fn::Equals": ["1", 1]}));
        assert_eq!(different, Expression::Constant(false));
    }

    #[test]
    fn depth_limit_marks_definition_ambiguous() {
        let nested = json!({"Fn::Not": [{"Fn::Not": [{"Fn::Not": [{"Fn::Not": [
            {"Fn::Equals": [{"Ref": "A"}, "x"]}
        ]}]}]}]});
        let (expression, _) = parse(&nested);
        assert_eq!(
            expression,
            Expression::Ambiguous(AmbiguityReason::TooDeep {
                max_depth: 4
            })
        );
    }

    #[test]
    fn extra_keys_are_not_a_connective() {
        let (expression, _) =
            parse(&json!({"Fn::Equals": ["a", {"Ref": "B"}], "Fn::Not": [{"Condition": "C"}]}));
        assert_eq!(expression, Expression::Ambiguous(AmbiguityReason::NotAConnective));
    }
}
