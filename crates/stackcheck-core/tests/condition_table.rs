// crates/stackcheck-core/tests/condition_table.rs
// ============================================================================
// Module: Condition Table Tests
// Description: Loading, atom interning, ambiguity, and index queries.
// Purpose: Ensure malformed definitions degrade to ambiguity without failing the load.
// ============================================================================
//! ## Overview
//! Integration tests for `ConditionTable` construction and its structural
//! queries.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use serde_json::Value;
use serde_json::json;
use stackcheck_core::AmbiguityReason;
use stackcheck_core::AtomId;
use stackcheck_core::ConditionAuditKind;
use stackcheck_core::ConditionName;
use stackcheck_core::ConditionTable;
use stackcheck_core::EngineLimits;
use stackcheck_core::Expression;
use support::RecordingSink;
use support::TestResult;
use support::ensure;

fn sample_section() -> Value {
    json!({
        "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
        "IsUsEast": {"Fn::Equals": [{"Ref": "AWS::Region"}, "us-east-1"]},
        "ProdInUsEast": {"Fn::And": [{"Condition": "IsProd"}, {"Condition": "IsUsEast"}]},
        "NotProd": {"Fn::Not": [{"Condition": "IsProd"}]},
        "ProdAgain": {"Fn::Equals": ["prod", {"Ref": "Env"}]}
    })
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn test_load_keeps_document_order() -> TestResult {
    let table = ConditionTable::load(&sample_section());
    let names: Vec<&str> = table.names().map(ConditionName::as_str).collect();
    ensure(
        names == ["IsProd", "IsUsEast", "ProdInUsEast", "NotProd", "ProdAgain"],
        format!("unexpected order {names:?}"),
    )?;
    ensure(table.len() == 5, "expected five conditions")?;
    ensure(!table.is_empty(), "table should not be empty")?;
    Ok(())
}

#[test]
fn test_swapped_equality_reuses_atom() -> TestResult {
    let table = ConditionTable::load(&sample_section());
    ensure(table.atoms().len() == 2, "expected two distinct atoms")?;
    ensure(table.get("IsProd") == table.get("ProdAgain"), "swapped operands must share the atom")?;
    let users = table.conditions_for_atom(AtomId::new(0)).ok_or("missing atom users")?;
    let users: Vec<&str> = users.iter().map(ConditionName::as_str).collect();
    ensure(users == ["IsProd", "ProdAgain"], format!("unexpected atom users {users:?}"))?;
    Ok(())
}

#[test]
fn test_atoms_of_follows_references_in_discovery_order() -> TestResult {
    let table = ConditionTable::load(&sample_section());
    ensure(
        table.atoms_of("ProdInUsEast") == [AtomId::new(0), AtomId::new(1)],
        "expected both atoms through references",
    )?;
    ensure(table.atoms_of("NotProd") == [AtomId::new(0)], "expected the shared atom")?;
    ensure(table.atoms_of("Missing").is_empty(), "unknown names reach no atoms")?;
    Ok(())
}

#[test]
fn test_reference_atom_records_target_and_literal() -> TestResult {
    let table = ConditionTable::load(&sample_section());
    let atom = table.atom(AtomId::new(1)).ok_or("missing atom")?;
    let reference = atom.reference().ok_or("expected a reference equality")?;
    ensure(reference.target == "AWS::Region", "unexpected target")?;
    ensure(reference.literal == "us-east-1", "unexpected literal")?;
    Ok(())
}

#[test]
fn test_from_template_reads_conditions_section() -> TestResult {
    let table = ConditionTable::from_template(&json!({
        "Conditions": {"UseX": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}},
        "Resources": {}
    }));
    ensure(table.contains("UseX"), "expected UseX to load")?;
    ensure(ConditionTable::from_template(&json!({"Resources": {}})).is_empty(), "missing section")?;
    ensure(ConditionTable::from_template(&json!({"Conditions": []})).is_empty(), "list section")?;
    Ok(())
}

#[test]
fn test_literal_equality_folds_to_constant() -> TestResult {
    let table = ConditionTable::load(&json!({
        "Always": {"Fn::Equals": [{"a": [1, 2]}, {"a": [1, 2]}]},
        "Never": {"Fn::Equals": ["true", true]}
    }));
    ensure(table.get("Always") == Some(&Expression::Constant(true)), "expected constant true")?;
    ensure(table.get("Never") == Some(&Expression::Constant(false)), "expected constant false")?;
    ensure(table.atoms().is_empty(), "folded equalities register no atoms")?;
    Ok(())
}

// ============================================================================
// SECTION: Ambiguity
// ============================================================================

#[test]
fn test_single_operand_and_is_ambiguous() -> TestResult {
    let table = ConditionTable::load(&json!({
        "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
        "Broken": {"Fn::And": [{"Condition": "IsProd"}]}
    }));
    let expected = Expression::Ambiguous(AmbiguityReason::WrongArity {
        connective: "Fn::And".to_string(),
        min: 2,
        max: 10,
        found: 1,
    });
    ensure(table.get("Broken") == Some(&expected), format!("got {:?}", table.get("Broken")))?;
    ensure(!table.is_ambiguous("IsProd"), "IsProd must stay precise")?;
    Ok(())
}

#[test]
fn test_malformed_shapes_are_ambiguous() -> TestResult {
    let table = ConditionTable::load(&json!({
        "Scalar": "yes",
        "Unknown": {"Fn::Xor": [true, false]},
        "NotList": {"Fn::Or": {"Condition": "Scalar"}},
        "TooManyNots": {"Fn::Not": [{"Condition": "Scalar"}, {"Condition": "Unknown"}]},
        "BadRef": {"Condition": 7},
        "ElevenWay": {"Fn::Or": [
            {"Condition": "Scalar"}, {"Condition": "Scalar"}, {"Condition": "Scalar"},
            {"Condition": "Scalar"}, {"Condition": "Scalar"}, {"Condition": "Scalar"},
            {"Condition": "Scalar"}, {"Condition": "Scalar"}, {"Condition": "Scalar"},
            {"Condition": "Scalar"}, {"Condition": "Scalar"}
        ]}
    }));
    let reasons: Vec<(&str, &AmbiguityReason)> =
        table.ambiguous().map(|(name, reason)| (name.as_str(), reason)).collect();
    ensure(reasons.len() == 6, format!("expected every condition ambiguous, got {reasons:?}"))?;
    ensure(
        matches!(reasons[0].1, AmbiguityReason::NotAConnective),
        "scalar definition is not a connective",
    )?;
    ensure(
        matches!(reasons[1].1, AmbiguityReason::UnknownConnective { connective } if connective == "Fn::Xor"),
        "unknown connective",
    )?;
    ensure(matches!(reasons[2].1, AmbiguityReason::NotAList { .. }), "non-list operands")?;
    ensure(matches!(reasons[3].1, AmbiguityReason::WrongArity { found: 2, .. }), "not arity")?;
    ensure(matches!(reasons[4].1, AmbiguityReason::InvalidReference), "non-string reference")?;
    ensure(matches!(reasons[5].1, AmbiguityReason::WrongArity { found: 11, .. }), "or arity")?;
    Ok(())
}

#[test]
fn test_dangling_reference_is_ambiguous() -> TestResult {
    let table = ConditionTable::load(&json!({
        "Dangling": {"Fn::Not": [{"Condition": "Missing"}]}
    }));
    let expected = Expression::Ambiguous(AmbiguityReason::UnknownReference {
        condition: ConditionName::new("Missing"),
    });
    ensure(table.get("Dangling") == Some(&expected), "dangling reference must be ambiguous")?;
    Ok(())
}

#[test]
fn test_reference_cycle_marks_only_members() -> TestResult {
    let table = ConditionTable::load(&json!({
        "A": {"Fn::Not": [{"Condition": "B"}]},
        "B": {"Fn::Not": [{"Condition": "A"}]},
        "Self": {"Fn::Or": [{"Condition": "Self"}, {"Fn::Equals": [{"Ref": "P"}, "x"]}]},
        "C": {"Condition": "A"}
    }));
    let cycle = Some(Expression::Ambiguous(AmbiguityReason::ReferenceCycle));
    ensure(table.get("A").cloned() == cycle, "A is on a cycle")?;
    ensure(table.get("B").cloned() == cycle, "B is on a cycle")?;
    ensure(table.get("Self").cloned() == cycle, "self reference is a cycle")?;
    ensure(
        table.get("C") == Some(&Expression::Reference(ConditionName::new("A"))),
        "C only points into the cycle",
    )?;
    Ok(())
}

#[test]
fn test_expression_depth_limit() -> TestResult {
    let limits = EngineLimits {
        max_expression_depth: 2,
        ..EngineLimits::default()
    };
    let table = ConditionTable::load_with_limits(
        &json!({
            "Shallow": {"Fn::Not": [{"Fn::Equals": [{"Ref": "P"}, "x"]}]},
            "Deep": {"Fn::Not": [{"Fn::Not": [{"Fn::Equals": [{"Ref": "P"}, "x"]}]}]}
        }),
        limits,
        &stackcheck_core::NoopAuditSink,
    );
    ensure(!table.is_ambiguous("Shallow"), "two levels fit")?;
    ensure(
        table.get("Deep")
            == Some(&Expression::Ambiguous(AmbiguityReason::TooDeep {
                max_depth: 2,
            })),
        "three levels exceed the limit",
    )?;
    ensure(table.limits() == limits, "table keeps its limits")?;
    Ok(())
}

// ============================================================================
// SECTION: Fingerprint and Audit
// ============================================================================

#[test]
fn test_fingerprint_ignores_key_order() -> TestResult {
    let first = ConditionTable::load(&json!({
        "A": {"Fn::Equals": [{"Ref": "P"}, "x"]},
        "B": {"Condition": "A"}
    }));
    let second = ConditionTable::load(&json!({
        "B": {"Condition": "A"},
        "A": {"Fn::Equals": [{"Ref": "P"}, "x"]}
    }));
    ensure(first.fingerprint().is_some(), "fingerprint must be computed")?;
    ensure(first.fingerprint() == second.fingerprint(), "fingerprint must ignore key order")?;
    Ok(())
}

#[test]
fn test_load_reports_ambiguity_and_summary() -> TestResult {
    let sink = RecordingSink::default();
    let table = ConditionTable::load_with_limits(
        &json!({
            "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
            "Broken": {"Fn::And": [{"Condition": "IsProd"}]}
        }),
        EngineLimits::default(),
        &sink,
    );
    let events = sink.events();
    ensure(events.len() == 2, format!("expected two events, got {events:?}"))?;
    ensure(
        matches!(&events[0], ConditionAuditKind::ConditionAmbiguous { condition, .. } if condition.as_str() == "Broken"),
        "first event names the ambiguous condition",
    )?;
    ensure(
        events[1]
            == ConditionAuditKind::ConditionTableLoaded {
                fingerprint: table.fingerprint().cloned(),
                conditions: 2,
                atoms: 1,
                ambiguous: 1,
            },
        "summary event counts conditions and atoms",
    )?;
    Ok(())
}
