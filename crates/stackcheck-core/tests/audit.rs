// crates/stackcheck-core/tests/audit.rs
// ============================================================================
// Module: Audit Sink Tests
// Description: JSON-line payload shape and file sink persistence.
// Purpose: Ensure audit events serialize with a stable tag and append to disk.
// ============================================================================
//! ## Overview
//! Integration tests for `ConditionAuditEvent` serialization and
//! `FileAuditSink`.

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
use stackcheck_core::ConditionAuditEvent;
use stackcheck_core::ConditionAuditKind;
use stackcheck_core::ConditionName;
use stackcheck_core::ConditionTable;
use stackcheck_core::EngineLimits;
use stackcheck_core::FileAuditSink;
use support::TestResult;
use support::ensure;

#[test]
fn test_event_payload_is_tagged_and_flat() -> TestResult {
    let event = ConditionAuditEvent::new(ConditionAuditKind::ConditionAmbiguous {
        condition: ConditionName::new("Broken"),
        reason: AmbiguityReason::ReferenceCycle,
    });
    let payload = serde_json::to_value(&event)?;
    ensure(payload["event"] == "condition_ambiguous", format!("got {payload}"))?;
    ensure(payload["condition"] == "Broken", "condition name is flattened")?;
    ensure(payload["reason"] == json!({"kind": "reference_cycle"}), "reason is tagged")?;
    ensure(payload["timestamp_ms"].is_u64(), "timestamp is numeric")?;
    Ok(())
}

#[test]
fn test_file_sink_appends_json_lines() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("audit.jsonl");
    let sink = FileAuditSink::new(&path)?;
    let section = json!({
        "Good": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
        "Bad": {"Fn::Or": "Good"}
    });
    let _ = ConditionTable::load_with_limits(&section, EngineLimits::default(), &sink);
    let _ = ConditionTable::load_with_limits(&section, EngineLimits::default(), &sink);

    let contents = std::fs::read_to_string(&path)?;
    let lines: Vec<Value> =
        contents.lines().map(serde_json::from_str).collect::<Result<_, _>>()?;
    ensure(lines.len() == 4, format!("expected four lines, got {}", lines.len()))?;
    ensure(lines[0]["event"] == "condition_ambiguous", "ambiguity first")?;
    ensure(lines[0]["reason"]["kind"] == "not_a_list", "reason kind recorded")?;
    ensure(lines[1]["event"] == "condition_table_loaded", "summary second")?;
    ensure(lines[1]["fingerprint"]["algorithm"] == "sha256", "fingerprint recorded")?;
    ensure(lines[1]["conditions"] == 2, "condition count recorded")?;
    ensure(lines[3]["fingerprint"] == lines[1]["fingerprint"], "fingerprint is stable")?;
    Ok(())
}
