// crates/stackcheck-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for `stackcheck.toml`. The example validates as-is and
//! spells out every default so operators can see what they are tuning.

/// Returns a canonical example `stackcheck.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[limits]
# Independent variables enumerated exhaustively (1..=24).
max_variables = 16
# Scenarios returned by one enumeration (1..=65536).
max_scenarios = 4096
# Nesting depth of a single condition definition (1..=128).
max_expression_depth = 32
# Depth walked inside a document subtree (1..=1024).
max_tree_depth = 256

[audit]
# One of "none", "stderr", "file".
sink = "file"
path = "stackcheck-audit.jsonl"
"#,
    )
}
