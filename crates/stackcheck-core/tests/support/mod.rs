// crates/stackcheck-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Shared result helpers and fixtures for condition engine tests.
// ============================================================================
//! ## Overview
//! Shared test helpers for consistent Result-based assertions, plus a
//! recording audit sink and scenario builders.

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
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::error::Error;
use std::fmt;
use std::sync::Mutex;

use stackcheck_core::ConditionAuditEvent;
use stackcheck_core::ConditionAuditKind;
use stackcheck_core::ConditionAuditSink;
use stackcheck_core::Scenario;

// ========================================================================
// Test Result Helpers
// ========================================================================

/// Standard result type used across condition engine integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Lightweight error type for test assertions.
#[derive(Debug)]
struct TestError {
    /// Human-readable failure message.
    message: String,
}

impl TestError {
    /// Creates a new test error with the provided message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl Error for TestError {}

/// Returns an error when a test condition fails.
///
/// # Errors
/// Returns a `TestError` when the condition is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition { Ok(()) } else { Err(Box::new(TestError::new(message))) }
}

// ========================================================================
// Fixtures
// ========================================================================

/// Builds a scenario from name/value pairs.
pub fn scenario(pairs: &[(&str, bool)]) -> Scenario {
    pairs.iter().map(|(name, value)| (*name, *value)).collect()
}

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    /// Recorded event payloads.
    events: Mutex<Vec<ConditionAuditKind>>,
}

impl RecordingSink {
    /// Returns a copy of the recorded payloads.
    pub fn events(&self) -> Vec<ConditionAuditKind> {
        self.events.lock().unwrap().clone()
    }
}

impl ConditionAuditSink for RecordingSink {
    fn record(&self, event: &ConditionAuditEvent) {
        self.events.lock().unwrap().push(event.kind.clone());
    }
}
