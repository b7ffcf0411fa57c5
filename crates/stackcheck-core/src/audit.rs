// crates/stackcheck-core/src/audit.rs
// ============================================================================
// Module: Condition Engine Audit Logging
// Description: Structured audit events for condition loading and enumeration.
// Purpose: Surface degraded paths (ambiguity, caps) without failing the caller.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The engine never raises on malformed input. Instead, every time it falls
//! back to a conservative answer it emits an audit event so callers can see
//! why a condition was treated as unconstrained. Sinks write JSON lines and
//! are intentionally lightweight so deployments can route events to their
//! preferred logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::conditions::AmbiguityReason;
use crate::hashing::HashDigest;
use crate::identifiers::ConditionName;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event-specific fields, tagged by `event`.
    #[serde(flatten)]
    pub kind: ConditionAuditKind,
}

/// Event-specific audit payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConditionAuditKind {
    /// A condition table finished loading.
    ConditionTableLoaded {
        /// Canonical digest of the source section, when it could be computed.
        fingerprint: Option<HashDigest>,
        /// Number of named conditions.
        conditions: usize,
        /// Number of distinct equality atoms.
        atoms: usize,
        /// Number of conditions recorded as ambiguous.
        ambiguous: usize,
    },
    /// A condition definition was malformed and is treated as unconstrained.
    ConditionAmbiguous {
        /// Offending condition.
        condition: ConditionName,
        /// Why it was rejected.
        reason: AmbiguityReason,
    },
    /// More variables were reachable than the enumeration cap allows.
    EnumerationCapped {
        /// Number of requested condition names.
        requested: usize,
        /// Variables reachable from the requested names.
        variables: usize,
        /// Variables enumerated exhaustively.
        bound: usize,
    },
    /// The scenario list was truncated.
    ScenarioLimitReached {
        /// Number of requested condition names.
        requested: usize,
        /// Scenario ceiling that was hit.
        max_scenarios: usize,
    },
}

impl ConditionAuditEvent {
    /// Stamps an event payload with the current time.
    #[must_use]
    pub fn new(kind: ConditionAuditKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            timestamp_ms,
            kind,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for condition engine events.
pub trait ConditionAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &ConditionAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ConditionAuditSink for StderrAuditSink {
    fn record(&self, event: &ConditionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ConditionAuditSink for FileAuditSink {
    fn record(&self, event: &ConditionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ConditionAuditSink for NoopAuditSink {
    fn record(&self, _event: &ConditionAuditEvent) {}
}
