// crates/stackcheck-core/src/identifiers.rs
// ============================================================================
// Module: Stackcheck Identifiers
// Description: Opaque string identifiers for named document entities.
// Purpose: Keep condition names strongly typed across table, scenarios, and paths.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as strings. Whether a name resolves to
//! a defined condition is decided by the condition table, never here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Name of a condition in a document's `Conditions` section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionName(String);

impl ConditionName {
    /// Creates a new condition name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ConditionName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ConditionName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&String> for ConditionName {
    fn from(value: &String) -> Self {
        Self::new(value.as_str())
    }
}

impl Borrow<str> for ConditionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
