// crates/stackcheck-core/src/template.rs
// ============================================================================
// Module: Template Facade
// Description: A parsed document bundled with its condition table.
// Purpose: Give validation passes one entry point for condition-aware queries.
// Dependencies: crate::{audit, conditions, limits, paths, rewrite, tree}, serde_json
// ============================================================================

//! ## Overview
//! A [`Template`] owns the document and the [`ConditionTable`] loaded from its
//! `Conditions` section. The table is immutable after construction, so a
//! template can be shared by reference across concurrent validation passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::audit::ConditionAuditSink;
use crate::audit::NoopAuditSink;
use crate::conditions::ConditionTable;
use crate::conditions::Scenario;
use crate::conditions::ScenarioEnumerator;
use crate::identifiers::ConditionName;
use crate::limits::EngineLimits;
use crate::paths::PathConditionOptions;
use crate::paths::PathConditions;
use crate::paths::extract_path_conditions;
use crate::rewrite::ScenarioValue;
use crate::rewrite::object_without_conditions;
use crate::tree::CONDITION;
use crate::tree::CONDITIONS_SECTION;
use crate::tree::PathSegment;
use crate::tree::RESOURCES_SECTION;

// ============================================================================
// SECTION: Template
// ============================================================================

/// A document and its condition table.
pub struct Template {
    /// Parsed document.
    document: Value,
    /// Conditions loaded from the document.
    table: ConditionTable,
    /// Receives load and enumeration events.
    audit: Arc<dyn ConditionAuditSink>,
}

impl Template {
    /// Loads a document with default limits and no audit output.
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self::with_limits(document, EngineLimits::default(), Arc::new(NoopAuditSink))
    }

    /// Loads a document with explicit limits and audit sink.
    #[must_use]
    pub fn with_limits(
        document: Value,
        limits: EngineLimits,
        audit: Arc<dyn ConditionAuditSink>,
    ) -> Self {
        let table = ConditionTable::load_with_limits(
            document.get(CONDITIONS_SECTION).unwrap_or(&Value::Null),
            limits,
            audit.as_ref(),
        );
        Self {
            document,
            table,
            audit,
        }
    }

    /// Returns the document.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// Returns the condition table.
    #[must_use]
    pub const fn conditions(&self) -> &ConditionTable {
        &self.table
    }

    /// Returns an enumerator bound to this template's table and audit sink.
    #[must_use]
    pub fn enumerator(&self) -> ScenarioEnumerator<'_> {
        ScenarioEnumerator::new(&self.table).with_audit(self.audit.as_ref())
    }

    /// Returns the condition constraints implied by reaching `path`.
    #[must_use]
    pub fn conditions_from_path(
        &self,
        path: &[PathSegment],
        options: PathConditionOptions,
    ) -> PathConditions {
        extract_path_conditions(&self.document, path, options)
    }

    /// Returns every satisfiable scenario over `names`.
    #[must_use]
    pub fn scenarios<I, N>(&self, names: I) -> Vec<Scenario>
    where
        I: IntoIterator<Item = N>,
        N: Into<ConditionName>,
    {
        self.enumerator().enumerate(names)
    }

    /// Returns every concrete shape of a conditional subtree.
    #[must_use]
    pub fn object_without_conditions(&self, value: &Value) -> Vec<ScenarioValue> {
        object_without_conditions(&self.enumerator(), value)
    }

    /// Returns the scenarios in which `resource` does not exist while `path` does.
    ///
    /// The result is empty when the resource has no `Condition`, or when
    /// every scenario reaching `path` also creates the resource.
    #[must_use]
    pub fn is_resource_available(&self, path: &[PathSegment], resource: &str) -> Vec<Scenario> {
        let Some(condition) = self
            .document
            .get(RESOURCES_SECTION)
            .and_then(|resources| resources.get(resource))
            .and_then(|definition| definition.get(CONDITION))
            .and_then(Value::as_str)
        else {
            return Vec::new();
        };
        let constraints = self.conditions_from_path(path, PathConditionOptions::default());
        let names = constraints.names().cloned().chain([ConditionName::new(condition)]);
        self.enumerator()
            .enumerate_constrained(names, &constraints)
            .into_iter()
            .filter(|scenario| scenario.get(condition) == Some(false))
            .collect()
    }
}
