// crates/stackcheck-core/src/conditions/table.rs
// ============================================================================
// Module: Condition Table
// Description: Immutable registry of parsed conditions and their shared atoms.
// Purpose: Load a document's `Conditions` section once and answer structural queries.
// Dependencies: crate::{audit, conditions, hashing, limits, tree}, serde_json
// ============================================================================

//! ## Overview
//! A [`ConditionTable`] is built once per document and never mutated. Loading
//! never fails: malformed definitions, dangling references, and reference
//! cycles are recorded as ambiguous expressions and reported to the audit
//! sink. The table keeps, for every atom, the set of conditions whose own
//! definition mentions it, plus a dependency order used by the enumerator to
//! evaluate conditions without recursing through references.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;

use serde_json::Value;

use crate::audit::ConditionAuditEvent;
use crate::audit::ConditionAuditKind;
use crate::audit::ConditionAuditSink;
use crate::audit::NoopAuditSink;
use crate::conditions::expression::AmbiguityReason;
use crate::conditions::expression::Atom;
use crate::conditions::expression::AtomId;
use crate::conditions::expression::Expression;
use crate::conditions::expression::Leaf;
use crate::conditions::parse::AtomRegistry;
use crate::conditions::parse::ExpressionParser;
use crate::hashing::DEFAULT_HASH_ALGORITHM;
use crate::hashing::HashDigest;
use crate::hashing::hash_canonical_json;
use crate::identifiers::ConditionName;
use crate::limits::EngineLimits;
use crate::tree::CONDITIONS_SECTION;
use crate::tree::REGION;

// ============================================================================
// SECTION: Variables
// ============================================================================

/// Independent truth variable seen by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Variable {
    /// Equality atom.
    Atom(AtomId),
    /// Ambiguous or undefined condition, free to take either value.
    Free(ConditionName),
}

// ============================================================================
// SECTION: Condition Table
// ============================================================================

/// Parsed named condition.
#[derive(Debug, Clone)]
struct ConditionEntry {
    /// Condition name.
    name: ConditionName,
    /// Parsed definition.
    expression: Expression,
}

/// Immutable registry of a document's named conditions.
///
/// # Invariants
/// - No non-ambiguous condition takes part in a reference cycle.
/// - Every reference inside a non-ambiguous expression resolves to a defined condition.
/// - `order` lists every condition after all conditions it references.
#[derive(Debug, Clone)]
pub struct ConditionTable {
    /// Conditions in document order.
    entries: Vec<ConditionEntry>,
    /// Lookup from name to entry position.
    index: HashMap<ConditionName, usize>,
    /// Distinct equality atoms in first-discovered order.
    atoms: Vec<Atom>,
    /// For each atom, the conditions whose own definition mentions it.
    atom_users: Vec<BTreeSet<ConditionName>>,
    /// Atoms comparing the same reference against different literals.
    exclusive_groups: Vec<Vec<AtomId>>,
    /// Entry positions in dependency order.
    order: Vec<usize>,
    /// Canonical digest of the source section.
    fingerprint: Option<HashDigest>,
    /// Limits the table was loaded with.
    limits: EngineLimits,
}

impl Default for ConditionTable {
    fn default() -> Self {
        Self::load(&Value::Null)
    }
}

impl ConditionTable {
    /// Loads a `Conditions` section with default limits and no audit output.
    #[must_use]
    pub fn load(section: &Value) -> Self {
        Self::load_with_limits(section, EngineLimits::default(), &NoopAuditSink)
    }

    /// Loads the `Conditions` section of a whole document.
    ///
    /// A missing or non-map section yields an empty table.
    #[must_use]
    pub fn from_template(document: &Value) -> Self {
        Self::load(document.get(CONDITIONS_SECTION).unwrap_or(&Value::Null))
    }

    /// Loads a `Conditions` section with explicit limits and audit sink.
    ///
    /// Limits are clamped to the engine ceilings.
    #[must_use]
    pub fn load_with_limits(
        section: &Value,
        limits: EngineLimits,
        audit: &dyn ConditionAuditSink,
    ) -> Self {
        let limits = limits.clamped();
        let mut registry = AtomRegistry::default();
        let mut entries = Vec::new();
        if let Some(definitions) = section.as_object() {
            let mut parser = ExpressionParser::new(
                &mut registry,
                limits.max_expression_depth,
                limits.max_tree_depth,
            );
            for (name, definition) in definitions {
                entries.push(ConditionEntry {
                    name: ConditionName::new(name.as_str()),
                    expression: parser.parse_definition(definition),
                });
            }
        }
        let index: HashMap<ConditionName, usize> =
            entries.iter().enumerate().map(|(pos, entry)| (entry.name.clone(), pos)).collect();

        mark_dangling_references(&mut entries, &index);
        mark_reference_cycles(&mut entries, &index);
        let order = dependency_order(&entries, &index);

        let atoms = registry.into_atoms();
        let mut atom_users = vec![BTreeSet::new(); atoms.len()];
        for entry in &entries {
            entry.expression.visit_leaves(&mut |leaf| {
                if let Leaf::Atom(id) = leaf {
                    atom_users[id.index()].insert(entry.name.clone());
                }
            });
        }
        let exclusive_groups = exclusive_groups(&atoms);
        let fingerprint = hash_canonical_json(DEFAULT_HASH_ALGORITHM, section).ok();

        let table = Self {
            entries,
            index,
            atoms,
            atom_users,
            exclusive_groups,
            order,
            fingerprint,
            limits,
        };
        table.report(audit);
        table
    }

    /// Emits load-time audit events.
    fn report(&self, audit: &dyn ConditionAuditSink) {
        let mut ambiguous = 0;
        for entry in &self.entries {
            if let Expression::Ambiguous(reason) = &entry.expression {
                ambiguous += 1;
                audit.record(&ConditionAuditEvent::new(ConditionAuditKind::ConditionAmbiguous {
                    condition: entry.name.clone(),
                    reason: reason.clone(),
                }));
            }
        }
        audit.record(&ConditionAuditEvent::new(ConditionAuditKind::ConditionTableLoaded {
            fingerprint: self.fingerprint.clone(),
            conditions: self.entries.len(),
            atoms: self.atoms.len(),
            ambiguous,
        }));
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns the number of named conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the table holds no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns condition names in document order.
    pub fn names(&self) -> impl Iterator<Item = &ConditionName> {
        self.entries.iter().map(|entry| &entry.name)
    }

    /// Returns true when the name is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the parsed definition of a condition.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.index.get(name).map(|pos| &self.entries[*pos].expression)
    }

    /// Returns true when the condition is defined but malformed.
    #[must_use]
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.get(name).is_some_and(Expression::is_ambiguous)
    }

    /// Returns every ambiguous condition with the reason it was rejected.
    pub fn ambiguous(&self) -> impl Iterator<Item = (&ConditionName, &AmbiguityReason)> {
        self.entries.iter().filter_map(|entry| match &entry.expression {
            Expression::Ambiguous(reason) => Some((&entry.name, reason)),
            _ => None,
        })
    }

    /// Returns an atom by id.
    #[must_use]
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id.index())
    }

    /// Returns all atoms in first-discovered order.
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Returns the conditions whose own definition mentions an atom.
    #[must_use]
    pub fn conditions_for_atom(&self, id: AtomId) -> Option<&BTreeSet<ConditionName>> {
        self.atom_users.get(id.index())
    }

    /// Returns the canonical digest of the section this table was loaded from.
    #[must_use]
    pub const fn fingerprint(&self) -> Option<&HashDigest> {
        self.fingerprint.as_ref()
    }

    /// Returns the limits this table was loaded with.
    #[must_use]
    pub const fn limits(&self) -> EngineLimits {
        self.limits
    }

    /// Returns every atom reachable from a condition through references.
    ///
    /// Atoms are listed in first-discovered order, breadth-first across
    /// references. Unknown and ambiguous conditions reach no atoms.
    #[must_use]
    pub fn atoms_of(&self, name: &str) -> Vec<AtomId> {
        self.variables_of([name])
            .into_iter()
            .filter_map(|variable| match variable {
                Variable::Atom(id) => Some(id),
                Variable::Free(_) => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Enumerator Support
    // ------------------------------------------------------------------------

    /// Returns the distinct variables reachable from the given names.
    ///
    /// Undefined names and ambiguous conditions each contribute one free
    /// variable named after themselves.
    pub(crate) fn variables_of<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Vec<Variable> {
        let mut variables = Vec::new();
        let mut seen_atoms = HashSet::new();
        let mut seen_names: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for name in names {
            if seen_names.insert(name) {
                queue.push_back(name);
            }
        }
        while let Some(name) = queue.pop_front() {
            let Some(position) = self.index.get(name) else {
                variables.push(Variable::Free(ConditionName::new(name)));
                continue;
            };
            let entry = &self.entries[*position];
            if entry.expression.is_ambiguous() {
                variables.push(Variable::Free(entry.name.clone()));
                continue;
            }
            entry.expression.visit_leaves(&mut |leaf| match leaf {
                Leaf::Atom(id) => {
                    if seen_atoms.insert(id) {
                        variables.push(Variable::Atom(id));
                    }
                }
                Leaf::Reference(target) => {
                    if seen_names.insert(target.as_str()) {
                        queue.push_back(target.as_str());
                    }
                }
            });
        }
        variables
    }

    /// Returns entry positions needed to evaluate `names`, in dependency order.
    pub(crate) fn evaluation_plan<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Vec<usize> {
        let mut needed = vec![false; self.entries.len()];
        let mut stack: Vec<usize> =
            names.into_iter().filter_map(|name| self.index.get(name).copied()).collect();
        while let Some(position) = stack.pop() {
            if needed[position] {
                continue;
            }
            needed[position] = true;
            self.entries[position].expression.visit_leaves(&mut |leaf| {
                if let Leaf::Reference(target) = leaf
                    && let Some(next) = self.index.get(target.as_str())
                {
                    stack.push(*next);
                }
            });
        }
        self.order.iter().copied().filter(|position| needed[*position]).collect()
    }

    /// Returns the name and definition stored at an entry position.
    pub(crate) fn entry(&self, position: usize) -> (&ConditionName, &Expression) {
        let entry = &self.entries[position];
        (&entry.name, &entry.expression)
    }

    /// Returns the entry position of a name.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns groups of atoms of which at most one may hold at a time.
    pub(crate) fn exclusive_groups(&self) -> &[Vec<AtomId>] {
        &self.exclusive_groups
    }

    /// Returns the fixed value of every region comparison for a region.
    pub(crate) fn region_atoms(&self, region: &str) -> HashMap<AtomId, bool> {
        self.atoms
            .iter()
            .enumerate()
            .filter_map(|(position, atom)| {
                let reference = atom.reference()?;
                if reference.target != REGION {
                    return None;
                }
                Some((AtomId::new(position), reference.literal == region))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Load Helpers
// ============================================================================

/// Replaces definitions that reference undefined conditions with ambiguity.
fn mark_dangling_references(entries: &mut [ConditionEntry], index: &HashMap<ConditionName, usize>) {
    for entry in entries.iter_mut() {
        let mut missing = None;
        entry.expression.visit_leaves(&mut |leaf| {
            if let Leaf::Reference(target) = leaf
                && missing.is_none()
                && !index.contains_key(target)
            {
                missing = Some(target.clone());
            }
        });
        if let Some(condition) = missing {
            entry.expression = Expression::Ambiguous(AmbiguityReason::UnknownReference {
                condition,
            });
        }
    }
}

/// Replaces definitions that can reach themselves through references.
fn mark_reference_cycles(entries: &mut [ConditionEntry], index: &HashMap<ConditionName, usize>) {
    let edges = reference_edges(entries, index);
    let on_cycle: Vec<bool> =
        (0 .. entries.len()).map(|start| reaches(&edges, start, start)).collect();
    for (entry, cyclic) in entries.iter_mut().zip(on_cycle) {
        if cyclic {
            entry.expression = Expression::Ambiguous(AmbiguityReason::ReferenceCycle);
        }
    }
}

/// Returns, per entry, the positions of the conditions it references.
fn reference_edges(
    entries: &[ConditionEntry],
    index: &HashMap<ConditionName, usize>,
) -> Vec<Vec<usize>> {
    entries
        .iter()
        .map(|entry| {
            let mut targets = Vec::new();
            entry.expression.visit_leaves(&mut |leaf| {
                if let Leaf::Reference(target) = leaf
                    && let Some(position) = index.get(target)
                {
                    targets.push(*position);
                }
            });
            targets
        })
        .collect()
}

/// Returns true when `target` is reachable from `start` in one or more steps.
fn reaches(edges: &[Vec<usize>], start: usize, target: usize) -> bool {
    let mut visited = vec![false; edges.len()];
    let mut stack: Vec<usize> = edges[start].clone();
    while let Some(position) = stack.pop() {
        if position == target {
            return true;
        }
        if visited[position] {
            continue;
        }
        visited[position] = true;
        stack.extend(edges[position].iter().copied());
    }
    false
}

/// Orders entries so every condition follows the conditions it references.
///
/// Runs after cycle marking, so the reference graph is acyclic.
fn dependency_order(entries: &[ConditionEntry], index: &HashMap<ConditionName, usize>) -> Vec<usize> {
    let edges = reference_edges(entries, index);
    let mut pending: Vec<usize> = edges.iter().map(Vec::len).collect();
    let mut dependents = vec![Vec::new(); entries.len()];
    for (position, targets) in edges.iter().enumerate() {
        for target in targets {
            dependents[*target].push(position);
        }
    }
    let mut ready: VecDeque<usize> =
        (0 .. entries.len()).filter(|position| pending[*position] == 0).collect();
    let mut order = Vec::with_capacity(entries.len());
    while let Some(position) = ready.pop_front() {
        order.push(position);
        for dependent in &dependents[position] {
            pending[*dependent] -= 1;
            if pending[*dependent] == 0 {
                ready.push_back(*dependent);
            }
        }
    }
    order
}

/// Groups atoms that compare one reference against distinct string literals.
fn exclusive_groups(atoms: &[Atom]) -> Vec<Vec<AtomId>> {
    let mut groups: Vec<(&str, Vec<AtomId>)> = Vec::new();
    for (position, atom) in atoms.iter().enumerate() {
        let Some(reference) = atom.reference() else {
            continue;
        };
        let id = AtomId::new(position);
        match groups.iter_mut().find(|(target, _)| *target == reference.target) {
            Some((_, members)) => members.push(id),
            None => groups.push((reference.target.as_str(), vec![id])),
        }
    }
    groups.into_iter().map(|(_, members)| members).filter(|members| members.len() > 1).collect()
}
