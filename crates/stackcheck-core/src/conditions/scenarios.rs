// crates/stackcheck-core/src/conditions/scenarios.rs
// ============================================================================
// Module: Scenario Enumeration
// Description: Satisfiable True/False assignments over a set of condition names.
// Purpose: Enumerate independent atoms, evaluate conditions, and project scenarios.
// Dependencies: crate::{audit, conditions, identifiers, limits, paths}, serde, smallvec
// ============================================================================

//! ## Overview
//! Conditions are not independent: two conditions built on the same equality
//! atom move together, and a parameter cannot equal two different strings at
//! once. The enumerator therefore assigns truth values to *atoms*, evaluates
//! each requested condition under that assignment, and keeps the distinct
//! projections onto the requested names.
//!
//! Ambiguous and undefined conditions are free variables. Variables beyond
//! [`EngineLimits::max_variables`] are left unbound: every requested name
//! touching one is emitted with both values, which over-admits scenarios
//! instead of enumerating an exponential product. Those combinations are
//! produced lazily and stop at [`EngineLimits::max_scenarios`].
//!
//! Constraints (path conditions, or the partial scenario given to
//! [`ScenarioEnumerator::implies`]) restrict the values each name may take
//! before any combination is built, so rejected combinations cost nothing.
//!
//! Output order is reproducible: variables are taken in first-discovered
//! order, each assignment lists the first variable as most significant, and
//! `true` is tried before `false`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::btree_map;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::audit::ConditionAuditEvent;
use crate::audit::ConditionAuditKind;
use crate::audit::ConditionAuditSink;
use crate::audit::NoopAuditSink;
use crate::conditions::expression::AtomId;
use crate::conditions::expression::Valuation;
use crate::conditions::table::ConditionTable;
use crate::conditions::table::Variable;
use crate::identifiers::ConditionName;
use crate::limits::EngineLimits;
use crate::paths::BranchSet;
use crate::paths::PathConditions;

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// One consistent assignment of truth values to condition names.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario(BTreeMap<ConditionName, bool>);

impl Scenario {
    /// Returns the value assigned to a condition.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    /// Returns true when the scenario assigns the condition.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns assigned condition names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &ConditionName> {
        self.0.keys()
    }

    /// Iterates over assignments in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, ConditionName, bool> {
        self.0.iter()
    }

    /// Returns the number of assigned conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the unconditional scenario.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when every assignment here agrees with `other`.
    #[must_use]
    pub fn agrees_with(&self, other: &Self) -> bool {
        self.0.iter().all(|(name, value)| other.get(name.as_str()).is_none_or(|v| v == *value))
    }
}

impl<N: Into<ConditionName>> FromIterator<(N, bool)> for Scenario {
    fn from_iter<I: IntoIterator<Item = (N, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, value)| (name.into(), value)).collect())
    }
}

impl<'a> IntoIterator for &'a Scenario {
    type IntoIter = btree_map::Iter<'a, ConditionName, bool>;
    type Item = (&'a ConditionName, &'a bool);

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// SECTION: Enumerator
// ============================================================================

/// Shared no-op sink used when no audit sink is configured.
static NOOP_AUDIT: NoopAuditSink = NoopAuditSink;

/// Enumerates scenarios against one condition table.
pub struct ScenarioEnumerator<'a> {
    /// Table supplying expressions and atoms.
    table: &'a ConditionTable,
    /// Width and depth bounds.
    limits: EngineLimits,
    /// Receives cap events.
    audit: &'a dyn ConditionAuditSink,
}

impl<'a> ScenarioEnumerator<'a> {
    /// Creates an enumerator using the table's own limits.
    #[must_use]
    pub fn new(table: &'a ConditionTable) -> Self {
        Self {
            table,
            limits: table.limits(),
            audit: &NOOP_AUDIT,
        }
    }

    /// Overrides the limits, clamped to the engine ceilings.
    #[must_use]
    pub const fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits.clamped();
        self
    }

    /// Routes cap events to an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: &'a dyn ConditionAuditSink) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the limits in effect.
    #[must_use]
    pub const fn limits(&self) -> EngineLimits {
        self.limits
    }

    /// Returns every satisfiable assignment over `names`.
    ///
    /// No names yields exactly one empty scenario.
    #[must_use]
    pub fn enumerate<I, N>(&self, names: I) -> Vec<Scenario>
    where
        I: IntoIterator<Item = N>,
        N: Into<ConditionName>,
    {
        self.run(&collect_names(names), &HashMap::new(), |_| BranchSet::BOTH)
    }

    /// Returns the scenarios over `names` that respect path constraints.
    #[must_use]
    pub fn enumerate_constrained<I, N>(&self, names: I, constraints: &PathConditions) -> Vec<Scenario>
    where
        I: IntoIterator<Item = N>,
        N: Into<ConditionName>,
    {
        self.run(&collect_names(names), &HashMap::new(), |name| {
            constraints.get(name).unwrap_or(BranchSet::BOTH)
        })
    }

    /// Returns the scenarios over `names` possible in a deployment region.
    ///
    /// Equality tests between `{"Ref": "AWS::Region"}` and a string are fixed
    /// to whether that string is `region`.
    #[must_use]
    pub fn enumerate_for_region<I, N>(&self, names: I, region: &str) -> Vec<Scenario>
    where
        I: IntoIterator<Item = N>,
        N: Into<ConditionName>,
    {
        self.run(&collect_names(names), &self.table.region_atoms(region), |_| BranchSet::BOTH)
    }

    /// Returns true when `name` must hold whenever `given` holds.
    ///
    /// A `given` scenario that no assignment satisfies implies nothing.
    #[must_use]
    pub fn implies(&self, given: &Scenario, name: &str) -> bool {
        let mut names: BTreeSet<ConditionName> = given.names().cloned().collect();
        names.insert(ConditionName::new(name));
        let consistent: Vec<Scenario> = self.run(&names, &HashMap::new(), |candidate| {
            given.get(candidate).map_or(BranchSet::BOTH, BranchSet::only)
        });
        !consistent.is_empty() && consistent.iter().all(|scenario| scenario.get(name) == Some(true))
    }

    // ------------------------------------------------------------------------
    // Core Loop
    // ------------------------------------------------------------------------

    /// Enumerates projections over `names` with some atoms pre-assigned.
    ///
    /// `admitted` gives the values each requested name may take.
    fn run(
        &self,
        names: &BTreeSet<ConditionName>,
        fixed: &HashMap<AtomId, bool>,
        admitted: impl Fn(&str) -> BranchSet,
    ) -> Vec<Scenario> {
        if names.is_empty() {
            return vec![Scenario::default()];
        }

        let variables: Vec<Variable> = self
            .table
            .variables_of(names.iter().map(ConditionName::as_str))
            .into_iter()
            .filter(|variable| !matches!(variable, Variable::Atom(id) if fixed.contains_key(id)))
            .collect();
        let bound_count = variables.len().min(self.limits.max_variables);
        if variables.len() > bound_count {
            self.audit.record(&ConditionAuditEvent::new(ConditionAuditKind::EnumerationCapped {
                requested: names.len(),
                variables: variables.len(),
                bound: bound_count,
            }));
        }
        let bound = &variables[.. bound_count];
        let unbound: HashSet<&Variable> = variables[bound_count ..].iter().collect();

        let mut loose = Vec::new();
        let mut tight = Vec::new();
        for name in names {
            let depends_on_unbound = !unbound.is_empty()
                && self
                    .table
                    .variables_of([name.as_str()])
                    .iter()
                    .any(|variable| unbound.contains(variable));
            if depends_on_unbound {
                loose.push(LooseChoice::new(name, admitted(name.as_str())));
            } else {
                tight.push(name);
            }
        }
        if loose.iter().any(|choice| choice.values.is_empty()) {
            return Vec::new();
        }

        let plan = self.table.evaluation_plan(tight.iter().map(|name| name.as_str()));
        let mut output = Output::new(self.limits.max_scenarios);
        let mut seen = HashSet::new();
        // Limits are clamped, so `bound` never exceeds `MAX_VARIABLES_CEILING`.
        let total = 1usize << bound.len();
        for mask in 0 .. total {
            let assignment = Assignment::new(bound, mask, fixed);
            if !assignment.respects(self.table.exclusive_groups()) {
                continue;
            }
            let values = assignment.evaluate(self.table, &plan);
            let projection: Scenario = tight
                .iter()
                .map(|name| ((*name).clone(), values.lookup(self.table, &assignment, name)))
                .collect();
            if !projection.iter().all(|(name, value)| admitted(name.as_str()).contains(*value)) {
                continue;
            }
            if !seen.insert(projection.clone()) {
                continue;
            }
            if !expand_loose(&projection, &loose, &mut output) {
                self.audit.record(&ConditionAuditEvent::new(
                    ConditionAuditKind::ScenarioLimitReached {
                        requested: names.len(),
                        max_scenarios: self.limits.max_scenarios,
                    },
                ));
                break;
            }
        }
        output.scenarios
    }
}

/// Collects requested names into a sorted, deduplicated set.
fn collect_names<I, N>(names: I) -> BTreeSet<ConditionName>
where
    I: IntoIterator<Item = N>,
    N: Into<ConditionName>,
{
    names.into_iter().map(Into::into).collect()
}

/// Admissible values of a name left outside exhaustive enumeration.
struct LooseChoice<'n> {
    /// Requested name.
    name: &'n ConditionName,
    /// Values to emit, true first.
    values: SmallVec<[bool; 2]>,
}

impl<'n> LooseChoice<'n> {
    /// Collects the values of `branches` in emission order.
    fn new(name: &'n ConditionName, branches: BranchSet) -> Self {
        let values = [true, false].into_iter().filter(|value| branches.contains(*value)).collect();
        Self {
            name,
            values,
        }
    }
}

/// Appends `base` extended by combinations of loose values.
///
/// Combinations are produced one at a time, first name most significant, so
/// the work done is bounded by the output ceiling rather than by the number
/// of loose names. Returns false once the output is full.
fn expand_loose(base: &Scenario, loose: &[LooseChoice<'_>], output: &mut Output) -> bool {
    let mut digits = vec![0usize; loose.len()];
    loop {
        let mut scenario = base.clone();
        for (choice, digit) in loose.iter().zip(&digits) {
            if let Some(value) = choice.values.get(*digit) {
                scenario.0.insert(choice.name.clone(), *value);
            }
        }
        if !output.push(scenario) {
            return false;
        }
        if !advance(&mut digits, loose) {
            return true;
        }
    }
}

/// Steps the odometer to the next combination; false once it wraps.
fn advance(digits: &mut [usize], loose: &[LooseChoice<'_>]) -> bool {
    for (digit, choice) in digits.iter_mut().zip(loose).rev() {
        *digit += 1;
        if *digit < choice.values.len() {
            return true;
        }
        *digit = 0;
    }
    false
}

/// Returns the value of variable `position` of `width` in assignment `mask`.
///
/// The first variable is the most significant bit and a clear bit means true.
const fn bit_is_true(mask: usize, position: usize, width: usize) -> bool {
    (mask >> (width - 1 - position)) & 1 == 0
}

// ============================================================================
// SECTION: Assignment
// ============================================================================

/// Truth values for one point of the enumeration.
struct Assignment<'v> {
    /// Values of bound atoms and fixed atoms.
    atoms: HashMap<AtomId, bool>,
    /// Values of bound free variables.
    free: HashMap<&'v ConditionName, bool>,
}

impl<'v> Assignment<'v> {
    /// Decodes `mask` over the bound variables.
    fn new(bound: &'v [Variable], mask: usize, fixed: &HashMap<AtomId, bool>) -> Self {
        let mut atoms = fixed.clone();
        let mut free = HashMap::new();
        for (position, variable) in bound.iter().enumerate() {
            let value = bit_is_true(mask, position, bound.len());
            match variable {
                Variable::Atom(id) => {
                    atoms.insert(*id, value);
                }
                Variable::Free(name) => {
                    free.insert(name, value);
                }
            }
        }
        Self {
            atoms,
            free,
        }
    }

    /// Returns false when two atoms of one exclusive group both hold.
    fn respects(&self, groups: &[Vec<AtomId>]) -> bool {
        groups.iter().all(|group| {
            group.iter().filter(|id| self.atoms.get(*id).copied().unwrap_or(false)).count() <= 1
        })
    }

    /// Evaluates the planned conditions in dependency order.
    fn evaluate(&self, table: &ConditionTable, plan: &[usize]) -> Values {
        let mut values = Values {
            by_position: HashMap::new(),
        };
        for position in plan {
            let (name, expression) = table.entry(*position);
            let value = expression
                .evaluate(&Scope {
                    assignment: self,
                    values: &values,
                    table,
                })
                .or_else(|| self.free.get(name).copied())
                .unwrap_or(false);
            values.by_position.insert(*position, value);
        }
        values
    }
}

/// Evaluated condition values for one assignment.
struct Values {
    /// Values keyed by table entry position.
    by_position: HashMap<usize, bool>,
}

impl Values {
    /// Returns the value of a requested name, falling back to its free variable.
    fn lookup(&self, table: &ConditionTable, assignment: &Assignment<'_>, name: &ConditionName) -> bool {
        table
            .position(name.as_str())
            .and_then(|position| self.by_position.get(&position).copied())
            .or_else(|| assignment.free.get(name).copied())
            .unwrap_or(false)
    }
}

/// Valuation view combining atom values with already-evaluated conditions.
struct Scope<'s, 'v> {
    /// Current assignment.
    assignment: &'s Assignment<'v>,
    /// Conditions evaluated so far.
    values: &'s Values,
    /// Table used to resolve reference positions.
    table: &'s ConditionTable,
}

impl Valuation for Scope<'_, '_> {
    fn atom(&self, id: AtomId) -> bool {
        self.assignment.atoms.get(&id).copied().unwrap_or(false)
    }

    fn condition(&self, name: &ConditionName) -> Option<bool> {
        let position = self.table.position(name.as_str())?;
        self.values.by_position.get(&position).copied()
    }
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Bounded scenario list.
struct Output {
    /// Scenarios collected so far.
    scenarios: Vec<Scenario>,
    /// Maximum number of scenarios.
    max: usize,
}

impl Output {
    /// Creates an empty output with a ceiling.
    const fn new(max: usize) -> Self {
        Self {
            scenarios: Vec::new(),
            max,
        }
    }

    /// Appends a scenario; returns false when the ceiling was already reached.
    fn push(&mut self, scenario: Scenario) -> bool {
        if self.scenarios.len() >= self.max {
            return false;
        }
        self.scenarios.push(scenario);
        true
    }
}

// ============================================================================
// SECTION: Table Convenience
// ============================================================================

impl ConditionTable {
    /// Enumerates scenarios over `names` with the table's limits.
    #[must_use]
    pub fn scenarios<I, N>(&self, names: I) -> Vec<Scenario>
    where
        I: IntoIterator<Item = N>,
        N: Into<ConditionName>,
    {
        ScenarioEnumerator::new(self).enumerate(names)
    }
}
