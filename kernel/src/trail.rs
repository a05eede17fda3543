//! The trail of implied literals, the per-variable assignment it backs, and
//! the decision stack that records the one decision literal per level.

use crate::{
    clause_db::ClauseId,
    Literal,
    Sign,
    Variable,
};
use bounded::{
    bounded_map,
    BoundedMap,
    BoundedStack,
    Index,
};
use core::{
    fmt,
    fmt::Display,
    ops::Not,
};

/// A concrete decision level.
///
/// Level `1` is the start level, before any decision has been made; it is
/// where construction-time unit propagation and host-provided hard facts
/// live. Every `decide_literal` call bumps the level by one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DecisionLevel(u32);

impl DecisionLevel {
    /// The start level, before any decision has been made.
    pub const START: Self = Self(1);

    pub fn is_start(self) -> bool {
        self == Self::START
    }
}

impl Index for DecisionLevel {
    fn from_index(index: usize) -> Self {
        assert!(index <= Variable::MAX_LEN);
        Self(index as u32)
    }

    fn into_index(self) -> usize {
        self.0 as usize
    }
}

impl Display for DecisionLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur while pushing a literal onto the trail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PushError {
    /// The literal is already assigned to the same value.
    AlreadyAssigned,
    /// The literal conflicts with the current assignment.
    Conflict,
}

/// The per-variable truth assignment.
#[derive(Debug, Default, Clone)]
pub struct VariableAssignment {
    assignment: BoundedMap<Variable, Sign>,
}

impl VariableAssignment {
    /// Returns the number of registered variables.
    pub fn len(&self) -> usize {
        self.assignment.capacity()
    }

    /// Returns `true` if no variables are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of currently assigned variables.
    pub fn len_assigned(&self) -> usize {
        self.assignment.len()
    }

    /// Returns `true` if every registered variable is assigned.
    pub fn is_complete(&self) -> bool {
        self.len() == self.len_assigned()
    }

    pub fn iter(&self) -> bounded_map::Iter<Variable, Sign> {
        self.assignment.iter()
    }

    pub(crate) fn register_variables(&mut self, additional: usize) {
        let new_len = self.len() + additional;
        self.assignment.resize_capacity(new_len);
    }

    /// Returns the assignment of `variable`, or `None` if it is unassigned.
    pub fn value_of(&self, variable: Variable) -> Option<Sign> {
        self.assignment
            .get(variable)
            .expect("encountered unexpected invalid variable")
            .copied()
    }

    /// Returns `true` if `literal` currently holds, `false` if it is
    /// falsified, or `None` if its variable is unassigned.
    pub fn is_satisfied(&self, literal: Literal) -> Option<bool> {
        self.value_of(literal.variable())
            .map(|sign| sign == literal.sign())
    }

    /// Returns the negation of [`Self::is_satisfied`].
    pub fn is_conflicting(&self, literal: Literal) -> Option<bool> {
        self.is_satisfied(literal).map(Not::not)
    }

    fn assign(&mut self, variable: Variable, sign: Sign) {
        let old = self
            .assignment
            .insert(variable, sign)
            .expect("encountered unexpected invalid variable");
        assert!(old.is_none(), "variable was already assigned");
    }

    fn unassign(&mut self, variable: Variable) {
        let old = self
            .assignment
            .take(variable)
            .expect("encountered unexpected invalid variable");
        assert!(old.is_some(), "variable was already unassigned");
    }
}

/// The decision level and, if implied, the reason clause of a variable.
#[derive(Debug, Copy, Clone)]
struct DecisionLevelAndReason {
    level: DecisionLevel,
    reason: Option<ClauseId>,
}

/// Per-variable bookkeeping of the decision level an assignment happened on
/// and, for implied literals, the clause that forced it.
#[derive(Debug, Default, Clone)]
pub struct DecisionLevelsAndReasons {
    entries: BoundedMap<Variable, DecisionLevelAndReason>,
}

impl DecisionLevelsAndReasons {
    pub(crate) fn register_variables(&mut self, additional: usize) {
        let new_len = self.entries.capacity() + additional;
        self.entries.resize_capacity(new_len);
    }

    fn set(&mut self, variable: Variable, level: DecisionLevel, reason: Option<ClauseId>) {
        self.entries
            .insert(variable, DecisionLevelAndReason { level, reason })
            .expect("encountered unexpected invalid variable");
    }

    fn clear(&mut self, variable: Variable) {
        self.entries
            .take(variable)
            .expect("encountered unexpected invalid variable");
    }

    fn get(&self, variable: Variable) -> Option<(DecisionLevel, Option<ClauseId>)> {
        self.entries
            .get(variable)
            .expect("encountered unexpected invalid variable")
            .map(|entry| (entry.level, entry.reason))
    }

    /// Returns the reason clause that implied `variable`, if it was implied
    /// (as opposed to decided) and is currently assigned.
    pub fn reason_of(&self, variable: Variable) -> Option<ClauseId> {
        self.get(variable).and_then(|(_, reason)| reason)
    }

    /// Returns the decision level `variable` is currently assigned on.
    pub fn level_of(&self, variable: Variable) -> Option<DecisionLevel> {
        self.get(variable).map(|(level, _)| level)
    }
}

/// The append-only buffer of decided and implied literals in assignment
/// order, split into per-level ranges by [`DecisionLevel`].
///
/// This is the implementation detail backing both the undo operations and
/// conflict analysis, which both need to walk assignment order; the decision
/// literal of each level is additionally tracked on its own by
/// [`DecisionStack`] for the host-facing decision-stack view.
#[derive(Debug, Default, Clone)]
pub struct Trail {
    entries: BoundedStack<Literal>,
    /// `level_starts[i]` is the trail offset at which decision level `i + 1`
    /// began. `level_starts[0]` is always `0` (the start level begins empty).
    level_starts: Vec<usize>,
    /// Index of the next not-yet-propagated entry.
    propagate_head: usize,
}

impl Trail {
    pub(crate) fn register_variables(&mut self, additional: usize) {
        let new_cap = self.entries.capacity() + additional;
        self.entries.resize_capacity(new_cap);
    }

    fn ensure_level_starts(&mut self) {
        if self.level_starts.is_empty() {
            self.level_starts.push(0);
        }
    }

    /// Bumps the decision level and returns the new level.
    pub fn bump_decision_level(&mut self) -> DecisionLevel {
        self.ensure_level_starts();
        self.level_starts.push(self.entries.len());
        DecisionLevel::from_index(self.level_starts.len())
    }

    /// Returns the current decision level.
    pub fn current_decision_level(&self) -> DecisionLevel {
        let len = self.level_starts.len().max(1);
        DecisionLevel::from_index(len)
    }

    /// Returns the literals assigned during `level`, in assignment order.
    pub fn level_assignments(&self, level: DecisionLevel) -> &[Literal] {
        let index = level.into_index();
        assert!(index >= 1, "decision levels start at 1");
        let start = self
            .level_starts
            .get(index - 1)
            .copied()
            .unwrap_or(0);
        let end = self
            .level_starts
            .get(index)
            .copied()
            .unwrap_or_else(|| self.entries.len());
        &self.entries[start..end]
    }

    /// Returns the next enqueued-but-not-yet-propagated literal, if any.
    pub fn pop_enqueued(&mut self) -> Option<Literal> {
        if self.propagate_head == self.entries.len() {
            return None
        }
        let literal = self.entries[self.propagate_head];
        self.propagate_head += 1;
        Some(literal)
    }

    /// Pushes `literal` onto the trail, assigning its variable.
    ///
    /// Does not itself propagate; only records the assignment and its
    /// reason (`None` for decisions, `Some(clause)` for implied literals).
    pub fn push(
        &mut self,
        literal: Literal,
        reason: Option<ClauseId>,
        assignment: &mut VariableAssignment,
        levels_and_reasons: &mut DecisionLevelsAndReasons,
    ) -> Result<(), PushError> {
        match assignment.is_conflicting(literal) {
            Some(true) => return Err(PushError::Conflict),
            Some(false) => return Err(PushError::AlreadyAssigned),
            None => (),
        }
        self.entries.push(literal);
        assignment.assign(literal.variable(), literal.sign());
        levels_and_reasons.set(literal.variable(), self.current_decision_level(), reason);
        Ok(())
    }

    /// Undoes the trail back to the start of `target_level`, unassigning
    /// every variable assigned at or after that level.
    pub fn undo_to_level(
        &mut self,
        target_level: DecisionLevel,
        assignment: &mut VariableAssignment,
        levels_and_reasons: &mut DecisionLevelsAndReasons,
    ) {
        let index = target_level.into_index();
        assert!(index >= 1, "decision levels start at 1");
        assert!(index <= self.level_starts.len().max(1));
        let start = self.level_starts.get(index - 1).copied().unwrap_or(0);
        self.entries.pop_to(start, |popped| {
            assignment.unassign(popped.variable());
            levels_and_reasons.clear(popped.variable());
        });
        self.level_starts.truncate(index - 1);
        self.propagate_head = start;
    }
}

/// The stack of decision literals, one per decision level beyond the start
/// level, indexed `decision_stack[level - 2]`.
#[derive(Debug, Default, Clone)]
pub struct DecisionStack {
    literals: Vec<Literal>,
}

impl DecisionStack {
    /// Records `literal` as the decision of the just-bumped `level`.
    pub fn push(&mut self, level: DecisionLevel, literal: Literal) {
        assert_eq!(level.into_index(), self.literals.len() + 2);
        self.literals.push(literal);
    }

    /// Removes and returns the decision literal of the current top level.
    pub fn pop(&mut self) -> Option<Literal> {
        self.literals.pop()
    }

    /// Returns the decision literal of `level`, if any decision has been
    /// made at or above that level.
    pub fn get(&self, level: DecisionLevel) -> Option<Literal> {
        level
            .into_index()
            .checked_sub(2)
            .and_then(|index| self.literals.get(index).copied())
    }

    /// Returns `true` if no decision has been made yet.
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Returns the number of decisions currently on the stack.
    pub fn len(&self) -> usize {
        self.literals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Variable;

    fn var(index1: usize) -> Variable {
        Variable::from_index1(index1).unwrap()
    }

    #[test]
    fn trail_push_and_level_assignments() {
        let mut trail = Trail::default();
        let mut assignment = VariableAssignment::default();
        let mut levels = DecisionLevelsAndReasons::default();
        trail.register_variables(3);
        assignment.register_variables(3);
        levels.register_variables(3);

        trail
            .push(var(1).into_literal(Sign::POS), None, &mut assignment, &mut levels)
            .unwrap();
        assert_eq!(trail.current_decision_level(), DecisionLevel::START);
        assert_eq!(trail.level_assignments(DecisionLevel::START).len(), 1);

        let level2 = trail.bump_decision_level();
        trail
            .push(var(2).into_literal(Sign::NEG), None, &mut assignment, &mut levels)
            .unwrap();
        trail
            .push(var(3).into_literal(Sign::POS), Some(ClauseId::from_index(0)), &mut assignment, &mut levels)
            .unwrap();
        assert_eq!(trail.level_assignments(level2).len(), 2);
        assert_eq!(levels.level_of(var(3)), Some(level2));
        assert_eq!(levels.reason_of(var(2)), None);
        assert!(levels.reason_of(var(3)).is_some());
    }

    #[test]
    fn trail_undo_restores_prior_level() {
        let mut trail = Trail::default();
        let mut assignment = VariableAssignment::default();
        let mut levels = DecisionLevelsAndReasons::default();
        trail.register_variables(2);
        assignment.register_variables(2);
        levels.register_variables(2);

        trail
            .push(var(1).into_literal(Sign::POS), None, &mut assignment, &mut levels)
            .unwrap();
        let level2 = trail.bump_decision_level();
        trail
            .push(var(2).into_literal(Sign::NEG), None, &mut assignment, &mut levels)
            .unwrap();
        assert_eq!(trail.current_decision_level(), level2);

        trail.undo_to_level(DecisionLevel::START, &mut assignment, &mut levels);
        assert_eq!(trail.current_decision_level(), DecisionLevel::START);
        assert_eq!(assignment.value_of(var(2)), None);
        assert_eq!(assignment.value_of(var(1)), Some(Sign::POS));
    }

    #[test]
    fn push_conflicting_literal_errs() {
        let mut trail = Trail::default();
        let mut assignment = VariableAssignment::default();
        let mut levels = DecisionLevelsAndReasons::default();
        trail.register_variables(1);
        assignment.register_variables(1);
        levels.register_variables(1);
        trail
            .push(var(1).into_literal(Sign::POS), None, &mut assignment, &mut levels)
            .unwrap();
        assert_eq!(
            trail.push(var(1).into_literal(Sign::NEG), None, &mut assignment, &mut levels),
            Err(PushError::Conflict)
        );
        assert_eq!(
            trail.push(var(1).into_literal(Sign::POS), None, &mut assignment, &mut levels),
            Err(PushError::AlreadyAssigned)
        );
    }

    #[test]
    fn decision_stack_indexing() {
        let mut stack = DecisionStack::default();
        stack.push(DecisionLevel::from_index(2), var(1).into_literal(Sign::POS));
        stack.push(DecisionLevel::from_index(3), var(2).into_literal(Sign::NEG));
        assert_eq!(stack.get(DecisionLevel::from_index(2)), Some(var(1).into_literal(Sign::POS)));
        assert_eq!(stack.get(DecisionLevel::from_index(3)), Some(var(2).into_literal(Sign::NEG)));
        assert_eq!(stack.pop(), Some(var(2).into_literal(Sign::NEG)));
        assert_eq!(stack.len(), 1);
    }
}
