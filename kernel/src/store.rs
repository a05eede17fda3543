//! The entity store: the clause database plus the cross-linkage and host
//! mark bits built on top of it.
//!
//! Variable and original-clause counts are fixed at construction; only the
//! clause database itself grows afterwards, by appending learned clauses.

use crate::{
    clause_db::{
        Clause,
        ClauseDb,
        ClauseId,
        ClauseRef,
    },
    trail::{
        DecisionLevel,
        VariableAssignment,
    },
    Variable,
};
use bounded::{
    BoundedArray,
    BoundedBitmap,
    Index,
};

/// Owns the clause database, the per-variable original-clause occurrence
/// lists, and the host-facing mark bits on variables and clauses.
#[derive(Debug, Default, Clone)]
pub struct Store {
    clauses: ClauseDb,
    num_original_clauses: usize,
    /// Original clauses mentioning each variable, built once at construction
    /// and never extended when learned clauses are appended.
    var_occurrences: BoundedArray<Variable, Vec<ClauseId>>,
    var_marks: BoundedBitmap<Variable, bool>,
    /// Indexed by `ClauseId::into_index()`; grows alongside `clauses`.
    clause_marks: Vec<bool>,
    /// Assertion level of each learned clause, indexed by learned-clause
    /// order (i.e. `ClauseId::into_index() - num_original_clauses`). Original
    /// clauses have no assertion level.
    learned_levels: Vec<DecisionLevel>,
}

impl Store {
    pub(crate) fn register_variables(&mut self, additional: usize) {
        let total = self.var_occurrences.len() + additional;
        self.var_occurrences.resize_with(total, Vec::new);
        self.var_marks.resize_to_len(total);
    }

    /// Pushes an original clause at construction time, recording occurrence
    /// links for every variable it mentions.
    pub(crate) fn push_original_clause(&mut self, clause: Clause) -> ClauseId {
        let variables: Vec<Variable> = (&clause).into_iter().map(|lit| lit.variable()).collect();
        let id = self.clauses.push(clause);
        for variable in variables {
            self.var_occurrences
                .get_mut(variable)
                .expect("encountered unexpected invalid variable")
                .push(id);
        }
        self.num_original_clauses += 1;
        self.clause_marks.push(false);
        id
    }

    /// Appends a learned clause with its assertion level, returning its
    /// stable clause identifier.
    pub(crate) fn push_learned_clause(&mut self, clause: Clause, assertion_level: DecisionLevel) -> ClauseId {
        let id = self.clauses.push(clause);
        self.clause_marks.push(false);
        self.learned_levels.push(assertion_level);
        id
    }

    /// Returns `true` iff `id` names a learned (as opposed to original) clause.
    pub fn is_learned(&self, id: ClauseId) -> bool {
        id.into_index() >= self.num_original_clauses
    }

    /// Returns the assertion level of a learned clause.
    ///
    /// # Panics
    ///
    /// If `id` does not name a learned clause.
    pub fn assertion_level_of(&self, id: ClauseId) -> DecisionLevel {
        let index = id.into_index() - self.num_original_clauses;
        self.learned_levels[index]
    }

    pub fn clauses(&self) -> &ClauseDb {
        &self.clauses
    }

    pub(crate) fn clauses_mut(&mut self) -> &mut ClauseDb {
        &mut self.clauses
    }

    pub fn clause_count(&self) -> usize {
        self.num_original_clauses
    }

    pub fn learned_count(&self) -> usize {
        self.clauses.len() - self.num_original_clauses
    }

    pub fn resolve(&self, id: ClauseId) -> Option<ClauseRef> {
        self.clauses.resolve(id)
    }

    /// Returns `true` iff every original clause mentioning `variable` is
    /// subsumed under `assignment`.
    pub fn is_irrelevant_var(&self, variable: Variable, assignment: &VariableAssignment) -> bool {
        self.var_occurrences
            .get(variable)
            .expect("encountered unexpected invalid variable")
            .iter()
            .all(|&id| {
                self.clauses
                    .resolve(id)
                    .expect("encountered unexpected invalid clause ID")
                    .is_subsumed(assignment)
            })
    }

    /// Returns the number of original clauses mentioning `variable`.
    pub fn var_occurrence_count(&self, variable: Variable) -> usize {
        self.var_occurrences
            .get(variable)
            .expect("encountered unexpected invalid variable")
            .len()
    }

    /// Returns the `n`-th original clause mentioning `variable`, if any.
    pub fn var_occurrence(&self, variable: Variable, n: usize) -> Option<ClauseId> {
        self.var_occurrences
            .get(variable)
            .expect("encountered unexpected invalid variable")
            .get(n)
            .copied()
    }

    pub fn mark_var(&mut self, variable: Variable) {
        self.var_marks
            .set(variable, true)
            .expect("encountered unexpected invalid variable");
    }

    pub fn unmark_var(&mut self, variable: Variable) {
        self.var_marks
            .set(variable, false)
            .expect("encountered unexpected invalid variable");
    }

    pub fn marked_var(&self, variable: Variable) -> bool {
        self.var_marks
            .get(variable)
            .expect("encountered unexpected invalid variable")
    }

    fn clause_mark_index(&self, id: ClauseId) -> usize {
        id.into_index()
    }

    pub fn mark_clause(&mut self, id: ClauseId) {
        let index = self.clause_mark_index(id);
        self.clause_marks[index] = true;
    }

    pub fn unmark_clause(&mut self, id: ClauseId) {
        let index = self.clause_mark_index(id);
        self.clause_marks[index] = false;
    }

    pub fn marked_clause(&self, id: ClauseId) -> bool {
        let index = self.clause_mark_index(id);
        self.clause_marks[index]
    }
}
