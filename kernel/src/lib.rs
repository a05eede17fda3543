#![deny(unsafe_code)]
#![warn(unsafe_op_in_unsafe_fn)]
#![allow(clippy::len_without_is_empty)]

mod analysis;
mod builder;
pub mod clause_db;
mod literal;
mod sanitizer;
mod store;
mod trail;
mod watch_list;

use crate::{
    analysis::{
        assertion_level,
        FirstUipLearning,
    },
    builder::ReasonerBuilder,
    clause_db::{
        Clause,
        ClauseId,
    },
    literal::RegisterVariables,
    store::Store,
    trail::{
        DecisionLevelsAndReasons,
        DecisionStack,
        Trail,
        VariableAssignment,
    },
    watch_list::WatchList,
};
pub use crate::literal::{
    Literal,
    Sign,
    Variable,
};
use bounded::Index;
use cnf_parser::Error as CnfError;
use std::path::Path;
use thiserror::Error as ThisError;

/// Errors that can occur while constructing a [`Reasoner`] from DIMACS input.
///
/// All variants are construction-time, input-driven failures; none of them
/// are raised once a reasoner exists. A normal conflict during `decide` or
/// `assert_clause` is not an error — it is the `Option<ClauseId>` return
/// every mutating operation already uses.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("failed to read DIMACS input: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed DIMACS input: {0}")]
    Dimacs(String),
    #[error("encountered an empty or self-conflicting clause")]
    EmptyClause,
    #[error("more variables were declared than this kernel can index")]
    TooManyVariables,
}

impl From<CnfError<Error>> for Error {
    fn from(err: CnfError<Error>) -> Self {
        Error::Dimacs(err.to_string())
    }
}

/// The CDCL reasoning kernel: an incremental, backtrackable view over a CNF
/// formula. A host decides literals, observes propagation, and reacts to
/// conflicts by asserting the learned clause this kernel publishes.
#[derive(Debug, Default, Clone)]
pub struct Reasoner {
    num_variables: usize,
    store: Store,
    assignment: VariableAssignment,
    levels_and_reasons: DecisionLevelsAndReasons,
    trail: Trail,
    decision_stack: DecisionStack,
    watch_list: WatchList,
    analysis: FirstUipLearning,
    /// The currently published asserting clause, if a conflict has not yet
    /// been resolved by the host.
    asserting_clause: Option<ClauseId>,
}

impl RegisterVariables for Reasoner {
    fn register_variables(&mut self, additional: usize) {
        self.store.register_variables(additional);
        self.assignment.register_variables(additional);
        self.levels_and_reasons.register_variables(additional);
        self.trail.register_variables(additional);
        self.watch_list.register_variables(additional);
        self.analysis.register_variables(additional);
        self.num_variables += additional;
    }
}

impl Reasoner {
    /// Loads a CNF formula from a DIMACS file at `path`.
    pub fn from_dimacs_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Self::from_dimacs_bytes(&bytes)
    }

    /// Loads a CNF formula from DIMACS-formatted bytes.
    pub fn from_dimacs_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut builder = ReasonerBuilder::default();
        cnf_parser::parse_cnf(&mut &*bytes, &mut builder)?;
        builder.finalize()
    }

    /// Returns the number of registered variables.
    pub fn variable_count(&self) -> usize {
        self.num_variables
    }

    /// Returns the number of original clauses.
    pub fn clause_count(&self) -> usize {
        self.store.clause_count()
    }

    /// Returns the number of clauses learned so far.
    pub fn learned_clause_count(&self) -> usize {
        self.store.learned_count()
    }

    /// Returns the variable for the given stable 1-based index.
    pub fn index_to_variable(&self, index: usize) -> Option<Variable> {
        let variable = Variable::from_index1(index)?;
        (variable.into_index() < self.num_variables).then(|| variable)
    }

    /// Returns the clause for the given stable clause index (see
    /// [`crate::clause_db::ClauseId::index`]).
    pub fn index_to_clause(&self, index: usize) -> Option<ClauseId> {
        let id = ClauseId::from_index(index.checked_sub(1)?);
        self.store.resolve(id).map(|_| id)
    }

    /// Returns the positive literal of `variable`.
    pub fn pos_literal(&self, variable: Variable) -> Literal {
        variable.pos_literal()
    }

    /// Returns the negative literal of `variable`.
    pub fn neg_literal(&self, variable: Variable) -> Literal {
        variable.neg_literal()
    }

    /// Returns `true` if `variable` currently has a value.
    pub fn instantiated_var(&self, variable: Variable) -> bool {
        self.assignment.value_of(variable).is_some()
    }

    /// Returns `true` if `literal` is implied, i.e. its variable is
    /// instantiated (matching either [`Self::instantiated_var`]).
    pub fn implied_literal(&self, literal: Literal) -> bool {
        self.instantiated_var(literal.variable())
    }

    /// Returns `literal`'s current truth value, or `None` if its variable is
    /// unassigned. Not part of the core query set; exposed for hosts that
    /// need to read out a satisfying assignment.
    pub fn literal_value(&self, literal: Literal) -> Option<bool> {
        self.assignment.is_satisfied(literal)
    }

    /// Returns `true` iff every original clause mentioning `variable` is
    /// already subsumed under the current assignment.
    pub fn irrelevant_var(&self, variable: Variable) -> bool {
        self.store.is_irrelevant_var(variable, &self.assignment)
    }

    /// Returns `true` if `clause` currently holds a true literal.
    pub fn subsumed_clause(&self, clause: ClauseId) -> bool {
        self.store
            .resolve(clause)
            .expect("encountered unexpected invalid clause ID")
            .is_subsumed(&self.assignment)
    }

    /// Returns the number of literals in `clause`.
    pub fn clause_size(&self, clause: ClauseId) -> usize {
        self.store
            .resolve(clause)
            .expect("encountered unexpected invalid clause ID")
            .len()
    }

    /// Returns the `n`-th literal of `clause`, if any.
    pub fn clause_literal(&self, clause: ClauseId, n: usize) -> Option<Literal> {
        self.store.resolve(clause).expect("encountered unexpected invalid clause ID").into_iter().nth(n)
    }

    /// Returns the number of original clauses mentioning `variable`.
    pub fn var_occurrence_count(&self, variable: Variable) -> usize {
        self.store.var_occurrence_count(variable)
    }

    /// Returns the `n`-th original clause mentioning `variable`.
    pub fn var_occurrence(&self, variable: Variable, n: usize) -> Option<ClauseId> {
        self.store.var_occurrence(variable, n)
    }

    /// Marks `variable` for host-side bookkeeping. Never read by the kernel.
    pub fn mark_var(&mut self, variable: Variable) {
        self.store.mark_var(variable)
    }

    pub fn unmark_var(&mut self, variable: Variable) {
        self.store.unmark_var(variable)
    }

    pub fn marked_var(&self, variable: Variable) -> bool {
        self.store.marked_var(variable)
    }

    /// Marks `clause` for host-side bookkeeping. Never read by the kernel.
    pub fn mark_clause(&mut self, clause: ClauseId) {
        self.store.mark_clause(clause)
    }

    pub fn unmark_clause(&mut self, clause: ClauseId) {
        self.store.unmark_clause(clause)
    }

    pub fn marked_clause(&self, clause: ClauseId) -> bool {
        self.store.marked_clause(clause)
    }

    /// Returns `true` if `clause`'s assertion level equals the current
    /// decision level, i.e. the host may call [`Self::assert_clause`] now.
    pub fn at_assertion_level(&self, clause: ClauseId) -> bool {
        self.store.assertion_level_of(clause) == self.trail.current_decision_level()
    }

    /// Returns `true` if no decision has been made yet.
    pub fn at_start_level(&self) -> bool {
        self.trail.current_decision_level().is_start()
    }

    /// Returns `true` if a conflict's asserting clause is currently published.
    pub fn conflict_exists(&self) -> bool {
        self.asserting_clause.is_some()
    }

    /// Returns the currently published asserting clause, if any.
    pub fn asserting_clause(&self) -> Option<ClauseId> {
        self.asserting_clause
    }

    /// Decides `literal`, bumping the decision level and running propagation.
    ///
    /// # Panics (debug only)
    ///
    /// If `literal`'s variable is already instantiated, or a conflict is
    /// already published.
    pub fn decide_literal(&mut self, literal: Literal) -> Option<ClauseId> {
        debug_assert!(!self.instantiated_var(literal.variable()));
        debug_assert!(!self.conflict_exists());
        log::debug!("deciding {}", literal);
        let level = self.trail.bump_decision_level();
        self.decision_stack.push(level, literal);
        self.trail
            .push(literal, None, &mut self.assignment, &mut self.levels_and_reasons)
            .expect("decision literal must not already be assigned");
        self.run_propagation();
        self.asserting_clause
    }

    /// Undoes the most recent decision and every propagation it caused.
    ///
    /// # Panics (debug only)
    ///
    /// If at the start level (no decision to undo).
    ///
    /// Does not touch the published asserting clause, if any: per the
    /// decide/undo/assert control flow, a conflict learned above the current
    /// level stays published across repeated undos until the host reaches
    /// its assertion level and calls [`Self::assert_clause`].
    pub fn undo_decide_literal(&mut self) {
        debug_assert!(!self.at_start_level());
        let level = self.trail.current_decision_level();
        log::debug!("undoing decision at level {}", level);
        self.trail
            .undo_to_level(level, &mut self.assignment, &mut self.levels_and_reasons);
        self.decision_stack.pop();
    }

    /// Asserts `clause` (the currently published asserting clause): forces
    /// its one remaining free literal true with `clause` as the reason, then
    /// re-runs propagation at the current level.
    ///
    /// `clause` was already stored (with watches, if it has 2+ literals) by
    /// the conflict analysis that published it; asserting is the separate
    /// step of actually making it force its implication, since the host may
    /// still be undoing further decisions when it is merely published.
    ///
    /// If every literal of `clause` is already assigned, the clause is still
    /// falsified under the current assignment and there is no decision left
    /// to undo that would free it: `clause` is republished unchanged, and a
    /// host that observes this while [`Self::at_start_level`] holds has its
    /// answer — the formula is unsatisfiable.
    ///
    /// # Panics (debug only)
    ///
    /// If `clause` is not the published asserting clause, or its assertion
    /// level does not match the current decision level.
    pub fn assert_clause(&mut self, clause: ClauseId) -> Option<ClauseId> {
        debug_assert_eq!(self.asserting_clause, Some(clause));
        debug_assert!(self.at_assertion_level(clause));
        log::debug!(
            "asserting learned clause {} at level {}",
            clause.index(),
            self.trail.current_decision_level()
        );
        self.asserting_clause = None;
        let implied = self
            .store
            .resolve(clause)
            .expect("encountered unexpected invalid clause ID")
            .into_iter()
            .find(|&literal| !self.instantiated_var(literal.variable()));
        match implied {
            Some(literal) => {
                self.push_fact(literal, clause);
                if !self.conflict_exists() {
                    self.run_propagation();
                }
            }
            None => {
                log::info!("clause {} is still falsified, no level left to free it", clause.index());
                self.asserting_clause = Some(clause);
            }
        }
        self.asserting_clause
    }

    /// Drains the propagation queue, publishing the first conflict found (if
    /// any) as the asserting clause via first-UIP analysis.
    fn run_propagation(&mut self) {
        while let Some(literal) = self.trail.pop_enqueued() {
            if let Some(conflicting) = self.watch_list.propagate(
                literal,
                self.store.clauses_mut(),
                &mut self.assignment,
                &mut self.levels_and_reasons,
                &mut self.trail,
            ) {
                self.learn_from_conflict(conflicting);
                return
            }
        }
    }

    /// Runs first-UIP analysis against `conflicting` and publishes the
    /// resulting learned clause as the current asserting clause.
    fn learn_from_conflict(&mut self, conflicting: ClauseId) {
        log::info!("conflict on clause {}", conflicting.index());
        let conflicting_ref = self
            .store
            .resolve(conflicting)
            .expect("encountered unexpected invalid clause ID");
        let learned: Vec<Literal> = self
            .analysis
            .compute_conflict_clause(conflicting_ref, &self.trail, &self.levels_and_reasons, self.store.clauses())
            .collect();
        let level = assertion_level(&learned, &self.levels_and_reasons);
        let clause = Clause::new(learned.iter().copied())
            .expect("a learned clause must be non-empty and free of self-conflicting literals");
        let id = self.store.push_learned_clause(clause, level);
        if learned.len() >= 2 {
            self.watch_list.watch_clause(id, learned[0], learned[1]);
        }
        log::debug!("learned clause {} with assertion level {}", id.index(), level);
        self.asserting_clause = Some(id);
    }

    /// Pushes `literal` onto the trail with `reason` as its implying clause.
    /// On conflict, `reason` is itself the falsified clause under the
    /// current assignment, so it is handed to the same first-UIP analysis a
    /// watch-driven conflict would use.
    fn push_fact(&mut self, literal: Literal, reason: ClauseId) {
        match self
            .trail
            .push(literal, Some(reason), &mut self.assignment, &mut self.levels_and_reasons)
        {
            Ok(()) | Err(trail::PushError::AlreadyAssigned) => (),
            Err(trail::PushError::Conflict) => self.learn_from_conflict(reason),
        }
    }

    /// Construction-time entry point for [`builder::ReasonerBuilder`]: stores
    /// `clause` as an original clause and, if it has at least two literals,
    /// registers its initial watches.
    pub(crate) fn add_original_clause(&mut self, clause: Clause) -> ClauseId {
        let first = (&clause).into_iter().next();
        let second = (&clause).into_iter().nth(1);
        let id = self.store.push_original_clause(clause);
        if let (Some(first), Some(second)) = (first, second) {
            self.watch_list.watch_clause(id, first, second);
        }
        id
    }

    /// Construction-time entry point for [`builder::ReasonerBuilder`]: seeds
    /// a unit fact discovered while reading the formula, then drains any
    /// cascading propagation it causes.
    pub(crate) fn seed_and_propagate(&mut self, literal: Literal, reason: ClauseId) {
        self.push_fact(literal, reason);
        if !self.conflict_exists() {
            self.run_propagation();
        }
    }
}
