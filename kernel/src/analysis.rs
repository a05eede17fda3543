//! First-UIP conflict analysis: turns a conflicting clause plus the current
//! trail into a learned clause with its asserting literal first, and
//! computes the level to backjump to.

use crate::{
    clause_db::{
        ClauseDb,
        ClauseId,
        ClauseRef,
    },
    trail::{
        DecisionLevel,
        DecisionLevelsAndReasons,
        Trail,
    },
    Literal,
    Variable,
};
use bounded::BoundedBitmap;
use core::slice;

/// Types that provide information about the current decision level.
pub trait CurrentDecisionLevel {
    fn current_decision_level(&self) -> DecisionLevel;
}

/// Types that provide the assignments of a given decision level.
pub trait LevelAssignments {
    fn level_assignments(&self, level: DecisionLevel) -> &[Literal];
}

/// Types that resolve a clause ID into the clause it names.
pub trait ResolveClauseId {
    fn resolve_clause_id(&self, id: ClauseId) -> ClauseRef;
}

/// Types that provide the decision level and reason clause of a variable.
pub trait DecisionLevelAndReasonOf {
    fn decision_level_and_reason_of(&self, variable: Variable) -> (DecisionLevel, Option<ClauseId>);
}

impl CurrentDecisionLevel for Trail {
    fn current_decision_level(&self) -> DecisionLevel {
        Self::current_decision_level(self)
    }
}

impl LevelAssignments for Trail {
    fn level_assignments(&self, level: DecisionLevel) -> &[Literal] {
        Self::level_assignments(self, level)
    }
}

impl ResolveClauseId for ClauseDb {
    fn resolve_clause_id(&self, id: ClauseId) -> ClauseRef {
        self.resolve(id)
            .expect("encountered unexpected invalid clause ID")
    }
}

impl DecisionLevelAndReasonOf for DecisionLevelsAndReasons {
    fn decision_level_and_reason_of(&self, variable: Variable) -> (DecisionLevel, Option<ClauseId>) {
        let level = self
            .level_of(variable)
            .expect("encountered missing decision level for variable on the trail");
        (level, self.reason_of(variable))
    }
}

/// An iterator over the literals of a freshly learned clause, asserting
/// literal first.
pub struct LearnedClauseLiterals<'a> {
    literals: slice::Iter<'a, Literal>,
}

impl<'a> LearnedClauseLiterals<'a> {
    fn new(literals: &'a [Literal]) -> Self {
        Self {
            literals: literals.iter(),
        }
    }
}

impl<'a> Iterator for LearnedClauseLiterals<'a> {
    type Item = Literal;

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.literals.size_hint()
    }

    fn next(&mut self) -> Option<Self::Item> {
        self.literals.next().copied()
    }
}

impl<'a> ExactSizeIterator for LearnedClauseLiterals<'a> {}

#[derive(Debug, Default, Clone)]
struct StampMap {
    stamps: BoundedBitmap<Variable, bool>,
}

impl StampMap {
    fn len_variables(&self) -> usize {
        self.stamps.len()
    }

    pub fn register_variables(&mut self, additional: usize) {
        let total = self.len_variables() + additional;
        self.stamps.resize_to_len(total);
    }

    pub fn stamp(&mut self, variable: Variable) {
        self.stamps
            .set(variable, true)
            .expect("encountered unexpected invalid variable upon stamping");
    }

    pub fn unstamp(&mut self, variable: Variable) {
        self.stamps
            .set(variable, false)
            .expect("encountered unexpected invalid variable upon unstamping");
    }

    pub fn is_stamped(&self, variable: Variable) -> bool {
        self.stamps
            .get(variable)
            .expect("encountered unexpected invalid variable upon querying stamp state")
    }
}

/// First-UIP conflict analysis state, reused across conflicts to avoid
/// reallocating the stamp bitmap and result buffer.
#[derive(Debug, Default, Clone)]
pub struct FirstUipLearning {
    /// Stamped iff a variable's literal occurs in the in-progress result, or
    /// its reason still needs resolving. Both uses share the bitmap since a
    /// variable can only ever need one at a time.
    stamps: StampMap,
    result: Vec<Literal>,
}

impl FirstUipLearning {
    pub fn register_variables(&mut self, additional: usize) {
        self.stamps.register_variables(additional);
    }

    /// Computes the learned clause for `conflicting_clause` given the
    /// current trail. Yields the asserting literal first.
    pub fn compute_conflict_clause<T, R, C>(
        &mut self,
        conflicting_clause: ClauseRef,
        trail: &T,
        levels_and_reasons: &R,
        clause_db: &C,
    ) -> LearnedClauseLiterals
    where
        T: CurrentDecisionLevel + LevelAssignments,
        R: DecisionLevelAndReasonOf,
        C: ResolveClauseId,
    {
        let count_unresolved = self.initialize_result(conflicting_clause, trail, levels_and_reasons);
        self.resolve_until_uip(count_unresolved, trail, levels_and_reasons, clause_db);
        self.clear_stamps();
        LearnedClauseLiterals::new(self.result.as_slice())
    }

    fn clear_stamps(&mut self) {
        for literal in &self.result {
            self.stamps.unstamp(literal.variable());
        }
    }

    /// Seeds the result buffer from the conflicting clause: literals outside
    /// the current level go straight into the result, literals on the
    /// current level are stamped as pending resolution work. Returns the
    /// count of the latter.
    fn initialize_result<T, R>(
        &mut self,
        conflicting_clause: ClauseRef,
        trail: &T,
        levels_and_reasons: &R,
    ) -> usize
    where
        T: CurrentDecisionLevel,
        R: DecisionLevelAndReasonOf,
    {
        self.result.clear();
        let count_unresolved = self.add_resolvent(conflicting_clause, None, trail, levels_and_reasons);
        assert!(
            count_unresolved >= 1,
            "conflicting clause has no literal on the current decision level"
        );
        count_unresolved
    }

    /// Resolves `reason` into the result buffer, skipping `resolve_at_lit`
    /// (the literal being resolved away). Literals on the current level are
    /// stamped and counted as unresolved work rather than added to the
    /// result directly.
    fn add_resolvent<T, R>(
        &mut self,
        reason: ClauseRef,
        resolve_at_lit: Option<Literal>,
        trail: &T,
        levels_and_reasons: &R,
    ) -> usize
    where
        T: CurrentDecisionLevel,
        R: DecisionLevelAndReasonOf,
    {
        if let Some(resolve_at_lit) = resolve_at_lit {
            debug_assert!(self.stamps.is_stamped(resolve_at_lit.variable()));
            self.stamps.unstamp(resolve_at_lit.variable());
        }
        self.result.reserve(reason.len());
        let current_level = trail.current_decision_level();
        let mut count_unresolved = 0;
        for reason_literal in reason {
            let reason_variable = reason_literal.variable();
            if Some(reason_literal) != resolve_at_lit && !self.stamps.is_stamped(reason_variable) {
                self.stamps.stamp(reason_variable);
                let (reason_level, _) = levels_and_reasons.decision_level_and_reason_of(reason_variable);
                if reason_level == current_level {
                    count_unresolved += 1;
                } else {
                    self.result.push(reason_literal);
                }
            }
        }
        count_unresolved
    }

    /// Walks the current level's assignments in reverse, resolving away
    /// every stamped implied literal until exactly one stamped literal (the
    /// 1-UIP) remains.
    fn find_first_uip<T, R, C, L>(
        &mut self,
        count_unresolved: usize,
        level_assignments: &mut L,
        trail: &T,
        levels_and_reasons: &R,
        clause_db: &C,
    ) where
        T: CurrentDecisionLevel,
        R: DecisionLevelAndReasonOf,
        C: ResolveClauseId,
        L: Iterator<Item = Literal>,
    {
        let mut count_unresolved = count_unresolved;
        let current_level = trail.current_decision_level();
        while count_unresolved != 1 {
            let resolve_at_lit = level_assignments
                .next()
                .expect("encountered unexpected missing level assignment");
            let resolve_at_var = resolve_at_lit.variable();
            if self.stamps.is_stamped(resolve_at_var) {
                let (level, reason) = levels_and_reasons.decision_level_and_reason_of(resolve_at_var);
                debug_assert_eq!(level, current_level);
                match reason {
                    None => panic!("encountered the 1-UIP too early"),
                    Some(reason) => {
                        let reason = clause_db.resolve_clause_id(reason);
                        count_unresolved +=
                            self.add_resolvent(reason, Some(resolve_at_lit), trail, levels_and_reasons);
                        count_unresolved -= 1;
                    }
                }
            }
        }
        assert_eq!(
            count_unresolved, 1,
            "reached the end of the decision level assignments without finding the 1-UIP"
        );
    }

    /// Places the 1-UIP literal into the first position of the result
    /// buffer. Must follow [`Self::find_first_uip`].
    ///
    /// The trail holds the UIP variable's asserted (true) value; the
    /// learned clause needs its negation, the form every other literal
    /// reaching the result already has from resolution.
    fn find_asserting_literal<L>(&mut self, level_assignments: &mut L)
    where
        L: Iterator<Item = Literal>,
    {
        let asserting_literal = level_assignments
            .find(|literal| self.stamps.is_stamped(literal.variable()))
            .expect("encountered missing asserting literal");
        self.result.push(!asserting_literal);
        let last = self.result.len() - 1;
        self.result.swap(0, last);
        self.stamps.unstamp(asserting_literal.variable());
    }

    fn resolve_until_uip<T, R, C>(
        &mut self,
        count_unresolved: usize,
        trail: &T,
        levels_and_reasons: &R,
        clause_db: &C,
    ) where
        T: CurrentDecisionLevel + LevelAssignments,
        R: DecisionLevelAndReasonOf,
        C: ResolveClauseId,
    {
        let current_level = trail.current_decision_level();
        let mut level_assignments = trail.level_assignments(current_level).iter().copied().rev();
        self.find_first_uip(count_unresolved, &mut level_assignments, trail, levels_and_reasons, clause_db);
        self.find_asserting_literal(&mut level_assignments);
    }
}

/// Computes the level to backjump to for a learned clause.
///
/// This is the highest decision level, strictly below the current one, among
/// the clause's literals other than the asserting literal; `1` (the start
/// level) if no such literal exists (the clause is unit).
pub fn assertion_level<R>(
    learned_clause: &[Literal],
    levels_and_reasons: &R,
) -> DecisionLevel
where
    R: DecisionLevelAndReasonOf,
{
    learned_clause[1..]
        .iter()
        .map(|literal| levels_and_reasons.decision_level_and_reason_of(literal.variable()).0)
        .max()
        .unwrap_or(DecisionLevel::START)
}
