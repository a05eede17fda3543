//! Two-watched-literal bookkeeping: which clauses watch which literal, and
//! how watches move when a watched literal becomes false.

use crate::{
    clause_db::{
        ClauseDb,
        ClauseId,
        PropagationResult as ClausePropagationResult,
    },
    trail::{
        DecisionLevelsAndReasons,
        PushError,
        Trail,
        VariableAssignment,
    },
    Literal,
    Variable,
};
use bounded::BoundedArray;

#[derive(Debug, Copy, Clone)]
struct Watcher {
    blocker: Literal,
    clause: ClauseId,
}

/// The watchers registered for a single variable, split by which polarity of
/// the variable they watch the falsification of.
#[derive(Debug, Clone, Default)]
struct VariableWatchers {
    pos: Vec<Watcher>,
    neg: Vec<Watcher>,
}

impl VariableWatchers {
    fn bucket_mut(&mut self, watched: Literal) -> &mut Vec<Watcher> {
        if watched.sign().is_pos() {
            &mut self.pos
        } else {
            &mut self.neg
        }
    }

    fn register(&mut self, watched: Literal, blocker: Literal, clause: ClauseId) {
        self.bucket_mut(watched).push(Watcher { blocker, clause });
    }

    /// Runs local propagation for every watcher registered under `literal`
    /// (the literal that just became true, so each watching clause has lost
    /// its negation). Returns the first conflicting clause encountered, if
    /// any; watchers that need to move to a new literal are appended to
    /// `deferred`.
    fn propagate(
        &mut self,
        literal: Literal,
        clause_db: &mut ClauseDb,
        assignment: &mut VariableAssignment,
        levels_and_reasons: &mut DecisionLevelsAndReasons,
        trail: &mut Trail,
        deferred: &mut Vec<(Literal, Literal, ClauseId)>,
    ) -> Option<ClauseId> {
        let mut conflict = None;
        let watchers = self.bucket_mut(literal);
        watchers.retain(|&watcher| {
            if conflict.is_some() {
                return true
            }
            if assignment.is_satisfied(watcher.blocker) == Some(true) {
                return true
            }
            let result = clause_db
                .resolve_mut(watcher.clause)
                .expect("encountered unexpected invalid clause ID")
                .propagate(literal, assignment);
            match result {
                ClausePropagationResult::UnitUnderAssignment(unit_literal) => {
                    match trail.push(unit_literal, Some(watcher.clause), assignment, levels_and_reasons) {
                        Ok(()) | Err(PushError::AlreadyAssigned) => (),
                        Err(PushError::Conflict) => conflict = Some(watcher.clause),
                    }
                    true
                }
                ClausePropagationResult::NewWatchedLiteral {
                    new_watched,
                    new_blocker,
                } => {
                    deferred.push((new_watched, new_blocker, watcher.clause));
                    false
                }
            }
        });
        conflict
    }
}

/// The watch list monitoring which clauses are watching which literals.
#[derive(Debug, Default, Clone)]
pub struct WatchList {
    watchers: BoundedArray<Variable, VariableWatchers>,
    deferred: Vec<(Literal, Literal, ClauseId)>,
}

impl WatchList {
    fn len_variables(&self) -> usize {
        self.watchers.len()
    }

    pub(crate) fn register_variables(&mut self, additional: usize) {
        let total = self.len_variables() + additional;
        self.watchers.resize_with(total, Default::default);
    }

    /// Registers `clause` as watching the falsification of `watched`, with
    /// `blocker` as the fast-path satisfied-literal check.
    pub fn register_for_lit(&mut self, watched: Literal, blocker: Literal, clause: ClauseId) {
        self.watchers
            .get_mut(watched.variable())
            .expect("encountered unexpected invalid variable")
            .register(watched, blocker, clause);
    }

    /// Registers the initial two watches of a freshly stored clause.
    pub fn watch_clause(&mut self, id: ClauseId, first: Literal, second: Literal) {
        self.register_for_lit(!first, second, id);
        self.register_for_lit(!second, first, id);
    }

    /// Propagates `literal` (just assigned true) to every clause watching
    /// it. Returns the first clause found conflicting.
    pub fn propagate(
        &mut self,
        literal: Literal,
        clause_db: &mut ClauseDb,
        assignment: &mut VariableAssignment,
        levels_and_reasons: &mut DecisionLevelsAndReasons,
        trail: &mut Trail,
    ) -> Option<ClauseId> {
        let result = self
            .watchers
            .get_mut(literal.variable())
            .expect("encountered unexpected invalid propagation literal")
            .propagate(
                literal,
                clause_db,
                assignment,
                levels_and_reasons,
                trail,
                &mut self.deferred,
            );
        for (watched, blocker, clause) in self.deferred.drain(..) {
            self.watchers
                .get_mut(watched.variable())
                .expect("encountered unexpected invalid variable")
                .register(watched, blocker, clause);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clause_db::{
            Clause,
            ClauseDb,
        },
        Sign,
    };

    fn var(index1: usize) -> Variable {
        Variable::from_index1(index1).unwrap()
    }

    #[test]
    fn unit_propagation_through_watch() {
        // Clause (a | b). Assign !a, expect watcher to report b as unit.
        let mut db = ClauseDb::default();
        let a = var(1).into_literal(Sign::POS);
        let b = var(2).into_literal(Sign::POS);
        let clause = Clause::new(vec![a, b]).unwrap();
        let id = db.push(clause);

        let mut watch_list = WatchList::default();
        watch_list.register_variables(2);
        watch_list.watch_clause(id, a, b);

        let mut assignment = VariableAssignment::default();
        let mut levels = DecisionLevelsAndReasons::default();
        let mut trail = Trail::default();
        assignment.register_variables(2);
        levels.register_variables(2);
        trail.register_variables(2);

        trail.push(!a, None, &mut assignment, &mut levels).unwrap();
        let conflict = watch_list.propagate(!a, &mut db, &mut assignment, &mut levels, &mut trail);
        assert!(conflict.is_none());
        assert_eq!(trail.pop_enqueued(), Some(!a));
        assert_eq!(trail.pop_enqueued(), Some(b));
    }

    #[test]
    fn conflicting_unit_is_reported() {
        let mut db = ClauseDb::default();
        let a = var(1).into_literal(Sign::POS);
        let b = var(2).into_literal(Sign::POS);
        let clause = Clause::new(vec![a, b]).unwrap();
        let id = db.push(clause);

        let mut watch_list = WatchList::default();
        watch_list.register_variables(2);
        watch_list.watch_clause(id, a, b);

        let mut assignment = VariableAssignment::default();
        let mut levels = DecisionLevelsAndReasons::default();
        let mut trail = Trail::default();
        assignment.register_variables(2);
        levels.register_variables(2);
        trail.register_variables(2);

        trail.push(!b, None, &mut assignment, &mut levels).unwrap();
        trail.push(!a, None, &mut assignment, &mut levels).unwrap();
        trail.pop_enqueued();
        let conflict = watch_list.propagate(!a, &mut db, &mut assignment, &mut levels, &mut trail);
        assert_eq!(conflict, Some(id));
    }
}
