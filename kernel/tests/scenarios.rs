//! End-to-end tests driving [`Reasoner`] the way a branching host would:
//! construct from DIMACS, then decide/undo/assert in a loop.

use cdcl_kernel::{
    Reasoner,
    Variable,
};

fn var(reasoner: &Reasoner, index1: usize) -> Variable {
    reasoner.index_to_variable(index1).unwrap()
}

/// Drives conflicts upward from the current decision until either no
/// conflict remains or the start level is reached with one still published
/// and unassertable. Mirrors the control flow described for the host in the
/// overview.
fn resolve_conflicts(reasoner: &mut Reasoner) {
    while let Some(conflict) = reasoner.asserting_clause() {
        if reasoner.at_assertion_level(conflict) {
            if reasoner.assert_clause(conflict) == Some(conflict) {
                return
            }
        } else {
            reasoner.undo_decide_literal();
        }
    }
}

#[test]
fn scenario_1_single_unit_clause_propagates() {
    let reasoner = Reasoner::from_dimacs_bytes(b"p cnf 1 1\n1 0\n").unwrap();
    let x1 = var(&reasoner, 1);
    assert!(reasoner.instantiated_var(x1));
    assert_eq!(reasoner.literal_value(reasoner.pos_literal(x1)), Some(true));
    assert!(reasoner.at_start_level());
    assert!(!reasoner.conflict_exists());
}

#[test]
fn scenario_2_unit_vs_unit_is_immediate_unsat() {
    let reasoner = Reasoner::from_dimacs_bytes(b"p cnf 1 2\n1 0\n-1 0\n").unwrap();
    assert!(reasoner.conflict_exists());
    assert!(reasoner.at_start_level());
    let conflict = reasoner.asserting_clause().unwrap();
    assert!(reasoner.at_assertion_level(conflict));
}

#[test]
fn scenario_3_start_level_cascade_is_unsat() {
    let reasoner = Reasoner::from_dimacs_bytes(b"p cnf 2 3\n1 2 0\n-1 2 0\n-2 0\n").unwrap();
    assert!(reasoner.conflict_exists());
    assert!(reasoner.at_start_level());
}

#[test]
fn scenario_4_learned_unit_forces_second_start_level_conflict() {
    let mut reasoner =
        Reasoner::from_dimacs_bytes(b"p cnf 2 4\n1 2 0\n-1 2 0\n1 -2 0\n-1 -2 0\n").unwrap();
    assert!(!reasoner.conflict_exists());
    let x1 = var(&reasoner, 1);

    let conflict = reasoner.decide_literal(reasoner.pos_literal(x1));
    let conflict = conflict.expect("deciding x1=true must conflict");
    assert_eq!(reasoner.learned_clause_count(), 1);
    assert!(!reasoner.at_assertion_level(conflict), "learned unit backjumps to the start level");

    resolve_conflicts(&mut reasoner);

    assert!(reasoner.conflict_exists());
    assert!(reasoner.at_start_level());
    assert_eq!(reasoner.learned_clause_count(), 2);
}

#[test]
fn scenario_5_decide_then_undo_restores_state() {
    let mut reasoner = Reasoner::from_dimacs_bytes(b"p cnf 2 1\n1 2 0\n").unwrap();
    let x1 = var(&reasoner, 1);
    let x2 = var(&reasoner, 2);

    let conflict = reasoner.decide_literal(reasoner.neg_literal(x1));
    assert!(conflict.is_none());
    assert_eq!(reasoner.literal_value(reasoner.pos_literal(x2)), Some(true));
    assert!(!reasoner.at_start_level());

    reasoner.undo_decide_literal();

    assert!(reasoner.at_start_level());
    assert!(!reasoner.instantiated_var(x1));
    assert!(!reasoner.instantiated_var(x2));
    assert!(!reasoner.conflict_exists());
}

#[test]
fn scenario_6_start_level_chain_falsifies_ternary_clause() {
    let reasoner =
        Reasoner::from_dimacs_bytes(b"p cnf 3 4\n1 2 3 0\n-1 2 0\n-2 3 0\n-3 0\n").unwrap();
    assert!(reasoner.conflict_exists());
    assert!(reasoner.at_start_level());
}

#[test]
fn irrelevant_var_once_every_occurrence_is_subsumed() {
    let reasoner = Reasoner::from_dimacs_bytes(b"p cnf 1 1\n1 0\n").unwrap();
    let x1 = var(&reasoner, 1);
    assert!(reasoner.irrelevant_var(x1));
}

#[test]
fn host_mark_bits_round_trip() {
    let mut reasoner = Reasoner::from_dimacs_bytes(b"p cnf 2 1\n1 2 0\n").unwrap();
    let x1 = var(&reasoner, 1);
    assert!(!reasoner.marked_var(x1));
    reasoner.mark_var(x1);
    assert!(reasoner.marked_var(x1));
    reasoner.unmark_var(x1);
    assert!(!reasoner.marked_var(x1));

    let clause = reasoner.index_to_clause(1).unwrap();
    assert!(!reasoner.marked_clause(clause));
    reasoner.mark_clause(clause);
    assert!(reasoner.marked_clause(clause));
}

#[test]
fn malformed_dimacs_is_a_construction_error() {
    let err = Reasoner::from_dimacs_bytes(b"not dimacs at all").unwrap_err();
    assert!(matches!(err, cdcl_kernel::Error::Dimacs(_)));
}
