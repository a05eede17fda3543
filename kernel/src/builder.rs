//! Builds a [`Reasoner`] from a DIMACS stream via [`cnf_parser::Output`].
//!
//! Original clauses are sanitized (deduped, tautology-checked) as they
//! arrive. Unit clauses are seeded onto the trail immediately, so a formula
//! that is already start-level-unsatisfiable is caught during construction
//! rather than on the host's first decision.

use crate::{
    clause_db::Clause,
    literal::RegisterVariables,
    sanitizer::{
        ClauseSanitizer,
        SanitizedLiterals,
    },
    Error,
    Literal,
    Reasoner,
};
use cnf_parser::Output;

#[derive(Debug, Default)]
pub struct ReasonerBuilder {
    reasoner: Reasoner,
    num_variables: Option<usize>,
    current_clause: Vec<Literal>,
    sanitizer: ClauseSanitizer,
}

impl ReasonerBuilder {
    fn finalize_current_clause(&mut self) -> Result<(), Error> {
        if self.num_variables.is_none() {
            return Err(Error::Dimacs("missing problem line before clause inputs".to_string()))
        }
        match self.sanitizer.sanitize(self.current_clause.drain(..)) {
            SanitizedLiterals::Literals(literals) => {
                let clause = Clause::new(literals).map_err(|_| Error::EmptyClause)?;
                self.reasoner.add_original_clause(clause);
            }
            SanitizedLiterals::UnitClause(unit) => {
                let clause = Clause::new([unit]).map_err(|_| Error::EmptyClause)?;
                let id = self.reasoner.add_original_clause(clause);
                self.reasoner.seed_and_propagate(unit, id);
            }
            SanitizedLiterals::TautologicalClause => (),
            SanitizedLiterals::EmptyClause => return Err(Error::EmptyClause),
        }
        Ok(())
    }

    /// Consumes the builder, returning the constructed reasoner.
    pub fn finalize(mut self) -> Result<Reasoner, Error> {
        if !self.current_clause.is_empty() {
            self.finalize_current_clause()?;
        }
        Ok(self.reasoner)
    }
}

impl Output for ReasonerBuilder {
    type Error = Error;

    fn problem(&mut self, num_variables: u32, _num_clauses: u32) -> Result<(), Self::Error> {
        let num_variables = num_variables as usize;
        self.num_variables = Some(num_variables);
        self.reasoner.register_variables(num_variables);
        Ok(())
    }

    fn literal(&mut self, literal: cnf_parser::Literal) -> Result<(), Self::Error> {
        self.current_clause.push(literal.into());
        Ok(())
    }

    fn finalize_clause(&mut self) -> Result<(), Self::Error> {
        self.finalize_current_clause()
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        if !self.current_clause.is_empty() {
            self.finalize_current_clause()?;
        }
        Ok(())
    }
}
