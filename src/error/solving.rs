//! This module contains errors pertaining to the translation of symbolic
//! terms into the solver's term algebra and to driving the solver itself.

use thiserror::Error;

use crate::value::Term;

/// Errors that occur while lowering terms to the solver or while running
/// satisfiability queries.
///
/// A solver verdict of `unsat` or `unknown` is not an error; those outcomes
/// are recorded on the [`crate::machine::context::Context`] they concern.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The lvalue marker {pointer} reached the solver translation")]
    PointerValue { pointer: Term },

    #[error("The variable '{name}' was used without being declared")]
    UndeclaredVariable { name: String },

    #[error("Expected a {expected} term, found {term}")]
    SortMismatch {
        expected: &'static str,
        term: Term,
    },

    #[error("Cannot compare {left} with {right}: the operands have different sorts")]
    MixedSorts { left: Term, right: Term },

    #[error("The solver reported sat but produced no model")]
    MissingModel,

    #[error("The model assigns no value to '{name}'")]
    UnvaluedVariable { name: String },

    #[error("The model value {value} for '{name}' does not fit the machine's integers")]
    ModelOutOfRange { name: String, value: i64 },
}
