//! This module contains the branching-time property checker: formulas over
//! machine keys and symbolic terms, their per-node proof obligations, and
//! the verdict produced by discharging those obligations through the
//! solver.

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    engine::Trace,
    machine::{Context, Key, Model},
    solver::{Oracle, Result},
    tree::NodeId,
    value::Term,
};

/// A boolean predicate over one machine state.
///
/// Atoms are evaluated against a [`Context`] to yield a symbolic [`Term`];
/// the solver then decides the term under the context's obligations.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Atom {
    /// The value bound at a machine key. An unbound key evaluates to
    /// `false`, letting flag predicates read naturally on states the
    /// machine has not touched yet.
    Key(Key),

    /// A literal symbolic term.
    Term(Term),

    /// Negation of an atom.
    Not(Box<Atom>),

    /// Conjunction of atoms.
    And(Box<Atom>, Box<Atom>),

    /// Disjunction of atoms.
    Or(Box<Atom>, Box<Atom>),

    /// Equality of atoms.
    Eq(Box<Atom>, Box<Atom>),

    /// Strictly-greater comparison of atoms.
    Gt(Box<Atom>, Box<Atom>),

    /// Strictly-less comparison of atoms.
    Lt(Box<Atom>, Box<Atom>),
}

impl Atom {
    /// Constructs an atom reading a machine key.
    #[must_use]
    pub fn key(key: Key) -> Self {
        Self::Key(key)
    }

    /// Constructs an atom wrapping a literal term.
    #[must_use]
    pub fn term(term: Term) -> Self {
        Self::Term(term)
    }

    /// Constructs the negation of an atom.
    #[must_use]
    pub fn not(atom: Atom) -> Self {
        Self::Not(Box::new(atom))
    }

    /// Constructs the conjunction of two atoms.
    #[must_use]
    pub fn and(left: Atom, right: Atom) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// Constructs the disjunction of two atoms.
    #[must_use]
    pub fn or(left: Atom, right: Atom) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Constructs the equality of two atoms.
    #[must_use]
    pub fn eq(left: Atom, right: Atom) -> Self {
        Self::Eq(Box::new(left), Box::new(right))
    }

    /// Constructs the strictly-greater comparison of two atoms.
    #[must_use]
    pub fn gt(left: Atom, right: Atom) -> Self {
        Self::Gt(Box::new(left), Box::new(right))
    }

    /// Constructs the strictly-less comparison of two atoms.
    #[must_use]
    pub fn lt(left: Atom, right: Atom) -> Self {
        Self::Lt(Box::new(left), Box::new(right))
    }

    /// Evaluates the atom at `context`, producing the symbolic term the
    /// solver will decide.
    #[must_use]
    pub fn eval(&self, context: &Context) -> Term {
        match self {
            Self::Key(key) => {
                if context.is_bound(*key) {
                    context.read(*key)
                } else {
                    Term::truth(false)
                }
            }
            Self::Term(term) => term.clone(),
            Self::Not(inner) => Term::not(inner.eval(context)),
            Self::And(left, right) => Term::and(left.eval(context), right.eval(context)),
            Self::Or(left, right) => Term::or(left.eval(context), right.eval(context)),
            Self::Eq(left, right) => Term::equals(left.eval(context), right.eval(context)),
            Self::Gt(left, right) => Term::greater(left.eval(context), right.eval(context)),
            Self::Lt(left, right) => Term::less(left.eval(context), right.eval(context)),
        }
    }
}

/// A formula of the universal fragment of branching-time logic over the
/// state tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Formula {
    /// The atom holds at every state along every path.
    AllG(Atom),

    /// The atom eventually holds along every path.
    AllF(Atom),

    /// Both sub-formulas hold.
    And(Box<Formula>, Box<Formula>),
}

impl Formula {
    /// Constructs the conjunction of two formulas.
    #[must_use]
    pub fn and(left: Formula, right: Formula) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }
}

/// A state at which the negation of a checked formula was satisfiable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Witness {
    /// The tree node whose state admits the violation.
    pub node: NodeId,

    /// The assignment of the free variables realising it.
    pub model: Model,
}

/// The verdict on a checked formula.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Proof {
    /// No reachable state can violate the formula.
    Proved,

    /// The formula is violable, witnessed per offending node.
    Falsifiable { witnesses: Vec<Witness> },
}

impl Proof {
    /// Checks whether the verdict is [`Proof::Proved`].
    #[must_use]
    pub fn is_proved(&self) -> bool {
        matches!(self, Self::Proved)
    }

    /// Gets the witnesses of a falsifiable verdict, empty when proved.
    #[must_use]
    pub fn witnesses(&self) -> &[Witness] {
        match self {
            Self::Proved => &[],
            Self::Falsifiable { witnesses } => witnesses,
        }
    }
}

/// Checks `formula` against every obligation it induces over `trace`.
///
/// The formula is refuted by search: a globally-quantified atom must be
/// unviolable at every node, an eventually-quantified atom at every leaf,
/// and a conjunction splits into the union of its sides' obligations. Each
/// obligation asserts the node's accumulated path condition, constraints
/// and variable definitions together with the negated atom; any `sat`
/// answer becomes a [`Witness`].
///
/// # Errors
///
/// Returns [`Err`] if an atom's evaluation does not lower to the solver.
pub fn verify(trace: &Trace, formula: &Formula, oracle: &mut Oracle) -> Result<Proof> {
    let tasks = obligations(formula, trace);
    info!(obligations = tasks.len(), "checking formula");

    let mut witnesses = Vec::new();
    for (node, atom) in tasks {
        let Some(context) = trace.context(node) else {
            continue;
        };
        let requirement = atom.eval(context);
        if let Some(model) = oracle.find_violation(context, &requirement)? {
            witnesses.push(Witness { node, model });
        }
    }

    if witnesses.is_empty() {
        Ok(Proof::Proved)
    } else {
        debug!(
            nodes = %witnesses.iter().map(|w| w.node).join(", "),
            "formula falsified"
        );
        Ok(Proof::Falsifiable { witnesses })
    }
}

/// Derives the per-node obligations of `formula` over `trace`.
fn obligations<'a>(formula: &'a Formula, trace: &Trace) -> Vec<(NodeId, &'a Atom)> {
    match formula {
        Formula::AllG(atom) => trace
            .tree()
            .keys()
            .into_iter()
            .map(|node| (node, atom))
            .collect(),
        Formula::AllF(atom) => trace
            .tree()
            .leaves()
            .into_iter()
            .map(|node| (node, atom))
            .collect(),
        Formula::And(left, right) => {
            let mut tasks = obligations(left, trace);
            tasks.extend(obligations(right, trace));
            tasks
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        checker::Atom,
        machine::{Context, Flag, Key},
        value::Term,
    };

    #[test]
    fn unbound_keys_evaluate_to_false() {
        let context = Context::new();
        let atom = Atom::key(Key::Flag(Flag::Overflow));

        assert_eq!(atom.eval(&context), Term::truth(false));
    }

    #[test]
    fn bound_keys_evaluate_to_their_binding() {
        let mut context = Context::new();
        let predicate = Term::greater(Term::var("x"), Term::zero());
        context.write(Key::Flag(Flag::Condition), predicate.clone());

        let atom = Atom::key(Key::Flag(Flag::Condition));
        assert_eq!(atom.eval(&context), predicate);
    }

    #[test]
    fn compound_atoms_evaluate_structurally() {
        let mut context = Context::new();
        context.write(Key::Address(3), Term::var("m"));

        let atom = Atom::and(
            Atom::eq(Atom::key(Key::Address(3)), Atom::term(Term::int(7))),
            Atom::not(Atom::key(Key::Flag(Flag::Overflow))),
        );

        assert_eq!(
            atom.eval(&context),
            Term::and(
                Term::equals(Term::var("m"), Term::int(7)),
                Term::not(Term::truth(false)),
            )
        );
    }
}
