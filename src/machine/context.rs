//! This module contains the definition of the [`Context`], the snapshot of
//! guest-machine state and accumulated symbolic obligations at one point of
//! execution.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    isa::{encoding::encode, Instruction},
    machine::{Flag, Key},
    value::{Term, TermData},
};

/// A labelled assertion supplied with the initial state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Constraint {
    /// A human-readable name for the assertion, carried through to solver
    /// reporting.
    pub label: String,

    /// The boolean term being asserted.
    pub term: Term,
}

/// A satisfying assignment for the free variables of a context.
pub type Model = BTreeMap<String, i32>;

/// The solver's verdict on a context, attached after the context has been
/// placed in the state tree.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub enum Solution {
    /// The context has not been solved, or the solver gave up within its
    /// timeout.
    #[default]
    Unknown,

    /// The path condition and constraints admit no assignment; the path is
    /// terminal.
    Unsatisfiable,

    /// The path is feasible, witnessed by `model`.
    Satisfiable { model: Model },
}

/// The state of one execution point: machine bindings plus the symbolic
/// obligations accumulated on the way to it.
///
/// A context is created either as the user-supplied initial state or by
/// cloning-and-extending a parent at a fork. Once it has been placed in the
/// state tree it is never mutated again, except for the solver attaching a
/// [`Solution`] in a second pass.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Context {
    /// The machine state, as a mapping from keys to terms. Missing keys read
    /// as the integer zero.
    #[serde(serialize_with = "crate::utility::ordered_pairs")]
    bindings: BTreeMap<Key, Term>,

    /// The conjunction of the branch guards taken to reach this point.
    path_condition: Term,

    /// User-supplied assertions over the free variables.
    constraints: Vec<Constraint>,

    /// The free variables of this context. A trivial entry (`name ↦ name`)
    /// merely declares the variable to the solver; a non-trivial entry
    /// defines an equality the solver asserts and pointer resolution may
    /// substitute.
    store: BTreeMap<String, Term>,

    /// The solver's verdict on this context.
    solution: Solution,
}

impl Context {
    /// Constructs an empty context: no bindings, a `true` path condition, no
    /// constraints and no variables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
            path_condition: Term::truth(true),
            constraints: Vec::new(),
            store: BTreeMap::new(),
            solution: Solution::Unknown,
        }
    }

    /// Reads the term bound at `key`, or the integer zero when the key is
    /// unbound.
    #[must_use]
    pub fn read(&self, key: Key) -> Term {
        self.bindings.get(&key).cloned().unwrap_or_else(Term::zero)
    }

    /// Checks whether `key` is bound.
    #[must_use]
    pub fn is_bound(&self, key: Key) -> bool {
        self.bindings.contains_key(&key)
    }

    /// Binds `value` at `key`, replacing any previous binding.
    pub fn write(&mut self, key: Key, value: Term) {
        self.bindings.insert(key, value);
    }

    /// Gets the full binding store.
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<Key, Term> {
        &self.bindings
    }

    /// Places each instruction of `program` into program memory at its
    /// stated slot, encoded as a word constant.
    pub fn load_program(&mut self, program: &[(u8, Instruction)]) {
        for (slot, instruction) in program {
            self.write(Key::Program(*slot), Term::word(encode(instruction)));
        }
    }

    /// Gets the path condition.
    #[must_use]
    pub fn path_condition(&self) -> &Term {
        &self.path_condition
    }

    /// Replaces the path condition.
    pub fn set_path_condition(&mut self, condition: Term) {
        self.path_condition = condition;
    }

    /// Clones this context into the child reached by taking the branch
    /// guarded by `guard`, conjoining the guard onto the path condition.
    #[must_use]
    pub fn fork(&self, guard: Term) -> Self {
        let mut child = self.clone();
        child.path_condition = Term::and(self.path_condition.clone(), guard);
        child.solution = Solution::Unknown;
        child
    }

    /// Adds the labelled assertion `term` to the constraints.
    pub fn constrain(&mut self, label: impl Into<String>, term: Term) {
        self.constraints.push(Constraint {
            label: label.into(),
            term,
        });
    }

    /// Gets the user-supplied constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Declares the free variable `name` to the solver.
    pub fn declare(&mut self, name: impl Into<String>) {
        let name = name.into();
        let value = Term::var(name.clone());
        self.store.insert(name, value);
    }

    /// Defines the free variable `name` as equal to `value`.
    pub fn define(&mut self, name: impl Into<String>, value: Term) {
        self.store.insert(name.into(), value);
    }

    /// Gets the variable store.
    #[must_use]
    pub fn store(&self) -> &BTreeMap<String, Term> {
        &self.store
    }

    /// Substitutes every non-trivial store definition into `term`.
    ///
    /// This is the resolution step that lets an indirect load through a
    /// pointer variable succeed once the variable has been defined to a
    /// constant.
    #[must_use]
    pub fn resolve(&self, term: &Term) -> Term {
        let mut resolved = term.clone();
        for (name, definition) in &self.store {
            if !matches!(definition.data(), TermData::Var(defined) if defined == name) {
                resolved = resolved.substitute(name, definition);
            }
        }
        resolved
    }

    /// Gets the solver's verdict on this context.
    #[must_use]
    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    /// Attaches the solver's verdict to this context.
    pub fn set_solution(&mut self, solution: Solution) {
        self.solution = solution;
    }

    /// Checks whether the solver has marked this context unsatisfiable.
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self.solution, Solution::Unsatisfiable)
    }

    /// Checks whether the halt flag is concretely raised.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.read(Key::Flag(Flag::Halted)).is_true()
    }

    /// Enumerates the data-memory bindings in address order.
    #[must_use]
    pub fn dump_memory(&self) -> Vec<(u8, Term)> {
        self.bindings
            .iter()
            .filter_map(|(key, term)| match key {
                Key::Address(address) => Some((*address, term.clone())),
                _ => None,
            })
            .collect()
    }

    /// Gets the names of every free variable mentioned by the bindings, the
    /// path condition, or the constraints.
    #[must_use]
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for term in self.bindings.values() {
            term.collect_variables(&mut names);
        }
        self.path_condition.collect_variables(&mut names);
        for constraint in &self.constraints {
            constraint.term.collect_variables(&mut names);
        }
        names
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        isa::{Instruction, Register},
        machine::{context::Context, Flag, Key},
        value::Term,
    };

    #[test]
    fn unbound_keys_read_as_zero() {
        let context = Context::new();

        assert_eq!(context.read(Key::Register(Register::R0)), Term::zero());
        assert_eq!(context.read(Key::Address(17)), Term::zero());
        assert!(!context.is_bound(Key::Address(17)));
    }

    #[test]
    fn forking_extends_the_path_condition() {
        let mut parent = Context::new();
        parent.write(Key::Register(Register::R1), Term::var("x"));

        let guard = Term::greater(Term::var("x"), Term::zero());
        let child = parent.fork(guard.clone());

        assert_eq!(
            child.path_condition(),
            &Term::and(parent.path_condition().clone(), guard)
        );
        // Bindings carry over unchanged.
        assert_eq!(child.read(Key::Register(Register::R1)), Term::var("x"));
    }

    #[test]
    fn resolution_substitutes_definitions_but_not_declarations() {
        let mut context = Context::new();
        context.declare("q");
        context.define("p", Term::int(42));

        let pointer = Term::var("p");
        assert_eq!(context.resolve(&pointer), Term::int(42));

        let declared = Term::var("q");
        assert_eq!(context.resolve(&declared), Term::var("q"));
    }

    #[test]
    fn memory_dump_is_ordered_and_memory_only() {
        let mut context = Context::new();
        context.write(Key::Address(9), Term::int(1));
        context.write(Key::Address(3), Term::var("x"));
        context.write(Key::Register(Register::R0), Term::int(5));
        context.write(Key::Flag(Flag::Condition), Term::truth(true));

        let dump = context.dump_memory();
        assert_eq!(dump, vec![(3, Term::var("x")), (9, Term::int(1))]);
    }

    #[test]
    fn free_variables_cover_bindings_paths_and_constraints() {
        let mut context = Context::new();
        context.write(Key::Address(0), Term::var("a"));
        context.set_path_condition(Term::greater(Term::var("b"), Term::zero()));
        context.constrain("range", Term::less(Term::var("c"), Term::int(10)));

        let names = context.free_variables();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn loading_a_program_binds_word_constants() {
        let mut context = Context::new();
        context.load_program(&[(0, Instruction::Halt)]);

        assert!(context.is_bound(Key::Program(0)));
        assert_eq!(context.read(Key::Program(0)), Term::word(0));
    }
}
