//! This library implements symbolic execution and temporal property
//! checking for a small 32-bit register machine. Given an initial machine
//! state containing symbolic variables, it explores every feasible
//! execution path up to a bounded step budget, consulting an SMT solver to
//! prune infeasible branches, and checks universally-quantified
//! branching-time properties over the resulting tree of states.
//!
//! # How it Works
//!
//! From a very high level, an analysis proceeds as follows:
//!
//! 1. A program — a list of `(slot, Instruction)` pairs, typically produced
//!    by an assembler front-end — is loaded into the program memory of an
//!    initial [`machine::Context`], alongside memory bindings, free-variable
//!    declarations and range constraints.
//! 2. The [`engine::Engine`] repeatedly fetches, decodes and executes
//!    instructions through the shared semantics in [`isa::semantics`]. A
//!    conditional jump whose guard stays symbolic forks the context in two,
//!    extending each side's path condition with the guard or its negation.
//! 3. Every produced context is annotated by the [`solver::Oracle`]:
//!    satisfiable paths carry a model of their free variables, while
//!    unsatisfiable paths are recorded in the [`tree::StateTree`] but never
//!    expanded further.
//! 4. The [`checker`] turns a [`checker::Formula`] into one proof obligation
//!    per tree node (or per leaf), discharges them through the solver, and
//!    reports either a proof or the witnessing counterexamples.
//!
//! The same semantics clauses also drive [`machine::concrete::Simulator`],
//! a plain sequential interpreter for fully-concrete states.
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, construct an
//! [`analyzer::Analyzer`], describe the initial state, run it, and verify a
//! property:
//!
//! ```
//! use isa_symex::{
//!     analyzer::Analyzer,
//!     checker::{Atom, Formula},
//!     isa::{Instruction, Register},
//!     machine::Key,
//!     value::Term,
//! };
//!
//! // Accumulate an unknown input into r0.
//! let program = [
//!     (0, Instruction::Set { register: Register::R0, immediate: 0 }),
//!     (1, Instruction::Add { register: Register::R0, address: 0 }),
//!     (2, Instruction::Halt),
//! ];
//!
//! let analysis = Analyzer::new(&program)
//!     .with_memory(0, Term::var("x"))
//!     .with_variable("x")
//!     .with_constraint(
//!         "input range",
//!         Term::and(
//!             Term::greater(Term::var("x"), Term::int(-11)),
//!             Term::less(Term::var("x"), Term::int(11)),
//!         ),
//!     )
//!     .run()
//!     .expect("the program is well-formed");
//!
//! // A straight-line program explores a single path.
//! assert_eq!(analysis.trace.tree().leaves().len(), 1);
//!
//! // Along every path, r0 eventually equals the input.
//! let property = Formula::AllF(Atom::eq(
//!     Atom::key(Key::Register(Register::R0)),
//!     Atom::term(Term::var("x")),
//! ));
//! assert!(analysis.verify(&property).expect("the property lowers").is_proved());
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod analyzer;
pub mod checker;
pub mod constant;
pub mod engine;
pub mod error;
pub mod isa;
pub mod machine;
pub mod solver;
pub mod tree;
pub mod utility;
pub mod value;

// Re-exports to provide the library interface.
pub use analyzer::{Analysis, Analyzer};
pub use checker::{Atom, Formula, Proof};
pub use engine::{Config, Engine, SymExecStats, Trace};
pub use machine::{Context, Key};
pub use value::Term;
