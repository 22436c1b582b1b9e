//! This module contains the front door of the library: a builder that
//! assembles the initial machine state, runs the symbolic engine over it,
//! and checks properties against the resulting trace.

use crate::{
    checker::{self, Formula, Proof},
    engine::{Config, Engine, SymExecStats, Trace},
    error::Result,
    isa::{Instruction, Register},
    machine::{Context, Key},
    solver::{self, Oracle},
    value::Term,
};

/// A builder over the initial machine state.
///
/// The analyzer starts from a program, accumulates memory bindings,
/// variable declarations and constraints, and is consumed by [`Self::run`],
/// which symbolically executes the state and returns an [`Analysis`] to
/// check properties against.
#[derive(Clone, Debug)]
pub struct Analyzer {
    context: Context,
    config: Config,
}

impl Analyzer {
    /// Constructs an analyzer over `program`, with each instruction loaded
    /// into program memory at its stated slot.
    #[must_use]
    pub fn new(program: &[(u8, Instruction)]) -> Self {
        let mut context = Context::new();
        context.load_program(program);
        Self {
            context,
            config: Config::default(),
        }
    }

    /// Sets the engine configuration to `config`.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Binds the data-memory cell at `address` to `value`.
    #[must_use]
    pub fn with_memory(mut self, address: u8, value: Term) -> Self {
        self.context.write(Key::Address(address), value);
        self
    }

    /// Binds `register` to `value`.
    #[must_use]
    pub fn with_register(mut self, register: Register, value: Term) -> Self {
        self.context.write(Key::Register(register), value);
        self
    }

    /// Declares the free variable `name` to the solver.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.context.declare(name);
        self
    }

    /// Defines the free variable `name` as equal to `value`.
    #[must_use]
    pub fn with_definition(mut self, name: impl Into<String>, value: Term) -> Self {
        self.context.define(name, value);
        self
    }

    /// Adds the labelled assertion `term` over the free variables.
    #[must_use]
    pub fn with_constraint(mut self, label: impl Into<String>, term: Term) -> Self {
        self.context.constrain(label, term);
        self
    }

    /// Gets the initial context assembled so far.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Consumes the analyzer, symbolically executing the assembled state.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if execution hits a fatal condition; see
    /// [`Engine::execute`].
    pub fn run(self) -> Result<Analysis> {
        let engine = Engine::new(self.config.clone());
        let (trace, stats) = engine.execute(self.context)?;
        Ok(Analysis {
            trace,
            stats,
            config: self.config,
        })
    }
}

/// The outcome of one symbolic execution, ready for property checking.
#[derive(Clone, Debug)]
pub struct Analysis {
    /// The tree of explored contexts.
    pub trace: Trace,

    /// The statistics gathered during exploration.
    pub stats: SymExecStats,

    /// The configuration the trace was produced under, reused for checking.
    config: Config,
}

impl Analysis {
    /// Checks `formula` against the trace.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the formula's atoms do not lower to the solver.
    pub fn verify(&self, formula: &Formula) -> solver::Result<Proof> {
        let mut oracle = Oracle::new(self.config.solver_timeout);
        checker::verify(&self.trace, formula, &mut oracle)
    }
}
