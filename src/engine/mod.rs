//! This module contains the symbolic execution engine: the bounded
//! exploration loop that grows a [`StateTree`] of reachable contexts from an
//! initial machine state.

use std::{collections::BTreeMap, time::Duration};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    constant::{DEFAULT_SIMPLIFY_STEPS, DEFAULT_SOLVER_TIMEOUT, DEFAULT_STEP_BUDGET},
    error::{container::Locatable, Error, Result},
    isa::semantics,
    machine::{
        symbolic::{Forker, StepOutcome},
        Context,
        Key,
        Solution,
    },
    solver::Oracle,
    tree::{NodeId, StateTree},
    value::known::KnownValue,
};

/// The configuration for the symbolic execution engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of machine steps executed along any single path.
    ///
    /// Defaults to [`DEFAULT_STEP_BUDGET`].
    pub step_budget: usize,

    /// The wall-clock budget for a single satisfiability query. A query
    /// that exceeds it leaves its context [`crate::machine::Solution::Unknown`].
    ///
    /// Defaults to [`DEFAULT_SOLVER_TIMEOUT`].
    pub solver_timeout: Duration,

    /// The iteration cap for expression simplification during execution.
    ///
    /// Defaults to [`DEFAULT_SIMPLIFY_STEPS`].
    pub simplify_steps: usize,
}

impl Config {
    /// Sets the `step_budget` config parameter to `value`.
    #[must_use]
    pub fn with_step_budget(mut self, value: usize) -> Self {
        self.step_budget = value;
        self
    }

    /// Sets the `solver_timeout` config parameter to `value`.
    #[must_use]
    pub fn with_solver_timeout(mut self, value: Duration) -> Self {
        self.solver_timeout = value;
        self
    }

    /// Sets the `simplify_steps` config parameter to `value`.
    #[must_use]
    pub fn with_simplify_steps(mut self, value: usize) -> Self {
        self.simplify_steps = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            solver_timeout: DEFAULT_SOLVER_TIMEOUT,
            simplify_steps: DEFAULT_SIMPLIFY_STEPS,
        }
    }
}

/// The result of a symbolic execution: the state tree together with the
/// context reached at every node.
#[derive(Clone, Debug, Serialize)]
pub struct Trace {
    /// The shape of the explored execution.
    tree: StateTree,

    /// The context at every node of `tree`.
    contexts: BTreeMap<NodeId, Context>,
}

impl Trace {
    /// Gets the state tree.
    #[must_use]
    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    /// Gets the context at the node identified by `id`, if the node exists.
    #[must_use]
    pub fn context(&self, id: NodeId) -> Option<&Context> {
        self.contexts.get(&id)
    }

    /// Gets the contexts at every node.
    #[must_use]
    pub fn contexts(&self) -> &BTreeMap<NodeId, Context> {
        &self.contexts
    }

    /// Gets the leaves whose contexts the solver marked satisfiable, in
    /// pre-order.
    #[must_use]
    pub fn satisfiable_leaves(&self) -> Vec<NodeId> {
        self.tree
            .leaves()
            .into_iter()
            .filter(|id| {
                self.contexts.get(id).is_some_and(|context| {
                    matches!(context.solution(), Solution::Satisfiable { .. })
                })
            })
            .collect()
    }
}

/// The statistics gathered over one symbolic execution.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SymExecStats {
    /// Total wall-clock time spent inside solver queries.
    pub elapsed: Duration,
}

/// The symbolic execution engine.
///
/// The engine explores depth-first from the initial context. Every produced
/// child is annotated by the solver before exploration continues, so an
/// unsatisfiable fork arm is recorded in the tree for explainability but
/// never expanded. Node identifiers issue from the tree's allocation
/// counter in exploration order, which makes the produced tree reproducible
/// for a given initial context and configuration.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: Config,
}

impl Engine {
    /// Constructs an engine with the provided configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Gets the engine's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Symbolically executes from `initial`, producing the trace of every
    /// explored path and the time spent in the solver.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] on the fatal conditions of execution — a symbolic
    /// instruction counter, an undecodable instruction, an unresolvable
    /// indirect load, an ill-typed evaluation — and on solver translation
    /// failures. The error carries the program slot being executed.
    pub fn execute(&self, initial: Context) -> Result<(Trace, SymExecStats)> {
        let mut oracle = Oracle::new(self.config.solver_timeout);

        let mut root = initial;
        oracle
            .process_context(&mut root)
            .map_err(|e| Error::from(e).locate(0))?;

        let mut tree = StateTree::new();
        let mut contexts = BTreeMap::new();
        let root_id = tree.root();
        contexts.insert(root_id, root);

        self.expand(&mut tree, &mut contexts, &mut oracle, root_id, 0)?;

        let stats = SymExecStats {
            elapsed: oracle.elapsed(),
        };
        info!(
            nodes = tree.len(),
            leaves = tree.leaves().len(),
            solver_elapsed = ?stats.elapsed,
            "exploration complete"
        );

        Ok((Trace { tree, contexts }, stats))
    }

    /// Expands the leaf identified by `node`, recursing into every child it
    /// produces, depth-first with the branch-taken side leftmost.
    fn expand(
        &self,
        tree: &mut StateTree,
        contexts: &mut BTreeMap<NodeId, Context>,
        oracle: &mut Oracle,
        node: NodeId,
        steps_taken: usize,
    ) -> Result<()> {
        let context = &contexts[&node];
        if steps_taken >= self.config.step_budget
            || context.is_halted()
            || context.is_unsatisfiable()
        {
            return Ok(());
        }

        let slot = concrete_slot(context);
        let locate = |error: Error| error.locate(slot);

        let mut forker = Forker::new(context.clone(), self.config.simplify_steps);
        let instruction = semantics::step(&mut forker)
            .map_err(|e| locate(Error::from(e)))?;
        debug!(node, slot, %instruction, "stepped");

        match forker.into_outcome() {
            StepOutcome::Advanced(mut child) => {
                oracle
                    .process_context(&mut child)
                    .map_err(|e| locate(Error::from(e)))?;
                let id = tree.extend_one(node).map_err(|e| locate(Error::from(e)))?;
                contexts.insert(id, child);
                self.expand(tree, contexts, oracle, id, steps_taken + 1)
            }
            StepOutcome::Forked {
                mut when_true,
                mut when_false,
            } => {
                oracle
                    .process_context(&mut when_true)
                    .map_err(|e| locate(Error::from(e)))?;
                oracle
                    .process_context(&mut when_false)
                    .map_err(|e| locate(Error::from(e)))?;

                let (left, right) = tree.extend_two(node).map_err(|e| locate(Error::from(e)))?;
                contexts.insert(left, when_true);
                contexts.insert(right, when_false);

                self.expand(tree, contexts, oracle, left, steps_taken + 1)?;
                self.expand(tree, contexts, oracle, right, steps_taken + 1)
            }
        }
    }
}

/// Reads the context's instruction counter as a concrete slot for error
/// locations, falling back to zero when the counter is not a folded
/// constant.
fn concrete_slot(context: &Context) -> u32 {
    match context.read(Key::InstructionCounter).as_known() {
        Some(KnownValue::Int32(value)) => u32::try_from(*value).unwrap_or(0),
        _ => 0,
    }
}
