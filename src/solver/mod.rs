//! This module contains the lowering of symbolic terms into the solver's
//! term algebra, and the [`Oracle`] that drives satisfiability queries over
//! execution contexts.

use std::{
    collections::BTreeMap,
    sync::Once,
    time::{Duration, Instant},
};

use tracing::{debug, warn};
use z3::{
    ast::{Bool, Dynamic, Int},
    Params,
    SatResult,
    Solver,
};

use crate::{
    error::solving::Error,
    machine::{Context, Model, Solution},
    value::{known::KnownValue, Term, TermData},
};

/// The result type for solver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Enables the solver's internal parallelism once per process.
fn enable_parallelism() {
    static PARALLEL: Once = Once::new();
    PARALLEL.call_once(|| {
        z3::set_global_param("parallel.enable", "true");
    });
}

/// A translator from [`Term`]s to solver terms, carrying one integer symbol
/// per declared free variable.
///
/// Translators are cheap and short-lived: one is built per query, and no
/// solver-side object outlives the query it was built for.
pub struct Translator {
    variables: BTreeMap<String, Int>,
}

impl Translator {
    /// Constructs a translator declaring one integer symbol for each of
    /// `names`.
    #[must_use]
    pub fn declare(names: impl IntoIterator<Item = String>) -> Self {
        let variables = names
            .into_iter()
            .map(|name| {
                let symbol = Int::new_const(name.clone());
                (name, symbol)
            })
            .collect();
        Self { variables }
    }

    /// Gets the declared variables and their solver symbols.
    pub fn variables(&self) -> impl Iterator<Item = (&String, &Int)> {
        self.variables.iter()
    }

    /// Lowers `term` to a solver boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the term does not lower, or lowers to an integer.
    pub fn lower_bool(&self, term: &Term) -> Result<Bool> {
        self.lower(term)?
            .as_bool()
            .ok_or_else(|| Error::SortMismatch {
                expected: "boolean",
                term: term.clone(),
            })
    }

    /// Lowers `term` to a solver integer.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the term does not lower, or lowers to a boolean.
    pub fn lower_int(&self, term: &Term) -> Result<Int> {
        self.lower(term)?
            .as_int()
            .ok_or_else(|| Error::SortMismatch {
                expected: "integer",
                term: term.clone(),
            })
    }

    /// Lowers `term` to a solver term of whichever sort it has.
    ///
    /// Machine words lower to the same integer sort as machine integers;
    /// the distinction between them is a guest-level typing concern, not a
    /// solver-level one.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the term mentions an undeclared variable, if an
    /// lvalue marker survived into it, or if an operation is applied at the
    /// wrong sort.
    pub fn lower(&self, term: &Term) -> Result<Dynamic> {
        match term.data() {
            TermData::Const(value) => match value {
                KnownValue::Int32(v) => Ok(Dynamic::from_ast(&Int::from_i64(i64::from(*v)))),
                KnownValue::Word16(v) => Ok(Dynamic::from_ast(&Int::from_i64(i64::from(*v)))),
                KnownValue::Bool(v) => Ok(Dynamic::from_ast(&Bool::from_bool(*v))),
            },

            TermData::Var(name) => self
                .variables
                .get(name)
                .map(Dynamic::from_ast)
                .ok_or_else(|| Error::UndeclaredVariable { name: name.clone() }),

            TermData::Pointer(_) => Err(Error::PointerValue {
                pointer: term.clone(),
            }),

            TermData::Ite {
                condition,
                when_true,
                when_false,
            } => {
                let condition = self.lower_bool(condition)?;
                let when_true = self.lower(when_true)?;
                let when_false = self.lower(when_false)?;
                if let (Some(t), Some(e)) = (when_true.as_int(), when_false.as_int()) {
                    Ok(Dynamic::from_ast(&condition.ite(&t, &e)))
                } else if let (Some(t), Some(e)) = (when_true.as_bool(), when_false.as_bool()) {
                    Ok(Dynamic::from_ast(&condition.ite(&t, &e)))
                } else {
                    Err(Error::MixedSorts {
                        left: term.clone(),
                        right: term.clone(),
                    })
                }
            }

            TermData::Add { left, right } => {
                let l = self.lower_int(left)?;
                let r = self.lower_int(right)?;
                Ok(Dynamic::from_ast(&Int::add(&[l, r])))
            }
            TermData::Sub { left, right } => {
                let l = self.lower_int(left)?;
                let r = self.lower_int(right)?;
                Ok(Dynamic::from_ast(&Int::sub(&[l, r])))
            }
            TermData::Mul { left, right } => {
                let l = self.lower_int(left)?;
                let r = self.lower_int(right)?;
                Ok(Dynamic::from_ast(&Int::mul(&[l, r])))
            }
            TermData::Div { dividend, divisor } => {
                let l = self.lower_int(dividend)?;
                let r = self.lower_int(divisor)?;
                Ok(Dynamic::from_ast(&l.div(&r)))
            }
            TermData::Mod { dividend, divisor } => {
                let l = self.lower_int(dividend)?;
                let r = self.lower_int(divisor)?;
                Ok(Dynamic::from_ast(&l.modulo(&r)))
            }

            TermData::Abs(target) => {
                let value = self.lower_int(target)?;
                let negated = Int::sub(&[Int::from_i64(0), value.clone()]);
                let negative = value.lt(&Int::from_i64(0));
                Ok(Dynamic::from_ast(&negative.ite(&negated, &value)))
            }

            TermData::Eq { left, right } => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                if let (Some(li), Some(ri)) = (l.as_int(), r.as_int()) {
                    Ok(Dynamic::from_ast(&li.eq(&ri)))
                } else if let (Some(lb), Some(rb)) = (l.as_bool(), r.as_bool()) {
                    Ok(Dynamic::from_ast(&lb.eq(&rb)))
                } else {
                    Err(Error::MixedSorts {
                        left: left.clone(),
                        right: right.clone(),
                    })
                }
            }
            TermData::Gt { left, right } => {
                let l = self.lower_int(left)?;
                let r = self.lower_int(right)?;
                Ok(Dynamic::from_ast(&l.gt(&r)))
            }
            TermData::Lt { left, right } => {
                let l = self.lower_int(left)?;
                let r = self.lower_int(right)?;
                Ok(Dynamic::from_ast(&l.lt(&r)))
            }

            TermData::And { left, right } => {
                let l = self.lower_bool(left)?;
                let r = self.lower_bool(right)?;
                Ok(Dynamic::from_ast(&Bool::and(&[l, r])))
            }
            TermData::Or { left, right } => {
                let l = self.lower_bool(left)?;
                let r = self.lower_bool(right)?;
                Ok(Dynamic::from_ast(&Bool::or(&[l, r])))
            }
            TermData::Not(target) => {
                let value = self.lower_bool(target)?;
                Ok(Dynamic::from_ast(&value.not()))
            }
        }
    }
}

/// The solver driver.
///
/// The oracle owns a single solver and isolates every query inside a
/// `push`/`pop` assertion scope. Variable declarations are re-issued per
/// query; nothing solver-side is retained between queries. Wall-clock time
/// spent inside queries is accumulated for reporting.
pub struct Oracle {
    solver: Solver,
    elapsed: Duration,
}

impl Oracle {
    /// Constructs an oracle whose queries time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        enable_parallelism();

        let solver = Solver::new();
        let mut params = Params::new();
        #[allow(clippy::cast_possible_truncation)] // Practical timeouts fit.
        params.set_u32("timeout", timeout.as_millis() as u32);
        solver.set_params(&params);

        Self {
            solver,
            elapsed: Duration::ZERO,
        }
    }

    /// Gets the total wall-clock time spent inside solver queries.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Solves the context's path condition and constraints, attaching the
    /// verdict to the context.
    ///
    /// A `sat` verdict attaches a model covering every declared variable;
    /// `unsat` marks the context's path terminal; solver timeouts and
    /// give-ups attach [`Solution::Unknown`]. None of the three is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the context's terms do not lower to the solver.
    pub fn process_context(&mut self, context: &mut Context) -> Result<()> {
        let (solution, elapsed) = {
            let started = Instant::now();
            self.solver.push();
            let outcome = self.query_context(context);
            self.solver.pop(1);
            (outcome, started.elapsed())
        };
        self.elapsed += elapsed;

        let solution = solution?;
        debug!(verdict = ?solution, "context processed");
        context.set_solution(solution);
        Ok(())
    }

    /// Searches for an assignment that satisfies the context's obligations
    /// while violating `requirement`.
    ///
    /// Returns the witnessing model if one exists. A solver give-up is
    /// logged and treated as the absence of a witness.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the terms involved do not lower to the solver.
    pub fn find_violation(
        &mut self,
        context: &Context,
        requirement: &Term,
    ) -> Result<Option<Model>> {
        let started = Instant::now();
        self.solver.push();
        let outcome = self.query_violation(context, requirement);
        self.solver.pop(1);
        self.elapsed += started.elapsed();
        outcome
    }

    /// Checks whether `antecedent` entails `consequent` over their shared
    /// free variables: the entailment holds exactly when the conjunction of
    /// the antecedent and the negated consequent is unsatisfiable.
    ///
    /// A solver give-up counts as a failure to prove the entailment.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either term does not lower to the solver.
    pub fn entails(&mut self, antecedent: &Term, consequent: &Term) -> Result<bool> {
        let mut names = antecedent.free_variables();
        names.extend(consequent.free_variables());
        let translator = Translator::declare(names);

        let started = Instant::now();
        self.solver.push();
        let outcome: Result<SatResult> = (|| {
            self.assert_variable_ranges(&translator);
            self.solver.assert(&translator.lower_bool(antecedent)?);
            self.solver.assert(&translator.lower_bool(consequent)?.not());
            Ok(self.solver.check())
        })();
        self.solver.pop(1);
        self.elapsed += started.elapsed();

        Ok(matches!(outcome?, SatResult::Unsat))
    }

    /// Runs the per-context query inside the current assertion scope.
    fn query_context(&self, context: &Context) -> Result<Solution> {
        let translator = self.declare_for(context, None);
        self.assert_context(&translator, context)?;

        match self.solver.check() {
            SatResult::Sat => Ok(Solution::Satisfiable {
                model: self.extract_model(&translator)?,
            }),
            SatResult::Unsat => Ok(Solution::Unsatisfiable),
            SatResult::Unknown => Ok(Solution::Unknown),
        }
    }

    /// Runs the violation query inside the current assertion scope.
    fn query_violation(&self, context: &Context, requirement: &Term) -> Result<Option<Model>> {
        let translator = self.declare_for(context, Some(requirement));
        self.assert_context(&translator, context)?;
        self.solver
            .assert(&translator.lower_bool(requirement)?.not());

        match self.solver.check() {
            SatResult::Sat => Ok(Some(self.extract_model(&translator)?)),
            SatResult::Unsat => Ok(None),
            SatResult::Unknown => {
                warn!(requirement = %requirement, "solver gave up on a violation query");
                Ok(None)
            }
        }
    }

    /// Builds a translator declaring the context's variables, together with
    /// those of `extra` when present.
    fn declare_for(&self, context: &Context, extra: Option<&Term>) -> Translator {
        let mut names = context.free_variables();
        names.extend(context.store().keys().cloned());
        if let Some(term) = extra {
            names.extend(term.free_variables());
        }
        Translator::declare(names)
    }

    /// Asserts the context's obligations into the current scope: the 32-bit
    /// range of every declared variable, the store's defining equalities,
    /// the path condition, and each user constraint.
    fn assert_context(&self, translator: &Translator, context: &Context) -> Result<()> {
        self.assert_variable_ranges(translator);

        for (name, definition) in context.store() {
            if matches!(definition.data(), TermData::Var(defined) if defined == name) {
                continue;
            }
            let symbol = translator.lower_int(&Term::var(name.clone()))?;
            let defined = translator.lower_int(definition)?;
            self.solver.assert(&symbol.eq(&defined));
        }

        self.solver
            .assert(&translator.lower_bool(context.path_condition())?);

        for constraint in context.constraints() {
            self.solver.assert(&translator.lower_bool(&constraint.term)?);
        }

        Ok(())
    }

    /// Asserts that every declared variable lies within the machine's
    /// 32-bit signed range, pinning the integer theory to the guest's value
    /// domain.
    fn assert_variable_ranges(&self, translator: &Translator) {
        for (_, symbol) in translator.variables() {
            self.solver
                .assert(&symbol.ge(&Int::from_i64(i64::from(i32::MIN))));
            self.solver
                .assert(&symbol.le(&Int::from_i64(i64::from(i32::MAX))));
        }
    }

    /// Reads the value of every declared variable out of the solver's model.
    fn extract_model(&self, translator: &Translator) -> Result<Model> {
        let model = self.solver.get_model().ok_or(Error::MissingModel)?;

        let mut values = Model::new();
        for (name, symbol) in translator.variables() {
            let value = model
                .eval(symbol, true)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| Error::UnvaluedVariable { name: name.clone() })?;
            let value = i32::try_from(value).map_err(|_| Error::ModelOutOfRange {
                name: name.clone(),
                value,
            })?;
            values.insert(name.clone(), value);
        }
        Ok(values)
    }
}
