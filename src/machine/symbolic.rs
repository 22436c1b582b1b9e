//! This module contains the symbolic forking backend of the instruction
//! semantics.

use tracing::debug;

use crate::{
    error::execution::Result,
    machine::{address_of, Context, Key, MachineEffects},
    value::{simplify::simplify, Term},
};

/// The machine states produced by one symbolic step.
#[derive(Clone, Debug)]
pub enum StepOutcome {
    /// The step had a single successor.
    Advanced(Context),

    /// The step branched on an undecidable condition, producing one
    /// successor per arm. Each successor's path condition has been extended
    /// with the guard for its side.
    Forked {
        when_true: Context,
        when_false: Context,
    },
}

/// A single-step symbolic machine over a [`Context`].
///
/// The forker wraps the context being stepped. Reads and writes go straight
/// through to it; `select` is where the symbolic behaviour lives. A guard
/// that simplifies to a boolean constant picks its arm in place, exactly as
/// the concrete simulator would. Anything else forks: the context is cloned
/// into a copy per arm, each copy's path condition is extended with the
/// guard (or its negation), and each continuation runs against its own copy.
///
/// The instruction set contains no nested conditionals, so at most one fork
/// occurs per step.
#[derive(Clone, Debug)]
pub struct Forker {
    /// The context being stepped.
    context: Context,

    /// The pair of forked contexts, if this step's `select` branched.
    fork: Option<(Context, Context)>,

    /// The iteration cap handed to expression simplification.
    simplify_steps: usize,
}

impl Forker {
    /// Constructs a forker that will step `context`.
    #[must_use]
    pub fn new(context: Context, simplify_steps: usize) -> Self {
        Self {
            context,
            fork: None,
            simplify_steps,
        }
    }

    /// Consumes the forker, yielding the context(s) the step produced.
    #[must_use]
    pub fn into_outcome(self) -> StepOutcome {
        match self.fork {
            Some((when_true, when_false)) => StepOutcome::Forked {
                when_true,
                when_false,
            },
            None => StepOutcome::Advanced(self.context),
        }
    }

    /// Forks the wrapped context with `guard` conjoined onto the path
    /// condition, simplifying the extended condition.
    fn forked_child(&self, guard: Term) -> Result<Context> {
        let mut child = self.context.fork(guard);
        let condition = simplify(self.simplify_steps, child.path_condition())?;
        child.set_path_condition(condition);
        Ok(child)
    }
}

impl MachineEffects for Forker {
    fn read(&mut self, key: Key) -> Term {
        self.context.read(key)
    }

    fn write(&mut self, key: Key, value: Term) -> Result<()> {
        let value = simplify(self.simplify_steps, &value)?;
        self.context.write(key, value);
        Ok(())
    }

    fn select(
        &mut self,
        condition: Term,
        when_true: &dyn Fn(&mut dyn MachineEffects) -> Result<()>,
        when_false: &dyn Fn(&mut dyn MachineEffects) -> Result<()>,
    ) -> Result<()> {
        let condition = simplify(self.simplify_steps, &condition)?;

        // A decided guard follows its arm in place, producing a single
        // successor.
        if condition.is_true() {
            return when_true(self);
        }
        if condition.is_false() {
            return when_false(self);
        }

        debug!(guard = %condition, "forking on an undecidable condition");

        let mut taken = Forker::new(self.forked_child(condition.clone())?, self.simplify_steps);
        when_true(&mut taken)?;

        let mut skipped = Forker::new(
            self.forked_child(Term::not(condition))?,
            self.simplify_steps,
        );
        when_false(&mut skipped)?;

        debug_assert!(
            taken.fork.is_none() && skipped.fork.is_none(),
            "the instruction set has no nested conditionals"
        );

        self.fork = Some((taken.context, skipped.context));
        Ok(())
    }

    fn resolve_address(&self, pointer: &Term) -> Result<Option<u8>> {
        // Store definitions participate in pointer resolution, which is how
        // a pointer variable pinned by a definition becomes loadable.
        address_of(&self.context.resolve(pointer))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        constant::DEFAULT_SIMPLIFY_STEPS,
        isa::{semantics, Instruction, Register},
        machine::{
            symbolic::{Forker, StepOutcome},
            Context,
            Flag,
            Key,
        },
        value::Term,
    };

    /// Steps `context` once through the forker.
    fn step_once(context: Context) -> anyhow::Result<StepOutcome> {
        let mut forker = Forker::new(context, DEFAULT_SIMPLIFY_STEPS);
        semantics::step(&mut forker)?;
        Ok(forker.into_outcome())
    }

    #[test]
    fn a_data_instruction_advances_without_forking() -> anyhow::Result<()> {
        let mut context = Context::new();
        context.load_program(&[(
            0,
            Instruction::Load {
                register: Register::R0,
                address: 4,
            },
        )]);
        context.write(Key::Address(4), Term::var("x"));

        match step_once(context)? {
            StepOutcome::Advanced(next) => {
                assert_eq!(next.read(Key::Register(Register::R0)), Term::var("x"));
                assert_eq!(next.read(Key::InstructionCounter), Term::int(1));
            }
            StepOutcome::Forked { .. } => panic!("a load must not fork"),
        }

        Ok(())
    }

    #[test]
    fn an_undecidable_jump_forks_both_ways() -> anyhow::Result<()> {
        let mut context = Context::new();
        context.load_program(&[(0, Instruction::JumpIfTrue { offset: 3 })]);
        let guard = Term::greater(Term::var("x"), Term::zero());
        context.write(Key::Flag(Flag::Condition), guard.clone());

        match step_once(context)? {
            StepOutcome::Forked {
                when_true,
                when_false,
            } => {
                // The taken side jumped, the skipped side fell through.
                assert_eq!(when_true.read(Key::InstructionCounter), Term::int(4));
                assert_eq!(when_false.read(Key::InstructionCounter), Term::int(1));

                // Each side's path condition picked up its guard.
                assert_eq!(when_true.path_condition(), &guard);
                assert_eq!(when_false.path_condition(), &Term::not(guard));
            }
            StepOutcome::Advanced(_) => panic!("an undecidable jump must fork"),
        }

        Ok(())
    }

    #[test]
    fn a_decided_jump_does_not_fork() -> anyhow::Result<()> {
        let mut context = Context::new();
        context.load_program(&[(0, Instruction::JumpIfFalse { offset: 2 })]);
        context.write(Key::Flag(Flag::Condition), Term::truth(false));

        match step_once(context)? {
            StepOutcome::Advanced(next) => {
                assert_eq!(next.read(Key::InstructionCounter), Term::int(3));
            }
            StepOutcome::Forked { .. } => panic!("a decided jump must not fork"),
        }

        Ok(())
    }

    #[test]
    fn store_definitions_unlock_indirect_loads() -> anyhow::Result<()> {
        let mut context = Context::new();
        context.load_program(&[(
            0,
            Instruction::LoadIndirect {
                register: Register::R0,
                address: 8,
            },
        )]);
        context.write(Key::Address(8), Term::var("p"));
        context.write(Key::Address(42), Term::var("secret"));
        context.define("p", Term::int(42));

        match step_once(context)? {
            StepOutcome::Advanced(next) => {
                assert_eq!(
                    next.read(Key::Register(Register::R0)),
                    Term::var("secret")
                );
            }
            StepOutcome::Forked { .. } => panic!("an indirect load must not fork"),
        }

        Ok(())
    }
}
