//! This module contains the concrete simulator, the non-forking backend of
//! the instruction semantics.

use crate::{
    constant::DEFAULT_SIMPLIFY_STEPS,
    error::execution::Result,
    isa::{semantics, Instruction},
    machine::{address_of, Context, Key, MachineEffects},
    value::{simplify::simplify, Term},
};

/// A sequential simulator over a single [`Context`].
///
/// The simulator runs the very same semantics clauses as the symbolic
/// engine; the only behavioural difference is in `select`, which follows a
/// single continuation chosen by the condition's truth value instead of
/// forking.
///
/// It is intended for running fully-concrete initial states, but nothing
/// stops mixing in symbolic bindings: they flow through unchanged, and a
/// condition that stays symbolic is treated as true.
#[derive(Clone, Debug)]
pub struct Simulator {
    /// The machine state being stepped in place.
    context: Context,

    /// The iteration cap handed to expression simplification on writes.
    simplify_steps: usize,
}

impl Simulator {
    /// Constructs a simulator over `context`.
    #[must_use]
    pub fn new(context: Context) -> Self {
        Self {
            context,
            simplify_steps: DEFAULT_SIMPLIFY_STEPS,
        }
    }

    /// Sets the simplification iteration cap to `value`.
    #[must_use]
    pub fn with_simplify_steps(mut self, value: usize) -> Self {
        self.simplify_steps = value;
        self
    }

    /// Gets the simulator's machine state.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Consumes the simulator, returning its final machine state.
    #[must_use]
    pub fn into_context(self) -> Context {
        self.context
    }

    /// Executes a single machine step.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the step fails; see [`semantics::step`].
    pub fn step(&mut self) -> Result<Instruction> {
        semantics::step(self)
    }

    /// Runs the machine until it halts or `step_budget` steps have executed,
    /// returning the number of steps taken.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any step fails.
    pub fn run(&mut self, step_budget: usize) -> Result<usize> {
        let mut steps = 0;
        while steps < step_budget && !self.context.is_halted() {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }
}

impl MachineEffects for Simulator {
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
        if condition.truth_value() {
            when_true(self)
        } else {
            when_false(self)
        }
    }

    fn resolve_address(&self, pointer: &Term) -> Result<Option<u8>> {
        address_of(pointer)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::execution::Error,
        isa::{Instruction, Register},
        machine::{concrete::Simulator, Context, Key},
        value::{known::KnownValue, Term},
    };

    /// A program that sums the contents of two memory cells into `r0`.
    fn summing_context() -> Context {
        let mut context = Context::new();
        context.load_program(&[
            (
                0,
                Instruction::Load {
                    register: Register::R0,
                    address: 10,
                },
            ),
            (
                1,
                Instruction::Add {
                    register: Register::R0,
                    address: 11,
                },
            ),
            (2, Instruction::Halt),
        ]);
        context.write(Key::Address(10), Term::int(30));
        context.write(Key::Address(11), Term::int(12));
        context
    }

    #[test]
    fn runs_a_straight_line_program_to_the_halt() -> anyhow::Result<()> {
        let mut simulator = Simulator::new(summing_context());
        let steps = simulator.run(100)?;

        assert_eq!(steps, 3);
        assert!(simulator.context().is_halted());
        assert_eq!(
            simulator.context().read(Key::Register(Register::R0)),
            Term::int(42)
        );

        Ok(())
    }

    #[test]
    fn conditional_jumps_follow_the_condition_flag() -> anyhow::Result<()> {
        // Compares r0 (= 5) with memory (= 3), then jumps over a `set` that
        // would clobber the result.
        let mut context = Context::new();
        context.load_program(&[
            (
                0,
                Instruction::Set {
                    register: Register::R0,
                    immediate: 5,
                },
            ),
            (
                1,
                Instruction::CompareGt {
                    register: Register::R0,
                    address: 20,
                },
            ),
            (2, Instruction::JumpIfTrue { offset: 1 }),
            (
                3,
                Instruction::Set {
                    register: Register::R0,
                    immediate: 0,
                },
            ),
            (4, Instruction::Halt),
        ]);
        context.write(Key::Address(20), Term::int(3));

        let mut simulator = Simulator::new(context);
        simulator.run(100)?;

        assert_eq!(
            simulator.context().read(Key::Register(Register::R0)),
            Term::int(5)
        );

        Ok(())
    }

    #[test]
    fn counter_wraps_through_simplification_on_every_step() -> anyhow::Result<()> {
        let mut simulator = Simulator::new(summing_context());
        simulator.step()?;

        // After one step the counter is a folded constant, not `0 + 1`.
        assert_eq!(
            simulator.context().read(Key::InstructionCounter),
            Term::int(1)
        );

        Ok(())
    }

    #[test]
    fn indirect_loads_follow_concrete_pointers() -> anyhow::Result<()> {
        let mut context = Context::new();
        context.load_program(&[
            (
                0,
                Instruction::LoadIndirect {
                    register: Register::R1,
                    address: 0,
                },
            ),
            (1, Instruction::Halt),
        ]);
        context.write(Key::Address(0), Term::int(7));
        context.write(Key::Address(7), Term::int(99));

        let mut simulator = Simulator::new(context);
        simulator.run(100)?;

        assert_eq!(
            simulator.context().read(Key::Register(Register::R1)),
            Term::int(99)
        );

        Ok(())
    }

    #[test]
    fn indirect_loads_reject_symbolic_pointers() {
        let mut context = Context::new();
        context.load_program(&[(
            0,
            Instruction::LoadIndirect {
                register: Register::R1,
                address: 0,
            },
        )]);
        context.write(Key::Address(0), Term::var("p"));

        let mut simulator = Simulator::new(context);
        let outcome = simulator.run(100);

        assert!(matches!(
            outcome,
            Err(Error::InvalidIndirectAddress { .. })
        ));
    }

    #[test]
    fn division_records_its_flags_concretely() -> anyhow::Result<()> {
        let mut context = Context::new();
        context.load_program(&[
            (
                0,
                Instruction::Set {
                    register: Register::R0,
                    immediate: 14,
                },
            ),
            (
                1,
                Instruction::Div {
                    register: Register::R0,
                    address: 5,
                },
            ),
            (2, Instruction::Halt),
        ]);
        context.write(Key::Address(5), Term::int(2));

        let mut simulator = Simulator::new(context);
        simulator.run(100)?;

        assert_eq!(
            simulator.context().read(Key::Register(Register::R0)),
            Term::int(7)
        );
        assert_eq!(
            simulator
                .context()
                .read(Key::Flag(crate::machine::Flag::DivisionByZero))
                .as_known(),
            Some(&KnownValue::Bool(false))
        );

        Ok(())
    }
}
