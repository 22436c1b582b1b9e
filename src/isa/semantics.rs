//! This module contains the semantics of the instruction set, written once
//! against the [`MachineEffects`] interface so that the same clauses drive
//! both the concrete simulator and the symbolic forking engine.

use tracing::trace;

use crate::{
    error::execution::{Error, Result},
    isa::{encoding::decode, Instruction, Register},
    machine::{Flag, Key, MachineEffects},
    value::{
        simplify::{to_concrete_address, to_instruction_code, Resolution},
        Term,
    },
};

/// Executes one full machine step: fetch, increment, decode, execute.
///
/// The fetched code is latched into the instruction register and the
/// instruction counter is advanced before the instruction itself runs, so
/// jump offsets are relative to the incremented counter.
///
/// Returns the decoded instruction to aid the caller's tracing.
///
/// # Errors
///
/// Returns [`Err`] if the instruction counter does not fold to a program
/// address (no resolution beyond constant folding is attempted), if the
/// fetched code is symbolic or names no instruction, or if the instruction
/// itself fails.
pub fn step(machine: &mut dyn MachineEffects) -> Result<Instruction> {
    // Fetch.
    let counter = machine.read(Key::InstructionCounter);
    let slot = match to_concrete_address(&counter)? {
        Resolution::Known(slot) => slot,
        Resolution::Unresolved(counter) => {
            return Err(Error::SymbolicInstructionCounter { counter })
        }
    };
    let fetched = machine.read(Key::Program(slot));
    machine.write(Key::InstructionRegister, fetched.clone())?;

    // Increment.
    machine.write(
        Key::InstructionCounter,
        Term::add(counter, Term::int(1)),
    )?;

    // Decode.
    let code = match to_instruction_code(&fetched)? {
        Resolution::Known(code) => code,
        Resolution::Unresolved(code) => return Err(Error::SymbolicInstructionCode { code }),
    };
    let instruction = decode(code).ok_or(Error::UnknownInstructionCode { code })?;

    // Execute.
    trace!(slot, %instruction, "executing");
    execute(&instruction, machine)?;

    Ok(instruction)
}

/// Executes a single instruction against the machine.
///
/// # Errors
///
/// Returns [`Err`] if an indirect load's pointer does not resolve to a
/// concrete address, or if a write evaluates an ill-typed value.
pub fn execute(instruction: &Instruction, machine: &mut dyn MachineEffects) -> Result<()> {
    match instruction {
        Instruction::Halt => machine.write(Key::Flag(Flag::Halted), Term::truth(true)),

        Instruction::Load { register, address } => {
            let value = machine.read(Key::Address(*address));
            machine.write(Key::Register(*register), value)
        }

        Instruction::LoadIndirect { register, address } => {
            let pointer = machine.read(Key::Address(*address));
            let Some(target) = machine.resolve_address(&pointer)? else {
                return Err(Error::InvalidIndirectAddress { pointer });
            };
            let value = machine.read(Key::Address(target));
            machine.write(Key::Register(*register), value)
        }

        Instruction::Set {
            register,
            immediate,
        } => machine.write(Key::Register(*register), Term::int(i32::from(*immediate))),

        Instruction::Store { register, address } => {
            let value = machine.read(Key::Register(*register));
            machine.write(Key::Address(*address), value)
        }

        Instruction::Add { register, address } => {
            let operand = machine.read(Key::Address(*address));
            arithmetic(machine, *register, operand, Term::add, addition_overflows)
        }
        Instruction::AddImmediate {
            register,
            immediate,
        } => arithmetic(
            machine,
            *register,
            Term::int(i32::from(*immediate)),
            Term::add,
            addition_overflows,
        ),

        Instruction::Sub { register, address } => {
            let operand = machine.read(Key::Address(*address));
            arithmetic(machine, *register, operand, Term::sub, subtraction_overflows)
        }
        Instruction::SubImmediate {
            register,
            immediate,
        } => arithmetic(
            machine,
            *register,
            Term::int(i32::from(*immediate)),
            Term::sub,
            subtraction_overflows,
        ),

        Instruction::Mul { register, address } => {
            let operand = machine.read(Key::Address(*address));
            arithmetic(
                machine,
                *register,
                operand,
                Term::mul,
                multiplication_overflows,
            )
        }

        Instruction::Div { register, address } => {
            let divisor = machine.read(Key::Address(*address));
            division(machine, *register, divisor, Term::div)
        }
        Instruction::Mod { register, address } => {
            let divisor = machine.read(Key::Address(*address));
            division(machine, *register, divisor, Term::modulo)
        }

        Instruction::Abs { register } => {
            let current = machine.read(Key::Register(*register));
            machine.write(
                Key::Flag(Flag::Overflow),
                absolute_value_overflows(&current),
            )?;
            machine.write(Key::Register(*register), Term::abs(current))
        }

        Instruction::CompareEq { register, address } => {
            comparison(machine, *register, *address, Term::equals)
        }
        Instruction::CompareGt { register, address } => {
            comparison(machine, *register, *address, Term::greater)
        }
        Instruction::CompareLt { register, address } => {
            comparison(machine, *register, *address, Term::less)
        }

        Instruction::Jump { offset } => {
            let counter = machine.read(Key::InstructionCounter);
            machine.write(
                Key::InstructionCounter,
                Term::add(counter, Term::int(i32::from(*offset))),
            )
        }

        Instruction::JumpIfTrue { offset } => conditional_jump(machine, *offset, true),
        Instruction::JumpIfFalse { offset } => conditional_jump(machine, *offset, false),
    }
}

/// Runs an arithmetic instruction: the overflow flag is written from the
/// operands before the destination register is updated.
fn arithmetic(
    machine: &mut dyn MachineEffects,
    register: Register,
    operand: Term,
    build: fn(Term, Term) -> Term,
    overflows: fn(&Term, &Term) -> Term,
) -> Result<()> {
    let current = machine.read(Key::Register(register));
    machine.write(Key::Flag(Flag::Overflow), overflows(&current, &operand))?;
    machine.write(Key::Register(register), build(current, operand))
}

/// Runs a division-family instruction, which additionally records whether
/// the divisor is zero. The register write still produces the division term;
/// paths on which the divisor is concretely zero are pruned by the solver
/// before the term is ever evaluated.
fn division(
    machine: &mut dyn MachineEffects,
    register: Register,
    divisor: Term,
    build: fn(Term, Term) -> Term,
) -> Result<()> {
    let current = machine.read(Key::Register(register));
    machine.write(
        Key::Flag(Flag::Overflow),
        division_overflows(&current, &divisor),
    )?;
    machine.write(
        Key::Flag(Flag::DivisionByZero),
        Term::equals(divisor.clone(), Term::zero()),
    )?;
    machine.write(Key::Register(register), build(current, divisor))
}

/// Runs a comparison instruction, writing the condition flag.
fn comparison(
    machine: &mut dyn MachineEffects,
    register: Register,
    address: u8,
    build: fn(Term, Term) -> Term,
) -> Result<()> {
    let current = machine.read(Key::Register(register));
    let operand = machine.read(Key::Address(address));
    machine.write(Key::Flag(Flag::Condition), build(current, operand))
}

/// Runs a conditional jump through the machine's `select`, exposing both the
/// jumping and non-jumping continuations so a forking backend can schedule
/// each of them.
fn conditional_jump(machine: &mut dyn MachineEffects, offset: i8, jump_when: bool) -> Result<()> {
    let condition = machine.read(Key::Flag(Flag::Condition));

    let advance = move |machine: &mut dyn MachineEffects| -> Result<()> {
        let counter = machine.read(Key::InstructionCounter);
        machine.write(
            Key::InstructionCounter,
            Term::add(counter, Term::int(i32::from(offset))),
        )
    };
    let stay = |_: &mut dyn MachineEffects| -> Result<()> { Ok(()) };

    if jump_when {
        machine.select(condition, &advance, &stay)
    } else {
        machine.select(condition, &stay, &advance)
    }
}

/// The closed-form predicate for signed addition overflowing the 32-bit
/// range.
///
/// Both disjuncts bound the intermediate subtraction by the sign guard on
/// `y`, so the predicate folds exactly on concrete operands as well as
/// lowering exactly to the solver.
#[must_use]
pub fn addition_overflows(x: &Term, y: &Term) -> Term {
    let above = Term::and(
        Term::greater(y.clone(), Term::zero()),
        Term::greater(x.clone(), Term::sub(Term::int(i32::MAX), y.clone())),
    );
    let below = Term::and(
        Term::less(y.clone(), Term::zero()),
        Term::less(x.clone(), Term::sub(Term::int(i32::MIN), y.clone())),
    );
    Term::or(above, below)
}

/// The closed-form predicate for signed subtraction overflowing the 32-bit
/// range.
#[must_use]
pub fn subtraction_overflows(x: &Term, y: &Term) -> Term {
    let above = Term::and(
        Term::less(y.clone(), Term::zero()),
        Term::greater(x.clone(), Term::add(Term::int(i32::MAX), y.clone())),
    );
    let below = Term::and(
        Term::greater(y.clone(), Term::zero()),
        Term::less(x.clone(), Term::add(Term::int(i32::MIN), y.clone())),
    );
    Term::or(above, below)
}

/// The closed-form predicate for signed multiplication overflowing the
/// 32-bit range, phrased over the exact product.
#[must_use]
pub fn multiplication_overflows(x: &Term, y: &Term) -> Term {
    let product = Term::mul(x.clone(), y.clone());
    Term::or(
        Term::greater(product.clone(), Term::int(i32::MAX)),
        Term::less(product, Term::int(i32::MIN)),
    )
}

/// The closed-form predicate for signed division overflowing the 32-bit
/// range: the minimum integer divided by minus one.
#[must_use]
pub fn division_overflows(x: &Term, y: &Term) -> Term {
    Term::and(
        Term::equals(x.clone(), Term::int(i32::MIN)),
        Term::equals(y.clone(), Term::int(-1)),
    )
}

/// The closed-form predicate for the absolute value overflowing the 32-bit
/// range: the minimum integer has no positive counterpart.
#[must_use]
pub fn absolute_value_overflows(x: &Term) -> Term {
    Term::equals(x.clone(), Term::int(i32::MIN))
}
