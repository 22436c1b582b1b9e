//! This module is an integration test modelling a bounded control loop that
//! scales a speed by a gain on every tick, where the multiplication can
//! overflow for wide-enough input ranges.
#![cfg(test)]

use isa_symex::{
    analyzer::Analyzer,
    checker::{Atom, Formula},
    isa::{Instruction, Register},
    machine::{Flag, Key},
    value::Term,
};

mod common;

/// The control loop: two ticks, each multiplying the speed in `r0` by the
/// gain at cell 1. Cell 4 is left unbound as the counter's zero floor.
fn control_loop(speed_range: (i32, i32), gain_range: (i32, i32)) -> Analyzer {
    let program = [
        (
            0,
            Instruction::Load {
                register: Register::R0,
                address: 0,
            },
        ),
        (
            1,
            Instruction::Set {
                register: Register::R1,
                immediate: 2,
            },
        ),
        (
            2,
            Instruction::CompareGt {
                register: Register::R1,
                address: 4,
            },
        ),
        (3, Instruction::JumpIfFalse { offset: 3 }),
        (
            4,
            Instruction::Mul {
                register: Register::R0,
                address: 1,
            },
        ),
        (
            5,
            Instruction::SubImmediate {
                register: Register::R1,
                immediate: 1,
            },
        ),
        (6, Instruction::Jump { offset: -5 }),
        (7, Instruction::Halt),
    ];

    Analyzer::new(&program)
        .with_memory(0, Term::var("speed"))
        .with_memory(1, Term::var("gain"))
        .with_variable("speed")
        .with_variable("gain")
        .with_constraint(
            "speed range",
            common::between("speed", speed_range.0, speed_range.1),
        )
        .with_constraint(
            "gain range",
            common::between("gain", gain_range.0, gain_range.1),
        )
}

#[test]
fn wide_input_ranges_admit_an_overflow() -> anyhow::Result<()> {
    let analysis = control_loop((0, 100_000), (0, 100_000)).run()?;

    let no_overflow = Formula::AllG(Atom::not(Atom::key(Key::Flag(Flag::Overflow))));
    let proof = analysis.verify(&no_overflow)?;

    assert!(!proof.is_proved());

    // The first witness sits right after the first multiplication, so its
    // model must name a speed and gain whose product escapes the 32-bit
    // range.
    let witness = &proof.witnesses()[0];
    let speed = i64::from(*witness.model.get("speed").expect("speed is declared"));
    let gain = i64::from(*witness.model.get("gain").expect("gain is declared"));
    assert!(
        speed * gain > i64::from(i32::MAX) || speed * gain < i64::from(i32::MIN),
        "the counterexample {speed} * {gain} must overflow"
    );

    Ok(())
}

#[test]
fn narrow_input_ranges_prove_overflow_freedom() -> anyhow::Result<()> {
    let analysis = control_loop((0, 100), (0, 100)).run()?;

    let no_overflow = Formula::AllG(Atom::not(Atom::key(Key::Flag(Flag::Overflow))));

    // 100 * 100 * 100 stays far inside the 32-bit range, on every tick.
    assert!(analysis.verify(&no_overflow)?.is_proved());

    Ok(())
}
