//! This module contains common testing utilities for testing this library.
#![cfg(test)]

use isa_symex::{
    analyzer::Analyzer,
    isa::{Instruction, Register},
    value::Term,
};

/// Constructs the inclusive range constraint `lo <= name <= hi`.
#[allow(unused)] // It is actually
pub fn between(name: &str, lo: i32, hi: i32) -> Term {
    Term::and(
        Term::not(Term::less(Term::var(name), Term::int(lo))),
        Term::not(Term::greater(Term::var(name), Term::int(hi))),
    )
}

/// Constructs an analyzer over a program that sums the integers `1..=n`
/// into `r0`, for a symbolic `n` stored at memory cell 0.
///
/// The loop counts `r1` down from `n`, staging it through cell 3 because
/// arithmetic instructions take one memory operand. Cell 2 is left unbound
/// and reads as zero, serving as the comparison's floor.
#[allow(unused)] // It is actually
pub fn summation_analyzer(lo: i32, hi: i32) -> Analyzer {
    let program = [
        (
            0,
            Instruction::Set {
                register: Register::R0,
                immediate: 0,
            },
        ),
        (
            1,
            Instruction::Load {
                register: Register::R1,
                address: 0,
            },
        ),
        (
            2,
            Instruction::CompareGt {
                register: Register::R1,
                address: 2,
            },
        ),
        (3, Instruction::JumpIfFalse { offset: 4 }),
        (
            4,
            Instruction::Store {
                register: Register::R1,
                address: 3,
            },
        ),
        (
            5,
            Instruction::Add {
                register: Register::R0,
                address: 3,
            },
        ),
        (
            6,
            Instruction::SubImmediate {
                register: Register::R1,
                immediate: 1,
            },
        ),
        (7, Instruction::Jump { offset: -6 }),
        (8, Instruction::Halt),
    ];

    Analyzer::new(&program)
        .with_memory(0, Term::var("n"))
        .with_variable("n")
        .with_constraint("count range", between("n", lo, hi))
}
