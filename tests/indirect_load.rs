//! This module is an integration test for indirect loads: a pointer that
//! stays symbolic is fatal, while a pointer pinned by a store definition
//! resolves and loads.
#![cfg(test)]

use isa_symex::{
    analyzer::Analyzer,
    error::{execution, Error},
    isa::{Instruction, Register},
    machine::Key,
    value::Term,
};

/// The program under test: `r0 := mem[mem[1]]; halt`.
fn indirect_program() -> [(u8, Instruction); 2] {
    [
        (
            0,
            Instruction::LoadIndirect {
                register: Register::R0,
                address: 1,
            },
        ),
        (1, Instruction::Halt),
    ]
}

#[test]
fn an_unconstrained_pointer_is_fatal() {
    let outcome = Analyzer::new(&indirect_program())
        .with_memory(1, Term::var("p"))
        .with_variable("p")
        .run();

    match outcome {
        Err(located) => {
            assert!(matches!(
                located.payload,
                Error::Execution(execution::Error::InvalidIndirectAddress { .. })
            ));
            // The failure happened while executing the load's slot.
            assert_eq!(located.location, 0);
        }
        Ok(_) => panic!("a symbolic pointer must not load"),
    }
}

#[test]
fn a_defined_pointer_resolves_and_loads() -> anyhow::Result<()> {
    let analysis = Analyzer::new(&indirect_program())
        .with_memory(1, Term::var("p"))
        .with_memory(42, Term::int(7))
        .with_definition("p", Term::int(42))
        .run()?;

    let leaves = analysis.trace.tree().leaves();
    assert_eq!(leaves.len(), 1);

    let leaf = analysis.trace.context(leaves[0]).expect("leaf context");
    assert!(leaf.is_halted());
    assert_eq!(leaf.read(Key::Register(Register::R0)), Term::int(7));

    Ok(())
}

#[test]
fn an_out_of_range_pointer_is_fatal() {
    let outcome = Analyzer::new(&indirect_program())
        .with_memory(1, Term::int(300))
        .run();

    assert!(matches!(
        outcome,
        Err(located) if matches!(
            located.payload,
            Error::Execution(execution::Error::InvalidIndirectAddress { .. })
        )
    ));
}
