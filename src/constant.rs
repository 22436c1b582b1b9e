//! This module contains constants that are needed throughout the codebase.

use std::time::Duration;

/// The number of general-purpose registers in the machine.
pub const REGISTER_COUNT: usize = 4;

/// The number of cells in the data memory, addressed from zero.
pub const MEMORY_SIZE: usize = 256;

/// The number of slots in the program memory, addressed from zero.
pub const PROGRAM_SIZE: usize = 256;

/// The position of the opcode field within an encoded instruction.
///
/// The opcode occupies the bits above this position, the register field the
/// two bits directly below it, and the operand byte the low eight bits.
pub const OPCODE_SHIFT: u32 = 10;

/// The position of the register field within an encoded instruction.
pub const REGISTER_SHIFT: u32 = 8;

/// The default number of machine steps the engine will execute along any
/// single path before abandoning the leaf.
pub const DEFAULT_STEP_BUDGET: usize = 100;

/// The default wall-clock budget for a single satisfiability query.
pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(10);

/// The default iteration cap for expression simplification.
///
/// The cap bounds cost only; simplification that reaches it returns the
/// partially-rewritten term.
pub const DEFAULT_SIMPLIFY_STEPS: usize = 1000;

/// The iteration cap used when partially evaluating a term down to an
/// address, immediate, or instruction code.
pub const PARTIAL_EVAL_SIMPLIFY_STEPS: usize = 100;
