//! This module contains the machine-state representation: the typed key
//! space, the [`Context`] binding store, and the [`MachineEffects`] interface
//! through which the instruction semantics read and write state.

pub mod concrete;
pub mod context;
pub mod symbolic;

use std::fmt::{Display, Formatter};

use serde::Serialize;

pub use context::{Constraint, Context, Model, Solution};

use crate::{
    error::{execution, value},
    isa::Register,
    value::{
        simplify::{to_concrete_address, Resolution},
        Term,
    },
};

/// A flag of the machine's status word.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Flag {
    /// Execution has stopped; a context with this flag concretely raised is
    /// never stepped again.
    Halted,

    /// The most recent arithmetic instruction overflowed the 32-bit range.
    Overflow,

    /// The most recent division-family instruction had a zero divisor.
    DivisionByZero,

    /// The result of the most recent comparison, consumed by conditional
    /// jumps.
    Condition,
}

/// A location in machine state.
///
/// Keys identify every piece of state an instruction can read or write:
/// the register file, data memory, program memory, the instruction counter
/// and register, and the flags. The ordering is derived so binding stores
/// enumerate deterministically, with data memory in address order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Key {
    /// A general-purpose register.
    Register(Register),

    /// A cell of data memory.
    Address(u8),

    /// A slot of program memory.
    Program(u8),

    /// The instruction counter.
    InstructionCounter,

    /// The instruction register, latched on fetch.
    InstructionRegister,

    /// A status flag.
    Flag(Flag),
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register(register) => write!(f, "{register}"),
            Self::Address(address) => write!(f, "@{address}"),
            Self::Program(slot) => write!(f, "prog[{slot}]"),
            Self::InstructionCounter => write!(f, "ic"),
            Self::InstructionRegister => write!(f, "ir"),
            Self::Flag(flag) => write!(f, "flag({flag:?})"),
        }
    }
}

/// The effectful interface between the instruction semantics and a machine
/// backend.
///
/// The semantics in [`crate::isa::semantics`] are written once against this
/// trait; the concrete simulator and the symbolic forking engine are its two
/// implementations. The shape of the interface is what makes that sharing
/// work:
///
/// - `read` and `write` cover every data operation;
/// - `select` takes *both* continuations of a conditional, so a backend that
///   cannot decide the condition can run each of them against a forked copy
///   of its state;
/// - `resolve_address` concentrates the one data-dependent lookup in the
///   instruction set (indirect loads), which is also the one place backends
///   legitimately differ in how far they can concretize a pointer.
pub trait MachineEffects {
    /// Reads the term bound at `key`, or the integer zero when the key is
    /// unbound.
    fn read(&mut self, key: Key) -> Term;

    /// Writes `value` at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if normalising the value evaluates an ill-typed
    /// operation or a division by zero.
    fn write(&mut self, key: Key, value: Term) -> execution::Result<()>;

    /// Branches on `condition`, running `when_true`, `when_false`, or — in a
    /// forking backend with an undecidable condition — both against
    /// independent copies of the machine state.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the taken continuation(s) fail.
    fn select(
        &mut self,
        condition: Term,
        when_true: &dyn Fn(&mut dyn MachineEffects) -> execution::Result<()>,
        when_false: &dyn Fn(&mut dyn MachineEffects) -> execution::Result<()>,
    ) -> execution::Result<()>;

    /// Resolves a pointer term to a concrete data-memory address, returning
    /// [`None`] when the pointer stays symbolic or lies outside memory.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if evaluating the pointer fails for a reason other
    /// than staying symbolic (for example a division by zero inside it).
    fn resolve_address(&self, pointer: &Term) -> execution::Result<Option<u8>>;
}

/// Partially evaluates an already-resolved pointer term to an address,
/// mapping every "this is not an address" outcome to [`None`].
pub(crate) fn address_of(pointer: &Term) -> execution::Result<Option<u8>> {
    match to_concrete_address(pointer) {
        Ok(Resolution::Known(address)) => Ok(Some(address)),
        Ok(Resolution::Unresolved(_)) => Ok(None),
        Err(
            value::Error::AddressRange { .. }
            | value::Error::WordAddress { .. }
            | value::Error::Type { .. },
        ) => Ok(None),
        Err(other) => Err(other.into()),
    }
}
