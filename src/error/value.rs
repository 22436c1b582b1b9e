//! This module contains errors pertaining to concrete values and to the
//! evaluation of symbolic terms.

use thiserror::Error;

use crate::value::known::KnownValue;

/// Errors that occur when operating on [`KnownValue`]s, or when partially
/// evaluating a [`crate::value::Term`] down to a concrete quantity.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("{operation} is not defined for {value}")]
    Type {
        operation: &'static str,
        value: KnownValue,
    },

    #[error("Division by zero was evaluated on the host")]
    DivisionByZero,

    #[error("Unsigned word {value:#06x} cannot be used as a memory address")]
    WordAddress { value: u16 },

    #[error("{value} is outside the addressable range of memory")]
    AddressRange { value: i32 },

    #[error("Unsigned word {value:#06x} cannot be used as an immediate")]
    WordImmediate { value: u16 },

    #[error("{value} does not fit in the immediate range")]
    ImmediateRange { value: i32 },

    #[error("{value} does not fit in an instruction code")]
    InstructionCodeRange { value: i32 },
}

/// The result type for operations on values and terms.
pub type Result<T> = std::result::Result<T, Error>;
