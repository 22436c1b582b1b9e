//! This module contains errors pertaining to the execution of guest programs,
//! whether by the concrete simulator or by the symbolic engine.

use thiserror::Error;

use crate::{error::container, value::Term};

/// Errors that occur while stepping the machine.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The instruction counter {counter} did not fold to a program address")]
    SymbolicInstructionCounter { counter: Term },

    #[error("The instruction register held {code}, which is not a concrete instruction code")]
    SymbolicInstructionCode { code: Term },

    #[error("No instruction is encoded by {code:#06x}")]
    UnknownInstructionCode { code: u16 },

    #[error("The indirect-load pointer {pointer} does not resolve to a memory address")]
    InvalidIndirectAddress { pointer: Term },

    #[error(transparent)]
    Value(#[from] crate::error::value::Error),
}

/// An execution error with an associated program-memory location.
pub type LocatedError = container::Located<Error>;

/// The result type for methods that may produce execution errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, slot: u32) -> Self::Located {
        container::Located {
            location: slot,
            payload: self,
        }
    }
}
