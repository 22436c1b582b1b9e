//! This module contains the primary error type for the library's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.
//!
//! # Anyhow
//!
//! All of the errors implement [`std::error::Error`], and hence can be used
//! with `anyhow::Error` internally. It is _not_ recommended to use that error
//! type in the interface of the library, as this forces clients to also use
//! `anyhow`.

pub mod container;
pub mod execution;
pub mod solving;
pub mod tree;
pub mod value;

use thiserror::Error;

/// The interface result type for the library.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by
/// the clients of the library) should be members of this enum.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// Errors from stepping the guest machine.
    #[error(transparent)]
    Execution(#[from] execution::Error),

    /// Errors from the solver translation and driver.
    #[error(transparent)]
    Solving(#[from] solving::Error),

    /// Errors from the state tree.
    #[error(transparent)]
    Tree(#[from] tree::Error),

    /// Errors from concrete values and partial evaluation.
    #[error(transparent)]
    Value(#[from] value::Error),
}

/// A library error with an associated program-memory location.
pub type LocatedError = container::Located<Error>;

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

/// Allow simple conversions from located execution errors by re-wrapping the
/// located error around the more general payload.
impl From<execution::LocatedError> for LocatedError {
    fn from(value: execution::LocatedError) -> Self {
        Self {
            location: value.location,
            payload: Error::from(value.payload),
        }
    }
}
