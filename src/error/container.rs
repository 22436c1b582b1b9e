use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular slot in program memory.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The program-memory slot at which the error occurred.
    pub location: u32,

    /// The error data.
    pub payload: E,
}

/// Displays the error associated with the hexadecimal-encoded program slot at
/// which the error occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[0x{}]: {}",
            hex::encode(self.location.to_be_bytes()),
            self.payload
        )
    }
}

/// A trait for types that can have a program-memory location attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attaches the location described by `slot` (a slot in program memory) to
    /// the error.
    fn locate(self, slot: u32) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, slot: u32) -> Self::Located {
        self.map_err(|e| Located {
            location: slot,
            payload: e,
        })
    }
}
