//! This module contains the definition of [`KnownValue`], the type of data
//! whose value is concretely known during execution.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::error::value::{Error, Result};

/// A scalar whose value is concretely known.
///
/// The machine is 32-bit: general arithmetic happens on signed 32-bit
/// integers, while encoded instructions are unsigned 16-bit words and the
/// flags are booleans. Arithmetic on like-typed integer variants stays in
/// that variant; mixing a word with an integer promotes the word to an
/// integer. Any arithmetic involving a boolean is a type error.
///
/// Integer arithmetic wraps on overflow. Overflow detection is the
/// responsibility of the instruction semantics, which record a closed-form
/// overflow predicate alongside every arithmetic result.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum KnownValue {
    /// A signed 32-bit integer, the machine's general data type.
    Int32(i32),

    /// An unsigned 16-bit word, the machine's instruction-code type.
    Word16(u16),

    /// A boolean, the type of the machine's flags.
    Bool(bool),
}

impl KnownValue {
    /// Gets the boolean carried by this value, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Adds `other` to this value, promoting words to integers when the
    /// variants are mixed.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is a boolean.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.arithmetic(other, "addition", i32::wrapping_add, u16::wrapping_add)
    }

    /// Subtracts `other` from this value.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is a boolean.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.arithmetic(other, "subtraction", i32::wrapping_sub, u16::wrapping_sub)
    }

    /// Multiplies this value by `other`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is a boolean.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.arithmetic(other, "multiplication", i32::wrapping_mul, u16::wrapping_mul)
    }

    /// Divides this value by `other` using Euclidean division, matching the
    /// `div` operation of the solver's integer theory.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is a boolean, or if `other` is zero.
    pub fn div(&self, other: &Self) -> Result<Self> {
        self.guard_nonzero(other)?;
        self.arithmetic(
            other,
            "division",
            i32::wrapping_div_euclid,
            u16::wrapping_div_euclid,
        )
    }

    /// Takes this value modulo `other` using the Euclidean remainder,
    /// matching the `mod` operation of the solver's integer theory.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is a boolean, or if `other` is zero.
    pub fn modulo(&self, other: &Self) -> Result<Self> {
        self.guard_nonzero(other)?;
        self.arithmetic(
            other,
            "modulo",
            i32::wrapping_rem_euclid,
            u16::wrapping_rem_euclid,
        )
    }

    /// Computes the absolute value.
    ///
    /// Words are unsigned and are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is a boolean.
    pub fn abs(&self) -> Result<Self> {
        match self {
            Self::Int32(value) => Ok(Self::Int32(value.wrapping_abs())),
            Self::Word16(value) => Ok(Self::Word16(*value)),
            Self::Bool(_) => Err(self.type_error("absolute value")),
        }
    }

    /// Compares this value with `other` for equality.
    ///
    /// Integers and words compare numerically after promotion; booleans
    /// compare with booleans only.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a boolean is compared with a numeric value.
    pub fn equals(&self, other: &Self) -> Result<Self> {
        match (self, other) {
            (Self::Bool(left), Self::Bool(right)) => Ok(Self::Bool(left == right)),
            (Self::Bool(_), _) | (_, Self::Bool(_)) => {
                Err(self.first_bool(other).type_error("equality"))
            }
            _ => {
                let (left, right) = self.promoted(other);
                Ok(Self::Bool(left == right))
            }
        }
    }

    /// Checks whether this value is numerically greater than `other`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is a boolean.
    pub fn greater(&self, other: &Self) -> Result<Self> {
        self.comparison(other, "ordering", |left, right| left > right)
    }

    /// Checks whether this value is numerically less than `other`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is a boolean.
    pub fn less(&self, other: &Self) -> Result<Self> {
        self.comparison(other, "ordering", |left, right| left < right)
    }

    /// Computes the conjunction of two booleans.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is not a boolean.
    pub fn and(&self, other: &Self) -> Result<Self> {
        self.connective(other, "conjunction", |left, right| left && right)
    }

    /// Computes the disjunction of two booleans.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is not a boolean.
    pub fn or(&self, other: &Self) -> Result<Self> {
        self.connective(other, "disjunction", |left, right| left || right)
    }

    /// Computes the negation of a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a boolean.
    pub fn not(&self) -> Result<Self> {
        match self {
            Self::Bool(value) => Ok(Self::Bool(!value)),
            _ => Err(self.type_error("negation")),
        }
    }

    /// Applies a binary arithmetic operation after variant promotion.
    fn arithmetic(
        &self,
        other: &Self,
        operation: &'static str,
        on_ints: fn(i32, i32) -> i32,
        on_words: fn(u16, u16) -> u16,
    ) -> Result<Self> {
        match (self, other) {
            (Self::Int32(left), Self::Int32(right)) => Ok(Self::Int32(on_ints(*left, *right))),
            (Self::Word16(left), Self::Word16(right)) => Ok(Self::Word16(on_words(*left, *right))),
            (Self::Int32(left), Self::Word16(right)) => {
                Ok(Self::Int32(on_ints(*left, i32::from(*right))))
            }
            (Self::Word16(left), Self::Int32(right)) => {
                Ok(Self::Int32(on_ints(i32::from(*left), *right)))
            }
            _ => Err(self.first_bool(other).type_error(operation)),
        }
    }

    /// Applies a numeric comparison after variant promotion.
    fn comparison(
        &self,
        other: &Self,
        operation: &'static str,
        compare: fn(i32, i32) -> bool,
    ) -> Result<Self> {
        match (self, other) {
            (Self::Bool(_), _) | (_, Self::Bool(_)) => {
                Err(self.first_bool(other).type_error(operation))
            }
            _ => {
                let (left, right) = self.promoted(other);
                Ok(Self::Bool(compare(left, right)))
            }
        }
    }

    /// Applies a boolean connective.
    fn connective(
        &self,
        other: &Self,
        operation: &'static str,
        combine: fn(bool, bool) -> bool,
    ) -> Result<Self> {
        match (self, other) {
            (Self::Bool(left), Self::Bool(right)) => Ok(Self::Bool(combine(*left, *right))),
            (Self::Bool(_), offender) | (offender, _) => Err(offender.type_error(operation)),
        }
    }

    /// Widens both operands to `i32`, assuming neither is a boolean.
    fn promoted(&self, other: &Self) -> (i32, i32) {
        let widen = |value: &Self| match value {
            Self::Int32(v) => *v,
            Self::Word16(v) => i32::from(*v),
            Self::Bool(_) => unreachable!("booleans are rejected before promotion"),
        };
        (widen(self), widen(other))
    }

    /// Picks whichever of the two operands is a boolean, preferring the left.
    fn first_bool(&self, other: &Self) -> &Self {
        if matches!(self, Self::Bool(_)) {
            self
        } else {
            other
        }
    }

    /// Rejects a zero divisor.
    fn guard_nonzero(&self, divisor: &Self) -> Result<()> {
        match divisor {
            Self::Int32(0) | Self::Word16(0) => Err(Error::DivisionByZero),
            _ => Ok(()),
        }
    }

    fn type_error(&self, operation: &'static str) -> Error {
        Error::Type {
            operation,
            value: *self,
        }
    }
}

impl From<i32> for KnownValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<u16> for KnownValue {
    fn from(value: u16) -> Self {
        Self::Word16(value)
    }
}

impl From<bool> for KnownValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Pretty-prints the value in a form that matches its variant: integers in
/// decimal, words in hexadecimal, booleans as keywords.
impl Display for KnownValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int32(value) => write!(f, "{value}"),
            Self::Word16(value) => write!(f, "{value:#06x}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{error::value::Error, value::known::KnownValue};

    #[test]
    fn promotes_words_when_mixed_with_integers() -> anyhow::Result<()> {
        let int = KnownValue::Int32(-3);
        let word = KnownValue::Word16(10);

        assert_eq!(int.add(&word)?, KnownValue::Int32(7));
        assert_eq!(word.add(&int)?, KnownValue::Int32(7));
        assert_eq!(word.add(&KnownValue::Word16(2))?, KnownValue::Word16(12));

        Ok(())
    }

    #[test]
    fn multiplication_is_multiplication() -> anyhow::Result<()> {
        // Multiplication must not degenerate into addition.
        let left = KnownValue::Int32(6);
        let right = KnownValue::Int32(7);

        assert_eq!(left.mul(&right)?, KnownValue::Int32(42));
        assert_ne!(left.mul(&right)?, left.add(&right)?);

        Ok(())
    }

    #[test]
    fn rejects_arithmetic_on_booleans() {
        let flag = KnownValue::Bool(true);
        let int = KnownValue::Int32(1);

        assert!(matches!(flag.add(&int), Err(Error::Type { .. })));
        assert!(matches!(int.mul(&flag), Err(Error::Type { .. })));
        assert!(matches!(flag.greater(&int), Err(Error::Type { .. })));
        assert!(matches!(int.equals(&flag), Err(Error::Type { .. })));
    }

    #[test]
    fn division_is_euclidean_and_guards_zero() -> anyhow::Result<()> {
        let dividend = KnownValue::Int32(-7);
        let divisor = KnownValue::Int32(2);

        // Euclidean semantics: the remainder is never negative.
        assert_eq!(dividend.div(&divisor)?, KnownValue::Int32(-4));
        assert_eq!(dividend.modulo(&divisor)?, KnownValue::Int32(1));

        let zero = KnownValue::Int32(0);
        assert_eq!(dividend.div(&zero), Err(Error::DivisionByZero));
        assert_eq!(dividend.modulo(&zero), Err(Error::DivisionByZero));

        Ok(())
    }

    #[test]
    fn division_overflow_wraps() -> anyhow::Result<()> {
        let dividend = KnownValue::Int32(i32::MIN);
        let divisor = KnownValue::Int32(-1);

        // The overflow flag is recorded by the semantics; the raw value
        // wraps rather than trapping the host.
        assert_eq!(dividend.div(&divisor)?, KnownValue::Int32(i32::MIN));

        Ok(())
    }
}
