//! This module contains the simplification pipeline for symbolic terms:
//! constant folding, one-step algebraic reduction, and the partial
//! evaluators that turn terms into addresses, immediates and instruction
//! codes.

use crate::{
    constant::PARTIAL_EVAL_SIMPLIFY_STEPS,
    error::value::{Error, Result},
    value::{known::KnownValue, Term, TermData},
};

/// The outcome of partially evaluating a term down to a concrete quantity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution<T> {
    /// The term evaluated to a concrete quantity.
    Known(T),

    /// The term remained symbolic; the simplified form is returned so the
    /// caller can report it.
    Unresolved(Term),
}

/// Folds every fully-concrete subterm of `term` into a constant.
///
/// A subterm folds exactly when it contains no variable, no lvalue marker
/// and no conditional; anything above such an obstruction is rebuilt around
/// the folded children.
///
/// # Errors
///
/// Returns [`Err`] if folding evaluates an ill-typed operation or a division
/// by zero.
pub fn fold_constants(term: &Term) -> Result<Term> {
    if let Some(value) = term.concretize()? {
        return Ok(Term::known(value));
    }

    let rebuild2 = |left: &Term, right: &Term, make: fn(Term, Term) -> Term| -> Result<Term> {
        let new_left = fold_constants(left)?;
        let new_right = fold_constants(right)?;
        Ok(if new_left == *left && new_right == *right {
            term.clone()
        } else {
            make(new_left, new_right)
        })
    };
    let rebuild1 = |target: &Term, make: fn(Term) -> Term| -> Result<Term> {
        let new_target = fold_constants(target)?;
        Ok(if new_target == *target {
            term.clone()
        } else {
            make(new_target)
        })
    };

    match term.data() {
        TermData::Const(_) | TermData::Var(_) => Ok(term.clone()),
        TermData::Pointer(target) => rebuild1(target, Term::pointer),
        TermData::Ite {
            condition,
            when_true,
            when_false,
        } => {
            let new_condition = fold_constants(condition)?;
            let new_true = fold_constants(when_true)?;
            let new_false = fold_constants(when_false)?;
            Ok(
                if new_condition == *condition
                    && new_true == *when_true
                    && new_false == *when_false
                {
                    term.clone()
                } else {
                    Term::ite(new_condition, new_true, new_false)
                },
            )
        }
        TermData::Add { left, right } => rebuild2(left, right, Term::add),
        TermData::Sub { left, right } => rebuild2(left, right, Term::sub),
        TermData::Mul { left, right } => rebuild2(left, right, Term::mul),
        TermData::Div { dividend, divisor } => rebuild2(dividend, divisor, Term::div),
        TermData::Mod { dividend, divisor } => rebuild2(dividend, divisor, Term::modulo),
        TermData::Abs(target) => rebuild1(target, Term::abs),
        TermData::Eq { left, right } => rebuild2(left, right, Term::equals),
        TermData::Gt { left, right } => rebuild2(left, right, Term::greater),
        TermData::Lt { left, right } => rebuild2(left, right, Term::less),
        TermData::And { left, right } => rebuild2(left, right, Term::and),
        TermData::Or { left, right } => rebuild2(left, right, Term::or),
        TermData::Not(target) => rebuild1(target, Term::not),
    }
}

/// Applies one parallel step of the algebraic rewrite rules, reducing the
/// children of `term` first and then the rewritten node itself.
///
/// The rules are unit elimination for addition, subtraction, conjunction and
/// disjunction, constant collapse for addition and subtraction, and the
/// literal-zero comparisons. Everything else is structural recursion.
///
/// # Errors
///
/// Returns [`Err`] if a constant collapse evaluates an ill-typed operation.
pub fn reduce_once(term: &Term) -> Result<Term> {
    match term.data() {
        TermData::Add { left, right } => {
            let left = reduce_once(left)?;
            let right = reduce_once(right)?;
            if left.is_zero() {
                Ok(right)
            } else if right.is_zero() {
                Ok(left)
            } else if let (Some(l), Some(r)) = (left.as_known(), right.as_known()) {
                Ok(Term::known(l.add(r)?))
            } else {
                Ok(Term::add(left, right))
            }
        }
        TermData::Sub { left, right } => {
            let left = reduce_once(left)?;
            let right = reduce_once(right)?;
            if right.is_zero() {
                Ok(left)
            } else if let (Some(l), Some(r)) = (left.as_known(), right.as_known()) {
                Ok(Term::known(l.sub(r)?))
            } else {
                Ok(Term::sub(left, right))
            }
        }
        TermData::And { left, right } => {
            let left = reduce_once(left)?;
            let right = reduce_once(right)?;
            if left.is_true() {
                Ok(right)
            } else if right.is_true() {
                Ok(left)
            } else {
                Ok(Term::and(left, right))
            }
        }
        TermData::Or { left, right } => {
            let left = reduce_once(left)?;
            let right = reduce_once(right)?;
            if left.is_false() {
                Ok(right)
            } else if right.is_false() {
                Ok(left)
            } else {
                Ok(Term::or(left, right))
            }
        }
        TermData::Eq { left, right } => {
            let left = reduce_once(left)?;
            let right = reduce_once(right)?;
            if left.is_zero() && right.is_zero() {
                Ok(Term::truth(true))
            } else {
                Ok(Term::equals(left, right))
            }
        }
        TermData::Gt { left, right } => {
            let left = reduce_once(left)?;
            let right = reduce_once(right)?;
            if left.is_zero() && right.is_zero() {
                Ok(Term::truth(false))
            } else {
                Ok(Term::greater(left, right))
            }
        }
        TermData::Lt { left, right } => {
            let left = reduce_once(left)?;
            let right = reduce_once(right)?;
            if left.is_zero() && right.is_zero() {
                Ok(Term::truth(false))
            } else {
                Ok(Term::less(left, right))
            }
        }
        TermData::Const(_) | TermData::Var(_) => Ok(term.clone()),
        TermData::Pointer(target) => Ok(Term::pointer(reduce_once(target)?)),
        TermData::Ite {
            condition,
            when_true,
            when_false,
        } => Ok(Term::ite(
            reduce_once(condition)?,
            reduce_once(when_true)?,
            reduce_once(when_false)?,
        )),
        TermData::Mul { left, right } => Ok(Term::mul(reduce_once(left)?, reduce_once(right)?)),
        TermData::Div { dividend, divisor } => {
            Ok(Term::div(reduce_once(dividend)?, reduce_once(divisor)?))
        }
        TermData::Mod { dividend, divisor } => {
            Ok(Term::modulo(reduce_once(dividend)?, reduce_once(divisor)?))
        }
        TermData::Abs(target) => Ok(Term::abs(reduce_once(target)?)),
        TermData::Not(target) => Ok(Term::not(reduce_once(target)?)),
    }
}

/// Simplifies `term` by iterating reduction and folding until a fixed point
/// is reached or `max_steps` iterations have run.
///
/// The iteration cap bounds cost, not correctness: a term that hits the cap
/// is returned in its partially-rewritten form.
///
/// # Errors
///
/// Returns [`Err`] if any rewrite evaluates an ill-typed operation or a
/// division by zero.
pub fn simplify(max_steps: usize, term: &Term) -> Result<Term> {
    let mut current = term.clone();
    for _ in 0..max_steps {
        let next = fold_constants(&reduce_once(&current)?)?;
        if next == current {
            break;
        }
        current = next;
    }
    Ok(current)
}

/// Conjoins the given terms, seeding the fold with `true`.
#[must_use]
pub fn conjoin(terms: impl IntoIterator<Item = Term>) -> Term {
    terms.into_iter().fold(Term::truth(true), Term::and)
}

/// Disjoins the given terms, seeding the fold with `false`.
#[must_use]
pub fn disjoin(terms: impl IntoIterator<Item = Term>) -> Term {
    terms.into_iter().fold(Term::truth(false), Term::or)
}

/// Partially evaluates `term` to a data-memory address.
///
/// # Errors
///
/// Returns [`Err`] if the term evaluates to an unsigned word (words are not
/// usable as addresses), to a boolean, or to an integer outside the
/// addressable range.
pub fn to_concrete_address(term: &Term) -> Result<Resolution<u8>> {
    let simplified = simplify(PARTIAL_EVAL_SIMPLIFY_STEPS, term)?;
    match simplified.as_known() {
        Some(KnownValue::Int32(value)) => u8::try_from(*value)
            .map(Resolution::Known)
            .map_err(|_| Error::AddressRange { value: *value }),
        Some(KnownValue::Word16(value)) => Err(Error::WordAddress { value: *value }),
        Some(KnownValue::Bool(_)) => Err(Error::Type {
            operation: "addressing",
            value: KnownValue::Bool(true),
        }),
        None => Ok(Resolution::Unresolved(simplified)),
    }
}

/// Partially evaluates `term` to a signed immediate.
///
/// # Errors
///
/// Returns [`Err`] if the term evaluates to an unsigned word, to a boolean,
/// or to an integer outside the immediate range.
pub fn to_immediate(term: &Term) -> Result<Resolution<i8>> {
    let simplified = simplify(PARTIAL_EVAL_SIMPLIFY_STEPS, term)?;
    match simplified.as_known() {
        Some(KnownValue::Int32(value)) => i8::try_from(*value)
            .map(Resolution::Known)
            .map_err(|_| Error::ImmediateRange { value: *value }),
        Some(KnownValue::Word16(value)) => Err(Error::WordImmediate { value: *value }),
        Some(KnownValue::Bool(_)) => Err(Error::Type {
            operation: "immediate conversion",
            value: KnownValue::Bool(true),
        }),
        None => Ok(Resolution::Unresolved(simplified)),
    }
}

/// Partially evaluates `term` to an instruction code.
///
/// Words are instruction codes directly; integers convert when they fit.
///
/// # Errors
///
/// Returns [`Err`] if the term evaluates to a boolean or to an integer
/// outside the 16-bit code range.
pub fn to_instruction_code(term: &Term) -> Result<Resolution<u16>> {
    let simplified = simplify(PARTIAL_EVAL_SIMPLIFY_STEPS, term)?;
    match simplified.as_known() {
        Some(KnownValue::Word16(value)) => Ok(Resolution::Known(*value)),
        Some(KnownValue::Int32(value)) => u16::try_from(*value)
            .map(Resolution::Known)
            .map_err(|_| Error::InstructionCodeRange { value: *value }),
        Some(KnownValue::Bool(_)) => Err(Error::Type {
            operation: "instruction decoding",
            value: KnownValue::Bool(true),
        }),
        None => Ok(Resolution::Unresolved(simplified)),
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::value::Error,
        value::{
            simplify::{
                conjoin, fold_constants, reduce_once, simplify, to_concrete_address,
                to_immediate, to_instruction_code, Resolution,
            },
            Term,
        },
    };

    #[test]
    fn folds_concrete_subterms_under_symbolic_roots() -> anyhow::Result<()> {
        let term = Term::mul(Term::var("x"), Term::mul(Term::int(2), Term::int(3)));
        let folded = fold_constants(&term)?;

        assert_eq!(folded, Term::mul(Term::var("x"), Term::int(6)));

        Ok(())
    }

    #[test]
    fn eliminates_additive_and_boolean_units() -> anyhow::Result<()> {
        let sum = Term::add(Term::zero(), Term::var("x"));
        assert_eq!(reduce_once(&sum)?, Term::var("x"));

        let difference = Term::sub(Term::var("x"), Term::zero());
        assert_eq!(reduce_once(&difference)?, Term::var("x"));

        let conjunction = Term::and(Term::truth(true), Term::var("p"));
        assert_eq!(reduce_once(&conjunction)?, Term::var("p"));

        let disjunction = Term::or(Term::var("p"), Term::truth(false));
        assert_eq!(reduce_once(&disjunction)?, Term::var("p"));

        Ok(())
    }

    #[test]
    fn rewrites_literal_zero_comparisons() -> anyhow::Result<()> {
        assert_eq!(
            reduce_once(&Term::equals(Term::zero(), Term::zero()))?,
            Term::truth(true)
        );
        assert_eq!(
            reduce_once(&Term::greater(Term::zero(), Term::zero()))?,
            Term::truth(false)
        );
        assert_eq!(
            reduce_once(&Term::less(Term::zero(), Term::zero()))?,
            Term::truth(false)
        );

        Ok(())
    }

    #[test]
    fn simplification_reaches_a_fixed_point() -> anyhow::Result<()> {
        let term = Term::add(
            Term::add(Term::zero(), Term::var("x")),
            Term::sub(Term::int(5), Term::int(5)),
        );

        let once = simplify(1000, &term)?;
        let twice = simplify(1000, &once)?;

        assert_eq!(once, Term::var("x"));
        assert_eq!(once, twice);

        Ok(())
    }

    #[test]
    fn folding_round_trips_with_concretization() -> anyhow::Result<()> {
        let closed = Term::sub(Term::mul(Term::int(6), Term::int(7)), Term::int(2));

        let value = closed.concretize()?.expect("term is closed");
        assert_eq!(simplify(1000, &closed)?, Term::known(value));

        Ok(())
    }

    #[test]
    fn conjoin_keeps_operands_in_order() -> anyhow::Result<()> {
        let folded = conjoin([Term::var("a"), Term::var("b")]);
        let simplified = simplify(1000, &folded)?;

        assert_eq!(simplified, Term::and(Term::var("a"), Term::var("b")));

        Ok(())
    }

    #[test]
    fn resolves_addresses_within_memory() -> anyhow::Result<()> {
        let in_range = Term::add(Term::int(40), Term::int(2));
        assert_eq!(to_concrete_address(&in_range)?, Resolution::Known(42));

        let out_of_range = Term::int(300);
        assert_eq!(
            to_concrete_address(&out_of_range),
            Err(Error::AddressRange { value: 300 })
        );

        let word = Term::word(3);
        assert_eq!(
            to_concrete_address(&word),
            Err(Error::WordAddress { value: 3 })
        );

        let symbolic = Term::add(Term::var("p"), Term::int(1));
        assert!(matches!(
            to_concrete_address(&symbolic)?,
            Resolution::Unresolved(_)
        ));

        Ok(())
    }

    #[test]
    fn resolves_immediates_and_instruction_codes() -> anyhow::Result<()> {
        assert_eq!(to_immediate(&Term::int(-128))?, Resolution::Known(-128));
        assert_eq!(
            to_immediate(&Term::int(128)),
            Err(Error::ImmediateRange { value: 128 })
        );

        assert_eq!(
            to_instruction_code(&Term::word(0x0456))?,
            Resolution::Known(0x0456)
        );
        assert_eq!(to_instruction_code(&Term::int(7))?, Resolution::Known(7));
        assert_eq!(
            to_instruction_code(&Term::int(-1)),
            Err(Error::InstructionCodeRange { value: -1 })
        );

        Ok(())
    }
}
