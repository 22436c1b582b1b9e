//! This module contains the definition of the symbolic [`Term`] and its
//! supporting operations.

pub mod known;
pub mod simplify;

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    sync::Arc,
};

use serde::Serialize;

use crate::{
    error::value::Result,
    value::known::KnownValue,
};

/// A symbolic term over the machine's values.
///
/// A term is either a known scalar, a named free variable, or an operation
/// over sub-terms. Terms are immutable and reference-counted, so rewrites
/// produced by [`simplify`] share every subtree they did not touch.
///
/// Equality, ordering and hashing are structural.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Term {
    data: Arc<TermData>,
}

/// The operations that can appear in a [`Term`].
///
/// Note that these do not duplicate the instruction set 1:1; they are the
/// value-level operations that instruction semantics produce when they write
/// machine state. Control flow never appears here: branching is recorded in
/// path conditions, not in values.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TermData {
    /// A concretely known scalar.
    Const(KnownValue),

    /// A named free variable.
    Var(String),

    /// An lvalue marker wrapping the address-producing term of an indirect
    /// access. It must be eliminated before a term reaches the solver.
    Pointer(Term),

    /// A conditional value.
    Ite {
        condition: Term,
        when_true: Term,
        when_false: Term,
    },

    /// Addition of terms.
    Add { left: Term, right: Term },

    /// Subtraction of terms.
    Sub { left: Term, right: Term },

    /// Multiplication of terms.
    Mul { left: Term, right: Term },

    /// Division of terms.
    Div { dividend: Term, divisor: Term },

    /// Modulo of terms.
    Mod { dividend: Term, divisor: Term },

    /// Absolute value of a term.
    Abs(Term),

    /// Equality of terms.
    Eq { left: Term, right: Term },

    /// Strictly-greater comparison of terms.
    Gt { left: Term, right: Term },

    /// Strictly-less comparison of terms.
    Lt { left: Term, right: Term },

    /// Boolean conjunction of terms.
    And { left: Term, right: Term },

    /// Boolean disjunction of terms.
    Or { left: Term, right: Term },

    /// Boolean negation of a term.
    Not(Term),
}

impl Term {
    /// Constructs a term from raw term data.
    #[must_use]
    pub fn new(data: TermData) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// Constructs a term wrapping a known scalar.
    #[must_use]
    pub fn known(value: KnownValue) -> Self {
        Self::new(TermData::Const(value))
    }

    /// Constructs a signed 32-bit integer constant.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Self::known(KnownValue::Int32(value))
    }

    /// Constructs an unsigned 16-bit word constant.
    #[must_use]
    pub fn word(value: u16) -> Self {
        Self::known(KnownValue::Word16(value))
    }

    /// Constructs a boolean constant.
    #[must_use]
    pub fn truth(value: bool) -> Self {
        Self::known(KnownValue::Bool(value))
    }

    /// Constructs the integer zero, the default contents of machine state.
    #[must_use]
    pub fn zero() -> Self {
        Self::int(0)
    }

    /// Constructs a named free variable.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::new(TermData::Var(name.into()))
    }

    /// Constructs an lvalue marker around `target`.
    #[must_use]
    pub fn pointer(target: Term) -> Self {
        Self::new(TermData::Pointer(target))
    }

    /// Constructs a conditional value.
    #[must_use]
    pub fn ite(condition: Term, when_true: Term, when_false: Term) -> Self {
        Self::new(TermData::Ite {
            condition,
            when_true,
            when_false,
        })
    }

    /// Constructs the sum of two terms.
    #[must_use]
    pub fn add(left: Term, right: Term) -> Self {
        Self::new(TermData::Add { left, right })
    }

    /// Constructs the difference of two terms.
    #[must_use]
    pub fn sub(left: Term, right: Term) -> Self {
        Self::new(TermData::Sub { left, right })
    }

    /// Constructs the product of two terms.
    #[must_use]
    pub fn mul(left: Term, right: Term) -> Self {
        Self::new(TermData::Mul { left, right })
    }

    /// Constructs the quotient of two terms.
    #[must_use]
    pub fn div(dividend: Term, divisor: Term) -> Self {
        Self::new(TermData::Div { dividend, divisor })
    }

    /// Constructs the remainder of two terms.
    #[must_use]
    pub fn modulo(dividend: Term, divisor: Term) -> Self {
        Self::new(TermData::Mod { dividend, divisor })
    }

    /// Constructs the absolute value of a term.
    #[must_use]
    pub fn abs(target: Term) -> Self {
        Self::new(TermData::Abs(target))
    }

    /// Constructs the equality of two terms.
    #[must_use]
    pub fn equals(left: Term, right: Term) -> Self {
        Self::new(TermData::Eq { left, right })
    }

    /// Constructs the strictly-greater comparison of two terms.
    #[must_use]
    pub fn greater(left: Term, right: Term) -> Self {
        Self::new(TermData::Gt { left, right })
    }

    /// Constructs the strictly-less comparison of two terms.
    #[must_use]
    pub fn less(left: Term, right: Term) -> Self {
        Self::new(TermData::Lt { left, right })
    }

    /// Constructs the conjunction of two terms.
    #[must_use]
    pub fn and(left: Term, right: Term) -> Self {
        Self::new(TermData::And { left, right })
    }

    /// Constructs the disjunction of two terms.
    #[must_use]
    pub fn or(left: Term, right: Term) -> Self {
        Self::new(TermData::Or { left, right })
    }

    /// Constructs the negation of a term.
    #[must_use]
    pub fn not(target: Term) -> Self {
        Self::new(TermData::Not(target))
    }

    /// Gets the term's operation data.
    #[must_use]
    pub fn data(&self) -> &TermData {
        &self.data
    }

    /// Gets the known scalar at the root of the term, if there is one.
    #[must_use]
    pub fn as_known(&self) -> Option<&KnownValue> {
        match self.data() {
            TermData::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Checks whether the term is the literal integer zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self.data(), TermData::Const(KnownValue::Int32(0)))
    }

    /// Checks whether the term is the literal boolean `true`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self.data(), TermData::Const(KnownValue::Bool(true)))
    }

    /// Checks whether the term is the literal boolean `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        matches!(self.data(), TermData::Const(KnownValue::Bool(false)))
    }

    /// Interprets the term as a branch condition.
    ///
    /// A term that is not a concrete boolean counts as `true`. This
    /// over-approximation is what lets a backend that cannot consult a
    /// solver still make progress through conditions it cannot decide, and
    /// it must be kept in place for the concrete simulator's conditional
    /// jumps.
    #[must_use]
    pub fn truth_value(&self) -> bool {
        match self.data() {
            TermData::Const(KnownValue::Bool(value)) => *value,
            _ => true,
        }
    }

    /// Attempts to evaluate the term to a known scalar.
    ///
    /// Returns `Ok(Some(_))` exactly when the term contains no variable, no
    /// lvalue marker and no conditional; returns `Ok(None)` when one of
    /// those makes the term irreducibly symbolic.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if evaluation applies an operation to values outside
    /// its domain: arithmetic on a boolean, a connective on a number, or a
    /// division by a zero that path pruning should have excluded.
    pub fn concretize(&self) -> Result<Option<KnownValue>> {
        /// Evaluates a binary node, short-circuiting to `None` if either
        /// side is symbolic.
        fn binary(
            left: &Term,
            right: &Term,
            apply: fn(&KnownValue, &KnownValue) -> Result<KnownValue>,
        ) -> Result<Option<KnownValue>> {
            match (left.concretize()?, right.concretize()?) {
                (Some(left), Some(right)) => apply(&left, &right).map(Some),
                _ => Ok(None),
            }
        }

        match self.data() {
            TermData::Const(value) => Ok(Some(*value)),
            TermData::Var(_) | TermData::Pointer(_) | TermData::Ite { .. } => Ok(None),
            TermData::Add { left, right } => binary(left, right, KnownValue::add),
            TermData::Sub { left, right } => binary(left, right, KnownValue::sub),
            TermData::Mul { left, right } => binary(left, right, KnownValue::mul),
            TermData::Div { dividend, divisor } => binary(dividend, divisor, KnownValue::div),
            TermData::Mod { dividend, divisor } => binary(dividend, divisor, KnownValue::modulo),
            TermData::Abs(target) => Ok(match target.concretize()? {
                Some(value) => Some(value.abs()?),
                None => None,
            }),
            TermData::Eq { left, right } => binary(left, right, KnownValue::equals),
            TermData::Gt { left, right } => binary(left, right, KnownValue::greater),
            TermData::Lt { left, right } => binary(left, right, KnownValue::less),
            TermData::And { left, right } => binary(left, right, KnownValue::and),
            TermData::Or { left, right } => binary(left, right, KnownValue::or),
            TermData::Not(target) => Ok(match target.concretize()? {
                Some(value) => Some(value.not()?),
                None => None,
            }),
        }
    }

    /// Replaces every occurrence of the variable called `name` with
    /// `replacement`, returning the rewritten term.
    ///
    /// Subtrees that do not mention the variable are shared with the
    /// original term rather than copied.
    #[must_use]
    pub fn substitute(&self, name: &str, replacement: &Term) -> Term {
        let rebuild2 = |left: &Term, right: &Term, make: fn(Term, Term) -> Term| {
            let new_left = left.substitute(name, replacement);
            let new_right = right.substitute(name, replacement);
            if new_left == *left && new_right == *right {
                self.clone()
            } else {
                make(new_left, new_right)
            }
        };
        let rebuild1 = |target: &Term, make: fn(Term) -> Term| {
            let new_target = target.substitute(name, replacement);
            if new_target == *target {
                self.clone()
            } else {
                make(new_target)
            }
        };

        match self.data() {
            TermData::Const(_) => self.clone(),
            TermData::Var(candidate) => {
                if candidate == name {
                    replacement.clone()
                } else {
                    self.clone()
                }
            }
            TermData::Pointer(target) => rebuild1(target, Term::pointer),
            TermData::Ite {
                condition,
                when_true,
                when_false,
            } => {
                let new_condition = condition.substitute(name, replacement);
                let new_true = when_true.substitute(name, replacement);
                let new_false = when_false.substitute(name, replacement);
                if new_condition == *condition && new_true == *when_true && new_false == *when_false
                {
                    self.clone()
                } else {
                    Term::ite(new_condition, new_true, new_false)
                }
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

    /// Collects the names of the free variables mentioned by the term into
    /// `names`.
    pub fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self.data() {
            TermData::Const(_) => {}
            TermData::Var(name) => {
                names.insert(name.clone());
            }
            TermData::Pointer(target) | TermData::Abs(target) | TermData::Not(target) => {
                target.collect_variables(names);
            }
            TermData::Ite {
                condition,
                when_true,
                when_false,
            } => {
                condition.collect_variables(names);
                when_true.collect_variables(names);
                when_false.collect_variables(names);
            }
            TermData::Add { left, right }
            | TermData::Sub { left, right }
            | TermData::Mul { left, right }
            | TermData::Eq { left, right }
            | TermData::Gt { left, right }
            | TermData::Lt { left, right }
            | TermData::And { left, right }
            | TermData::Or { left, right } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            TermData::Div { dividend, divisor } | TermData::Mod { dividend, divisor } => {
                dividend.collect_variables(names);
                divisor.collect_variables(names);
            }
        }
    }

    /// Gets the names of the free variables mentioned by the term.
    #[must_use]
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }
}

impl From<KnownValue> for Term {
    fn from(value: KnownValue) -> Self {
        Self::known(value)
    }
}

/// Pretty-prints the term in a compact infix form to aid in debugging and in
/// error reporting.
impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.data() {
            TermData::Const(value) => write!(f, "{value}"),
            TermData::Var(name) => write!(f, "{name}"),
            TermData::Pointer(target) => write!(f, "ptr({target})"),
            TermData::Ite {
                condition,
                when_true,
                when_false,
            } => write!(f, "(if {condition} then {when_true} else {when_false})"),
            TermData::Add { left, right } => write!(f, "({left} + {right})"),
            TermData::Sub { left, right } => write!(f, "({left} - {right})"),
            TermData::Mul { left, right } => write!(f, "({left} * {right})"),
            TermData::Div { dividend, divisor } => write!(f, "({dividend} / {divisor})"),
            TermData::Mod { dividend, divisor } => write!(f, "({dividend} % {divisor})"),
            TermData::Abs(target) => write!(f, "|{target}|"),
            TermData::Eq { left, right } => write!(f, "({left} == {right})"),
            TermData::Gt { left, right } => write!(f, "({left} > {right})"),
            TermData::Lt { left, right } => write!(f, "({left} < {right})"),
            TermData::And { left, right } => write!(f, "({left} && {right})"),
            TermData::Or { left, right } => write!(f, "({left} || {right})"),
            TermData::Not(target) => write!(f, "!{target}"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::value::{known::KnownValue, Term};

    #[test]
    fn concretizes_closed_terms() -> anyhow::Result<()> {
        let term = Term::mul(Term::add(Term::int(2), Term::int(3)), Term::int(4));

        assert_eq!(term.concretize()?, Some(KnownValue::Int32(20)));

        Ok(())
    }

    #[test]
    fn refuses_to_concretize_open_terms() -> anyhow::Result<()> {
        let open = Term::add(Term::int(1), Term::var("x"));
        assert_eq!(open.concretize()?, None);

        let conditional = Term::ite(Term::truth(true), Term::int(1), Term::int(2));
        assert_eq!(conditional.concretize()?, None);

        let marked = Term::pointer(Term::int(7));
        assert_eq!(marked.concretize()?, None);

        Ok(())
    }

    #[test]
    fn substitution_rewrites_only_the_named_variable() {
        let term = Term::add(Term::var("x"), Term::var("y"));
        let rewritten = term.substitute("x", &Term::int(5));

        assert_eq!(rewritten, Term::add(Term::int(5), Term::var("y")));
        // The untouched variable is still free.
        assert!(rewritten.free_variables().contains("y"));
        assert!(!rewritten.free_variables().contains("x"));
    }

    #[test]
    fn substitution_shares_untouched_subtrees() {
        let shared = Term::mul(Term::var("y"), Term::int(3));
        let term = Term::add(Term::var("x"), shared.clone());
        let rewritten = term.substitute("x", &Term::int(1));

        match rewritten.data() {
            super::TermData::Add { right, .. } => assert_eq!(right, &shared),
            _ => panic!("substitution changed the term shape"),
        }
    }

    #[test]
    fn collects_free_variables_across_operations() {
        let term = Term::and(
            Term::equals(Term::var("a"), Term::int(0)),
            Term::less(Term::var("b"), Term::abs(Term::var("c"))),
        );

        let names = term.free_variables();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn non_concrete_conditions_count_as_true() {
        assert!(Term::var("cond").truth_value());
        assert!(Term::truth(true).truth_value());
        assert!(!Term::truth(false).truth_value());
    }
}
