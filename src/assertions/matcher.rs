// Matcher constructors are routinely passed straight into `ensure_that`.
#![allow(clippy::must_use_candidate)]

//! Composable value matchers for [`ensure_that`](super::ensure_that).
//!
//! A [`Matcher`] answers whether a value is acceptable and can say, in
//! words, what it wanted and why a value fell short. Those words become the
//! expected value and the message of the resulting assertion failure.
//!
//! - ordering: [`eq`], [`gt`], [`ge`], [`lt`], [`le`]
//! - text: [`contains_str`]
//! - ad hoc: [`satisfies`]
//! - combinators: [`all_of`], [`all_of_boxed`], [`any_of`], [`not`]
//!
//! ```rust
//! use deferunit::assertions::matcher::{all_of, all_of_boxed, eq, gt, lt, not, Matcher};
//!
//! assert!(eq(42).matches(&42));
//! assert!(all_of(vec![gt(0), gt(10)]).matches(&50));
//! assert!(not(eq(0)).matches(&1));
//!
//! let mixed: Vec<Box<dyn Matcher<i32>>> = vec![Box::new(gt(0)), Box::new(lt(100))];
//! assert!(all_of_boxed(mixed).matches(&50));
//! ```

use std::cmp::Ordering;
use std::fmt::Debug;

/// A predicate over values that can explain itself.
///
/// ```rust
/// use deferunit::assertions::matcher::Matcher;
///
/// struct IsEven;
///
/// impl Matcher<i32> for IsEven {
///     fn matches(&self, value: &i32) -> bool {
///         value % 2 == 0
///     }
///
///     fn describe(&self) -> String {
///         "is even".to_string()
///     }
///
///     fn describe_mismatch(&self, value: &i32) -> String {
///         format!("{value} is odd")
///     }
/// }
///
/// assert!(IsEven.matches(&4));
/// assert_eq!(IsEven.describe_mismatch(&3), "3 is odd");
/// ```
pub trait Matcher<T: ?Sized> {
    /// Returns `true` if `value` is acceptable.
    fn matches(&self, value: &T) -> bool;

    /// What an acceptable value looks like.
    fn describe(&self) -> String;

    /// Why `value` is not acceptable.
    fn describe_mismatch(&self, value: &T) -> String;
}

impl<T: ?Sized> Matcher<T> for Box<dyn Matcher<T>> {
    fn matches(&self, value: &T) -> bool {
        (**self).matches(value)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn describe_mismatch(&self, value: &T) -> String {
        (**self).describe_mismatch(value)
    }
}

// =============================================================================
// Equality and ordering
// =============================================================================

/// The relation a [`Compare`] matcher checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Relation {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Relation {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        let Some(ordering) = ordering else {
            return false;
        };
        match self {
            Relation::Greater => ordering == Ordering::Greater,
            Relation::GreaterOrEqual => ordering != Ordering::Less,
            Relation::Less => ordering == Ordering::Less,
            Relation::LessOrEqual => ordering != Ordering::Greater,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            Relation::Greater => "greater than",
            Relation::GreaterOrEqual => "at least",
            Relation::Less => "less than",
            Relation::LessOrEqual => "at most",
        }
    }
}

/// Matcher comparing values against a bound.
pub struct Compare<T> {
    bound: T,
    relation: Relation,
}

impl<T: PartialOrd + Debug> Matcher<T> for Compare<T> {
    fn matches(&self, value: &T) -> bool {
        self.relation.holds(value.partial_cmp(&self.bound))
    }

    fn describe(&self) -> String {
        format!("{} {:?}", self.relation.phrase(), self.bound)
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{value:?} is not {} {:?}", self.relation.phrase(), self.bound)
    }
}

fn compare<T>(bound: T, relation: Relation) -> Compare<T> {
    Compare { bound, relation }
}

/// Matches values equal to `expected`.
pub fn eq<T: PartialEq + Debug>(expected: T) -> Equals<T> {
    Equals { expected }
}

/// Equality matcher.
pub struct Equals<T> {
    expected: T,
}

impl<T: PartialEq + Debug> Matcher<T> for Equals<T> {
    fn matches(&self, value: &T) -> bool {
        value == &self.expected
    }

    fn describe(&self) -> String {
        format!("equal to {:?}", self.expected)
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{value:?} is not equal to {:?}", self.expected)
    }
}

/// Matches values greater than `bound`.
pub fn gt<T: PartialOrd + Debug>(bound: T) -> Compare<T> {
    compare(bound, Relation::Greater)
}

/// Matches values greater than or equal to `bound`.
pub fn ge<T: PartialOrd + Debug>(bound: T) -> Compare<T> {
    compare(bound, Relation::GreaterOrEqual)
}

/// Matches values less than `bound`.
pub fn lt<T: PartialOrd + Debug>(bound: T) -> Compare<T> {
    compare(bound, Relation::Less)
}

/// Matches values less than or equal to `bound`.
pub fn le<T: PartialOrd + Debug>(bound: T) -> Compare<T> {
    compare(bound, Relation::LessOrEqual)
}

// =============================================================================
// Text and predicates
// =============================================================================

/// Matches text containing `needle`, as `str` or `String`.
pub fn contains_str(needle: &str) -> Contains {
    Contains {
        needle: needle.to_string(),
    }
}

/// Substring matcher.
pub struct Contains {
    needle: String,
}

impl Matcher<str> for Contains {
    fn matches(&self, value: &str) -> bool {
        value.contains(self.needle.as_str())
    }

    fn describe(&self) -> String {
        format!("contains {:?}", self.needle)
    }

    fn describe_mismatch(&self, value: &str) -> String {
        format!("{value:?} does not contain {:?}", self.needle)
    }
}

impl Matcher<String> for Contains {
    fn matches(&self, value: &String) -> bool {
        Matcher::<str>::matches(self, value)
    }

    fn describe(&self) -> String {
        Matcher::<str>::describe(self)
    }

    fn describe_mismatch(&self, value: &String) -> String {
        Matcher::<str>::describe_mismatch(self, value)
    }
}

/// Matches values for which `predicate` returns `true`.
///
/// ```rust
/// use deferunit::assertions::matcher::{satisfies, Matcher};
///
/// let even = satisfies(|n: &i32| n % 2 == 0, "is even");
/// assert!(even.matches(&2));
/// assert_eq!(even.describe_mismatch(&3), "3 does not satisfy: is even");
/// ```
pub fn satisfies<T, F>(predicate: F, description: &str) -> Predicate<F>
where
    F: Fn(&T) -> bool,
{
    Predicate {
        predicate,
        description: description.to_string(),
    }
}

/// Closure-backed matcher.
pub struct Predicate<F> {
    predicate: F,
    description: String,
}

impl<T: Debug, F: Fn(&T) -> bool> Matcher<T> for Predicate<F> {
    fn matches(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{value:?} does not satisfy: {}", self.description)
    }
}

// =============================================================================
// Combinators
// =============================================================================

fn boxed<T, M: Matcher<T> + 'static>(matchers: Vec<M>) -> Vec<Box<dyn Matcher<T>>> {
    matchers
        .into_iter()
        .map(|m| Box::new(m) as Box<dyn Matcher<T>>)
        .collect()
}

fn describe_all<T: ?Sized>(matchers: &[Box<dyn Matcher<T>>]) -> String {
    matchers
        .iter()
        .map(|m| m.describe())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Matches when every matcher matches. All matchers share one type; see
/// [`all_of_boxed`] to mix them.
pub fn all_of<T: Debug, M: Matcher<T> + 'static>(matchers: Vec<M>) -> All<T> {
    All {
        matchers: boxed(matchers),
    }
}

/// Like [`all_of`], for matchers of different types.
pub fn all_of_boxed<T: Debug>(matchers: Vec<Box<dyn Matcher<T>>>) -> All<T> {
    All { matchers }
}

/// Conjunction of matchers.
pub struct All<T: ?Sized> {
    matchers: Vec<Box<dyn Matcher<T>>>,
}

impl<T: Debug> Matcher<T> for All<T> {
    fn matches(&self, value: &T) -> bool {
        self.matchers.iter().all(|m| m.matches(value))
    }

    fn describe(&self) -> String {
        format!("all of ({})", describe_all(&self.matchers))
    }

    // Names the first matcher that rejected the value.
    fn describe_mismatch(&self, value: &T) -> String {
        self.matchers
            .iter()
            .find(|m| !m.matches(value))
            .map_or_else(|| format!("{value:?} matched"), |m| m.describe_mismatch(value))
    }
}

/// Matches when at least one matcher matches.
pub fn any_of<T: Debug, M: Matcher<T> + 'static>(matchers: Vec<M>) -> AnyOf<T> {
    AnyOf {
        matchers: boxed(matchers),
    }
}

/// Disjunction of matchers.
pub struct AnyOf<T: ?Sized> {
    matchers: Vec<Box<dyn Matcher<T>>>,
}

impl<T: Debug> Matcher<T> for AnyOf<T> {
    fn matches(&self, value: &T) -> bool {
        self.matchers.iter().any(|m| m.matches(value))
    }

    fn describe(&self) -> String {
        format!("any of ({})", describe_all(&self.matchers))
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{value:?} matched none of: {}", describe_all(&self.matchers))
    }
}

/// Matches when `matcher` does not.
pub fn not<T, M: Matcher<T> + 'static>(matcher: M) -> Not<T> {
    Not {
        inner: Box::new(matcher),
    }
}

/// Negated matcher.
pub struct Not<T: ?Sized> {
    inner: Box<dyn Matcher<T>>,
}

impl<T: Debug> Matcher<T> for Not<T> {
    fn matches(&self, value: &T) -> bool {
        !self.inner.matches(value)
    }

    fn describe(&self) -> String {
        format!("not {}", self.inner.describe())
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{value:?} is unexpectedly {}", self.inner.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        assert!(eq(1).matches(&1));
        assert!(gt(1).matches(&2));
        assert!(ge(2).matches(&2));
        assert!(!lt(1).matches(&2));
        assert!(le(2).matches(&2));
        assert_eq!(gt(5).describe_mismatch(&3), "3 is not greater than 5");
        assert_eq!(le(1.5).describe(), "at most 1.5");
    }

    #[test]
    fn test_comparisons_reject_unordered() {
        assert!(!gt(0.0).matches(&f64::NAN));
        assert!(!le(0.0).matches(&f64::NAN));
    }

    #[test]
    fn test_contains_str_on_both_string_types() {
        let m = contains_str("ell");
        assert!(Matcher::<str>::matches(&m, "hello"));
        assert!(m.matches(&"hello".to_string()));
        assert_eq!(
            Matcher::<str>::describe_mismatch(&m, "world"),
            "\"world\" does not contain \"ell\""
        );
    }

    #[test]
    fn test_all_of_reports_first_mismatch() {
        let mixed: Vec<Box<dyn Matcher<i32>>> = vec![Box::new(gt(0)), Box::new(lt(10))];
        let m = all_of_boxed(mixed);
        assert!(m.matches(&5));
        assert!(!m.matches(&50));
        assert_eq!(m.describe_mismatch(&50), "50 is not less than 10");
        assert_eq!(m.describe(), "all of (greater than 0, less than 10)");
    }

    #[test]
    fn test_any_of() {
        let m = any_of(vec![eq(1), eq(2)]);
        assert!(m.matches(&2));
        assert!(!m.matches(&3));
        assert_eq!(m.describe_mismatch(&3), "3 matched none of: equal to 1, equal to 2");
    }

    #[test]
    fn test_not() {
        let m = not(eq("x"));
        assert!(m.matches(&"y"));
        assert_eq!(m.describe(), "not equal to \"x\"");
    }
}
