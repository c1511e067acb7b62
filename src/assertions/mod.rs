//! Checks for test bodies.
//!
//! Every check returns `Result<_, Failure>` with an assertion-kind
//! [`Failure`] when it does not hold, so a test body propagates it with `?`
//! and the runner reports it as a failure rather than an error:
//!
//! - [`ensure`], [`ensure_eq`], [`ensure_ne`] - boolean and equality checks
//! - [`ensure_panics`], [`ensure_no_panic`] - panic checks
//! - [`ensure_ok`] - fails on an `Err` value
//! - [`ensure_that`] - any [`matcher::Matcher`]
//! - [`fail`] - unconditional failure
//!
//! The [`ensure!`](crate::ensure), [`ensure_eq!`](crate::ensure_eq) and
//! [`ensure_that!`](crate::ensure_that) macros return early from the
//! enclosing function instead.
//!
//! # Example
//!
//! ```rust
//! use deferunit::assertions::{ensure_eq, matcher::gt, ensure_that};
//! use deferunit::error::Failure;
//!
//! fn body() -> Result<(), Failure> {
//!     ensure_eq(&(2 + 2), &4)?;
//!     ensure_that(&10, &gt(3))?;
//!     Ok(())
//! }
//!
//! assert!(body().is_ok());
//! assert!(ensure_eq(&1, &2).unwrap_err().is_assertion());
//! ```

pub mod matcher;

use std::any::Any;
use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::Failure;
use matcher::Matcher;

/// Fails with `message`.
///
/// # Errors
///
/// Always.
pub fn fail<T>(message: impl Into<String>) -> Result<T, Failure> {
    Err(Failure::assertion(message))
}

/// Fails with `message` unless `condition` holds.
///
/// # Errors
///
/// Returns an assertion failure if `condition` is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), Failure> {
    if condition {
        Ok(())
    } else {
        fail(message)
    }
}

/// Fails unless `actual == expected`.
///
/// # Errors
///
/// Returns an assertion failure carrying both values.
pub fn ensure_eq<T: PartialEq + Debug + ?Sized>(actual: &T, expected: &T) -> Result<(), Failure> {
    if actual == expected {
        Ok(())
    } else {
        Err(Failure::mismatch(
            format!("{actual:?} != {expected:?}"),
            format!("{expected:?}"),
            format!("{actual:?}"),
        ))
    }
}

/// Fails if `actual == unexpected`.
///
/// # Errors
///
/// Returns an assertion failure naming the value.
pub fn ensure_ne<T: PartialEq + Debug + ?Sized>(actual: &T, unexpected: &T) -> Result<(), Failure> {
    if actual == unexpected {
        fail(format!("{actual:?} == {unexpected:?}"))
    } else {
        Ok(())
    }
}

/// Fails unless `value` matches `matcher`.
///
/// # Errors
///
/// Returns an assertion failure with the matcher's description as the
/// expected value.
pub fn ensure_that<T, M>(value: &T, matcher: &M) -> Result<(), Failure>
where
    T: Debug + ?Sized,
    M: Matcher<T> + ?Sized,
{
    if matcher.matches(value) {
        Ok(())
    } else {
        Err(Failure::mismatch(
            matcher.describe_mismatch(value),
            matcher.describe(),
            format!("{value:?}"),
        ))
    }
}

/// Runs `f` and fails unless it panics. Returns the caught payload.
///
/// # Errors
///
/// Returns an assertion failure if `f` returned normally.
pub fn ensure_panics<F: FnOnce()>(f: F) -> Result<Box<dyn Any + Send>, Failure> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => fail("expected a panic, but the call returned normally"),
        Err(payload) => Ok(payload),
    }
}

/// Runs `f` and fails if it panics. Returns its value.
///
/// # Errors
///
/// Returns an assertion failure describing the panic.
pub fn ensure_no_panic<T, F: FnOnce() -> T>(f: F) -> Result<T, Failure> {
    catch_unwind(AssertUnwindSafe(f)).or_else(|payload| {
        let caught = Failure::from_panic(payload);
        fail(format!("unexpected panic: {caught}"))
    })
}

/// Fails if `result` is an `Err`, returning the success value otherwise.
///
/// # Errors
///
/// Returns an assertion failure rendering the error.
pub fn ensure_ok<T, E: Debug>(result: Result<T, E>) -> Result<T, Failure> {
    result.or_else(|err| fail(format!("unexpected error: {err:?}")))
}

/// Returns early with an assertion failure unless the condition holds.
///
/// ```rust
/// use deferunit::ensure;
/// use deferunit::error::Failure;
///
/// fn check(n: i32) -> Result<(), Failure> {
///     ensure!(n > 0, "expected a positive number, got {}", n);
///     Ok(())
/// }
///
/// assert!(check(1).is_ok());
/// assert_eq!(check(-1).unwrap_err().to_string(), "expected a positive number, got -1");
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err(
                $crate::error::Failure::assertion(concat!("condition failed: ", stringify!($cond)))
                    .into(),
            );
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return ::core::result::Result::Err(
                $crate::error::Failure::assertion(format!($($arg)+)).into(),
            );
        }
    };
}

/// Returns early with an assertion failure unless both values are equal.
///
/// ```rust
/// use deferunit::ensure_eq;
/// use deferunit::error::Failure;
///
/// fn check() -> Result<(), Failure> {
///     ensure_eq!(1 + 1, 3);
///     Ok(())
/// }
///
/// assert_eq!(check().unwrap_err().to_string(), "2 != 3");
/// ```
#[macro_export]
macro_rules! ensure_eq {
    ($actual:expr, $expected:expr $(,)?) => {
        $crate::assertions::ensure_eq(&$actual, &$expected)?
    };
}

/// Returns early with an assertion failure unless the value matches.
///
/// ```rust
/// use deferunit::ensure_that;
/// use deferunit::assertions::matcher::lt;
/// use deferunit::error::Failure;
///
/// fn check(n: u32) -> Result<(), Failure> {
///     ensure_that!(n, lt(10));
///     Ok(())
/// }
///
/// assert!(check(3).is_ok());
/// assert!(check(30).is_err());
/// ```
#[macro_export]
macro_rules! ensure_that {
    ($value:expr, $matcher:expr $(,)?) => {
        $crate::assertions::ensure_that(&$value, &$matcher)?
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use matcher::{contains_str, eq, not};

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "unused").is_ok());
        let failure = ensure(false, "flag unset").unwrap_err();
        assert!(failure.is_assertion());
        assert_eq!(failure.to_string(), "flag unset");
    }

    #[test]
    fn test_ensure_eq_carries_values() {
        assert!(ensure_eq(&"a", &"a").is_ok());
        let failure = ensure_eq(&1, &2).unwrap_err();
        assert_eq!(failure, Failure::mismatch("1 != 2", "2", "1"));
    }

    #[test]
    fn test_ensure_ne() {
        assert!(ensure_ne(&1, &2).is_ok());
        assert_eq!(ensure_ne(&1, &1).unwrap_err().to_string(), "1 == 1");
    }

    #[test]
    fn test_ensure_that_describes_matcher() {
        assert!(ensure_that(&5, &not(eq(4))).is_ok());
        let failure = ensure_that("hello", &contains_str("world")).unwrap_err();
        assert!(failure.is_assertion());
        assert!(failure.describe().contains("contains \"world\""));
    }

    #[test]
    fn test_ensure_panics() {
        let payload = ensure_panics(|| panic!("expected")).unwrap();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"expected"));
        assert!(ensure_panics(|| {}).is_err());
    }

    #[test]
    fn test_ensure_no_panic() {
        assert_eq!(ensure_no_panic(|| 3).unwrap(), 3);
        let failure = ensure_no_panic(|| -> i32 { panic!("oops") }).unwrap_err();
        assert_eq!(failure.to_string(), "unexpected panic: oops");
    }

    #[test]
    fn test_ensure_ok() {
        assert_eq!(ensure_ok::<_, String>(Ok(1)).unwrap(), 1);
        let failure = ensure_ok::<(), _>(Err("disk full")).unwrap_err();
        assert_eq!(failure.to_string(), "unexpected error: \"disk full\"");
    }

    #[test]
    fn test_macros_return_early() {
        fn body(n: i32) -> Result<(), Failure> {
            crate::ensure!(n != 0);
            crate::ensure_eq!(n % 2, 0);
            crate::ensure_that!(n, matcher::gt(1));
            Ok(())
        }

        assert!(body(4).is_ok());
        assert_eq!(body(0).unwrap_err().to_string(), "condition failed: n != 0");
        assert_eq!(body(3).unwrap_err().to_string(), "1 != 0");
    }
}
