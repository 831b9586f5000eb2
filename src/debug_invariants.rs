use crate::exchange_error::ExchangeError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), ExchangeError>;
}

/// Run a fallible check and panic on error when invariant checking is enabled.
///
/// Release builds compile the check out unless the `check-invariants`
/// feature is on.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

/// Early-return a precondition error when invariant checking is enabled.
///
/// Unlike [`debug_invariants!`] this does not panic; the enclosing function
/// must return `Result<_, ExchangeError>`.
#[macro_export]
macro_rules! check_precondition {
    ($cond:expr, $($msg:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if !($cond) {
            return Err($crate::exchange_error::ExchangeError::Precondition(format!($($msg)*)));
        }
    };
}
