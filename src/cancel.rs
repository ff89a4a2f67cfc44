//! Cooperative cancellation for long-running sequence operations.
//!
//! Operations that may touch a whole tree — reversal, positional edits,
//! recursive concatenation and slicing — consult a [`Cancellation`]
//! capability at each recursion entry. A cancelled check aborts the
//! operation with [`Cancelled`] before any new tree is published, so the
//! inputs stay valid and no partially built version is observable.
//!
//! [`NeverCancel`] is the zero-cost default used by the plain methods of
//! [`crate::PersistentSequence`]; [`CancelFlag`] is a flag another thread
//! can set to stop an operation in flight.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error returned when an operation was cancelled between recursion steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sequence operation was cancelled")
    }
}

impl Error for Cancelled {}

/// Capability polled by interruptible operations.
///
/// Implementations must be cheap and side-effect-free; the check runs once
/// per recursion level, not once per element.
pub trait Cancellation {
    /// Returns `Err(Cancelled)` if the operation should stop.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when cancellation was requested.
    fn check(&self) -> Result<(), Cancelled>;
}

/// Cancellation capability that never cancels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeverCancel;

impl Cancellation for NeverCancel {
    #[inline]
    fn check(&self) -> Result<(), Cancelled> {
        Ok(())
    }
}

/// Cancellation flag settable from another thread.
///
/// # Examples
///
/// ```rust
/// use fingerseq::{CancelFlag, Cancellation};
///
/// let flag = CancelFlag::new();
/// assert!(flag.check().is_ok());
///
/// flag.cancel();
/// assert!(flag.check().is_err());
/// ```
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Requests cancellation of every operation polling this flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`CancelFlag::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Cancellation for CancelFlag {
    #[inline]
    fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
    }
}

impl<C: Cancellation + ?Sized> Cancellation for &C {
    fn check(&self) -> Result<(), Cancelled> {
        (**self).check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_never_cancel_always_passes() {
        assert_eq!(NeverCancel.check(), Ok(()));
    }

    #[rstest]
    fn test_cancel_flag_roundtrip() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        assert_eq!(flag.check(), Ok(()));

        flag.cancel();
        assert!(flag.is_cancelled());
        assert_eq!(flag.check(), Err(Cancelled));
    }

    #[rstest]
    fn test_cancelled_displays_reason() {
        assert_eq!(Cancelled.to_string(), "sequence operation was cancelled");
    }
}
