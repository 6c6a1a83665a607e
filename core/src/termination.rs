//! # Functionality Related to Early Solver Termination
//!
//! Since the `Try` trait is not stable, results are propagated with the
//! [`done`] macro instead of the `?` operator.

use std::fmt;

/// Early termination reasons for [`crate::BottleneckSolver::solve`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Terminated because the time budget ran out
    TimeLimit,
    /// Terminated because of maximum number of oracle calls reached
    OracleCallsLimit,
    /// Termination because of external interrupt
    Interrupted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::TimeLimit => {
                write!(f, "Solver terminated early because of time limit")
            }
            Termination::OracleCallsLimit => {
                write!(f, "Solver terminated early because of oracle call limit")
            }
            Termination::Interrupted => {
                write!(f, "Solver terminated early because of interrupt signal")
            }
        }
    }
}

/// Return type for functions that either return a value or were terminated early for some reason
#[derive(Debug, PartialEq)]
pub enum MaybeTerminated<T = ()> {
    /// The operation finished with a return value
    Done(T),
    /// The operation was terminated early
    Terminated(Termination),
}

impl<T> MaybeTerminated<T> {
    pub fn unwrap(self) -> T {
        match self {
            MaybeTerminated::Done(val) => val,
            MaybeTerminated::Terminated(term) => {
                panic!("called `MaybeTerminated::unwrap()` on a `Terminated` value: {term}")
            }
        }
    }
}

/// Return type for functions that either return a value, terminate early or error
#[derive(Debug)]
pub enum MaybeTerminatedError<T = ()> {
    /// The operation finished with a return value
    Done(T),
    /// The operation was terminated early
    Terminated(Termination),
    /// The operation failed
    Error(anyhow::Error),
}

impl<T> MaybeTerminatedError<T> {
    pub fn unwrap(self) -> T {
        match self {
            MaybeTerminatedError::Done(val) => val,
            MaybeTerminatedError::Terminated(term) => {
                panic!("called `MaybeTerminatedError::unwrap()` on a `Terminated` value: {term}")
            }
            MaybeTerminatedError::Error(err) => {
                panic!("called `MaybeTerminatedError::unwrap()` on an `Error` value: {err}")
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, MaybeTerminatedError::Done(_))
    }
}

impl<T> From<MaybeTerminated<T>> for MaybeTerminatedError<T> {
    fn from(value: MaybeTerminated<T>) -> Self {
        match value {
            MaybeTerminated::Done(val) => MaybeTerminatedError::Done(val),
            MaybeTerminated::Terminated(term) => MaybeTerminatedError::Terminated(term),
        }
    }
}

impl<T> From<anyhow::Result<T>> for MaybeTerminatedError<T> {
    fn from(value: anyhow::Result<T>) -> Self {
        match value {
            Ok(val) => MaybeTerminatedError::Done(val),
            Err(err) => MaybeTerminatedError::Error(err),
        }
    }
}

/// Unwraps a [`MaybeTerminated`], [`MaybeTerminatedError`] or
/// [`anyhow::Result`] value or returns early from a function returning
/// [`MaybeTerminatedError`]
#[macro_export]
macro_rules! done {
    ($val:expr) => {
        match $crate::MaybeTerminatedError::from($val) {
            $crate::MaybeTerminatedError::Done(val) => val,
            $crate::MaybeTerminatedError::Terminated(term) => {
                return $crate::MaybeTerminatedError::Terminated(term)
            }
            $crate::MaybeTerminatedError::Error(err) => {
                return $crate::MaybeTerminatedError::Error(err)
            }
        }
    };
}

/// Equivalent of [`anyhow::ensure`] for [`MaybeTerminatedError`]
macro_rules! ensure {
    ($cond:expr, $msg:literal) => {
        if !$cond {
            return crate::MaybeTerminatedError::Error(anyhow::anyhow!($msg));
        }
    };
    ($cond:expr, $err:expr) => {
        if !$cond {
            return crate::MaybeTerminatedError::Error(anyhow::anyhow!($err));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return crate::MaybeTerminatedError::Error(anyhow::anyhow!($fmt, $($arg)*));
        }
    };
}
pub(crate) use ensure;
