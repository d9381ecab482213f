//! Error types.

use std::time::Duration;

use thiserror::Error;

/// The error type returned by encode and decode operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The input matches none of the recognized shapes, or a format value is
    /// outside the closed set of [`Format`](crate::Format)s.
    #[error("invalid format")]
    InvalidFormat,

    /// The loose date interpreter rejected the input.
    #[error("invalid format: {0}")]
    InterpreterFailure(#[from] InterpretError),

    /// The timestamp cannot be represented in the requested unit or calendar.
    #[error("timestamp out of representable range")]
    Overflow,
}

/// The error type returned by a [`LooseDateInterpreter`](crate::LooseDateInterpreter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InterpretError {
    /// No date could be recognized in the input.
    #[error("unrecognized date string '{0}'")]
    Unrecognized(String),

    /// A date was recognized but one of its fields is out of range, or the
    /// resulting instant cannot be represented.
    #[error("date fields out of range")]
    OutOfRange,

    /// The interpreter did not answer within the allotted time.
    #[error("date interpretation timed out after {0:?}")]
    TimedOut(Duration),

    /// The interpreter could not be reached or died before answering.
    #[error("date interpreter unavailable")]
    Unavailable,
}
