use thiserror::Error;

use crate::time::{Deadline, Duration};

/// Coarse classification of every failure the crate can report.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    RangeViolation,
    InvalidOperation,
    NotFound,
    DuplicateEntry,
    UnsolvableConfiguration,
    TypeMismatch,
    MissingField,
}

/// Error type returned by all fallible operations of this crate.
///
/// All failures are deterministic precondition violations; none of
/// them is worth retrying with the same input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A constructor or mutator was handed a malformed value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A deadline is not a positive multiple of the task's deadline step.
    #[error("deadline {deadline} of task {task} is not a positive multiple of the step {step}")]
    MisalignedDeadline {
        task: String,
        deadline: Deadline,
        step: Duration,
    },

    /// A scheduling parameter is outside its admissible range.
    #[error("range violation for task {task}: {reason}")]
    RangeViolation { task: String, reason: String },

    /// The operation does not make sense in the task's current state.
    #[error("invalid operation on task {task}: {reason}")]
    InvalidOperation { task: String, reason: String },

    /// A probability was requested for a deadline that was never registered.
    #[error("deadline {deadline} does not exist for task {task}")]
    DeadlineNotFound { task: String, deadline: Deadline },

    /// No QoS builder is registered under the requested name.
    #[error("no QoS function registered as '{0}'")]
    UnknownQosFunction(String),

    /// A deadline was registered twice.
    #[error("deadline {deadline} already registered for task {task}")]
    DuplicateDeadline { task: String, deadline: Deadline },

    /// The solver cannot produce valid probabilities for its task set.
    #[error("cannot solve task {task}: {reason}")]
    Unsolvable { task: String, reason: String },

    /// A builder was handed parameters of a different QoS kind.
    #[error("{builder} builder cannot use {found} parameters")]
    TypeMismatch {
        builder: &'static str,
        found: &'static str,
    },

    /// A mandatory configuration field is absent.
    #[error("parameter '{0}' undefined for QoS function")]
    MissingField(&'static str),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) | Error::MisalignedDeadline { .. } => {
                ErrorKind::InvalidArgument
            }
            Error::RangeViolation { .. } => ErrorKind::RangeViolation,
            Error::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Error::DeadlineNotFound { .. } | Error::UnknownQosFunction(_) => ErrorKind::NotFound,
            Error::DuplicateDeadline { .. } => ErrorKind::DuplicateEntry,
            Error::Unsolvable { .. } => ErrorKind::UnsolvableConfiguration,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::MissingField(_) => ErrorKind::MissingField,
        }
    }

    pub(crate) fn invalid_operation(task: &str, reason: impl Into<String>) -> Self {
        Error::InvalidOperation {
            task: task.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn range_violation(task: &str, reason: impl Into<String>) -> Self {
        Error::RangeViolation {
            task: task.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsolvable(task: &str, reason: impl Into<String>) -> Self {
        Error::Unsolvable {
            task: task.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
