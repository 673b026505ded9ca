//! Error types for the simulator.
//!
//! Parse and execution failures are the only errors the simulator raises.
//! Semaphore states such as "signalled more often than anyone waited" are
//! valid states, not errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::ThreadId;

/// A line that the statement grammar rejects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at column {column}")]
pub struct ParseError {
    pub message: String,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, column: usize) -> Self {
        ParseError {
            message: message.into(),
            column,
        }
    }
}

/// Failure while executing a single row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("malformed line `{line}`: {reason}")]
    Malformed {
        line: String,
        #[source]
        reason: ParseError,
    },
    #[error("name `{name}` is not defined")]
    Name { name: String },
    #[error("type error: {message}")]
    Type { message: String },
    #[error("division by zero")]
    ZeroDivision,
    #[error("`{type_name}` object has no attribute `{attribute}`")]
    Attribute {
        type_name: &'static str,
        attribute: String,
    },
    #[error("{function}() {message}")]
    Argument { function: String, message: String },
}

impl ExecError {
    pub fn malformed(line: impl Into<String>, reason: ParseError) -> Self {
        ExecError::Malformed {
            line: line.into(),
            reason,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        ExecError::Name { name: name.into() }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ExecError::Type {
            message: message.into(),
        }
    }

    pub fn attribute(type_name: &'static str, attribute: impl Into<String>) -> Self {
        ExecError::Attribute {
            type_name,
            attribute: attribute.into(),
        }
    }

    pub fn argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        ExecError::Argument {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the scheduler and script loader.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("thread {thread} failed on row {row} `{line}`: {error}")]
    Exec {
        thread: String,
        row: usize,
        line: String,
        #[source]
        error: ExecError,
    },
    #[error("initialization blocked on row {row} `{line}`")]
    InitBlocked { row: usize, line: String },
    #[error("unknown thread {}", .0.raw())]
    UnknownThread(ThreadId),
    #[error("unknown column {0}")]
    UnknownColumn(usize),
    #[error("failed to read script {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl SimError {
    pub fn exec(thread: impl Into<String>, row: usize, line: impl Into<String>, error: ExecError) -> Self {
        SimError::Exec {
            thread: thread.into(),
            row,
            line: line.into(),
            error,
        }
    }

    /// The underlying execution failure, if this error came from a row.
    pub fn exec_error(&self) -> Option<&ExecError> {
        match self {
            SimError::Exec { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = SimError> = std::result::Result<T, E>;
