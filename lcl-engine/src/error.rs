//! Error classification.
//!
//! LCL's evaluator threads a small return-code protocol through every
//! command (`OK ERR RETURN BREAK CONTINUE`, see [`crate::eval::Flow`]).
//! This module covers only the `ERR` side of that protocol: a single,
//! flat error type, the same shape the reference implementation used
//! (one error enum rather than a nested exception taxonomy).

use std::fmt;

pub type Result<T> = std::result::Result<T, self::Error>;

#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed source: unbalanced braces/quotes/brackets, bad atom syntax.
    Parse { message: String },
    /// A name could not be resolved in any frame or namespace.
    Unbound { name: String },
    /// An operation was applied to a value of the wrong type.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Wrong number of arguments to a procedure or special form.
    Arity { expected: String, found: usize },
    /// List/string index out of range.
    IndexOutOfRange { index: i64, len: usize },
    /// Division or modulo by zero.
    DivideByZero,
    /// Call-stack depth exceeded `Interpreter::max_depth`.
    DepthExceeded { max_depth: usize },
    /// An opaque value's type tag did not match what the caller expected.
    OpaqueTypeMismatch { expected: String, found: String },
    /// A `$name`/`${name}`/`[...]` substitution ran off the end of input.
    UnterminatedSubstitution,
    /// Anything else; carries a human-readable reason, mirroring the
    /// reference implementation's catch-all reason string.
    Generic { message: String },
}

impl Error {
    pub fn generic(message: impl Into<String>) -> Self {
        Error::Generic {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    pub fn unbound(name: impl Into<String>) -> Self {
        Error::Unbound { name: name.into() }
    }

    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Error::TypeMismatch { expected, found }
    }

    pub fn arity(expected: impl Into<String>, found: usize) -> Self {
        Error::Arity {
            expected: expected.into(),
            found,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { message } => write!(f, "parse error: {message}"),
            Error::Unbound { name } => write!(f, "unbound name: {name}"),
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            Error::Arity { expected, found } => {
                write!(
                    f,
                    "arity mismatch: expected {expected} argument(s), found {found}"
                )
            }
            Error::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Error::DivideByZero => write!(f, "division by zero"),
            Error::DepthExceeded { max_depth } => {
                write!(f, "call stack depth exceeded (max {max_depth})")
            }
            Error::OpaqueTypeMismatch { expected, found } => {
                write!(f, "opaque type mismatch: expected {expected}, found {found}")
            }
            Error::UnterminatedSubstitution => write!(f, "unterminated substitution"),
            Error::Generic { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {}
