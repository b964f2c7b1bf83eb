// SPDX-License-Identifier: Apache-2.0

//! The errors this crate can raise. Nearly everything in `oddson` is a pure
//! function of immutable state, so this enum is small: construction-time
//! misuse and harness-level parse failures. Query-time conditions that
//! spec.md classifies as "not an error" (a miss, an empty index, k = 0)
//! never produce one of these.

use std::fmt;
use std::io;

/// Helper alias for a call that could go wrong.
pub type OddsonResult<T> = Result<T, OddsonError>;

/// Error type for `oddson`.
#[derive(Debug)]
pub enum OddsonError {
    /// A non-positive point count, or a dimension below 2.
    InvalidInput {
        /// What was wrong with the input.
        message: String,
    },
    /// The harness's text format had a malformed header or a short file.
    ParseError {
        /// Line number (1-indexed) where parsing failed, if known.
        line: Option<usize>,
        /// What was wrong.
        message: String,
    },
    /// Wraps an IO failure when the harness reads a points file.
    IoError(io::Error),
}

impl fmt::Display for OddsonError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OddsonError::InvalidInput { message } => write!(f, "invalid input: {}", message),
            OddsonError::ParseError {
                line: Some(line),
                message,
            } => write!(f, "parse error at line {}: {}", line, message),
            OddsonError::ParseError { line: None, message } => {
                write!(f, "parse error: {}", message)
            }
            OddsonError::IoError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OddsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OddsonError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OddsonError {
    fn from(e: io::Error) -> OddsonError {
        OddsonError::IoError(e)
    }
}
