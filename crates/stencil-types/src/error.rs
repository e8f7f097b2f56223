use crate::text::CharWidth;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The template tree could not be built (E100–E199).
    Construction,
    /// An evaluation-time contract was violated (E200–E299).
    Evaluation,
}

/// Numeric error code (E100–E299).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Construction errors (E100–E199) ──
    pub const UNKNOWN_FILTER: Self = Self(100);
    pub const UNKNOWN_TESTER: Self = Self(101);

    // ── Evaluation contract errors (E200–E299) ──
    pub const WIDTH_MISMATCH: Self = Self(200);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Evaluation,
            _ => ErrorCategory::Construction,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction => write!(f, "construction"),
            Self::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// A hard template error.
///
/// Only malformed templates produce these. Anything that goes wrong while
/// a well-formed tree is evaluated renders as an empty value instead.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateError {
    /// A filter name did not resolve.
    #[error("can't find filter '{name}'")]
    UnknownFilter { name: String },

    /// A tester name did not resolve.
    #[error("can't find tester '{name}'")]
    UnknownTester { name: String },

    /// Two strings of different character width met in one operation.
    #[error("can't combine {left} and {right} strings")]
    WidthMismatch { left: CharWidth, right: CharWidth },
}

impl TemplateError {
    /// Stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownFilter { .. } => ErrorCode::UNKNOWN_FILTER,
            Self::UnknownTester { .. } => ErrorCode::UNKNOWN_TESTER,
            Self::WidthMismatch { .. } => ErrorCode::WIDTH_MISMATCH,
        }
    }

    /// Category derived from the error code.
    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}
