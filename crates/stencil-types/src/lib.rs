//! Shared types for the Stencil template engine.
//!
//! This crate defines the operator enumerations, the template text
//! representation (narrow and wide strings), and the structured error
//! types used by the evaluator and by whatever front end builds the
//! expression tree.

mod error;
pub mod ops;
pub mod text;

pub use error::{ErrorCategory, ErrorCode, TemplateError};
pub use ops::{BinaryOperation, UnaryOperation};
pub use text::{CharWidth, TargetString, WideString};
