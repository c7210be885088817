//! Errors that actually reach a `Result` at the crate boundary.
//!
//! Everything recoverable *inside* a render (unknown names, type mismatches,
//! division by zero, argument-binding failures) resolves to an empty
//! [`crate::value::InternalValue`] or a `succeeded = false` bind outcome —
//! never a `Result::Err`. Only registry construction, which happens before a
//! render starts, can fail outright.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown filter `{name}`")]
    UnknownFilter { name: String },

    #[error("unknown tester `{name}`")]
    UnknownTester { name: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
