#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Runtime support for Tanuki-generated programs.
//!
//! Generated code leans on four things here:
//! - [`TnkError`] / [`TnkResult`] — the result-carrying discipline that
//!   exceptions lower to
//! - [`Flow`] — control-flow signal threaded through lowered `try` blocks
//! - [`Value`] — a runtime-tagged value for everything typed `Any`,
//!   holding either a primitive or a bridge handle
//! - [`bridge`] — the client side of the companion-process protocol
//!
//! The `ops` module carries the small native helpers (slicing, indexing,
//! formatting) the generator calls instead of open-coding them.

pub mod bridge;
pub mod error;
pub mod ops;
pub mod value;

#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod ops_tests;
#[cfg(test)]
mod value_tests;

pub use error::{ErrorKind, TnkError};
pub use value::{IntoValue, Value};

/// Result type generated functions return when they may raise.
pub type TnkResult<T> = std::result::Result<T, TnkError>;

/// Control-flow signal for lowered `try` blocks.
///
/// The body of a `try` runs inside a closure; `return`, `break`, and
/// `continue` cannot cross that boundary directly, so they come back as
/// variants and the caller re-applies them.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<T> {
    /// Fell off the end of the block.
    Fall,
    /// `return` with the function's value.
    Return(T),
    Break,
    Continue,
}
