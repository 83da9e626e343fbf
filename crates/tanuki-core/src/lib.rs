#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Shared data model for the Tanuki bridge protocol.
//!
//! Both sides of the pipe depend on this crate:
//! - the runtime client embedded in generated programs (`tanuki-runtime`)
//! - the companion worker process (`tanuki-worker`)
//!
//! The protocol is NDJSON: one JSON object per line, request then response,
//! strictly serial. Everything that crosses the boundary is either a
//! JSON-representable primitive, a homogeneous container of primitives, or
//! an opaque [`Handle`] owned by the worker.

pub mod policy;
pub mod protocol;

#[cfg(test)]
mod policy_tests;
#[cfg(test)]
mod protocol_tests;

pub use policy::{forbidden_name, forbidden_target, private_attribute};
pub use protocol::{
    Cmd, DictEntry, ErrorCode, Handle, Meta, Request, Response, Scalar, Target, WireError,
    WireValue, DEFAULT_BATCH_SIZE,
};
