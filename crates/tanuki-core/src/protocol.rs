//! Request, response, and value encoding for the bridge wire format.
//!
//! A request line is a [`Request`]; the matching response line is a
//! [`Response`]. Values travel as [`WireValue`]: primitives inline,
//! containers of primitives structurally, everything else as a [`Handle`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Elements fetched per `iter_next_batch` round trip unless overridden.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Commands the worker dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmd {
    CallFunction,
    CallMethod,
    GetAttribute,
    GetItem,
    Slice,
    Iter,
    IterNextBatch,
    Delete,
}

impl Cmd {
    pub fn as_str(self) -> &'static str {
        match self {
            Cmd::CallFunction => "call_function",
            Cmd::CallMethod => "call_method",
            Cmd::GetAttribute => "get_attribute",
            Cmd::GetItem => "get_item",
            Cmd::Slice => "slice",
            Cmd::Iter => "iter",
            Cmd::IterNextBatch => "iter_next_batch",
            Cmd::Delete => "delete",
        }
    }
}

/// What an operation acts on: a dotted path into the worker's module space,
/// or a handle id previously returned by the worker.
///
/// `call_function` sends a dotted path (`"math.sqrt"`); every other command
/// sends a handle id. The module form also appears as an explicit object so
/// a method call can target a module directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// `{"kind": "module", "module": "math"}`
    Module { kind: ModuleTag, module: String },
    /// Handle id or dotted path, depending on the command.
    Name(String),
}

/// The literal string `"module"`; exists to make the untagged variant
/// unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleTag {
    Module,
}

impl Target {
    pub fn name(s: impl Into<String>) -> Self {
        Target::Name(s.into())
    }

    pub fn module(s: impl Into<String>) -> Self {
        Target::Module {
            kind: ModuleTag::Module,
            module: s.into(),
        }
    }
}

/// A JSON scalar: the only values sent inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

/// One key/value pair of an encoded dict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictEntry {
    pub key: WireValue,
    pub value: WireValue,
}

/// An encoded value crossing the bridge.
///
/// Primitives are inline; lists, tuples, and dicts are encoded
/// structurally (and may contain handles as elements); anything the worker
/// cannot encode structurally becomes a [`Handle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WireValue {
    Value { value: Scalar },
    List { items: Vec<WireValue> },
    Tuple { items: Vec<WireValue> },
    Dict { items: Vec<DictEntry> },
    Handle(Handle),
}

impl WireValue {
    pub fn null() -> Self {
        WireValue::Value {
            value: Scalar::Null,
        }
    }

    pub fn int(n: i64) -> Self {
        WireValue::Value {
            value: Scalar::Int(n),
        }
    }

    pub fn float(f: f64) -> Self {
        WireValue::Value {
            value: Scalar::Float(f),
        }
    }

    pub fn bool(b: bool) -> Self {
        WireValue::Value {
            value: Scalar::Bool(b),
        }
    }

    pub fn str(s: impl Into<String>) -> Self {
        WireValue::Value {
            value: Scalar::Str(s.into()),
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            WireValue::Handle(h) => Some(h),
            _ => None,
        }
    }
}

/// An opaque reference to a value living inside the worker process.
///
/// `str` was absent in older worker revisions; decoding tolerates that and
/// display sites fall back to `repr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub repr: String,
    #[serde(rename = "str", default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    pub session_id: String,
}

impl Handle {
    /// Human-readable rendering: the worker's `str`, or `repr` when absent.
    pub fn display_text(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.repr)
    }
}

/// One request line.
///
/// `cmd` decides which optional fields are meaningful; unknown extras are
/// rejected by the worker as `ProtocolError` at validation, not at parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub cmd: Cmd,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_id: Option<u64>,
    pub target: Target,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<WireValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<IndexMap<String, WireValue>>,
}

impl Request {
    /// A request with only the always-required fields set.
    pub fn new(cmd: Cmd, session_id: impl Into<String>, target: Target) -> Self {
        Request {
            cmd,
            session_id: session_id.into(),
            req_id: None,
            target,
            method: None,
            name: None,
            key: None,
            start: None,
            stop: None,
            step: None,
            batch_size: None,
            args: None,
            kwargs: None,
        }
    }
}

/// Response metadata. Today only iterator exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub done: bool,
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Response {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        req_id: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<WireValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Meta>,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        req_id: Option<u64>,
        error: WireError,
    },
}

impl Response {
    pub fn ok(req_id: Option<u64>, value: WireValue) -> Self {
        Response::Ok {
            req_id,
            value: Some(value),
            meta: None,
        }
    }

    pub fn ok_with_meta(req_id: Option<u64>, value: WireValue, meta: Meta) -> Self {
        Response::Ok {
            req_id,
            value: Some(value),
            meta: Some(meta),
        }
    }

    pub fn error(req_id: Option<u64>, error: WireError) -> Self {
        Response::Error { req_id, error }
    }

    pub fn req_id(&self) -> Option<u64> {
        match self {
            Response::Ok { req_id, .. } | Response::Error { req_id, .. } => *req_id,
        }
    }
}

/// Error categories carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    SecurityViolation,
    StaleHandle,
    ProtocolError,
    TypeMismatch,
    PythonException,
    WorkerCrash,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SecurityViolation => "SecurityViolation",
            ErrorCode::StaleHandle => "StaleHandle",
            ErrorCode::ProtocolError => "ProtocolError",
            ErrorCode::TypeMismatch => "TypeMismatch",
            ErrorCode::PythonException => "PythonException",
            ErrorCode::WorkerCrash => "WorkerCrash",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured wire error.
///
/// `op`, when present, echoes the failing request's command, target, and
/// arguments for debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub py_type: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<serde_json::Value>,
}

impl WireError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        WireError {
            code,
            py_type: None,
            message: message.into(),
            traceback: None,
            op: None,
        }
    }

    pub fn exception(py_type: impl Into<String>, message: impl Into<String>) -> Self {
        WireError {
            code: ErrorCode::PythonException,
            py_type: Some(py_type.into()),
            message: message.into(),
            traceback: None,
            op: None,
        }
    }

    pub fn with_op(mut self, op: serde_json::Value) -> Self {
        self.op = Some(op);
        self
    }
}
