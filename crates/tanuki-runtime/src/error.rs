//! The structured runtime error generated programs propagate.

use tanuki_core::{ErrorCode, WireError};

/// Error categories a generated program can observe: the source-level
/// exception kinds, plus the bridge-originated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValueError,
    TypeError,
    IndexError,
    KeyError,
    AttributeError,
    ZeroDivisionError,
    RuntimeError,
    /// Catch-all base kind.
    Exception,
    SecurityViolation,
    StaleHandle,
    ProtocolError,
    WorkerCrash,
    PythonException,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValueError => "ValueError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::KeyError => "KeyError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::ZeroDivisionError => "ZeroDivisionError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::Exception => "Exception",
            ErrorKind::SecurityViolation => "SecurityViolation",
            ErrorKind::StaleHandle => "StaleHandle",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::WorkerCrash => "WorkerCrash",
            ErrorKind::PythonException => "PythonException",
        }
    }

    /// Kind for an exception type name, for bridge errors that carry a
    /// `py_type`.
    pub fn from_name(name: &str) -> ErrorKind {
        match name {
            "ValueError" => ErrorKind::ValueError,
            "TypeError" => ErrorKind::TypeError,
            "IndexError" => ErrorKind::IndexError,
            "KeyError" => ErrorKind::KeyError,
            "AttributeError" => ErrorKind::AttributeError,
            "ZeroDivisionError" => ErrorKind::ZeroDivisionError,
            "RuntimeError" => ErrorKind::RuntimeError,
            "Exception" => ErrorKind::Exception,
            _ => ErrorKind::PythonException,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised error: kind, message, source line, and an optional cause
/// chain built by `raise ... from ...`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}{kind}: {message}", line_prefix(.line))]
pub struct TnkError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<u32>,
    pub cause: Option<Box<TnkError>>,
    /// Exception type name reported by the worker, when finer than `kind`.
    pub py_type: Option<String>,
}

fn line_prefix(line: &Option<u32>) -> String {
    match line {
        Some(l) => format!("[line {}] ", l),
        None => String::new(),
    }
}

impl TnkError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        TnkError {
            kind,
            message: message.into(),
            line: None,
            cause: None,
            py_type: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_cause(mut self, cause: TnkError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Full chain rendering:
    ///
    /// ```text
    /// [line 7] RuntimeError: bad
    ///   Caused by: [line 3] ValueError: neg
    /// ```
    pub fn render(&self) -> String {
        let mut out = self.to_string();
        let mut indent = String::from("  ");
        let mut cause = self.cause.as_deref();
        while let Some(c) = cause {
            out.push('\n');
            out.push_str(&indent);
            out.push_str("Caused by: ");
            out.push_str(&c.to_string());
            indent.push_str("  ");
            cause = c.cause.as_deref();
        }
        out
    }
}

impl From<WireError> for TnkError {
    fn from(err: WireError) -> Self {
        let kind = match err.code {
            ErrorCode::SecurityViolation => ErrorKind::SecurityViolation,
            ErrorCode::StaleHandle => ErrorKind::StaleHandle,
            ErrorCode::ProtocolError => ErrorKind::ProtocolError,
            ErrorCode::TypeMismatch => ErrorKind::TypeError,
            ErrorCode::WorkerCrash => ErrorKind::WorkerCrash,
            // The worker's exception type picks the kind so `except
            // ValueError` still matches errors raised on the other side.
            ErrorCode::PythonException => err
                .py_type
                .as_deref()
                .map(ErrorKind::from_name)
                .unwrap_or(ErrorKind::PythonException),
        };
        TnkError {
            kind,
            message: err.message,
            line: None,
            cause: None,
            py_type: err.py_type,
        }
    }
}
