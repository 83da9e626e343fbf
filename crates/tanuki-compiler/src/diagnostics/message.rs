//! Diagnostic message types.

use crate::span::Span;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Stable diagnostic codes, one per compile-time error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Syntax,
    UnsupportedSyntax,
    TypeMismatch,
    OwnershipAmbiguous,
    UnresolvedName,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::Syntax => "TNK-SYNTAX",
            Code::UnsupportedSyntax => "TNK-UNSUPPORTED-SYNTAX",
            Code::TypeMismatch => "TNK-TYPE-MISMATCH",
            Code::OwnershipAmbiguous => "TNK-OWNERSHIP-AMBIGUOUS",
            Code::UnresolvedName => "TNK-UNRESOLVED-NAME",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Related location information for a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

impl RelatedInfo {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// A diagnostic message with code, location, message, and severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub severity: Severity,
    pub code: Code,
    pub span: Span,
    pub message: String,
    pub related: Vec<RelatedInfo>,
}

impl DiagnosticMessage {
    pub fn error(code: Code, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            span,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub fn warning(code: Code, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            span,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}]: {} at {}..{}",
            self.severity, self.code, self.message, self.span.start, self.span.end
        )
    }
}
