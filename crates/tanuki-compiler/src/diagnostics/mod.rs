//! Compiler diagnostics infrastructure.
//!
//! Diagnostics are collected across the whole pipeline (parse, analysis,
//! generation) and rendered at the end; no phase aborts on the first error.

mod message;
mod printer;

#[cfg(test)]
mod tests;

pub use message::{Code, DiagnosticMessage, RelatedInfo, Severity};
pub use printer::DiagnosticsPrinter;

use crate::span::Span;

/// Collection of diagnostic messages from parsing, analysis, and generation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

/// Builder for constructing a diagnostic message.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn error(&mut self, code: Code, msg: impl Into<String>, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::error(code, span, msg),
        }
    }

    pub fn warning(
        &mut self,
        code: Code,
        msg: impl Into<String>,
        span: Span,
    ) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::warning(code, span, msg),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }

    /// Any message carrying `code`?
    pub fn has_code(&self, code: Code) -> bool {
        self.messages.iter().any(|d| d.code == code)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn related_to(mut self, msg: impl Into<String>, span: Span) -> Self {
        self.message.related.push(RelatedInfo::new(span, msg));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
