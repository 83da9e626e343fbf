//! Diagnostic rendering.
//!
//! With source text available, all diagnostics are gathered into one
//! report (each titled with its message and `TNK-*` code) and rendered in
//! a single pass, followed by an error-count summary line. Without
//! source text, each message renders as its one-line plain form.

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use super::{Diagnostics, Severity};
use crate::span::Span;

pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    source: Option<&'s str>,
    path: Option<&'s str>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            source: None,
            path: None,
            colored: false,
        }
    }

    pub fn source(mut self, source: &'s str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        if self.diagnostics.is_empty() {
            return String::new();
        }
        let Some(source) = self.source else {
            return self.render_plain();
        };

        // Titles live outside the loop: the report groups borrow them.
        let titles: Vec<String> = self
            .diagnostics
            .iter()
            .map(|d| format!("{} [{}]", d.message, d.code))
            .collect();

        let mut report: Vec<Group> = Vec::with_capacity(titles.len());
        for (diag, title) in self.diagnostics.iter().zip(&titles) {
            let mut snippet = Snippet::source(source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(caret_range(diag.span, source.len()))
                    .label(&diag.message),
            );
            if let Some(p) = self.path {
                snippet = snippet.path(p);
            }
            for related in &diag.related {
                snippet = snippet.annotation(
                    AnnotationKind::Context
                        .span(caret_range(related.span, source.len()))
                        .label(&related.message),
                );
            }
            let level = match diag.severity {
                Severity::Error => Level::ERROR,
                Severity::Warning => Level::WARNING,
            };
            report.push(level.primary_title(title).element(snippet));
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };
        let mut out = renderer.render(&report).to_string();
        out.push_str(&self.summary_line());
        out
    }

    fn render_plain(&self) -> String {
        let lines: Vec<String> = self.diagnostics.iter().map(|d| d.to_string()).collect();
        format!("{}{}", lines.join("\n"), self.summary_line())
    }

    /// Trailing `N errors emitted` line; silent when nothing is an error.
    fn summary_line(&self) -> String {
        match self.diagnostics.error_count() {
            0 => String::new(),
            1 => "\n1 error emitted".to_string(),
            n => format!("\n{} errors emitted", n),
        }
    }
}

/// Empty spans widen to one character so the caret is visible.
fn caret_range(span: Span, limit: usize) -> std::ops::Range<usize> {
    let start = span.start as usize;
    let end = span.end as usize;
    if start == end {
        return start..(start + 1).min(limit);
    }
    start..end.min(limit)
}
