//! Core parser state machine and low-level operations.
//!
//! The grammar modules drive this cursor over the layout-processed token
//! stream. Errors are recorded and parsing continues; recovery skips to
//! the next statement boundary so one run reports many issues.

use crate::diagnostics::{Code, Diagnostics};
use crate::lexer::{token_text, Token, TokenKind};
use crate::span::Span;

const RECURSION_LIMIT: u32 = 256;

pub struct Parser<'src> {
    pub(super) source: &'src str,
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    pub(super) diags: Diagnostics,
    pub(super) depth: u32,
    /// Last error position, used to suppress cascading errors at one spot.
    last_error_pos: Option<u32>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            diags: Diagnostics::new(),
            depth: 0,
            last_error_pos: None,
        }
    }

    pub fn finish(self) -> Diagnostics {
        self.diags
    }

    /// Current token kind; `Eof` past the end.
    pub(super) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    pub(super) fn nth(&self, lookahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(super) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(super) fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or_else(|| Span::empty(self.source.len() as u32), |t| t.span)
    }

    /// End of the previous token; anchors spans for just-finished nodes.
    pub(super) fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            return 0;
        }
        self.tokens
            .get(self.pos - 1)
            .map_or(0, |t| t.span.end)
    }

    pub(super) fn current_text(&self) -> &'src str {
        self.tokens
            .get(self.pos)
            .map_or("", |t| token_text(self.source, t))
    }

    pub(super) fn bump(&mut self) {
        if !self.eof() {
            self.pos += 1;
        }
    }

    pub(super) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect token. On mismatch: record error, don't consume, so the
    /// caller's recovery decides what to skip.
    pub(super) fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(format!("expected {}", what));
        false
    }

    pub(super) fn error(&mut self, message: impl Into<String>) {
        self.error_with_code(Code::Syntax, message);
    }

    pub(super) fn error_with_code(&mut self, code: Code, message: impl Into<String>) {
        let span = self.current_span();
        if self.last_error_pos == Some(span.start) {
            return;
        }
        self.last_error_pos = Some(span.start);
        self.diags.error(code, message, span).emit();
    }

    pub(super) fn error_at(&mut self, code: Code, message: impl Into<String>, span: Span) {
        self.diags.error(code, message, span).emit();
    }

    /// Skip to the next statement boundary: past the next `Newline`, or to
    /// a `Dedent`/EOF, whichever comes first. Guarantees progress.
    pub(super) fn sync_to_stmt_boundary(&mut self) {
        if self.at(TokenKind::Dedent) || self.eof() {
            return;
        }
        while !self.eof() && !self.at(TokenKind::Newline) && !self.at(TokenKind::Dedent) {
            self.bump();
        }
        self.eat(TokenKind::Newline);
    }

    pub(super) fn enter_recursion(&mut self) -> bool {
        if self.depth >= RECURSION_LIMIT {
            self.error("expression nested too deeply");
            return false;
        }
        self.depth += 1;
        true
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
