//! Layout pass: turns raw newlines and leading whitespace into
//! `Newline` / `Indent` / `Dedent` structure tokens.
//!
//! Rules:
//! - Blank and comment-only lines produce no layout tokens at all.
//! - Inside `()`/`[]`/`{}` the line structure is suppressed entirely.
//! - A backslash-newline continues the logical line.
//! - Tabs advance to the next multiple of 8, matching the source language.
//! - An indentation level that matches no enclosing level dedents to the
//!   nearest enclosing one; the parser reports what falls out.

use super::raw::{to_token, RawKind, RawOrGarbage};
use super::{Token, TokenKind};
use crate::span::Span;

pub(super) fn apply(source: &str, raw: Vec<RawOrGarbage>) -> Vec<Token> {
    let mut out = Vec::new();
    let mut indents: Vec<u32> = vec![0];
    let mut depth: u32 = 0;
    let mut at_line_start = true;
    let mut pending_indent: u32 = 0;
    let mut line_start_offset: u32 = 0;
    let mut line_has_tokens = false;

    for item in raw {
        match item {
            RawOrGarbage::Raw(t) => match t.kind {
                RawKind::Whitespace => {
                    if at_line_start && depth == 0 {
                        pending_indent = measure(&source[t.span.range()], pending_indent);
                    }
                }
                RawKind::Comment => {}
                RawKind::LineContinuation => {
                    // Logical line continues; what follows is not a line start.
                    at_line_start = false;
                }
                RawKind::Newline => {
                    if depth == 0 {
                        if line_has_tokens {
                            out.push(Token::new(TokenKind::Newline, t.span));
                        }
                        at_line_start = true;
                        pending_indent = 0;
                        line_start_offset = t.span.end;
                        line_has_tokens = false;
                    }
                }
                _ => {
                    if at_line_start && depth == 0 {
                        emit_layout(&mut out, &mut indents, pending_indent, line_start_offset);
                    }
                    at_line_start = false;
                    line_has_tokens = true;
                    match t.kind {
                        RawKind::LParen | RawKind::LBracket | RawKind::LBrace => depth += 1,
                        RawKind::RParen | RawKind::RBracket | RawKind::RBrace => {
                            depth = depth.saturating_sub(1)
                        }
                        _ => {}
                    }
                    out.push(to_token(source, t));
                }
            },
            RawOrGarbage::Garbage(span) => {
                if at_line_start && depth == 0 {
                    emit_layout(&mut out, &mut indents, pending_indent, line_start_offset);
                }
                at_line_start = false;
                line_has_tokens = true;
                out.push(Token::new(TokenKind::Garbage, span));
            }
        }
    }

    let eof = Span::empty(source.len() as u32);
    if line_has_tokens {
        out.push(Token::new(TokenKind::Newline, eof));
    }
    while indents.len() > 1 {
        indents.pop();
        out.push(Token::new(TokenKind::Dedent, eof));
    }

    out
}

fn emit_layout(out: &mut Vec<Token>, indents: &mut Vec<u32>, width: u32, offset: u32) {
    let here = Span::empty(offset);
    let current = *indents.last().unwrap_or(&0);
    if width > current {
        indents.push(width);
        out.push(Token::new(TokenKind::Indent, here));
        return;
    }
    while indents.len() > 1 && width < *indents.last().unwrap_or(&0) {
        indents.pop();
        out.push(Token::new(TokenKind::Dedent, here));
    }
}

fn measure(text: &str, from: u32) -> u32 {
    let mut col = from;
    for c in text.chars() {
        match c {
            '\t' => col = (col / 8 + 1) * 8,
            _ => col += 1,
        }
    }
    col
}
