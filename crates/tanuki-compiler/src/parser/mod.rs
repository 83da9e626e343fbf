//! Recursive-descent parser for the typed Python subset.
//!
//! Consumes the layout-processed token stream and builds the plain AST in
//! [`crate::ast`]. Syntax errors never abort: the parser records a
//! diagnostic and resynchronizes at the next statement boundary.

mod core;
mod expressions;
mod statements;

#[cfg(test)]
mod tests;

use crate::ast::Module;
use crate::diagnostics::Diagnostics;
use crate::lexer;

pub(crate) use core::Parser;

/// Parses a whole source file.
pub fn parse(source: &str) -> (Module, Diagnostics) {
    let tokens = lexer::lex(source);
    let mut parser = Parser::new(source, tokens);
    let module = parser.module();
    (module, parser.finish())
}

/// Parses a single embedded expression (an f-string interpolation).
///
/// `offset` shifts token spans so diagnostics point into the enclosing
/// source.
pub(crate) fn parse_embedded_expr(
    source: &str,
    fragment: &str,
    offset: u32,
) -> (crate::ast::Expr, Diagnostics) {
    let mut tokens = lexer::lex(fragment);
    for t in &mut tokens {
        t.span = crate::span::Span::new(t.span.start + offset, t.span.end + offset);
    }
    // Drop the layout tokens a bare fragment acquires.
    tokens.retain(|t| {
        !matches!(
            t.kind,
            lexer::TokenKind::Newline | lexer::TokenKind::Indent | lexer::TokenKind::Dedent
        )
    });
    let mut parser = Parser::new(source, tokens);
    let expr = parser.expression();
    (expr, parser.finish())
}
