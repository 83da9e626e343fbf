//! Lexer for the typed Python subset.
//!
//! Two stages:
//! 1. A `logos`-derived raw scan producing span-based tokens (text is
//!    sliced from the source only when needed).
//! 2. A layout pass ([`layout`]) that measures leading whitespace and
//!    rewrites the raw stream into a structure-bearing stream with
//!    `Newline`, `Indent`, and `Dedent` tokens, suppressed inside
//!    brackets and on blank or comment-only lines.
//!
//! Malformed input never aborts the scan: unrecognized bytes become
//! `Garbage` tokens for the parser to report.

mod fstring;
mod layout;
mod raw;

#[cfg(test)]
mod lexer_tests;

pub use fstring::{split_fstring, unquote, FStringPiece};

use crate::span::Span;

/// Token kinds after the layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Layout
    Newline,
    Indent,
    Dedent,

    // Atoms
    Name,
    Int,
    Float,
    Str,
    FStr,

    // Keywords
    KwDef,
    KwClass,
    KwReturn,
    KwIf,
    KwElif,
    KwElse,
    KwFor,
    KwWhile,
    KwIn,
    KwNot,
    KwAnd,
    KwOr,
    KwIs,
    KwNone,
    KwTrue,
    KwFalse,
    KwImport,
    KwFrom,
    KwAs,
    KwTry,
    KwExcept,
    KwFinally,
    KwRaise,
    KwPass,
    KwBreak,
    KwContinue,
    KwLambda,
    KwWith,
    // Recognized so the matcher can refuse them with a precise message.
    KwDel,
    KwGlobal,
    KwNonlocal,
    KwAssert,
    KwYield,
    KwAsync,
    KwAwait,

    // Operators and punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    Assign,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    At,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Walrus,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DoubleSlashAssign,
    PercentAssign,
    DoubleStarAssign,
    ShlAssign,
    ShrAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    AtAssign,

    /// Unrecognized input, coalesced.
    Garbage,

    /// End of input; produced by the parser's cursor, never by the lexer.
    Eof,
}

impl TokenKind {
    /// Keyword lookup for an identifier's text.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "def" => TokenKind::KwDef,
            "class" => TokenKind::KwClass,
            "return" => TokenKind::KwReturn,
            "if" => TokenKind::KwIf,
            "elif" => TokenKind::KwElif,
            "else" => TokenKind::KwElse,
            "for" => TokenKind::KwFor,
            "while" => TokenKind::KwWhile,
            "in" => TokenKind::KwIn,
            "not" => TokenKind::KwNot,
            "and" => TokenKind::KwAnd,
            "or" => TokenKind::KwOr,
            "is" => TokenKind::KwIs,
            "None" => TokenKind::KwNone,
            "True" => TokenKind::KwTrue,
            "False" => TokenKind::KwFalse,
            "import" => TokenKind::KwImport,
            "from" => TokenKind::KwFrom,
            "as" => TokenKind::KwAs,
            "try" => TokenKind::KwTry,
            "except" => TokenKind::KwExcept,
            "finally" => TokenKind::KwFinally,
            "raise" => TokenKind::KwRaise,
            "pass" => TokenKind::KwPass,
            "break" => TokenKind::KwBreak,
            "continue" => TokenKind::KwContinue,
            "lambda" => TokenKind::KwLambda,
            "with" => TokenKind::KwWith,
            "del" => TokenKind::KwDel,
            "global" => TokenKind::KwGlobal,
            "nonlocal" => TokenKind::KwNonlocal,
            "assert" => TokenKind::KwAssert,
            "yield" => TokenKind::KwYield,
            "async" => TokenKind::KwAsync,
            "await" => TokenKind::KwAwait,
            _ => return None,
        })
    }

    pub fn is_augmented_assign(self) -> bool {
        matches!(
            self,
            TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::DoubleSlashAssign
                | TokenKind::PercentAssign
                | TokenKind::DoubleStarAssign
                | TokenKind::ShlAssign
                | TokenKind::ShrAssign
                | TokenKind::AmpAssign
                | TokenKind::PipeAssign
                | TokenKind::CaretAssign
                | TokenKind::AtAssign
        )
    }
}

/// Zero-copy token: kind + span, text retrieved via [`token_text`] when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'src>(source: &'src str, token: &Token) -> &'src str {
    &source[token.span.range()]
}

/// Tokenizes source into a layout-processed token stream.
pub fn lex(source: &str) -> Vec<Token> {
    let raw = raw::scan(source);
    layout::apply(source, raw)
}
