//! Raw `logos` scan, before the layout pass.

use logos::Logos;

use super::{Token, TokenKind};
use crate::span::Span;

/// Raw token kinds. Whitespace, comments, and line continuations are kept
/// so the layout pass can measure indentation; they never reach the parser.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RawKind {
    #[regex(r"[ \t]+")]
    Whitespace,

    #[regex(r"#[^\n]*", allow_greedy = true)]
    Comment,

    #[regex(r"\\\r?\n")]
    LineContinuation,

    #[token("\n")]
    #[token("\r\n")]
    Newline,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // Order matters: floats before ints so `1.5` is not lexed as `1` `.` `5`.
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+")]
    Float,

    #[regex(r"0[bB][01_]+")]
    #[regex(r"0[oO][0-7_]+")]
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"[0-9][0-9_]*")]
    Int,

    // Triple-quoted strings first so they win over the single-quoted rules.
    #[regex(r#"[fF]?"""([^"]|"[^"]|""[^"])*""""#)]
    #[regex(r"[fF]?'''([^']|'[^']|''[^'])*'''")]
    TripleStr,

    #[regex(r#"[fF]?"([^"\\\n]|\\.)*""#)]
    #[regex(r"[fF]?'([^'\\\n]|\\.)*'")]
    Str,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token(":=")]
    Walrus,
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("**=")]
    DoubleStarAssign,
    #[token("*=")]
    StarAssign,
    #[token("//=")]
    DoubleSlashAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("&=")]
    AmpAssign,
    #[token("|=")]
    PipeAssign,
    #[token("^=")]
    CaretAssign,
    #[token("@=")]
    AtAssign,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("**")]
    DoubleStar,
    #[token("*")]
    Star,
    #[token("//")]
    DoubleSlash,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("@")]
    At,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
}

/// A raw token destined for the layout pass.
#[derive(Debug, Clone, Copy)]
pub(super) struct RawToken {
    pub kind: RawKind,
    pub span: Span,
}

/// Scans the whole source, coalescing consecutive error characters into
/// single garbage spans (kept as `RawKind::Whitespace`-free entries with a
/// sentinel handled by the layout pass).
pub(super) fn scan(source: &str) -> Vec<RawOrGarbage> {
    let mut out = Vec::new();
    let mut lexer = RawKind::lexer(source);
    let mut garbage_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = garbage_start.take() {
                    out.push(RawOrGarbage::Garbage(Span::new(
                        start as u32,
                        lexer.span().start as u32,
                    )));
                }
                out.push(RawOrGarbage::Raw(RawToken {
                    kind,
                    span: lexer.span().into(),
                }));
            }
            Some(Err(())) => {
                if garbage_start.is_none() {
                    garbage_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = garbage_start.take() {
                    out.push(RawOrGarbage::Garbage(Span::new(
                        start as u32,
                        source.len() as u32,
                    )));
                }
                break;
            }
        }
    }

    out
}

#[derive(Debug, Clone, Copy)]
pub(super) enum RawOrGarbage {
    Raw(RawToken),
    Garbage(Span),
}

/// Maps a raw token to its parser-facing kind. Layout kinds are handled in
/// the layout pass; trivia never reaches here.
pub(super) fn to_token(source: &str, raw: RawToken) -> Token {
    let kind = match raw.kind {
        RawKind::Ident => {
            let text = &source[raw.span.range()];
            TokenKind::keyword(text).unwrap_or(TokenKind::Name)
        }
        RawKind::Int => TokenKind::Int,
        RawKind::Float => TokenKind::Float,
        RawKind::Str | RawKind::TripleStr => {
            let text = &source[raw.span.range()];
            if text.starts_with('f') || text.starts_with('F') {
                TokenKind::FStr
            } else {
                TokenKind::Str
            }
        }
        RawKind::LParen => TokenKind::LParen,
        RawKind::RParen => TokenKind::RParen,
        RawKind::LBracket => TokenKind::LBracket,
        RawKind::RBracket => TokenKind::RBracket,
        RawKind::LBrace => TokenKind::LBrace,
        RawKind::RBrace => TokenKind::RBrace,
        RawKind::Comma => TokenKind::Comma,
        RawKind::Colon => TokenKind::Colon,
        RawKind::Semicolon => TokenKind::Semicolon,
        RawKind::Dot => TokenKind::Dot,
        RawKind::Arrow => TokenKind::Arrow,
        RawKind::Walrus => TokenKind::Walrus,
        RawKind::Eq => TokenKind::Eq,
        RawKind::NotEq => TokenKind::NotEq,
        RawKind::LtEq => TokenKind::LtEq,
        RawKind::GtEq => TokenKind::GtEq,
        RawKind::Lt => TokenKind::Lt,
        RawKind::Gt => TokenKind::Gt,
        RawKind::Shl => TokenKind::Shl,
        RawKind::Shr => TokenKind::Shr,
        RawKind::Assign => TokenKind::Assign,
        RawKind::Plus => TokenKind::Plus,
        RawKind::Minus => TokenKind::Minus,
        RawKind::Star => TokenKind::Star,
        RawKind::DoubleStar => TokenKind::DoubleStar,
        RawKind::Slash => TokenKind::Slash,
        RawKind::DoubleSlash => TokenKind::DoubleSlash,
        RawKind::Percent => TokenKind::Percent,
        RawKind::At => TokenKind::At,
        RawKind::Amp => TokenKind::Amp,
        RawKind::Pipe => TokenKind::Pipe,
        RawKind::Caret => TokenKind::Caret,
        RawKind::Tilde => TokenKind::Tilde,
        RawKind::PlusAssign => TokenKind::PlusAssign,
        RawKind::MinusAssign => TokenKind::MinusAssign,
        RawKind::StarAssign => TokenKind::StarAssign,
        RawKind::SlashAssign => TokenKind::SlashAssign,
        RawKind::DoubleSlashAssign => TokenKind::DoubleSlashAssign,
        RawKind::PercentAssign => TokenKind::PercentAssign,
        RawKind::DoubleStarAssign => TokenKind::DoubleStarAssign,
        RawKind::ShlAssign => TokenKind::ShlAssign,
        RawKind::ShrAssign => TokenKind::ShrAssign,
        RawKind::AmpAssign => TokenKind::AmpAssign,
        RawKind::PipeAssign => TokenKind::PipeAssign,
        RawKind::CaretAssign => TokenKind::CaretAssign,
        RawKind::AtAssign => TokenKind::AtAssign,
        RawKind::Whitespace | RawKind::Comment | RawKind::LineContinuation | RawKind::Newline => {
            unreachable!("trivia handled by layout pass")
        }
    };
    Token::new(kind, raw.span)
}
