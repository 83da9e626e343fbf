//! String literal decoding: quote stripping, escape processing, and
//! f-string interpolation splitting.
//!
//! The raw lexer keeps every string as one token; the parser calls into
//! this module to get the literal's value, and for f-strings the sequence
//! of literal runs and embedded expression sources.

/// One piece of an f-string body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FStringPiece {
    /// Literal text, escapes already processed.
    Literal(String),
    /// An embedded `{expression}`. `offset` is the byte offset of the
    /// expression text in the original source, for diagnostics.
    Expr { source: String, offset: u32 },
}

/// Strips the `f`/`F` prefix and the surrounding quotes, returning the body
/// and its offset from the token start.
fn strip_quotes(text: &str) -> (&str, u32) {
    let (text, mut skip) = match text.as_bytes().first() {
        Some(b'f') | Some(b'F') => (&text[1..], 1u32),
        _ => (text, 0),
    };
    for q in ["\"\"\"", "'''"] {
        if text.starts_with(q) && text.ends_with(q) && text.len() >= 6 {
            skip += 3;
            return (&text[3..text.len() - 3], skip);
        }
    }
    // Single-character quote; the lexer guarantees both ends exist.
    if text.len() >= 2 {
        skip += 1;
        (&text[1..text.len() - 1], skip)
    } else {
        (text, skip)
    }
}

/// Decodes a plain (non-f) string literal token into its value.
pub fn unquote(text: &str) -> String {
    let (body, _) = strip_quotes(text);
    unescape(body)
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                // Unknown escapes pass through verbatim, backslash included.
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits an f-string token into literal runs and embedded expressions.
///
/// `token_start` is the token's byte offset in the source; embedded
/// expression pieces carry absolute offsets computed from it. `{{` and
/// `}}` are literal braces. Nested brackets and string quotes inside an
/// expression are tracked so `{d[\"k\"]}` splits correctly.
pub fn split_fstring(text: &str, token_start: u32) -> Vec<FStringPiece> {
    let (body, body_skip) = strip_quotes(text);
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let bytes = body.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if i + 1 < bytes.len() && bytes[i + 1] == b'{' => {
                literal.push('{');
                i += 2;
            }
            b'}' if i + 1 < bytes.len() && bytes[i + 1] == b'}' => {
                literal.push('}');
                i += 2;
            }
            b'{' => {
                if !literal.is_empty() {
                    pieces.push(FStringPiece::Literal(unescape(&literal)));
                    literal.clear();
                }
                let expr_start = i + 1;
                let expr_end = find_closing_brace(body, expr_start);
                pieces.push(FStringPiece::Expr {
                    source: body[expr_start..expr_end].to_string(),
                    offset: token_start + body_skip + expr_start as u32,
                });
                i = (expr_end + 1).min(bytes.len());
            }
            _ => {
                let c = body[i..].chars().next().unwrap_or('\u{FFFD}');
                literal.push(c);
                i += c.len_utf8();
            }
        }
    }

    if !literal.is_empty() {
        pieces.push(FStringPiece::Literal(unescape(&literal)));
    }

    pieces
}

/// Scans forward from `start` to the `}` closing an interpolation,
/// skipping nested brackets and quoted strings.
fn find_closing_brace(body: &str, start: usize) -> usize {
    let bytes = body.as_bytes();
    let mut depth = 0u32;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'[' | b'(' => depth += 1,
            b'}' if depth == 0 => return i,
            b'}' | b']' | b')' => depth = depth.saturating_sub(1),
            q @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != q {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}
