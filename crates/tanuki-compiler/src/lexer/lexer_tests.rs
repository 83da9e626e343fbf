use indoc::indoc;

use super::{lex, split_fstring, token_text, unquote, FStringPiece, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).into_iter().map(|t| t.kind).collect()
}

#[test]
fn simple_statement() {
    use TokenKind::*;
    assert_eq!(
        kinds("x = 1 + 2\n"),
        vec![Name, Assign, Int, Plus, Int, Newline]
    );
}

#[test]
fn keywords_are_distinguished() {
    use TokenKind::*;
    assert_eq!(
        kinds("def f(): return None\n"),
        vec![KwDef, Name, LParen, RParen, Colon, KwReturn, KwNone, Newline]
    );
}

#[test]
fn indent_dedent_blocks() {
    use TokenKind::*;
    let source = indoc! {"
        if x:
            y = 1
        z = 2
    "};
    assert_eq!(
        kinds(source),
        vec![
            KwIf, Name, Colon, Newline, //
            Indent, Name, Assign, Int, Newline, //
            Dedent, Name, Assign, Int, Newline,
        ]
    );
}

#[test]
fn nested_blocks_dedent_together() {
    use TokenKind::*;
    let source = indoc! {"
        if a:
            if b:
                x = 1
        y = 2
    "};
    let got = kinds(source);
    let dedents = got.iter().filter(|k| **k == Dedent).count();
    let indents = got.iter().filter(|k| **k == Indent).count();
    assert_eq!(indents, 2);
    assert_eq!(dedents, 2);
}

#[test]
fn blank_and_comment_lines_are_invisible() {
    use TokenKind::*;
    let source = indoc! {"
        x = 1

        # a comment
        y = 2
    "};
    assert_eq!(
        kinds(source),
        vec![Name, Assign, Int, Newline, Name, Assign, Int, Newline]
    );
}

#[test]
fn newlines_suppressed_inside_brackets() {
    use TokenKind::*;
    let source = "xs = [\n    1,\n    2,\n]\n";
    assert_eq!(
        kinds(source),
        vec![Name, Assign, LBracket, Int, Comma, Int, Comma, RBracket, Newline]
    );
}

#[test]
fn dedents_emitted_at_eof() {
    use TokenKind::*;
    let source = "if x:\n    y = 1";
    let got = kinds(source);
    assert_eq!(got.last(), Some(&Dedent));
    assert!(got.contains(&Newline));
}

#[test]
fn numeric_literal_kinds() {
    use TokenKind::*;
    assert_eq!(
        kinds("1 0b1010 0o77 0xFF 1_000 3.14 1e9 2.5e-3\n"),
        vec![Int, Int, Int, Int, Int, Float, Float, Float, Newline]
    );
}

#[test]
fn operators_longest_match() {
    use TokenKind::*;
    assert_eq!(
        kinds("a **= 2 ** 3 // 4 << 1\n"),
        vec![Name, DoubleStarAssign, Int, DoubleStar, Int, DoubleSlash, Int, Shl, Int, Newline]
    );
}

#[test]
fn string_and_fstring_tokens() {
    use TokenKind::*;
    assert_eq!(
        kinds("s = \"hi\"\nt = f\"{x}!\"\n"),
        vec![Name, Assign, Str, Newline, Name, Assign, FStr, Newline]
    );
}

#[test]
fn triple_quoted_string_spans_lines() {
    use TokenKind::*;
    let source = "s = \"\"\"line one\nline two\"\"\"\nx = 1\n";
    let toks = lex(source);
    assert_eq!(toks[2].kind, Str);
    assert!(token_text(source, &toks[2]).contains("line two"));
    // The newline inside the string must not produce layout tokens.
    assert_eq!(toks.iter().filter(|t| t.kind == Newline).count(), 2);
}

#[test]
fn garbage_is_coalesced() {
    use TokenKind::*;
    let got = kinds("x = §§§ + 1\n");
    assert_eq!(got, vec![Name, Assign, Garbage, Plus, Int, Newline]);
}

#[test]
fn unquote_processes_escapes() {
    assert_eq!(unquote(r#""a\nb""#), "a\nb");
    assert_eq!(unquote(r#"'it\'s'"#), "it's");
    assert_eq!(unquote("\"\"\"raw\"\"\""), "raw");
}

#[test]
fn fstring_split_literals_and_exprs() {
    let pieces = split_fstring(r#"f"{i}: {name}""#, 0);
    assert_eq!(
        pieces,
        vec![
            FStringPiece::Expr {
                source: "i".into(),
                offset: 3
            },
            FStringPiece::Literal(": ".into()),
            FStringPiece::Expr {
                source: "name".into(),
                offset: 8
            },
        ]
    );
}

#[test]
fn fstring_double_braces_are_literal() {
    let pieces = split_fstring(r#"f"{{x}}""#, 0);
    assert_eq!(pieces, vec![FStringPiece::Literal("{x}".into())]);
}

#[test]
fn fstring_nested_subscript() {
    let pieces = split_fstring(r#"f"{d['k']}!""#, 0);
    assert_eq!(
        pieces,
        vec![
            FStringPiece::Expr {
                source: "d['k']".into(),
                offset: 3
            },
            FStringPiece::Literal("!".into()),
        ]
    );
}
