use super::{Code, DiagnosticMessage, Diagnostics};
use crate::span::Span;

#[test]
fn plain_message_format() {
    let msg = DiagnosticMessage::error(
        Code::TypeMismatch,
        Span::new(10, 14),
        "expected `int`, found `str`",
    );
    insta::assert_snapshot!(
        msg.to_string(),
        @"error[TNK-TYPE-MISMATCH]: expected `int`, found `str` at 10..14"
    );
}

#[test]
fn warning_message_format() {
    let msg = DiagnosticMessage::warning(Code::UnresolvedName, Span::new(0, 3), "never used");
    insta::assert_snapshot!(
        msg.to_string(),
        @"warning[TNK-UNRESOLVED-NAME]: never used at 0..3"
    );
}

#[test]
fn collects_and_counts() {
    let mut diag = Diagnostics::new();
    assert!(diag.is_empty());

    diag.error(Code::Syntax, "expected ':'", Span::new(4, 5)).emit();
    diag.warning(Code::UnresolvedName, "unused binding", Span::new(0, 1))
        .emit();

    assert_eq!(diag.len(), 2);
    assert!(diag.has_errors());
    assert_eq!(diag.error_count(), 1);
    assert!(diag.has_code(Code::Syntax));
    assert!(!diag.has_code(Code::TypeMismatch));
}

#[test]
fn plain_rendering_without_source() {
    let mut diag = Diagnostics::new();
    diag.error(Code::UnsupportedSyntax, "`eval` is not supported", Span::new(0, 4))
        .emit();

    let out = diag.printer().render();
    assert!(out.contains("TNK-UNSUPPORTED-SYNTAX"));
    assert!(out.contains("`eval` is not supported"));
    assert!(out.ends_with("1 error emitted"));
}

#[test]
fn summary_line_counts_errors_only() {
    let mut diag = Diagnostics::new();
    diag.error(Code::Syntax, "one", Span::new(0, 1)).emit();
    diag.error(Code::TypeMismatch, "two", Span::new(2, 3)).emit();
    diag.warning(Code::UnresolvedName, "just a warning", Span::new(4, 5))
        .emit();
    assert!(diag.printer().render().ends_with("2 errors emitted"));

    let mut warnings_only = Diagnostics::new();
    warnings_only
        .warning(Code::UnresolvedName, "unused", Span::new(0, 1))
        .emit();
    assert!(!warnings_only.printer().render().contains("emitted"));
}

#[test]
fn snippet_rendering_includes_code_and_caret() {
    let source = "x = eval(\"1+1\")\n";
    let mut diag = Diagnostics::new();
    diag.error(Code::UnsupportedSyntax, "`eval` is not supported", Span::new(4, 8))
        .emit();

    let out = diag.printer().source(source).path("prog.py").render();
    assert!(out.contains("TNK-UNSUPPORTED-SYNTAX"));
    assert!(out.contains("prog.py"));
    assert!(out.contains("eval"));
}

#[test]
fn extend_merges() {
    let mut a = Diagnostics::new();
    a.error(Code::Syntax, "one", Span::new(0, 1)).emit();
    let mut b = Diagnostics::new();
    b.error(Code::TypeMismatch, "two", Span::new(1, 2)).emit();
    a.extend(b);
    assert_eq!(a.len(), 2);
}
