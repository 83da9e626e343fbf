use indoc::indoc;

use crate::{compile, Code};

#[test]
fn successful_compile_yields_code_and_no_errors() {
    let out = compile("print(1 + 2)\n");
    assert!(out.is_success());
    assert!(!out.diagnostics.has_errors());
    assert!(out.code.unwrap().contains("fn main()"));
}

#[test]
fn errors_suppress_code_emission() {
    let out = compile("x = eval(\"boom\")\n");
    assert!(!out.is_success());
    assert!(out.code.is_none());
    assert!(out.diagnostics.has_code(Code::UnsupportedSyntax));
}

#[test]
fn syntax_errors_recover_and_report_positions() {
    let source = "def broken(:\n    pass\ny = = 2\n";
    let out = compile(source);
    assert!(!out.is_success());
    assert!(out.diagnostics.error_count() >= 2);

    let rendered = out.diagnostics.printer().source(source).path("prog.py").render();
    assert!(rendered.contains("prog.py"));
}

#[test]
fn external_imports_are_surfaced_for_manifests() {
    let out = compile(indoc! {"
        import math
        import pandas as pd
        from sklearn.cluster import KMeans

        print(1)
    "});
    assert!(out.is_success());
    assert_eq!(out.external_imports, vec!["pandas", "sklearn.cluster"]);
}

#[test]
fn unsupported_constructs_never_silently_pass() {
    for source in [
        "x = getattr(obj, \"a\")\n",
        "m = memoryview(b)\n",
        "buf = bytearray(4)\n",
        "exec(\"pass\")\n",
        "g = globals()\n",
        "l = locals()\n",
    ] {
        let out = compile(source);
        assert!(
            out.diagnostics.has_code(Code::UnsupportedSyntax),
            "expected a diagnostic for {source:?}"
        );
    }
}
