use indoc::indoc;

use super::{analyze, Analysis};
use crate::diagnostics::Code;
use crate::ir::matcher::match_module;
use crate::ir::*;
use crate::parser;

fn analyzed(source: &str) -> (IrModule, Analysis) {
    let (ast, diags) = parser::parse(source);
    assert!(!diags.has_errors(), "parse errors: {:?}", diags);
    let out = match_module(&ast);
    let mut module = out.module;
    let mut all = diags;
    all.extend(out.diags);
    let analysis = analyze(&mut module, out.scopes, all);
    (module, analysis)
}

fn func<'m>(module: &'m IrModule, name: &str) -> &'m IrFunction {
    module
        .functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function `{}`", name))
}

#[test]
fn uncaught_raise_lifts_function() {
    let (module, analysis) = analyzed(indoc! {r#"
        def validate(x: int) -> int:
            if x < 0:
                raise ValueError("neg")
            return x
    "#});
    assert!(!analysis.diags.has_errors());
    assert!(func(&module, "validate").may_raise);
}

#[test]
fn raise_at_last_statement_still_lifts() {
    let (module, _) = analyzed(indoc! {r#"
        def fail() -> None:
            raise RuntimeError("always")
    "#});
    assert!(func(&module, "fail").may_raise);
}

#[test]
fn covered_raise_does_not_lift() {
    let (module, _) = analyzed(indoc! {r#"
        def safe(x: int) -> int:
            try:
                if x < 0:
                    raise ValueError("neg")
            except ValueError:
                return 0
            return x
    "#});
    assert!(!func(&module, "safe").may_raise);
}

#[test]
fn transitive_calls_lift_to_fixed_point() {
    let (module, _) = analyzed(indoc! {r#"
        def a(x: int) -> int:
            if x < 0:
                raise ValueError("neg")
            return x

        def b(x: int) -> int:
            return a(x)

        def c(x: int) -> int:
            return b(x)

        def d(x: int) -> int:
            try:
                return c(x)
            except ValueError:
                return 0
    "#});
    assert!(func(&module, "a").may_raise);
    assert!(func(&module, "b").may_raise);
    assert!(func(&module, "c").may_raise);
    assert!(!func(&module, "d").may_raise);
}

#[test]
fn bare_except_covers_bridge_errors() {
    let (module, _) = analyzed(indoc! {"
        import pandas as pd

        def load() -> int:
            try:
                df = pd.DataFrame()
            except:
                pass
            return 0
    "});
    assert!(!func(&module, "load").may_raise);
}

#[test]
fn named_except_does_not_cover_bridge_errors() {
    let (module, _) = analyzed(indoc! {"
        import pandas as pd

        def load() -> int:
            try:
                df = pd.DataFrame()
            except ValueError:
                pass
            return 0
    "});
    assert!(func(&module, "load").may_raise);
}

#[test]
fn imports_classify_math_native_everything_else_external() {
    let (module, _) = analyzed("import math\nimport numpy as np\n");
    assert!(!module.imports[0].external);
    assert!(module.imports[1].external);
}

#[test]
fn method_call_on_external_value_is_bridge() {
    let (module, _) = analyzed(indoc! {"
        import pandas as pd

        def main() -> None:
            df = pd.DataFrame()
            df.head()
    "});
    let IrStmtKind::Expr(e) = &func(&module, "main").body[1].kind else {
        panic!("expected expression statement");
    };
    let IrExprKind::MethodCall { resolution, .. } = &e.kind else {
        panic!("expected method call");
    };
    assert_eq!(*resolution, MethodResolution::Bridge);
    assert!(e.bridge_required);
    assert!(e.may_raise);
}

#[test]
fn is_none_narrowing_records_facts() {
    let (module, analysis) = analyzed(indoc! {"
        def first(xs: list[int]) -> Optional[int]:
            return None

        def f(x: Optional[int]) -> int:
            if x is None:
                return 0
            return x
    "});
    assert!(!analysis.diags.has_errors(), "{:?}", analysis.diags);
    let IrStmtKind::If { narrow, .. } = &func(&module, "f").body[0].kind else {
        panic!("expected if");
    };
    // `x` is an int on the else side and, because the then-branch
    // returns, after the whole statement.
    assert_eq!(narrow.else_facts.len(), 1);
    assert_eq!(narrow.after_facts.len(), 1);
    assert_eq!(narrow.then_facts.len(), 0);
}

#[test]
fn type_mismatch_is_reported() {
    let (_, analysis) = analyzed(indoc! {r#"
        def f() -> int:
            x: int = 5
            x = "text"
            return x
    "#});
    assert!(analysis.diags.has_code(Code::TypeMismatch));
}

#[test]
fn unresolved_name_is_reported() {
    let (_, analysis) = analyzed("print(missing)\n");
    assert!(analysis.diags.has_code(Code::UnresolvedName));
}

#[test]
fn str_and_list_methods_resolve_natively() {
    let (module, analysis) = analyzed(indoc! {r#"
        def f() -> int:
            s: str = "hello world"
            parts = s.split(" ")
            parts.append("!")
            return len(parts)
    "#});
    assert!(!analysis.diags.has_errors(), "{:?}", analysis.diags);
    let body = &func(&module, "f").body;
    let IrStmtKind::Assign { value, .. } = &body[1].kind else {
        panic!();
    };
    assert!(matches!(
        &value.kind,
        IrExprKind::MethodCall {
            resolution: MethodResolution::StrMethod,
            ..
        }
    ));
    let IrStmtKind::Expr(e) = &body[2].kind else {
        panic!();
    };
    assert!(matches!(
        &e.kind,
        IrExprKind::MethodCall {
            resolution: MethodResolution::ListMethod,
            ..
        }
    ));
}

#[test]
fn mutating_method_marks_receiver() {
    let (module, analysis) = analyzed(indoc! {"
        class Counter:
            def __init__(self) -> None:
                self.count = 0

            def bump(self) -> None:
                self.count = self.count + 1

        def main() -> None:
            c = Counter()
            c.bump()
    "});
    assert!(
        analysis
            .classes
            .get("Counter")
            .unwrap()
            .methods
            .get("bump")
            .unwrap()
            .mutates_self
    );
    let main = func(&module, "main");
    let IrStmtKind::Assign { target, .. } = &main.body[0].kind else {
        panic!();
    };
    let IrTarget::Name { binding: Some(b), .. } = target else {
        panic!();
    };
    assert!(analysis.scopes.binding(*b).mutated);
}

#[test]
fn hoisting_discovered_for_branch_introduced_names() {
    let (module, analysis) = analyzed(indoc! {r#"
        def pick(flag: bool) -> str:
            if flag:
                result = "yes"
            else:
                result = "no"
            return result
    "#});
    let f = func(&module, "pick");
    let hoisted = analysis.scopes.hoisted_in(f.scope);
    assert_eq!(hoisted.len(), 1);
    assert_eq!(analysis.scopes.binding(hoisted[0]).name, "result");
    assert!(!analysis.scopes.binding(hoisted[0]).hoisted_optional);
}

#[test]
fn ownership_ambiguity_is_reported() {
    let (_, analysis) = analyzed(indoc! {"
        def f(xs: list[int]) -> int:
            grab = lambda: xs
            return len(xs)
    "});
    assert!(analysis.diags.has_code(Code::OwnershipAmbiguous));
}

#[test]
fn native_index_access_lifts_function() {
    let (module, _) = analyzed(indoc! {"
        def head(xs: list[int]) -> int:
            return xs[0]

        def lookup(d: dict[int, str], k: int) -> str:
            return d[k]
    "});
    assert!(func(&module, "head").may_raise);
    assert!(func(&module, "lookup").may_raise);
}

#[test]
fn covered_index_error_does_not_lift() {
    let (module, _) = analyzed(indoc! {"
        def head_or_zero(xs: list[int]) -> int:
            try:
                return xs[0]
            except IndexError:
                return 0
    "});
    assert!(!func(&module, "head_or_zero").may_raise);
}

#[test]
fn fallible_list_methods_lift_function() {
    let (module, _) = analyzed(indoc! {"
        def last(xs: list[int]) -> int:
            return xs.pop()
    "});
    assert!(func(&module, "last").may_raise);
}

#[test]
fn int_conversion_of_text_may_raise() {
    let (module, _) = analyzed(indoc! {r#"
        def parse(s: str) -> int:
            return int(s)
    "#});
    assert!(func(&module, "parse").may_raise);
}
