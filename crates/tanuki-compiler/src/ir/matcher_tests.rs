use indoc::indoc;

use super::matcher::{match_module, MatchOutput};
use super::*;
use crate::diagnostics::Code;
use crate::parser;

fn matched(source: &str) -> MatchOutput {
    let (module, diags) = parser::parse(source);
    assert!(!diags.has_errors(), "parse errors: {:?}", diags);
    match_module(&module)
}

#[test]
fn main_guard_becomes_entry_carrier() {
    let out = matched(indoc! {r#"
        def main() -> None:
            pass

        if __name__ == "__main__":
            main()
    "#});
    assert!(out.module.entry.is_some());
    assert_eq!(out.module.functions.len(), 1);
    assert!(out.module.setup.is_empty());
}

#[test]
fn top_level_statements_accumulate_into_setup() {
    let out = matched(indoc! {r#"
        limit: int = 10
        print(limit)

        if __name__ == "__main__":
            pass
    "#});
    assert_eq!(out.module.setup.len(), 2);
    assert!(out.module.entry.is_some());
}

#[test]
fn range_call_matches_specialized_variant() {
    let out = matched("for i in range(1, 16):\n    print(i)\n");
    let IrStmtKind::For { iter, .. } = &out.module.setup[0].kind else {
        panic!("expected for");
    };
    assert!(matches!(iter.kind, IrExprKind::Range { .. }));
}

#[test]
fn range_shadowed_by_user_function_stays_generic() {
    let out = matched(indoc! {"
        def range(n: int) -> int:
            return n

        x = range(5)
    "});
    let IrStmtKind::Assign { value, .. } = &out.module.setup[0].kind else {
        panic!("expected assign");
    };
    assert!(matches!(
        value.kind,
        IrExprKind::Call {
            resolution: CallResolution::UserFunction,
            ..
        }
    ));
}

#[test]
fn print_and_len_match_builtins() {
    let out = matched("print(len(xs))\n");
    let IrStmtKind::Expr(e) = &out.module.setup[0].kind else {
        panic!();
    };
    let IrExprKind::Builtin { builtin, args } = &e.kind else {
        panic!("expected builtin");
    };
    assert_eq!(*builtin, Builtin::Print);
    assert!(matches!(
        args[0].kind,
        IrExprKind::Builtin {
            builtin: Builtin::Len,
            ..
        }
    ));
}

#[test]
fn tuple_swap_is_temporary_free() {
    let out = matched("a = 1\nb = 2\na, b = b, a\n");
    assert!(matches!(out.module.setup[2].kind, IrStmtKind::Swap { .. }));
}

#[test]
fn tuple_unpack_with_starred_rest() {
    let out = matched("first, *rest = items\n");
    let IrStmtKind::Unpack { targets, starred, .. } = &out.module.setup[0].kind else {
        panic!("expected unpack");
    };
    assert_eq!(targets.len(), 2);
    assert_eq!(*starred, Some(1));
}

#[test]
fn unsupported_builtin_elides_subtree() {
    let out = matched("x = eval(\"1+1\")\n");
    assert!(out.diags.has_code(Code::UnsupportedSyntax));
    let IrStmtKind::Assign { value, .. } = &out.module.setup[0].kind else {
        panic!();
    };
    assert!(matches!(value.kind, IrExprKind::Elided));
}

#[test]
fn import_rooted_call_is_external() {
    let out = matched("import numpy as np\nxs = np.array(1)\n");
    assert_eq!(out.module.imports.len(), 1);
    let IrStmtKind::Assign { value, .. } = &out.module.setup[0].kind else {
        panic!();
    };
    let IrExprKind::Call { resolution, .. } = &value.kind else {
        panic!("expected call");
    };
    assert_eq!(*resolution, CallResolution::External("numpy.array".into()));
}

#[test]
fn from_import_function_is_external_path() {
    let out = matched("from sklearn.cluster import KMeans\nm = KMeans(n_clusters=2)\n");
    let IrStmtKind::Assign { value, .. } = &out.module.setup[0].kind else {
        panic!();
    };
    let IrExprKind::Call { resolution, .. } = &value.kind else {
        panic!();
    };
    assert_eq!(
        *resolution,
        CallResolution::External("sklearn.cluster.KMeans".into())
    );
}

#[test]
fn math_calls_stay_native() {
    let out = matched("import math\nr = math.sqrt(2.0)\n");
    let IrStmtKind::Assign { value, .. } = &out.module.setup[0].kind else {
        panic!();
    };
    assert!(matches!(
        &value.kind,
        IrExprKind::MethodCall {
            resolution: MethodResolution::MathModule,
            method,
            ..
        } if method == "sqrt"
    ));
}

#[test]
fn class_with_annotated_fields() {
    let out = matched(indoc! {"
        @dataclass
        class Point:
            x: int
            y: int
    "});
    let class = &out.module.classes[0];
    assert!(class.dataclass);
    assert_eq!(class.fields.len(), 2);
    assert_eq!(class.fields[0].name, "x");
}

#[test]
fn init_assignments_become_fields() {
    let out = matched(indoc! {"
        class Counter:
            def __init__(self, start: int) -> None:
                self.count = start
    "});
    let class = &out.module.classes[0];
    assert_eq!(class.fields.len(), 1);
    assert_eq!(class.fields[0].name, "count");
    assert_eq!(class.fields[0].ty, crate::analyze::types::Type::Int);
}

#[test]
fn magic_method_override_is_refused() {
    let out = matched(indoc! {"
        class Bad:
            def __len__(self) -> int:
                return 0
    "});
    assert!(out.diags.has_code(Code::UnsupportedSyntax));
    assert!(out.module.classes[0].methods.is_empty());
}

#[test]
fn multiple_inheritance_is_refused() {
    let out = matched(indoc! {"
        class A:
            pass

        class B:
            pass

        class C(A, B):
            pass
    "});
    assert!(out.diags.has_code(Code::UnsupportedSyntax));
}

#[test]
fn super_method_call_matches() {
    let out = matched(indoc! {"
        class Base:
            def greet(self) -> str:
                return \"base\"

        class Child(Base):
            def greet(self) -> str:
                return super().greet()
    "});
    let child = &out.module.classes[1];
    let IrStmtKind::Return(Some(value)) = &child.methods[0].body[0].kind else {
        panic!("expected return");
    };
    let IrExprKind::MethodCall { recv, .. } = &value.kind else {
        panic!("expected method call");
    };
    assert!(matches!(recv.kind, IrExprKind::Super));
}

#[test]
fn raise_forms() {
    let out = matched(indoc! {r#"
        try:
            raise ValueError("neg")
        except ValueError as e:
            raise RuntimeError("bad") from e
    "#});
    let IrStmtKind::Try { body, handlers, .. } = &out.module.setup[0].kind else {
        panic!();
    };
    let IrStmtKind::Raise { kind, message, .. } = &body[0].kind else {
        panic!("expected raise");
    };
    assert_eq!(kind, "ValueError");
    assert!(message.is_some());

    let IrStmtKind::Raise { kind, cause, .. } = &handlers[0].body[0].kind else {
        panic!("expected raise-from");
    };
    assert_eq!(kind, "RuntimeError");
    assert!(cause.is_some());
}

#[test]
fn bare_raise_rebinds_handler_error() {
    let out = matched(indoc! {r#"
        try:
            risky()
        except Exception as e:
            raise
    "#});
    let IrStmtKind::Try { handlers, .. } = &out.module.setup[0].kind else {
        panic!();
    };
    let IrStmtKind::Raise { reraise, .. } = &handlers[0].body[0].kind else {
        panic!("expected re-raise");
    };
    assert!(reraise.is_some());
}

#[test]
fn loop_variable_homes_to_enclosing_function() {
    let out = matched(indoc! {"
        def f() -> int:
            for i in range(3):
                pass
            return i
    "});
    let func = &out.module.functions[0];
    let binding = out
        .scopes
        .lookup("i", func.scope)
        .expect("loop variable visible after the loop");
    assert_eq!(out.scopes.binding(binding).scope, func.scope);
}

#[test]
fn comprehension_scope_is_separate() {
    let out = matched("squares = [x * x for x in range(5)]\n");
    // `x` must not leak into the module scope.
    assert!(out
        .scopes
        .lookup("x", crate::analyze::scope::ScopeTree::MODULE)
        .is_none());
}

#[test]
fn docstrings_are_dropped() {
    let out = matched(indoc! {r#"
        def f() -> int:
            """Docstring."""
            return 1
    "#});
    assert_eq!(out.module.functions[0].body.len(), 1);
}
