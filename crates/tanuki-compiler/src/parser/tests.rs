use indoc::indoc;

use super::parse;
use crate::ast::*;

fn parse_ok(source: &str) -> Module {
    let (module, diags) = parse(source);
    assert!(!diags.has_errors(), "unexpected diagnostics: {:?}", diags);
    module
}

fn first_stmt(source: &str) -> Stmt {
    let mut module = parse_ok(source);
    assert!(!module.body.is_empty(), "no statements parsed");
    module.body.remove(0)
}

#[test]
fn function_def_with_annotations() {
    let stmt = first_stmt(indoc! {"
        def add(a: int, b: int = 0) -> int:
            return a + b
    "});
    let StmtKind::FunctionDef(f) = stmt.kind else {
        panic!("expected function def");
    };
    assert_eq!(f.name, "add");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[0].name, "a");
    assert!(f.params[0].annotation.is_some());
    assert!(f.params[1].default.is_some());
    assert!(f.returns.is_some());
    assert_eq!(f.body.len(), 1);
    assert!(matches!(f.body[0].kind, StmtKind::Return(Some(_))));
}

#[test]
fn star_args_parameter() {
    let stmt = first_stmt("def f(*values: int) -> int:\n    return 0\n");
    let StmtKind::FunctionDef(f) = stmt.kind else {
        panic!("expected function def");
    };
    assert!(f.params[0].starred);
}

#[test]
fn elif_chain_desugars_to_nested_if() {
    let stmt = first_stmt(indoc! {"
        if a:
            x = 1
        elif b:
            x = 2
        else:
            x = 3
    "});
    let StmtKind::If { orelse, .. } = stmt.kind else {
        panic!("expected if");
    };
    assert_eq!(orelse.len(), 1);
    let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else {
        panic!("expected nested if for elif");
    };
    assert_eq!(inner.len(), 1);
}

#[test]
fn try_except_else_finally() {
    let stmt = first_stmt(indoc! {r#"
        try:
            risky()
        except ValueError as e:
            handle(e)
        except:
            pass
        else:
            ok()
        finally:
            cleanup()
    "#});
    let StmtKind::Try {
        handlers,
        orelse,
        finalbody,
        ..
    } = stmt.kind
    else {
        panic!("expected try");
    };
    assert_eq!(handlers.len(), 2);
    assert!(handlers[0].ty.is_some());
    assert_eq!(handlers[0].name.as_deref(), Some("e"));
    assert!(handlers[1].ty.is_none());
    assert_eq!(orelse.len(), 1);
    assert_eq!(finalbody.len(), 1);
}

#[test]
fn raise_from() {
    let stmt = first_stmt("raise RuntimeError(\"bad\") from e\n");
    let StmtKind::Raise { exc, cause } = stmt.kind else {
        panic!("expected raise");
    };
    assert!(exc.is_some());
    assert!(cause.is_some());
}

#[test]
fn annotated_assignment() {
    let stmt = first_stmt("total: int = 0\n");
    let StmtKind::AnnAssign {
        target,
        annotation,
        value,
    } = stmt.kind
    else {
        panic!("expected annotated assignment");
    };
    assert!(matches!(target.kind, ExprKind::Name(ref n) if n == "total"));
    assert!(matches!(annotation.kind, ExprKind::Name(ref n) if n == "int"));
    assert!(value.is_some());
}

#[test]
fn augmented_assignment() {
    let stmt = first_stmt("x **= 2\n");
    assert!(matches!(
        stmt.kind,
        StmtKind::AugAssign {
            op: BinOp::Pow,
            ..
        }
    ));
}

#[test]
fn tuple_swap_targets() {
    let stmt = first_stmt("a, b = b, a\n");
    let StmtKind::Assign { target, value } = stmt.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(target.kind, ExprKind::Tuple(ref xs) if xs.len() == 2));
    assert!(matches!(value.kind, ExprKind::Tuple(ref xs) if xs.len() == 2));
}

#[test]
fn chained_assignment_desugars() {
    let module = parse_ok("a = b = 1\n");
    assert_eq!(module.body.len(), 2);
    assert!(matches!(module.body[0].kind, StmtKind::Assign { .. }));
    assert!(matches!(module.body[1].kind, StmtKind::Assign { .. }));
}

#[test]
fn starred_unpack_target() {
    let stmt = first_stmt("first, *rest = items\n");
    let StmtKind::Assign { target, .. } = stmt.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Tuple(elements) = target.kind else {
        panic!("expected tuple target");
    };
    assert!(matches!(elements[1].kind, ExprKind::Starred(_)));
}

#[test]
fn chained_comparison() {
    let stmt = first_stmt("ok = a < b <= c\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Compare { ops, comparators, .. } = value.kind else {
        panic!("expected comparison");
    };
    assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE]);
    assert_eq!(comparators.len(), 2);
}

#[test]
fn is_not_and_not_in() {
    let stmt = first_stmt("ok = x is not None and y not in xs\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!("expected assignment");
    };
    let ExprKind::BoolOp { values, .. } = value.kind else {
        panic!("expected bool op");
    };
    let ExprKind::Compare { ops: ref a, .. } = values[0].kind else {
        panic!();
    };
    let ExprKind::Compare { ops: ref b, .. } = values[1].kind else {
        panic!();
    };
    assert_eq!(a, &vec![CmpOp::IsNot]);
    assert_eq!(b, &vec![CmpOp::NotIn]);
}

#[test]
fn call_with_kwargs_and_star() {
    let stmt = first_stmt("f(1, *rest, mode=\"fast\")\n");
    let StmtKind::Expr(expr) = stmt.kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Call { args, kwargs, .. } = expr.kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 2);
    assert!(matches!(args[1].kind, ExprKind::Starred(_)));
    assert_eq!(kwargs.len(), 1);
    assert_eq!(kwargs[0].0, "mode");
}

#[test]
fn list_comprehension_with_filter() {
    let stmt = first_stmt("evens = [x * 2 for x in xs if x % 2 == 0]\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!("expected assignment");
    };
    let ExprKind::ListComp { generators, .. } = value.kind else {
        panic!("expected list comprehension");
    };
    assert_eq!(generators.len(), 1);
    assert_eq!(generators[0].ifs.len(), 1);
}

#[test]
fn dict_literal_and_comprehension() {
    let stmt = first_stmt("d = {3: \"A\", 5: \"B\"}\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    assert!(matches!(value.kind, ExprKind::Dict { ref keys, .. } if keys.len() == 2));

    let stmt = first_stmt("d = {k: v for k, v in pairs}\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    assert!(matches!(value.kind, ExprKind::DictComp { .. }));
}

#[test]
fn generator_argument() {
    let stmt = first_stmt("s = \"\".join(name for name in names)\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    let ExprKind::Call { args, .. } = value.kind else {
        panic!("expected call");
    };
    assert!(matches!(args[0].kind, ExprKind::GeneratorExp { .. }));
}

#[test]
fn lambda_expression() {
    let stmt = first_stmt("double = lambda x: x * 2\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    let ExprKind::Lambda { params, .. } = value.kind else {
        panic!("expected lambda");
    };
    assert_eq!(params.len(), 1);
}

#[test]
fn conditional_expression() {
    let stmt = first_stmt("pick = 1 if i in weekends else 0\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    assert!(matches!(value.kind, ExprKind::IfExp { .. }));
}

#[test]
fn slice_forms() {
    let stmt = first_stmt("part = arr[1:10:2]\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    let ExprKind::Subscript { index, .. } = value.kind else {
        panic!("expected subscript");
    };
    let Index::Slice { lower, upper, step } = *index else {
        panic!("expected slice");
    };
    assert!(lower.is_some() && upper.is_some() && step.is_some());

    let stmt = first_stmt("rev = arr[::-1]\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    let ExprKind::Subscript { index, .. } = value.kind else {
        panic!();
    };
    let Index::Slice { lower, upper, step } = *index else {
        panic!("expected slice");
    };
    assert!(lower.is_none() && upper.is_none());
    assert!(step.is_some());
}

#[test]
fn fstring_parts() {
    let stmt = first_stmt("msg = f\"{i}: {name}\"\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    let ExprKind::FString(parts) = value.kind else {
        panic!("expected f-string");
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(parts[0], FStringPart::Expr(_)));
    assert!(matches!(parts[1], FStringPart::Literal(ref s) if s == ": "));
    assert!(matches!(parts[2], FStringPart::Expr(_)));
}

#[test]
fn class_with_decorator_and_base() {
    let stmt = first_stmt(indoc! {"
        @dataclass
        class Point(Base):
            x: int
            y: int
    "});
    let StmtKind::ClassDef(c) = stmt.kind else {
        panic!("expected class");
    };
    assert_eq!(c.name, "Point");
    assert_eq!(c.decorators.len(), 1);
    assert_eq!(c.bases.len(), 1);
    assert_eq!(c.body.len(), 2);
}

#[test]
fn with_statement() {
    let stmt = first_stmt(indoc! {"
        with open(path) as f:
            data = f.read()
    "});
    let StmtKind::With { items, body } = stmt.kind else {
        panic!("expected with");
    };
    assert_eq!(items.len(), 1);
    assert!(items[0].binding.is_some());
    assert_eq!(body.len(), 1);
}

#[test]
fn imports() {
    let module = parse_ok("import numpy as np\nfrom math import sqrt, floor\n");
    let StmtKind::Import { ref names } = module.body[0].kind else {
        panic!();
    };
    assert_eq!(names[0].name, "numpy");
    assert_eq!(names[0].bound_name(), "np");
    let StmtKind::ImportFrom {
        module: ref m,
        names: ref names,
    } = module.body[1].kind
    else {
        panic!();
    };
    assert_eq!(m, "math");
    assert_eq!(names.len(), 2);
}

#[test]
fn main_guard_parses() {
    let module = parse_ok(indoc! {r#"
        def main() -> None:
            pass

        if __name__ == "__main__":
            main()
    "#});
    assert_eq!(module.body.len(), 2);
    assert!(matches!(module.body[1].kind, StmtKind::If { .. }));
}

#[test]
fn recovery_reports_multiple_errors() {
    let (_module, diags) = parse(indoc! {"
        def f(:
            pass
        x = = 1
        y = 2
    "});
    assert!(diags.has_errors());
    assert!(diags.error_count() >= 2);
}

#[test]
fn unsupported_statement_keyword() {
    let (module, diags) = parse("del x\ny = 1\n");
    assert!(diags.has_errors());
    assert!(matches!(module.body[0].kind, StmtKind::Unsupported));
    // Parsing continued past the unsupported statement.
    assert!(matches!(module.body[1].kind, StmtKind::Assign { .. }));
}

#[test]
fn single_line_suite() {
    let stmt = first_stmt("if x: y = 1\n");
    let StmtKind::If { body, .. } = stmt.kind else {
        panic!();
    };
    assert_eq!(body.len(), 1);
}

#[test]
fn matmul_operator() {
    let stmt = first_stmt("c = a @ b\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    assert!(matches!(
        value.kind,
        ExprKind::BinOp {
            op: BinOp::MatMul,
            ..
        }
    ));
}

#[test]
fn power_is_right_associative() {
    let stmt = first_stmt("x = 2 ** 3 ** 2\n");
    let StmtKind::Assign { value, .. } = stmt.kind else {
        panic!();
    };
    let ExprKind::BinOp { right, .. } = value.kind else {
        panic!();
    };
    assert!(matches!(
        right.kind,
        ExprKind::BinOp {
            op: BinOp::Pow,
            ..
        }
    ));
}
