//! Statement emission, including the exception lowering.
//!
//! `try` lowers into two immediately-invoked closures: the body (with
//! `return`/`break`/`continue` routed through [`Flow`]) and the
//! handler/else dispatch. The `finally` block runs between the dispatch
//! and the final flow application, so it executes on every exit path.

use super::types::rust_type;
use super::{rust_name, CodeGen};
use crate::analyze::scope::BindingKind;
use crate::analyze::types::Type;
use crate::ast::BinOp;
use crate::diagnostics::Code;
use crate::ir::*;

impl CodeGen<'_> {
    pub(crate) fn emit_block(&mut self, stmts: &[IrStmt]) {
        for stmt in stmts {
            self.emit_stmt(stmt);
        }
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &IrStmt) {
        match &stmt.kind {
            IrStmtKind::Assign { target, value, .. } => self.emit_assign(target, value),
            IrStmtKind::AugAssign { target, op, value } => {
                self.emit_aug_assign(target, *op, value)
            }
            IrStmtKind::Swap { left, right } => {
                let l = self.target_place(left);
                let r = self.target_place(right);
                self.line(&format!("std::mem::swap(&mut {}, &mut {});", l, r));
            }
            IrStmtKind::Unpack {
                targets,
                starred,
                value,
            } => self.emit_unpack(targets, *starred, value),
            IrStmtKind::Expr(e) => {
                let text = self.expr_owned(e);
                // Unit-valued calls stand alone; other values are dropped
                // explicitly so the line still compiles.
                if matches!(e.ty, Type::Unit) {
                    self.line(&format!("{};", text));
                } else {
                    self.line(&format!("let _ = {};", text));
                }
            }
            IrStmtKind::Return(value) => self.emit_return(value.as_ref()),
            IrStmtKind::If {
                test, body, orelse, ..
            } => {
                let cond = self.truthy(test);
                self.open(&format!("if {} {{", cond));
                self.emit_block(body);
                if orelse.is_empty() {
                    self.close("}");
                } else {
                    self.close("} else {");
                    self.indent += 1;
                    self.emit_block(orelse);
                    self.close("}");
                }
            }
            IrStmtKind::While { test, body, .. } => {
                let cond = self.truthy(test);
                self.loop_depth += 1;
                self.open(&format!("while {} {{", cond));
                self.emit_block(body);
                self.close("}");
                self.loop_depth -= 1;
            }
            IrStmtKind::For {
                target, iter, body, ..
            } => self.emit_for(target, iter, body),
            IrStmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => self.emit_try(body, handlers, orelse, finalbody),
            IrStmtKind::Raise {
                kind,
                message,
                cause,
                reraise,
            } => self.emit_raise(stmt, kind, message.as_ref(), cause.as_ref(), reraise.as_ref()),
            IrStmtKind::With {
                context,
                binding,
                body,
                ..
            } => self.emit_with(context, binding.as_ref(), body),
            IrStmtKind::Break => {
                if self.in_closure() && self.loop_depth == 0 {
                    self.uses_flow = true;
                    self.line("return Ok(Flow::Break);");
                } else {
                    self.line("break;");
                }
            }
            IrStmtKind::Continue => {
                if self.in_closure() && self.loop_depth == 0 {
                    self.uses_flow = true;
                    self.line("return Ok(Flow::Continue);");
                } else {
                    self.line("continue;");
                }
            }
            IrStmtKind::Pass => {}
            IrStmtKind::Elided => {}
        }
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn emit_assign(&mut self, target: &IrTarget, value: &IrExpr) {
        match target {
            IrTarget::Name { name, binding, .. } => {
                let Some(b) = *binding else {
                    let text = self.expr_owned(value);
                    self.line(&format!("let _ = {};", text));
                    return;
                };
                let info = self.analysis.scopes.binding(b);
                let binding_ty = info.ty.clone();
                let hoisted_optional = info.hoisted_optional;
                let mutated = info.mutated;
                let is_param = matches!(
                    info.kind,
                    BindingKind::Param | BindingKind::SelfParam
                );
                let rname = rust_name(name);

                let mut text = self.expr_owned(value);
                text = self.coerce(text, &value.ty, &binding_ty);
                if matches!(binding_ty, Type::Callable { .. }) && needs_boxing(self, value) {
                    text = format!("Rc::new({})", text);
                }

                if hoisted_optional {
                    self.line(&format!("{} = Some({});", rname, text));
                    return;
                }
                if self.declared.contains(&b) || is_param {
                    self.line(&format!("{} = {};", rname, text));
                    return;
                }
                self.declared.insert(b);
                self.note_type_uses(&binding_ty);
                let mut_kw = if mutated { "mut " } else { "" };
                self.line(&format!(
                    "let {}{}: {} = {};",
                    mut_kw,
                    rname,
                    rust_type(&binding_ty),
                    text
                ));
            }
            IrTarget::Attribute { base, attr } => {
                // Property setters win over plain fields.
                if let Type::Struct(class) = &base.ty {
                    let class = class.clone();
                    if self.analysis.property_type(&class, attr).is_some() {
                        if self.analysis.method_sig(&class, attr).is_none() {
                            self.gen_error(
                                Code::UnsupportedSyntax,
                                format!("property `{}` has no setter", attr),
                                base.span,
                            );
                            return;
                        }
                        let place = self.place_text(base);
                        let text = self.expr_owned(value);
                        self.line(&format!(
                            "{}.set_{}({});",
                            place,
                            rust_name(attr),
                            text
                        ));
                        return;
                    }
                    let place = self.place_text(base);
                    let mut text = self.expr_owned(value);
                    if let Some(field_ty) = self.analysis.field_type(&class, attr) {
                        text = self.coerce(text, &value.ty, &field_ty);
                        if matches!(field_ty, Type::Callable { .. })
                            && matches!(value.kind, IrExprKind::Lambda { .. })
                        {
                            text = format!("Rc::new({})", text);
                        }
                    }
                    self.line(&format!("{}.{} = {};", place, rust_name(attr), text));
                    return;
                }
                self.gen_error(
                    Code::UnsupportedSyntax,
                    "attribute assignment on bridge values is not supported",
                    base.span,
                );
            }
            IrTarget::Index { base, index } => match &base.ty {
                Type::List(elem) => {
                    self.uses_ops = true;
                    let elem = (**elem).clone();
                    let place = self.place_text(base);
                    let i = self.expr_owned(index);
                    let v = self.expr_owned(value);
                    let v = self.coerce(v, &value.ty, &elem);
                    self.line(&format!(
                        "ops::list_set(&mut {}, {}, {})?;",
                        place, i, v
                    ));
                }
                Type::Dict(kt, vt) => {
                    let (kt, vt) = ((**kt).clone(), (**vt).clone());
                    let place = self.place_text(base);
                    let k = self.expr_owned(index);
                    let k = self.coerce(k, &index.ty, &kt);
                    let v = self.expr_owned(value);
                    let v = self.coerce(v, &value.ty, &vt);
                    self.line(&format!("{}.insert({}, {});", place, k, v));
                }
                _ => {
                    self.gen_error(
                        Code::UnsupportedSyntax,
                        "item assignment on bridge values is not supported",
                        base.span,
                    );
                }
            },
            IrTarget::Tuple(_) => {
                // Handled by `Unpack`; a bare tuple target here means the
                // matcher produced a swap or unpack instead.
            }
        }
    }

    fn emit_aug_assign(&mut self, target: &IrTarget, op: BinOp, value: &IrExpr) {
        // Read-modify-write over the resolved lvalue.
        match target {
            IrTarget::Name { name, binding, .. } => {
                let rname = match binding.map(|b| self.analysis.scopes.binding(b)) {
                    Some(info) if info.kind == BindingKind::SelfParam => "self".to_string(),
                    _ => rust_name(name),
                };
                let target_ty = binding
                    .map(|b| self.analysis.scopes.binding(b).ty.clone())
                    .unwrap_or(Type::Any);
                let text = self.rmw_text(&rname, &target_ty, op, value);
                self.line(&format!("{} = {};", rname, text));
            }
            IrTarget::Attribute { base, attr } => {
                let place = self.place_text(base);
                let field_ty = match &base.ty {
                    Type::Struct(class) => self
                        .analysis
                        .field_type(class, attr)
                        .unwrap_or(Type::Any),
                    _ => Type::Any,
                };
                let lvalue = format!("{}.{}", place, rust_name(attr));
                let text = self.rmw_text(&lvalue, &field_ty, op, value);
                self.line(&format!("{} = {};", lvalue, text));
            }
            IrTarget::Index { base, index } => {
                let place = self.place_text(base);
                let i = self.expr_owned(index);
                match &base.ty {
                    Type::List(elem) => {
                        self.uses_ops = true;
                        let elem = (**elem).clone();
                        let tmp = self.fresh("i");
                        let lvalue = format!("{}[{}]", place, tmp);
                        let text = self.rmw_text(&lvalue, &elem, op, value);
                        self.line(&format!(
                            "{{ let {} = ops::norm_index({}, {}.len())?; {} = {}; }}",
                            tmp, i, place, lvalue, text
                        ));
                    }
                    Type::Dict(_, vt) => {
                        let vt = (**vt).clone();
                        self.uses_ops = true;
                        let tmp = self.fresh("k");
                        let lvalue = format!("ops::dict_get(&{}, &{})?", place, tmp);
                        let text = self.rmw_text(&lvalue, &vt, op, value);
                        self.line(&format!(
                            "{{ let {} = {}; let __new = {}; {}.insert({}, __new); }}",
                            tmp, i, text, place, tmp
                        ));
                    }
                    _ => {
                        self.gen_error(
                            Code::UnsupportedSyntax,
                            "augmented item assignment on bridge values is not supported",
                            base.span,
                        );
                    }
                }
            }
            IrTarget::Tuple(_) => {}
        }
    }

    /// Text of `lvalue <op> value`, matching the binary lowering rules.
    fn rmw_text(&mut self, lvalue: &str, target_ty: &Type, op: BinOp, value: &IrExpr) -> String {
        let read = if super::types::is_copy(target_ty) {
            lvalue.to_string()
        } else {
            format!("{}.clone()", lvalue)
        };
        let v = self.expr_owned(value);
        match (op, target_ty) {
            (BinOp::Add, Type::Str) => format!("format!(\"{{}}{{}}\", {}, {})", read, v),
            (BinOp::Add, Type::List(_)) => {
                format!("{{ let mut __v = {}; __v.extend({}); __v }}", read, v)
            }
            (BinOp::Div, _) => {
                let v = self.coerce(v, &value.ty, &Type::Float);
                format!("({} / {})", read, v)
            }
            (BinOp::FloorDiv, Type::Int) => format!("({}).div_euclid({})", read, v),
            (BinOp::Mod, Type::Int) => format!("({}).rem_euclid({})", read, v),
            (BinOp::Pow, Type::Int) => {
                self.uses_ops = true;
                format!("ops::ipow({}, {})", read, v)
            }
            (BinOp::Pow, Type::Float) => format!("({}).powf({})", read, v),
            (BinOp::Shl, _) => format!("({} << {})", read, v),
            (BinOp::Shr, _) => format!("({} >> {})", read, v),
            (BinOp::BitAnd, _) => format!("({} & {})", read, v),
            (BinOp::BitOr, _) => format!("({} | {})", read, v),
            (BinOp::BitXor, _) => format!("({} ^ {})", read, v),
            (BinOp::MatMul, _) => {
                self.gen_error(
                    Code::UnsupportedSyntax,
                    "`@=` is only supported for bridge values",
                    value.span,
                );
                read
            }
            _ => {
                let v = self.coerce(v, &value.ty, target_ty);
                format!("({} {} {})", read, op_text(op), v)
            }
        }
    }

    fn emit_unpack(&mut self, targets: &[IrTarget], starred: Option<usize>, value: &IrExpr) {
        let tmp = self.fresh("u");
        let text = self.expr_owned(value);

        match (&value.ty, starred) {
            (Type::Tuple(_), None) => {
                // Structural tuple destructuring.
                let all_fresh = targets
                    .iter()
                    .all(|t| matches!(t, IrTarget::Name { binding: Some(b), .. }
                        if !self.analysis.scopes.binding(*b).hoisted_optional
                            && !self.declared.contains(b)));
                if all_fresh {
                    let pats: Vec<String> =
                        targets.iter().map(|t| self.target_pattern(t)).collect();
                    self.line(&format!("let ({}) = {};", pats.join(", "), text));
                    // Loop targets may still be reassigned.
                    for (pat, target) in pats.iter().zip(targets) {
                        if let IrTarget::Name { binding: Some(b), .. } = target {
                            if self.analysis.scopes.binding(*b).mutated {
                                self.line(&format!("let mut {} = {};", pat, pat));
                            }
                        }
                    }
                    return;
                }
                self.line(&format!("let {} = {};", tmp, text));
                for (i, target) in targets.iter().enumerate() {
                    let access = format!("{}.{}.clone()", tmp, i);
                    self.assign_from_text(target, &access);
                }
            }
            _ => {
                // List-backed unpack, with optional starred rest.
                self.line(&format!("let {} = {};", tmp, text));
                let n = targets.len();
                for (i, target) in targets.iter().enumerate() {
                    let access = match starred {
                        Some(s) if i == s => format!(
                            "{}[{}..{}.len() - {}].to_vec()",
                            tmp,
                            i,
                            tmp,
                            n - i - 1
                        ),
                        Some(s) if i > s => {
                            format!("{}[{}.len() - {}].clone()", tmp, tmp, n - i)
                        }
                        _ => format!("{}[{}].clone()", tmp, i),
                    };
                    self.assign_from_text(target, &access);
                }
            }
        }
    }

    /// Assigns pre-rendered value text to a target.
    fn assign_from_text(&mut self, target: &IrTarget, text: &str) {
        match target {
            IrTarget::Name { name, binding, .. } => {
                let Some(b) = *binding else { return };
                let info = self.analysis.scopes.binding(b);
                let rname = rust_name(name);
                if info.hoisted_optional {
                    self.line(&format!("{} = Some({});", rname, text));
                } else if self.declared.contains(&b) {
                    self.line(&format!("{} = {};", rname, text));
                } else {
                    self.declared.insert(b);
                    let mut_kw = if info.mutated { "mut " } else { "" };
                    self.line(&format!("let {}{} = {};", mut_kw, rname, text));
                }
            }
            IrTarget::Attribute { base, attr } => {
                let place = self.place_text(base);
                self.line(&format!("{}.{} = {};", place, rust_name(attr), text));
            }
            IrTarget::Index { base, index } => {
                let place = self.place_text(base);
                let i = self.expr_owned(index);
                self.uses_ops = true;
                self.line(&format!("ops::list_set(&mut {}, {}, {})?;", place, i, text));
            }
            IrTarget::Tuple(_) => {}
        }
    }

    fn target_place(&mut self, target: &IrTarget) -> String {
        match target {
            IrTarget::Name { name, .. } => rust_name(name),
            IrTarget::Attribute { base, attr } => {
                let place = self.place_text(base);
                format!("{}.{}", place, rust_name(attr))
            }
            IrTarget::Index { base, index } => {
                let place = self.place_text(base);
                let i = self.expr_owned(index);
                format!("{}[({}) as usize]", place, i)
            }
            IrTarget::Tuple(_) => self.fresh("t"),
        }
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    fn emit_return(&mut self, value: Option<&IrExpr>) {
        let ret_ty = self.fn_ret.clone();
        let text = match value {
            Some(v) => {
                let t = self.expr_owned(v);
                self.coerce(t, &v.ty, &ret_ty)
            }
            None => match ret_ty {
                Type::Option(_) => "None".to_string(),
                _ => "()".to_string(),
            },
        };
        if self.in_closure() {
            self.uses_flow = true;
            self.line(&format!("return Ok(Flow::Return({}));", text));
        } else if self.fn_may_raise {
            self.line(&format!("return Ok({});", text));
        } else if text == "()" {
            self.line("return;");
        } else {
            self.line(&format!("return {};", text));
        }
    }

    fn emit_for(&mut self, target: &IrTarget, iter: &IrExpr, body: &[IrStmt]) {
        // Targets already introduced (hoisted or reused) keep their
        // binding; fresh ones bind in the loop pattern.
        let needs_rebind = target_needs_rebind(self, target);
        if needs_rebind {
            let tmp = self.fresh("x");
            let (header, rebinds) = self.iter_text(iter, &tmp);
            self.loop_depth += 1;
            self.open(&header);
            for rebind in rebinds {
                self.line(&rebind);
            }
            self.assign_from_text(target, &tmp);
            self.emit_block(body);
            self.close("}");
            self.loop_depth -= 1;
            return;
        }

        let pat = self.target_pattern(target);
        let (header, rebinds) = self.iter_text(iter, &pat);
        self.loop_depth += 1;
        self.open(&header);
        for rebind in rebinds {
            self.line(&rebind);
        }
        if let IrTarget::Name { binding: Some(b), name, .. } = target {
            if self.analysis.scopes.binding(*b).mutated {
                let rname = rust_name(name);
                self.line(&format!("let mut {} = {};", rname, rname));
            }
        }
        self.emit_block(body);
        self.close("}");
        self.loop_depth -= 1;
    }

    fn emit_with(&mut self, context: &IrExpr, binding: Option<&IrTarget>, body: &[IrStmt]) {
        let guard = self.fresh("ctx");
        if matches!(context.ty, Type::Any) {
            self.uses_value = true;
            let text = self.expr_owned(context);
            let entered = self.fresh("entered");
            self.open("{");
            self.line(&format!("let {} = {};", guard, text));
            self.line(&format!(
                "let {} = {}.call_method(\"__enter__\", vec![], vec![])?;",
                entered, guard
            ));
            if let Some(target) = binding {
                self.assign_from_text(target, &entered);
            }
            self.emit_block(body);
            self.line(&format!(
                "{}.call_method(\"__exit__\", vec![Value::None, Value::None, Value::None], vec![])?;",
                guard
            ));
            self.close("}");
            return;
        }

        // Native context: the value is scoped to the block and dropped at
        // its end.
        self.open("{");
        let text = self.expr_owned(context);
        match binding {
            Some(target) => {
                self.line(&format!("let {} = {};", guard, text));
                self.assign_from_text(target, &guard);
            }
            None => self.line(&format!("let {} = {};", guard, text)),
        }
        self.emit_block(body);
        self.close("}");
    }

    fn emit_raise(
        &mut self,
        stmt: &IrStmt,
        kind: &str,
        message: Option<&IrExpr>,
        cause: Option<&IrExpr>,
        reraise: Option<&IrExpr>,
    ) {
        self.uses_error = true;
        if let Some(r) = reraise {
            let text = self.expr_owned(r);
            self.line(&format!("return Err({});", text));
            return;
        }
        let line = self.src_line(stmt.span);
        let message_text = match message {
            Some(m) => {
                let t = self.expr_owned(m);
                self.coerce(t, &m.ty, &Type::Str)
            }
            None => "String::new()".to_string(),
        };
        let mut text = format!(
            "TnkError::new(ErrorKind::{}, {}).with_line({})",
            error_kind_variant(kind),
            message_text,
            line
        );
        if let Some(c) = cause {
            let cause_text = self.expr_owned(c);
            text = format!("{}.with_cause({})", text, cause_text);
        }
        self.line(&format!("return Err({});", text));
    }

    // ------------------------------------------------------------------
    // try / except / else / finally
    // ------------------------------------------------------------------

    fn emit_try(
        &mut self,
        body: &[IrStmt],
        handlers: &[IrHandler],
        orelse: &[IrStmt],
        finalbody: &[IrStmt],
    ) {
        self.uses_error = true;
        self.uses_flow = true;
        let ret = rust_type(&self.fn_ret);
        let attempt = self.fresh("t");
        let outcome = self.fresh("o");

        // Body closure.
        self.open(&format!(
            "let {}: TnkResult<Flow<{}>> = (|| {{",
            attempt, ret
        ));
        self.closure_loop_depth.push(self.loop_depth);
        self.loop_depth = 0;
        self.emit_block(body);
        self.line("Ok(Flow::Fall)");
        self.loop_depth = self.closure_loop_depth.pop().unwrap_or(0);
        self.close("})();");

        // Dispatch closure: else on success, handlers on error.
        self.open(&format!(
            "let {}: TnkResult<Flow<{}>> = (|| {{",
            outcome, ret
        ));
        self.closure_loop_depth.push(self.loop_depth);
        self.loop_depth = 0;
        self.open(&format!("match {} {{", attempt));

        self.open("Ok(__flow) => {");
        self.emit_block(orelse);
        self.line("Ok(__flow)");
        self.close("}");

        let mut has_catch_all = false;
        for handler in handlers {
            let bind = handler
                .name
                .as_deref()
                .map(rust_name)
                .unwrap_or_else(|| "__err".to_string());
            if handler.is_catch_all() {
                has_catch_all = true;
                self.open(&format!("Err({}) => {{", bind));
            } else {
                let pats: Vec<String> = handler
                    .kinds
                    .iter()
                    .map(|k| format!("ErrorKind::{}", error_kind_variant(k)))
                    .collect();
                self.open(&format!(
                    "Err({}) if matches!({}.kind, {}) => {{",
                    bind,
                    bind,
                    pats.join(" | ")
                ));
            }
            self.emit_block(&handler.body);
            self.line("Ok(Flow::Fall)");
            self.close("}");
            if has_catch_all {
                break;
            }
        }
        if !has_catch_all {
            self.line("Err(__err) => Err(__err),");
        }

        self.close("}");
        self.loop_depth = self.closure_loop_depth.pop().unwrap_or(0);
        self.close("})();");

        // `finally` runs before the outcome is applied, on every path.
        self.emit_block(finalbody);

        self.open(&format!("match {} {{", outcome));
        self.line("Ok(Flow::Fall) => {}");
        match (self.in_closure(), self.fn_may_raise) {
            (true, _) => {
                self.line("Ok(Flow::Return(__v)) => return Ok(Flow::Return(__v)),");
            }
            (false, true) => {
                self.line("Ok(Flow::Return(__v)) => return Ok(__v),");
            }
            (false, false) => {
                self.line("Ok(Flow::Return(__v)) => return __v,");
            }
        }
        if self.loop_depth > 0 {
            self.line("Ok(Flow::Break) => break,");
            self.line("Ok(Flow::Continue) => continue,");
        } else if self.in_closure() {
            self.line("Ok(Flow::Break) => return Ok(Flow::Break),");
            self.line("Ok(Flow::Continue) => return Ok(Flow::Continue),");
        } else {
            self.line("Ok(Flow::Break) | Ok(Flow::Continue) => unreachable!(\"loop flow outside a loop\"),");
        }
        if self.in_closure() {
            self.line("Err(__e) => return Err(__e),");
        } else if self.fn_may_raise {
            self.line("Err(__e) => return Err(__e),");
        } else {
            self.line("Err(__e) => unreachable!(\"uncaught error in non-raising function: {}\", __e),");
        }
        self.close("}");
    }
}

/// Lambdas and function items need wrapping when stored in an
/// `Rc<dyn Fn>`-typed slot; already-wrapped callable variables do not.
pub(crate) fn needs_boxing(cx: &CodeGen<'_>, value: &IrExpr) -> bool {
    match &value.kind {
        IrExprKind::Lambda { .. } => true,
        // Function items and `impl Fn` parameters are unboxed callables.
        IrExprKind::Name { binding: Some(b), .. } => matches!(
            (
                cx.analysis.scopes.binding(*b).kind,
                &cx.analysis.scopes.binding(*b).ty
            ),
            (BindingKind::Function, _) | (BindingKind::Param, Type::Callable { .. })
        ),
        _ => false,
    }
}

/// A `for` target needs the assign-inside-loop form when any of its
/// bindings is hoisted or already declared.
fn target_needs_rebind(cx: &CodeGen<'_>, target: &IrTarget) -> bool {
    match target {
        IrTarget::Name { binding: Some(b), .. } => {
            cx.analysis.scopes.binding(*b).hoisted_optional || cx.declared.contains(b)
        }
        IrTarget::Name { binding: None, .. } => false,
        IrTarget::Tuple(ts) => ts.iter().any(|t| target_needs_rebind(cx, t)),
        _ => true,
    }
}

fn op_text(op: BinOp) -> &'static str {
    op.as_str()
}

/// Maps a source exception kind to the runtime error enum variant.
pub(crate) fn error_kind_variant(kind: &str) -> &str {
    match kind {
        "ValueError" => "ValueError",
        "TypeError" => "TypeError",
        "IndexError" => "IndexError",
        "KeyError" => "KeyError",
        "AttributeError" => "AttributeError",
        "ZeroDivisionError" => "ZeroDivisionError",
        "RuntimeError" => "RuntimeError",
        "Exception" => "Exception",
        _ => "RuntimeError",
    }
}
