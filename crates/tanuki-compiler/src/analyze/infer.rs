//! Type inference, call resolution, and narrowing.
//!
//! Walks each body in statement order, computing expression types
//! bottom-up. Resolves every name to its binding, refines call and method
//! resolutions left `Unresolved` by the matcher, marks bridge-required
//! operations, and applies `is None` / `isinstance` / early-return
//! narrowing through a stack of fact frames.

use indexmap::IndexMap;

use super::scope::{BindingId, BindingKind, ScopeTree};
use super::types::{assignable, unify, Type};
use super::{Analysis, ClassInfo, FnSig};
use crate::ast::{BinOp, BoolOp, CmpOp, UnaryOp};
use crate::diagnostics::{Code, Diagnostics};
use crate::ir::*;
use crate::span::Span;

pub(super) fn run(module: &mut IrModule, analysis: &mut Analysis) {
    let imports: IndexMap<String, (String, bool)> = module
        .imports
        .iter()
        .map(|i| (i.alias.clone(), (i.target_path(), i.external)))
        .collect();

    // Phase 1: `__init__` bodies only. Fields the matcher could only type
    // as `Any` get refined from what the constructor actually stores.
    let refinements = {
        let Analysis {
            scopes,
            classes,
            functions,
            diags,
        } = analysis;
        let mut cx = Infer::new(scopes, classes, functions, diags, imports.clone());
        let class_names: Vec<String> = module.classes.iter().map(|c| c.name.clone()).collect();
        for (class, name) in module.classes.iter_mut().zip(class_names) {
            for method in &mut class.methods {
                if method.name != "__init__" {
                    continue;
                }
                cx.current_class = Some(name.clone());
                cx.enter_body(method.ret.clone());
                cx.block(&mut method.body);
                cx.finish_body();
            }
            cx.current_class = None;
        }
        cx.field_refinements
    };
    for (class, field, ty) in refinements {
        if let Some(info) = analysis.classes.get_mut(&class) {
            info.fields.insert(field.clone(), ty.clone());
        }
        if let Some(ir) = module.classes.iter_mut().find(|c| c.name == class) {
            if let Some(f) = ir.fields.iter_mut().find(|f| f.name == field) {
                f.ty = ty;
            }
        }
    }

    // Phase 2: everything else, against the refined field tables.
    let Analysis {
        scopes,
        classes,
        functions,
        diags,
    } = analysis;
    let mut cx = Infer::new(scopes, classes, functions, diags, imports);

    let class_names: Vec<String> = module.classes.iter().map(|c| c.name.clone()).collect();
    for (class, name) in module.classes.iter_mut().zip(class_names) {
        for method in &mut class.methods {
            if method.name == "__init__" {
                continue;
            }
            cx.current_class = Some(name.clone());
            cx.enter_body(method.ret.clone());
            cx.block(&mut method.body);
            cx.finish_body();
        }
        cx.current_class = None;
    }

    for func in &mut module.functions {
        cx.enter_body(func.ret.clone());
        cx.block(&mut func.body);
        cx.finish_body();
    }

    cx.enter_body(Type::Unit);
    cx.block(&mut module.setup);
    if let Some(entry) = &mut module.entry {
        cx.block(entry);
    }
    cx.finish_body();
}

struct Infer<'a> {
    scopes: &'a mut ScopeTree,
    classes: &'a IndexMap<String, ClassInfo>,
    functions: &'a IndexMap<String, FnSig>,
    diags: &'a mut Diagnostics,
    /// Import alias → (dotted path, external).
    imports: IndexMap<String, (String, bool)>,
    /// Narrowing fact frames, innermost last.
    narrows: Vec<Vec<(BindingId, Type)>>,
    /// Declared return type of the body being inferred.
    ret: Type,
    current_class: Option<String>,
    /// Non-primitive bindings moved into a closure: (binding, closure end).
    captures: Vec<(BindingId, u32)>,
    /// Every name use in the current body: (binding, offset, span).
    uses: Vec<(BindingId, u32, Span)>,
    /// Field types discovered while inferring `__init__` bodies.
    field_refinements: Vec<(String, String, Type)>,
}

impl<'a> Infer<'a> {
    fn new(
        scopes: &'a mut ScopeTree,
        classes: &'a IndexMap<String, ClassInfo>,
        functions: &'a IndexMap<String, FnSig>,
        diags: &'a mut Diagnostics,
        imports: IndexMap<String, (String, bool)>,
    ) -> Self {
        Infer {
            scopes,
            classes,
            functions,
            diags,
            imports,
            narrows: Vec::new(),
            ret: Type::Unit,
            current_class: None,
            captures: Vec::new(),
            uses: Vec::new(),
            field_refinements: Vec::new(),
        }
    }
}

impl Infer<'_> {
    fn enter_body(&mut self, ret: Type) {
        self.ret = ret;
        self.narrows.push(Vec::new());
        self.captures.clear();
        self.uses.clear();
    }

    fn finish_body(&mut self) {
        self.narrows.pop();
        // Ambiguous ownership: moved into a closure, used afterwards.
        for &(binding, closure_end) in &self.captures {
            let ty = &self.scopes.binding(binding).ty;
            if ty.is_primitive() || matches!(ty, Type::Callable { .. }) {
                continue;
            }
            if let Some(&(_, _, span)) = self
                .uses
                .iter()
                .find(|(b, offset, _)| *b == binding && *offset > closure_end)
            {
                let name = self.scopes.binding(binding).name.clone();
                self.diags
                    .error(
                        Code::OwnershipAmbiguous,
                        format!("`{}` is moved into a closure and used afterwards", name),
                        span,
                    )
                    .emit();
            }
        }
    }

    fn narrowed(&self, binding: BindingId) -> Type {
        for frame in self.narrows.iter().rev() {
            if let Some((_, ty)) = frame.iter().rev().find(|(b, _)| *b == binding) {
                return ty.clone();
            }
        }
        self.scopes.binding(binding).ty.clone()
    }

    fn unresolved(&mut self, name: &str, span: Span) {
        self.diags
            .error(
                Code::UnresolvedName,
                format!("cannot resolve `{}`", name),
                span,
            )
            .emit();
    }

    fn mismatch(&mut self, expected: &Type, got: &Type, span: Span) {
        self.diags
            .error(
                Code::TypeMismatch,
                format!("expected `{}`, found `{}`", expected, got),
                span,
            )
            .emit();
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self, stmts: &mut [IrStmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &mut IrStmt) {
        match &mut stmt.kind {
            IrStmtKind::Assign {
                target,
                value,
                annotation,
            } => {
                let hint = annotation.clone().or_else(|| match target {
                    IrTarget::Name { binding: Some(b), .. } => {
                        let ty = self.scopes.binding(*b).ty.clone();
                        (!matches!(ty, Type::Any)).then_some(ty)
                    }
                    _ => None,
                });
                let value_ty = self.expr_hint(value, hint.as_ref());
                self.assign_target(target, &value_ty, annotation.as_ref(), stmt.scope, stmt.span);
            }
            IrStmtKind::AugAssign { target, op, value } => {
                let value_ty = self.expr(value);
                let target_ty = self.target_read_type(target, stmt.span);
                let result =
                    self.binary_type(*op, &target_ty, &value_ty, stmt.span);
                if !assignable(&target_ty, &result) && !matches!(target_ty, Type::Any) {
                    self.mismatch(&target_ty, &result, stmt.span);
                }
                self.mark_target_mutated(target);
            }
            IrStmtKind::Swap { left, right } => {
                self.mark_target_mutated(left);
                self.mark_target_mutated(right);
            }
            IrStmtKind::Unpack {
                targets,
                starred,
                value,
            } => {
                let value_ty = self.expr(value);
                let element = value_ty.element();
                let count = targets.len();
                for (i, target) in targets.iter_mut().enumerate() {
                    let ty = match &value_ty {
                        Type::Tuple(ts) if starred.is_none() && ts.len() == count => {
                            ts.get(i).cloned().unwrap_or(Type::Any)
                        }
                        _ if Some(i) == *starred => Type::list(element.clone()),
                        _ => element.clone(),
                    };
                    self.assign_target(target, &ty, None, stmt.scope, stmt.span);
                }
            }
            IrStmtKind::Expr(e) => {
                self.expr(e);
            }
            IrStmtKind::Return(value) => {
                let expected = self.ret.clone();
                match value {
                    Some(v) => {
                        let got = self.expr_hint(v, Some(&expected));
                        if !assignable(&expected, &got) {
                            self.mismatch(&expected, &got, v.span);
                        }
                    }
                    None => {
                        if !matches!(expected, Type::Unit | Type::Option(_) | Type::Any) {
                            self.mismatch(&expected, &Type::Unit, stmt.span);
                        }
                    }
                }
            }
            IrStmtKind::If {
                test,
                body,
                orelse,
                narrow,
            } => {
                self.expr(test);
                let (then_facts, else_facts) = self.facts(test);
                narrow.then_facts = then_facts.clone();
                narrow.else_facts = else_facts.clone();

                self.narrows.push(then_facts.clone());
                self.block(body);
                self.narrows.pop();

                self.narrows.push(else_facts.clone());
                self.block(orelse);
                self.narrows.pop();

                let mut after = Vec::new();
                if diverges(body) {
                    after.extend(else_facts);
                }
                if !orelse.is_empty() && diverges(orelse) {
                    after.extend(then_facts);
                }
                narrow.after_facts = after.clone();
                if let Some(frame) = self.narrows.last_mut() {
                    frame.extend(after);
                }
            }
            IrStmtKind::While { test, body, .. } => {
                self.expr(test);
                self.block(body);
            }
            IrStmtKind::For {
                target,
                iter,
                body,
                body_scope,
            } => {
                let iter_ty = self.expr(iter);
                if matches!(iter_ty, Type::Any) {
                    iter.bridge_required = true;
                    iter.may_raise = true;
                }
                let element = match &iter.kind {
                    IrExprKind::Range { .. } => Type::Int,
                    _ => iter_ty.element(),
                };
                let body_scope = *body_scope;
                self.assign_target(target, &element, None, body_scope, iter.span);
                self.block(body);
            }
            IrStmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.block(body);
                for handler in handlers {
                    self.block(&mut handler.body);
                }
                self.block(orelse);
                self.block(finalbody);
            }
            IrStmtKind::Raise {
                kind,
                message,
                cause,
                reraise,
            } => {
                if let Some(m) = message {
                    self.expr(m);
                }
                if let Some(c) = cause {
                    self.expr(c);
                }
                if let Some(r) = reraise {
                    self.expr(r);
                }
                if !kind.is_empty() && !known_error_kind(kind) {
                    self.diags
                        .error(
                            Code::UnsupportedSyntax,
                            format!("unknown exception kind `{}`", kind),
                            stmt.span,
                        )
                        .emit();
                }
            }
            IrStmtKind::With {
                context,
                binding,
                body,
                body_scope,
            } => {
                let ty = self.expr(context);
                if matches!(ty, Type::Any) {
                    context.bridge_required = true;
                }
                let body_scope = *body_scope;
                if let Some(target) = binding {
                    self.assign_target(target, &ty, None, body_scope, context.span);
                }
                self.block(body);
            }
            IrStmtKind::Break | IrStmtKind::Continue | IrStmtKind::Pass | IrStmtKind::Elided => {}
        }
    }

    fn assign_target(
        &mut self,
        target: &mut IrTarget,
        value_ty: &Type,
        annotation: Option<&Type>,
        scope: super::scope::ScopeId,
        span: Span,
    ) {
        match target {
            IrTarget::Name { binding, span: tspan, .. } => {
                let Some(b) = *binding else { return };
                self.scopes.record_use(b, scope);
                self.record_use_at(b, *tspan);
                if let Some(ann) = annotation {
                    if !assignable(ann, value_ty) {
                        self.mismatch(ann, value_ty, span);
                    }
                    self.scopes.binding_mut(b).ty = ann.clone();
                    return;
                }
                let old = self.scopes.binding(b).ty.clone();
                let new = if matches!(old, Type::Any) {
                    value_ty.clone()
                } else if matches!(value_ty, Type::Any) {
                    old.clone()
                } else {
                    match unify(&old, value_ty) {
                        Some(t) => t,
                        None => {
                            self.mismatch(&old, value_ty, span);
                            old.clone()
                        }
                    }
                };
                self.scopes.binding_mut(b).ty = new;
            }
            IrTarget::Attribute { base, attr } => {
                let base_ty = self.expr(base);
                match base_ty {
                    Type::Struct(class) => {
                        match self.field_type(&class, attr) {
                            Some(field_ty) => {
                                if matches!(field_ty, Type::Any)
                                    && !matches!(value_ty, Type::Any)
                                    && self.current_class.as_deref() == Some(class.as_str())
                                {
                                    self.field_refinements.push((
                                        class.clone(),
                                        attr.clone(),
                                        value_ty.clone(),
                                    ));
                                } else if !assignable(&field_ty, value_ty) {
                                    self.mismatch(&field_ty, value_ty, span);
                                }
                            }
                            None => {
                                // `__init__` introduces fields; outside it this
                                // is a resolution error.
                                if self.current_class.as_deref() != Some(class.as_str()) {
                                    self.unresolved(attr, span);
                                }
                            }
                        }
                        self.mark_self_mutation(base);
                    }
                    Type::Any => {
                        base.bridge_required = true;
                    }
                    other => {
                        self.mismatch(&Type::Struct("object".into()), &other, span);
                    }
                }
            }
            IrTarget::Index { base, index } => {
                let base_ty = self.expr(base);
                self.expr(index);
                if matches!(base_ty, Type::Any) {
                    base.bridge_required = true;
                }
                self.mark_expr_mutated(base);
            }
            IrTarget::Tuple(targets) => {
                let element = value_ty.element();
                for t in targets {
                    self.assign_target(t, &element, None, scope, span);
                }
            }
        }
    }

    fn target_read_type(&mut self, target: &mut IrTarget, span: Span) -> Type {
        match target {
            IrTarget::Name { binding, .. } => match binding {
                Some(b) => {
                    self.record_use_at(*b, span);
                    self.narrowed(*b)
                }
                None => Type::Any,
            },
            IrTarget::Attribute { base, attr } => {
                let base_ty = self.expr(base);
                match base_ty {
                    Type::Struct(class) => self.field_type(&class, attr).unwrap_or(Type::Any),
                    Type::Any => {
                        base.bridge_required = true;
                        Type::Any
                    }
                    _ => Type::Any,
                }
            }
            IrTarget::Index { base, index } => {
                let base_ty = self.expr(base);
                let _ = self.expr(index);
                match base_ty {
                    Type::List(t) => *t,
                    Type::Dict(_, v) => *v,
                    Type::Any => {
                        base.bridge_required = true;
                        Type::Any
                    }
                    _ => Type::Any,
                }
            }
            IrTarget::Tuple(_) => Type::Any,
        }
    }

    fn mark_target_mutated(&mut self, target: &mut IrTarget) {
        match target {
            IrTarget::Name { binding: Some(b), span, .. } => {
                self.scopes.binding_mut(*b).mutated = true;
                self.record_use_at(*b, *span);
            }
            IrTarget::Attribute { base, .. } | IrTarget::Index { base, .. } => {
                self.mark_expr_mutated(base);
            }
            _ => {}
        }
    }

    /// Marks the root binding of an lvalue expression as mutated; a method
    /// mutating `self.<field>` makes the whole method `&mut self`.
    fn mark_expr_mutated(&mut self, expr: &IrExpr) {
        match &expr.kind {
            IrExprKind::Name { binding: Some(b), .. } => {
                self.scopes.binding_mut(*b).mutated = true;
            }
            IrExprKind::Attribute { value, .. } | IrExprKind::Index { value, .. } => {
                self.mark_expr_mutated(value);
            }
            _ => {}
        }
    }

    fn mark_self_mutation(&mut self, base: &IrExpr) {
        self.mark_expr_mutated(base);
    }

    fn record_use_at(&mut self, binding: BindingId, span: Span) {
        self.uses.push((binding, span.start, span));
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, e: &mut IrExpr) -> Type {
        self.expr_hint(e, None)
    }

    fn expr_hint(&mut self, e: &mut IrExpr, hint: Option<&Type>) -> Type {
        let ty = self.expr_kind(e, hint);
        e.ty = ty.clone();
        ty
    }

    fn expr_kind(&mut self, e: &mut IrExpr, hint: Option<&Type>) -> Type {
        let span = e.span;
        let scope = e.scope;
        match &mut e.kind {
            IrExprKind::Literal(lit) => match lit {
                Lit::Int(_) => Type::Int,
                Lit::Float(_) => Type::Float,
                Lit::Str(_) => Type::Str,
                Lit::Bool(_) => Type::Bool,
                Lit::None => match hint {
                    Some(Type::Option(t)) => Type::option((**t).clone()),
                    _ => Type::Unit,
                },
            },
            IrExprKind::FString(parts) => {
                for part in parts {
                    if let IrFPart::Expr(inner) = part {
                        self.expr(inner);
                    }
                }
                Type::Str
            }
            IrExprKind::Name { name, binding } => {
                if let Some(b) = self.scopes.lookup(name, scope) {
                    *binding = Some(b);
                    self.scopes.record_use(b, scope);
                    self.record_use_at(b, span);
                    if self.scopes.binding(b).kind == BindingKind::Import {
                        return Type::Any;
                    }
                    return self.narrowed(b);
                }
                if name == "self" {
                    if let Some(class) = &self.current_class {
                        return Type::Struct(class.clone());
                    }
                }
                self.unresolved(name, span);
                Type::Any
            }
            IrExprKind::Tuple(items) => {
                let types = items.iter_mut().map(|i| self.expr(i)).collect();
                Type::Tuple(types)
            }
            IrExprKind::List(items) => {
                let hint_elem = match hint {
                    Some(Type::List(t)) => Some((**t).clone()),
                    _ => None,
                };
                let mut types = Vec::new();
                for item in items.iter_mut() {
                    types.push(self.expr_hint(item, hint_elem.as_ref()));
                }
                let elem = unify_or_any(&types).or(hint_elem).unwrap_or(Type::Any);
                Type::list(elem)
            }
            IrExprKind::Set(items) => {
                let types: Vec<Type> = items.iter_mut().map(|i| self.expr(i)).collect();
                Type::set(unify_or_any(&types).unwrap_or(Type::Any))
            }
            IrExprKind::Dict { keys, values } => {
                let key_types: Vec<Type> = keys.iter_mut().map(|k| self.expr(k)).collect();
                let value_types: Vec<Type> = values.iter_mut().map(|v| self.expr(v)).collect();
                let (kh, vh) = match hint {
                    Some(Type::Dict(k, v)) => (Some((**k).clone()), Some((**v).clone())),
                    _ => (None, None),
                };
                Type::dict(
                    unify_or_any(&key_types).or(kh).unwrap_or(Type::Any),
                    unify_or_any(&value_types).or(vh).unwrap_or(Type::Any),
                )
            }
            IrExprKind::Binary { op, left, right } => {
                let lt = self.expr(left);
                let rt = self.expr(right);
                if matches!(lt, Type::Any) || matches!(rt, Type::Any) {
                    e.bridge_required = true;
                    e.may_raise = true;
                    return Type::Any;
                }
                let op = *op;
                self.binary_type(op, &lt, &rt, span)
            }
            IrExprKind::Unary { op, operand } => {
                let ty = self.expr(operand);
                match op {
                    UnaryOp::Not => Type::Bool,
                    UnaryOp::Neg | UnaryOp::Pos => ty,
                    UnaryOp::Invert => Type::Int,
                }
            }
            IrExprKind::BoolChain { op: _, values } => {
                let types: Vec<Type> = values.iter_mut().map(|v| self.expr(v)).collect();
                if types.iter().all(|t| matches!(t, Type::Bool)) {
                    Type::Bool
                } else {
                    unify_or_any(&types).unwrap_or(Type::Any)
                }
            }
            IrExprKind::Compare {
                left, comparators, ..
            } => {
                let lt = self.expr(left);
                let mut any = matches!(lt, Type::Any);
                for c in comparators.iter_mut() {
                    any |= matches!(self.expr(c), Type::Any);
                }
                if any {
                    e.bridge_required = true;
                    e.may_raise = true;
                }
                Type::Bool
            }
            IrExprKind::Range { start, stop, step } => {
                for part in [start.as_deref_mut(), Some(stop.as_mut()), step.as_deref_mut()]
                    .into_iter()
                    .flatten()
                {
                    let ty = self.expr(part);
                    if !matches!(ty, Type::Int | Type::Any) {
                        self.mismatch(&Type::Int, &ty, part.span);
                    }
                }
                Type::list(Type::Int)
            }
            IrExprKind::Builtin { builtin, args } => {
                let builtin = *builtin;
                let arg_types: Vec<Type> =
                    args.iter_mut().map(|a| self.expr(a)).collect();
                let (ty, may_raise) = self.builtin_type(builtin, &arg_types, args, span);
                e.may_raise = may_raise;
                ty
            }
            IrExprKind::Call {
                name,
                binding,
                args,
                kwargs,
                resolution,
            } => {
                let arg_types: Vec<Type> = args.iter_mut().map(|a| self.expr(a)).collect();
                for (_, v) in kwargs.iter_mut() {
                    self.expr(v);
                }
                match resolution {
                    CallResolution::UserFunction => {
                        let sig = self.functions.get(name.as_str()).cloned();
                        match sig {
                            Some(sig) => {
                                self.check_call(&sig, &arg_types, kwargs, span);
                                // Re-infer lambda arguments against declared
                                // parameter types.
                                for (arg, (_, pty)) in args.iter_mut().zip(&sig.params) {
                                    if matches!(arg.kind, IrExprKind::Lambda { .. }) {
                                        self.expr_hint(arg, Some(pty));
                                    }
                                }
                                sig.ret
                            }
                            None => Type::Any,
                        }
                    }
                    CallResolution::Constructor => {
                        let class = name.clone();
                        if let Some(sig) = self.constructor_sig(&class) {
                            self.check_call(&sig, &arg_types, kwargs, span);
                        }
                        Type::Struct(class)
                    }
                    CallResolution::External(_) => {
                        e.bridge_required = true;
                        e.may_raise = true;
                        Type::Any
                    }
                    CallResolution::CallableValue | CallResolution::Unresolved => {
                        match self.scopes.lookup(name, scope) {
                            Some(b) => {
                                *binding = Some(b);
                                self.record_use_at(b, span);
                                *resolution = CallResolution::CallableValue;
                                match self.narrowed(b) {
                                    Type::Callable { params, ret } => {
                                        for (got, want) in arg_types.iter().zip(&params) {
                                            if !assignable(want, got) {
                                                self.mismatch(want, got, span);
                                            }
                                        }
                                        *ret
                                    }
                                    Type::Any => {
                                        e.bridge_required = true;
                                        e.may_raise = true;
                                        Type::Any
                                    }
                                    other => {
                                        self.mismatch(
                                            &Type::Callable {
                                                params: vec![],
                                                ret: Box::new(Type::Any),
                                            },
                                            &other,
                                            span,
                                        );
                                        Type::Any
                                    }
                                }
                            }
                            None => {
                                self.unresolved(name, span);
                                Type::Any
                            }
                        }
                    }
                }
            }
            IrExprKind::MethodCall {
                recv,
                method,
                args,
                kwargs,
                resolution,
            } => {
                let method = method.clone();
                let recv_ty = self.expr(recv);
                let arg_types: Vec<Type> = args.iter_mut().map(|a| self.expr(a)).collect();
                for (_, v) in kwargs.iter_mut() {
                    self.expr(v);
                }
                self.method_call(
                    (&mut e.bridge_required, &mut e.may_raise),
                    recv,
                    recv_ty,
                    &method,
                    &arg_types,
                    resolution,
                    span,
                )
            }
            IrExprKind::CallValue { callee, args } => {
                let callee_ty = self.expr(callee);
                for a in args.iter_mut() {
                    self.expr(a);
                }
                match callee_ty {
                    Type::Callable { ret, .. } => *ret,
                    Type::Any => {
                        e.bridge_required = true;
                        e.may_raise = true;
                        Type::Any
                    }
                    _ => Type::Any,
                }
            }
            IrExprKind::Super => match self
                .current_class
                .as_ref()
                .and_then(|c| self.classes.get(c))
                .and_then(|info| info.base.clone())
            {
                Some(base) => Type::Struct(base),
                None => {
                    self.diags
                        .error(
                            Code::UnresolvedName,
                            "`super()` outside a subclass method",
                            span,
                        )
                        .emit();
                    Type::Any
                }
            },
            IrExprKind::Attribute { value, attr } => {
                let attr = attr.clone();
                // `math.pi` and other native-module constants.
                if let IrExprKind::Name { name, .. } = &value.kind {
                    if let Some((path, external)) = self.imports.get(name).cloned() {
                        if !external && path == "math" {
                            return math_constant(&attr).unwrap_or(Type::Float);
                        }
                    }
                }
                let value_ty = self.expr(value);
                match value_ty {
                    Type::Struct(class) => {
                        if let Some(ty) = self.field_type(&class, &attr) {
                            ty
                        } else if let Some((_, sig)) = self.find_method(&class, &attr) {
                            Type::Callable {
                                params: sig.params.iter().map(|(_, t)| t.clone()).collect(),
                                ret: Box::new(sig.ret),
                            }
                        } else if let Some(ty) = self.find_property(&class, &attr) {
                            ty
                        } else {
                            self.unresolved(&attr, span);
                            Type::Any
                        }
                    }
                    Type::Any => {
                        e.bridge_required = true;
                        e.may_raise = true;
                        Type::Any
                    }
                    _ => Type::Any,
                }
            }
            IrExprKind::Index { value, index } => {
                let value_ty = self.expr(value);
                let index_ty = self.expr(index);
                match value_ty {
                    Type::List(t) => {
                        if !matches!(index_ty, Type::Int | Type::Any) {
                            self.mismatch(&Type::Int, &index_ty, index.span);
                        }
                        *t
                    }
                    Type::Str => Type::Str,
                    Type::Dict(_, v) => *v,
                    Type::Tuple(ts) => match &index.kind {
                        IrExprKind::Literal(Lit::Int(i)) => {
                            let idx = if *i < 0 { ts.len() as i64 + i } else { *i };
                            ts.get(idx as usize).cloned().unwrap_or(Type::Any)
                        }
                        _ => ts.first().cloned().unwrap_or(Type::Any),
                    },
                    Type::Any => {
                        e.bridge_required = true;
                        e.may_raise = true;
                        Type::Any
                    }
                    _ => Type::Any,
                }
            }
            IrExprKind::SliceExpr {
                value,
                lower,
                upper,
                step,
            } => {
                let value_ty = self.expr(value);
                for part in [lower, upper, step].into_iter().flatten() {
                    self.expr(part);
                }
                match value_ty {
                    Type::List(t) => Type::list(*t),
                    Type::Str => Type::Str,
                    Type::Any => {
                        e.bridge_required = true;
                        e.may_raise = true;
                        Type::Any
                    }
                    other => other,
                }
            }
            IrExprKind::IfExp { test, body, orelse } => {
                self.expr(test);
                let bt = self.expr_hint(body, hint);
                let ot = self.expr_hint(orelse, hint);
                unify(&bt, &ot).unwrap_or(Type::Any)
            }
            IrExprKind::Lambda { params, body, .. } => {
                if let Some(Type::Callable {
                    params: hint_params,
                    ret: hint_ret,
                }) = hint
                {
                    for (p, ty) in params.iter_mut().zip(hint_params) {
                        p.ty = ty.clone();
                        if let Some(b) = p.binding {
                            self.scopes.binding_mut(b).ty = ty.clone();
                        }
                    }
                    let body_ty = self.expr(body);
                    if !assignable(hint_ret, &body_ty) {
                        self.mismatch(hint_ret, &body_ty, body.span);
                    }
                    self.note_captures(body, span);
                    return Type::Callable {
                        params: hint_params.clone(),
                        ret: hint_ret.clone(),
                    };
                }
                // Unannotated lambda: guess parameter types from how the
                // body uses them before inferring it.
                for p in params.iter_mut() {
                    let guessed = guess_lambda_param(body, &p.name);
                    p.ty = guessed.clone();
                    if let Some(b) = p.binding {
                        self.scopes.binding_mut(b).ty = guessed;
                    }
                }
                let body_ty = self.expr(body);
                self.note_captures(body, span);
                Type::Callable {
                    params: params.iter().map(|p| p.ty.clone()).collect(),
                    ret: Box::new(body_ty),
                }
            }
            IrExprKind::ListComp(comp) => {
                let elem = self.comp_element(comp);
                Type::list(elem)
            }
            IrExprKind::SetComp(comp) => {
                let elem = self.comp_element(comp);
                Type::set(elem)
            }
            IrExprKind::GeneratorExp(comp) => {
                let elem = self.comp_element(comp);
                Type::list(elem)
            }
            IrExprKind::DictComp {
                key,
                value,
                generators,
                ..
            } => {
                self.infer_generators(generators);
                let kt = self.expr(key);
                let vt = self.expr(value);
                Type::dict(kt, vt)
            }
            IrExprKind::Elided => Type::Any,
        }
    }

    fn comp_element(&mut self, comp: &mut IrComp) -> Type {
        self.infer_generators(&mut comp.generators);
        self.expr(&mut comp.element)
    }

    fn infer_generators(&mut self, generators: &mut [IrGenerator]) {
        for r#gen in generators.iter_mut() {
            let iter_ty = self.expr(&mut r#gen.iter);
            if matches!(iter_ty, Type::Any) {
                r#gen.iter.bridge_required = true;
                r#gen.iter.may_raise = true;
            }
            let element = match &r#gen.iter.kind {
                IrExprKind::Range { .. } => Type::Int,
                _ => iter_ty.element(),
            };
            let scope = r#gen.iter.scope;
            self.assign_target(&mut r#gen.target, &element, None, scope, r#gen.iter.span);
            for cond in &mut r#gen.ifs {
                self.expr(cond);
            }
        }
    }

    /// Free variables of a lambda body that live outside it: candidate
    /// closure captures for the ownership check.
    fn note_captures(&mut self, body: &IrExpr, lambda_span: Span) {
        let mut bindings = Vec::new();
        collect_names(body, &mut bindings);
        for b in bindings {
            let home = self.scopes.binding(b).scope;
            if !self.scopes.is_within(home, body.scope)
                && self.scopes.scope(home).kind != super::scope::ScopeKind::Module
            {
                self.captures.push((b, lambda_span.end));
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn binary_type(&mut self, op: BinOp, lt: &Type, rt: &Type, span: Span) -> Type {
        use Type::*;
        if matches!(lt, Any) || matches!(rt, Any) {
            return Any;
        }
        match op {
            BinOp::Add => match (lt, rt) {
                (Str, Str) => Str,
                (List(a), List(b)) => {
                    Type::list(unify(a, b).unwrap_or(Type::Any))
                }
                _ if lt.is_numeric() && rt.is_numeric() => promote(lt, rt),
                _ => {
                    self.mismatch(lt, rt, span);
                    Any
                }
            },
            BinOp::Sub | BinOp::Mul | BinOp::Pow => match (lt, rt) {
                (Str, Int) | (Int, Str) if op == BinOp::Mul => Str,
                (List(t), Int) if op == BinOp::Mul => Type::list((**t).clone()),
                _ if lt.is_numeric() && rt.is_numeric() => {
                    if op == BinOp::Pow {
                        // Negative exponents go float at runtime; stay with
                        // the operand promotion.
                        promote(lt, rt)
                    } else {
                        promote(lt, rt)
                    }
                }
                _ => {
                    self.mismatch(lt, rt, span);
                    Any
                }
            },
            BinOp::Div => {
                if lt.is_numeric() && rt.is_numeric() {
                    Float
                } else {
                    self.mismatch(lt, rt, span);
                    Any
                }
            }
            BinOp::FloorDiv | BinOp::Mod => {
                if lt.is_numeric() && rt.is_numeric() {
                    promote(lt, rt)
                } else if matches!((lt, rt), (Str, _)) && op == BinOp::Mod {
                    Str
                } else {
                    self.mismatch(lt, rt, span);
                    Any
                }
            }
            BinOp::MatMul => {
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        "`@` is only supported for bridge values",
                        span,
                    )
                    .emit();
                Any
            }
            BinOp::Shl | BinOp::Shr | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                match (lt, rt) {
                    (Int | Bool, Int | Bool) => Int,
                    (Set(a), Set(b)) => Type::set(unify(a, b).unwrap_or(Type::Any)),
                    _ => {
                        self.mismatch(lt, rt, span);
                        Any
                    }
                }
            }
        }
    }

    fn builtin_type(
        &mut self,
        builtin: Builtin,
        arg_types: &[Type],
        args: &mut [IrExpr],
        span: Span,
    ) -> (Type, bool) {
        use Builtin::*;
        let first = arg_types.first().cloned().unwrap_or(Type::Any);
        let ty = match builtin {
            Print => Type::Unit,
            Len => Type::Int,
            ListCtor => match &first {
                _ if args.is_empty() => Type::list(Type::Any),
                t => Type::list(t.element()),
            },
            DictCtor => match &first {
                _ if args.is_empty() => Type::dict(Type::Any, Type::Any),
                Type::Dict(k, v) => Type::dict((**k).clone(), (**v).clone()),
                Type::List(elem) => match &**elem {
                    Type::Tuple(kv) if kv.len() == 2 => {
                        Type::dict(kv[0].clone(), kv[1].clone())
                    }
                    _ => Type::dict(Type::Any, Type::Any),
                },
                _ => Type::dict(Type::Any, Type::Any),
            },
            SetCtor => match &first {
                _ if args.is_empty() => Type::set(Type::Any),
                t => Type::set(t.element()),
            },
            TupleCtor => match &first {
                Type::Tuple(ts) => Type::Tuple(ts.clone()),
                t => Type::list(t.element()),
            },
            Str => Type::Str,
            Int => {
                let may_raise = matches!(first, Type::Str | Type::Any);
                return (Type::Int, may_raise);
            }
            Float => {
                let may_raise = matches!(first, Type::Str | Type::Any);
                return (Type::Float, may_raise);
            }
            Bool => Type::Bool,
            Abs => first,
            Min | Max => unify_or_any(arg_types).unwrap_or(Type::Any),
            Round => {
                if arg_types.len() >= 2 {
                    Type::Float
                } else {
                    Type::Int
                }
            }
            Chr => Type::Str,
            Ord => Type::Int,
            Bin | Hex | Oct => Type::Str,
            Sum => first.element(),
            Sorted => Type::list(first.element()),
            Enumerate => Type::list(Type::Tuple(vec![Type::Int, first.element()])),
            Zip => {
                let second = arg_types.get(1).cloned().unwrap_or(Type::Any);
                Type::list(Type::Tuple(vec![first.element(), second.element()]))
            }
            Input => Type::Str,
            IsInstance => {
                if args.len() != 2 {
                    self.diags
                        .error(Code::TypeMismatch, "isinstance takes two arguments", span)
                        .emit();
                }
                Type::Bool
            }
        };
        (ty, false)
    }

    fn check_call(
        &mut self,
        sig: &FnSig,
        arg_types: &[Type],
        kwargs: &[(String, IrExpr)],
        span: Span,
    ) {
        if !sig.variadic {
            let positional = arg_types.len();
            let named: Vec<&str> = kwargs.iter().map(|(k, _)| k.as_str()).collect();
            if positional + named.len() > sig.params.len()
                || positional + named.len() < sig.required()
            {
                self.diags
                    .error(
                        Code::TypeMismatch,
                        format!(
                            "expected between {} and {} arguments, found {}",
                            sig.required(),
                            sig.params.len(),
                            positional + named.len()
                        ),
                        span,
                    )
                    .emit();
                return;
            }
            for name in named {
                if !sig.params.iter().any(|(p, _)| p == name) {
                    self.diags
                        .error(
                            Code::UnresolvedName,
                            format!("no parameter named `{}`", name),
                            span,
                        )
                        .emit();
                }
            }
        }
        for (got, (_, want)) in arg_types.iter().zip(&sig.params) {
            if !assignable(want, got) {
                self.mismatch(want, got, span);
            }
        }
    }

    fn constructor_sig(&self, class: &str) -> Option<FnSig> {
        let info = self.classes.get(class)?;
        if info.has_init {
            return info.methods.get("__init__").cloned();
        }
        if info.dataclass {
            let params: Vec<(String, Type)> = info
                .fields
                .iter()
                .map(|(n, t)| (n.clone(), t.clone()))
                .collect();
            return Some(FnSig {
                defaults: 0,
                variadic: false,
                ret: Type::Struct(class.to_string()),
                mutates_self: false,
                params,
            });
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn method_call(
        &mut self,
        (bridge_required, may_raise): (&mut bool, &mut bool),
        recv: &mut IrExpr,
        recv_ty: Type,
        method: &str,
        arg_types: &[Type],
        resolution: &mut MethodResolution,
        span: Span,
    ) -> Type {
        if *resolution == MethodResolution::MathModule {
            return math_function(method).unwrap_or_else(|| {
                self.unresolved(method, span);
                Type::Float
            });
        }

        match recv_ty {
            Type::Str => {
                *resolution = MethodResolution::StrMethod;
                str_method(method).unwrap_or_else(|| {
                    self.unresolved(method, span);
                    Type::Any
                })
            }
            Type::List(elem) => {
                *resolution = MethodResolution::ListMethod;
                if list_method_mutates(method) {
                    self.mark_expr_mutated(recv);
                }
                list_method(method, &elem).unwrap_or_else(|| {
                    self.unresolved(method, span);
                    Type::Any
                })
            }
            Type::Dict(k, v) => {
                *resolution = MethodResolution::DictMethod;
                dict_method(method, &k, &v, arg_types.len()).unwrap_or_else(|| {
                    self.unresolved(method, span);
                    Type::Any
                })
            }
            Type::Set(elem) => {
                *resolution = MethodResolution::SetMethod;
                if matches!(method, "add" | "remove" | "discard" | "clear") {
                    self.mark_expr_mutated(recv);
                }
                set_method(method, &elem).unwrap_or_else(|| {
                    self.unresolved(method, span);
                    Type::Any
                })
            }
            Type::Struct(class) => match self.find_method(&class, method) {
                Some((owner, sig)) => {
                    *resolution = MethodResolution::UserMethod(owner);
                    for (got, (_, want)) in arg_types.iter().zip(&sig.params) {
                        if !assignable(want, got) {
                            self.mismatch(want, got, span);
                        }
                    }
                    sig.ret
                }
                None => {
                    // A callable field invoked through the receiver.
                    if let Some(Type::Callable { params, ret }) = self.field_type(&class, method)
                    {
                        *resolution = MethodResolution::CallableField(class.clone());
                        for (got, want) in arg_types.iter().zip(&params) {
                            if !assignable(want, got) {
                                self.mismatch(want, got, span);
                            }
                        }
                        return *ret;
                    }
                    self.unresolved(method, span);
                    Type::Any
                }
            },
            Type::Any => {
                *resolution = MethodResolution::Bridge;
                *bridge_required = true;
                *may_raise = true;
                Type::Any
            }
            other => {
                self.mismatch(&Type::Any, &other, span);
                Type::Any
            }
        }
    }

    fn field_type(&self, class: &str, field: &str) -> Option<Type> {
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            let info = self.classes.get(&name)?;
            if let Some(ty) = info.fields.get(field) {
                return Some(ty.clone());
            }
            current = info.base.clone();
        }
        None
    }

    fn find_method(&self, class: &str, method: &str) -> Option<(String, FnSig)> {
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            let info = self.classes.get(&name)?;
            if let Some(sig) = info.methods.get(method) {
                return Some((name, sig.clone()));
            }
            current = info.base.clone();
        }
        None
    }

    fn find_property(&self, class: &str, prop: &str) -> Option<Type> {
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            let info = self.classes.get(&name)?;
            if let Some(ty) = info.properties.get(prop) {
                return Some(ty.clone());
            }
            current = info.base.clone();
        }
        None
    }

    /// Facts derived from an `if` test: (then, else).
    fn facts(&mut self, test: &IrExpr) -> (Vec<(BindingId, Type)>, Vec<(BindingId, Type)>) {
        match &test.kind {
            IrExprKind::Compare {
                left,
                ops,
                comparators,
            } if ops.len() == 1 => {
                let IrExprKind::Name { binding: Some(b), .. } = &left.kind else {
                    return Default::default();
                };
                let is_none_cmp = comparators
                    .first()
                    .is_some_and(|c| matches!(c.kind, IrExprKind::Literal(Lit::None)));
                if !is_none_cmp {
                    return Default::default();
                }
                let Type::Option(inner) = self.scopes.binding(*b).ty.clone() else {
                    return Default::default();
                };
                match ops[0] {
                    CmpOp::Is | CmpOp::Eq => (Vec::new(), vec![(*b, (*inner).clone())]),
                    CmpOp::IsNot | CmpOp::NotEq => (vec![(*b, (*inner).clone())], Vec::new()),
                    _ => Default::default(),
                }
            }
            IrExprKind::Builtin {
                builtin: Builtin::IsInstance,
                args,
            } => {
                let [value, class_expr] = args.as_slice() else {
                    return Default::default();
                };
                let IrExprKind::Name { binding: Some(b), .. } = &value.kind else {
                    return Default::default();
                };
                let IrExprKind::Name { name, .. } = &class_expr.kind else {
                    return Default::default();
                };
                let narrowed = match name.as_str() {
                    "int" => Type::Int,
                    "float" => Type::Float,
                    "str" => Type::Str,
                    "bool" => Type::Bool,
                    other if self.classes.contains_key(other) => {
                        Type::Struct(other.to_string())
                    }
                    _ => return Default::default(),
                };
                (vec![(*b, narrowed)], Vec::new())
            }
            IrExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let (t, e) = self.facts(operand);
                (e, t)
            }
            IrExprKind::BoolChain {
                op: BoolOp::And,
                values,
            } => {
                let mut then_facts = Vec::new();
                for v in values {
                    then_facts.extend(self.facts(v).0);
                }
                (then_facts, Vec::new())
            }
            _ => Default::default(),
        }
    }
}

fn promote(a: &Type, b: &Type) -> Type {
    if matches!(a, Type::Float) || matches!(b, Type::Float) {
        Type::Float
    } else {
        Type::Int
    }
}

fn unify_or_any(types: &[Type]) -> Option<Type> {
    if types.is_empty() {
        return None;
    }
    super::types::unify_all(types).or(Some(Type::Any))
}

fn diverges(stmts: &[IrStmt]) -> bool {
    match stmts.last() {
        Some(stmt) => match &stmt.kind {
            IrStmtKind::Return(_)
            | IrStmtKind::Raise { .. }
            | IrStmtKind::Break
            | IrStmtKind::Continue => true,
            IrStmtKind::If { body, orelse, .. } => {
                !orelse.is_empty() && diverges(body) && diverges(orelse)
            }
            _ => false,
        },
        None => false,
    }
}

/// Usage-based type for an unannotated lambda parameter: arithmetic and
/// comparisons suggest `int`, string concatenation `str`; anything else
/// stays dynamic.
fn guess_lambda_param(body: &IrExpr, param: &str) -> Type {
    fn mentions(e: &IrExpr, name: &str) -> bool {
        if matches!(&e.kind, IrExprKind::Name { name: n, .. } if n == name) {
            return true;
        }
        let mut found = false;
        visit_children(e, &mut |c| found |= mentions(c, name));
        found
    }
    fn scan(e: &IrExpr, name: &str, out: &mut Option<Type>) {
        match &e.kind {
            IrExprKind::Binary { left, right, .. } => {
                let involved = mentions_direct(left, name) || mentions_direct(right, name);
                if involved && out.is_none() {
                    let other_is_str = matches!(left.kind, IrExprKind::Literal(Lit::Str(_)))
                        || matches!(right.kind, IrExprKind::Literal(Lit::Str(_)));
                    *out = Some(if other_is_str { Type::Str } else { Type::Int });
                }
            }
            IrExprKind::Compare {
                left, comparators, ..
            } => {
                let involved = mentions_direct(left, name)
                    || comparators.iter().any(|c| mentions_direct(c, name));
                if involved && out.is_none() {
                    *out = Some(Type::Int);
                }
            }
            _ => {}
        }
        visit_children(e, &mut |c| scan(c, name, out));
    }
    fn mentions_direct(e: &IrExpr, name: &str) -> bool {
        matches!(&e.kind, IrExprKind::Name { name: n, .. } if n == name)
    }
    if !mentions(body, param) {
        return Type::Any;
    }
    let mut guessed = None;
    scan(body, param, &mut guessed);
    guessed.unwrap_or(Type::Any)
}

fn collect_names(expr: &IrExpr, out: &mut Vec<BindingId>) {
    if let IrExprKind::Name { binding: Some(b), .. } = &expr.kind {
        out.push(*b);
    }
    visit_children(expr, &mut |child| collect_names(child, out));
}

fn known_error_kind(kind: &str) -> bool {
    matches!(
        kind,
        "ValueError"
            | "TypeError"
            | "IndexError"
            | "KeyError"
            | "AttributeError"
            | "ZeroDivisionError"
            | "RuntimeError"
            | "Exception"
    )
}

fn math_constant(name: &str) -> Option<Type> {
    matches!(name, "pi" | "e" | "tau" | "inf" | "nan").then_some(Type::Float)
}

fn math_function(name: &str) -> Option<Type> {
    Some(match name {
        "floor" | "ceil" => Type::Int,
        "sqrt" | "pow" | "log" | "log2" | "log10" | "sin" | "cos" | "tan" | "fabs" | "exp" => {
            Type::Float
        }
        _ => return None,
    })
}

fn str_method(name: &str) -> Option<Type> {
    Some(match name {
        "upper" | "lower" | "strip" | "lstrip" | "rstrip" | "replace" | "zfill" | "ljust"
        | "rjust" | "center" | "join" | "format" => Type::Str,
        "split" => Type::list(Type::Str),
        "startswith" | "endswith" | "isdigit" | "isalpha" | "isalnum" | "isupper" | "islower" => {
            Type::Bool
        }
        "find" | "rfind" | "count" => Type::Int,
        _ => return None,
    })
}

fn list_method(name: &str, elem: &Type) -> Option<Type> {
    Some(match name {
        "append" | "insert" | "remove" | "extend" | "reverse" | "sort" | "clear" => Type::Unit,
        "pop" => elem.clone(),
        "index" | "count" => Type::Int,
        "copy" => Type::list(elem.clone()),
        _ => return None,
    })
}

fn list_method_mutates(name: &str) -> bool {
    matches!(
        name,
        "append" | "pop" | "insert" | "remove" | "extend" | "reverse" | "sort" | "clear"
    )
}

fn dict_method(name: &str, k: &Type, v: &Type, arg_count: usize) -> Option<Type> {
    Some(match name {
        "get" => {
            if arg_count >= 2 {
                v.clone()
            } else {
                Type::option(v.clone())
            }
        }
        "keys" => Type::list(k.clone()),
        "values" => Type::list(v.clone()),
        "items" => Type::list(Type::Tuple(vec![k.clone(), v.clone()])),
        _ => return None,
    })
}

fn set_method(name: &str, _elem: &Type) -> Option<Type> {
    Some(match name {
        "add" | "remove" | "discard" | "clear" => Type::Unit,
        _ => return None,
    })
}
