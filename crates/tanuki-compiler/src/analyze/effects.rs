//! Effect analysis: `may_raise` to a fixed point.
//!
//! A function may raise when it contains a `raise` not fully covered by an
//! enclosing `try`, or transitively calls something that may raise without
//! catching it. Methods join the same graph under `Class.method` keys.
//! Bridge-required operations raise an open set of kinds that only a
//! catch-all handler covers.
//!
//! The pass also finalizes receiver mutability: a method that mutates
//! `self` makes every receiver it is called on mutable.

use indexmap::{IndexMap, IndexSet};

use super::scope::BindingId;
use super::types::Type;
use super::Analysis;
use crate::ir::*;

/// Kinds a body can raise. `any` stands for the open-ended bridge set.
#[derive(Debug, Clone, Default, PartialEq)]
struct KindSet {
    any: bool,
    kinds: IndexSet<String>,
}

impl KindSet {
    fn add(&mut self, kind: &str) {
        self.kinds.insert(kind.to_string());
    }

    fn add_any(&mut self) {
        self.any = true;
    }

    fn union(&mut self, other: &KindSet) {
        self.any |= other.any;
        for k in &other.kinds {
            self.kinds.insert(k.clone());
        }
    }

    fn is_empty(&self) -> bool {
        !self.any && self.kinds.is_empty()
    }

    /// Removes everything the handlers cover.
    fn subtract_handlers(&mut self, handlers: &[IrHandler]) {
        if handlers.iter().any(|h| h.is_catch_all()) {
            self.any = false;
            self.kinds.clear();
            return;
        }
        for handler in handlers {
            for kind in &handler.kinds {
                self.kinds.shift_remove(kind);
            }
        }
    }
}

pub(super) fn run(module: &mut IrModule, analysis: &mut Analysis) {
    let mut sets: IndexMap<String, KindSet> = IndexMap::new();
    for func in &module.functions {
        sets.insert(func.name.clone(), KindSet::default());
    }
    for class in &module.classes {
        for method in &class.methods {
            sets.insert(method_key(&class.name, &method.name), KindSet::default());
        }
    }

    // Fixed point over the call graph.
    loop {
        let mut changed = false;
        for func in &module.functions {
            let set = block_raises(&func.body, &sets);
            if sets.get(&func.name) != Some(&set) {
                sets.insert(func.name.clone(), set);
                changed = true;
            }
        }
        for class in &module.classes {
            for method in &class.methods {
                let key = method_key(&class.name, &method.name);
                let set = block_raises(&method.body, &sets);
                if sets.get(&key) != Some(&set) {
                    sets.insert(key, set);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    for func in &mut module.functions {
        func.may_raise = !sets[&func.name].is_empty();
    }
    for class in &mut module.classes {
        for method in &mut class.methods {
            method.may_raise = !sets[&method_key(&class.name, &method.name)].is_empty();
        }
    }

    annotate_module(module, &sets);
    finalize_self_mutation(module, analysis);
}

fn method_key(class: &str, method: &str) -> String {
    format!("{}.{}", class, method)
}

fn block_raises(stmts: &[IrStmt], sets: &IndexMap<String, KindSet>) -> KindSet {
    let mut out = KindSet::default();
    for stmt in stmts {
        out.union(&stmt_raises(stmt, sets));
    }
    out
}

fn stmt_raises(stmt: &IrStmt, sets: &IndexMap<String, KindSet>) -> KindSet {
    let mut out = KindSet::default();
    match &stmt.kind {
        IrStmtKind::Raise {
            kind,
            message,
            cause,
            reraise,
        } => {
            if reraise.is_some() || kind.is_empty() {
                out.add_any();
            } else {
                out.add(kind);
            }
            for e in [message, cause].into_iter().flatten() {
                out.union(&expr_raises(e, sets));
            }
        }
        IrStmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            let mut body_set = block_raises(body, sets);
            body_set.union(&block_raises(orelse, sets));
            body_set.subtract_handlers(handlers);
            out.union(&body_set);
            for handler in handlers {
                out.union(&block_raises(&handler.body, sets));
            }
            out.union(&block_raises(finalbody, sets));
        }
        IrStmtKind::If { test, body, orelse, .. } => {
            out.union(&expr_raises(test, sets));
            out.union(&block_raises(body, sets));
            out.union(&block_raises(orelse, sets));
        }
        IrStmtKind::While { test, body, .. } => {
            out.union(&expr_raises(test, sets));
            out.union(&block_raises(body, sets));
        }
        IrStmtKind::For { target, iter, body, .. } => {
            out.union(&target_raises(target, sets, false));
            out.union(&expr_raises(iter, sets));
            out.union(&block_raises(body, sets));
        }
        IrStmtKind::With {
            context,
            binding,
            body,
            ..
        } => {
            out.union(&expr_raises(context, sets));
            if let Some(target) = binding {
                out.union(&target_raises(target, sets, false));
            }
            out.union(&block_raises(body, sets));
        }
        IrStmtKind::Assign { value, target, .. } => {
            out.union(&expr_raises(value, sets));
            out.union(&target_raises(target, sets, false));
        }
        IrStmtKind::AugAssign { value, target, .. } => {
            out.union(&expr_raises(value, sets));
            out.union(&target_raises(target, sets, true));
        }
        IrStmtKind::Unpack { value, targets, .. } => {
            out.union(&expr_raises(value, sets));
            for t in targets {
                out.union(&target_raises(t, sets, false));
            }
        }
        IrStmtKind::Expr(e) => out.union(&expr_raises(e, sets)),
        IrStmtKind::Return(Some(e)) => out.union(&expr_raises(e, sets)),
        IrStmtKind::Return(None)
        | IrStmtKind::Swap { .. }
        | IrStmtKind::Break
        | IrStmtKind::Continue
        | IrStmtKind::Pass
        | IrStmtKind::Elided => {}
    }
    out
}

/// Kinds an assignment *target* can raise. `aug` marks read-modify-write
/// targets, which also perform the read (`d[k] += v` can `KeyError`).
fn target_raises(target: &IrTarget, sets: &IndexMap<String, KindSet>, aug: bool) -> KindSet {
    let mut out = KindSet::default();
    match target {
        IrTarget::Name { .. } => {}
        IrTarget::Attribute { base, .. } => out.union(&expr_raises(base, sets)),
        IrTarget::Index { base, index } => {
            out.union(&expr_raises(base, sets));
            out.union(&expr_raises(index, sets));
            match &base.ty {
                Type::List(_) => out.add("IndexError"),
                Type::Dict(..) if aug => out.add("KeyError"),
                _ => {}
            }
        }
        IrTarget::Tuple(ts) => {
            for t in ts {
                out.union(&target_raises(t, sets, aug));
            }
        }
    }
    out
}

fn expr_raises(expr: &IrExpr, sets: &IndexMap<String, KindSet>) -> KindSet {
    let mut out = KindSet::default();
    if expr.bridge_required {
        out.add_any();
    }
    match &expr.kind {
        IrExprKind::Call { name, resolution, .. } => match resolution {
            CallResolution::UserFunction => {
                if let Some(set) = sets.get(name) {
                    out.union(set);
                }
            }
            CallResolution::Constructor => {
                if let Some(set) = sets.get(&method_key(name, "__init__")) {
                    out.union(set);
                }
            }
            CallResolution::External(_) => out.add_any(),
            CallResolution::CallableValue | CallResolution::Unresolved => {}
        },
        IrExprKind::MethodCall {
            method, resolution, ..
        } => match resolution {
            MethodResolution::UserMethod(owner) => {
                if let Some(set) = sets.get(&method_key(owner, method)) {
                    out.union(set);
                }
            }
            MethodResolution::Bridge => out.add_any(),
            MethodResolution::ListMethod => match method.as_str() {
                "pop" => out.add("IndexError"),
                "remove" | "index" => out.add("ValueError"),
                _ => {}
            },
            MethodResolution::SetMethod if method == "remove" => out.add("KeyError"),
            _ => {}
        },
        IrExprKind::Builtin {
            builtin: Builtin::Int | Builtin::Float,
            ..
        } if expr.may_raise => out.add("ValueError"),
        // Native container access raises like the source language.
        IrExprKind::Index { value, .. } => match &value.ty {
            Type::List(_) | Type::Str => out.add("IndexError"),
            Type::Dict(..) => out.add("KeyError"),
            _ => {}
        },
        IrExprKind::SliceExpr { value, .. } => {
            if matches!(&value.ty, Type::List(_) | Type::Str) {
                out.add("ValueError");
            }
        }
        _ => {}
    }
    visit_children(expr, &mut |child| out.union(&expr_raises(child, sets)));
    out
}

/// Second sweep: stamp `may_raise` on every call site whose callee set is
/// non-empty, so the generator knows where `?` belongs.
fn annotate_module(module: &mut IrModule, sets: &IndexMap<String, KindSet>) {
    for func in &mut module.functions {
        annotate_block(&mut func.body, sets);
    }
    for class in &mut module.classes {
        for method in &mut class.methods {
            annotate_block(&mut method.body, sets);
        }
    }
    annotate_block(&mut module.setup, sets);
    if let Some(entry) = &mut module.entry {
        annotate_block(entry, sets);
    }
}

fn annotate_block(stmts: &mut [IrStmt], sets: &IndexMap<String, KindSet>) {
    for stmt in stmts {
        annotate_stmt(stmt, sets);
    }
}

fn annotate_stmt(stmt: &mut IrStmt, sets: &IndexMap<String, KindSet>) {
    match &mut stmt.kind {
        IrStmtKind::Assign { value, target, .. }
        | IrStmtKind::AugAssign { value, target, .. } => {
            annotate_expr(value, sets);
            annotate_target(target, sets);
        }
        IrStmtKind::Unpack { value, targets, .. } => {
            annotate_expr(value, sets);
            for t in targets {
                annotate_target(t, sets);
            }
        }
        IrStmtKind::Expr(e) => annotate_expr(e, sets),
        IrStmtKind::Return(Some(e)) => annotate_expr(e, sets),
        IrStmtKind::If { test, body, orelse, .. } => {
            annotate_expr(test, sets);
            annotate_block(body, sets);
            annotate_block(orelse, sets);
        }
        IrStmtKind::While { test, body, .. } => {
            annotate_expr(test, sets);
            annotate_block(body, sets);
        }
        IrStmtKind::For { iter, body, .. } => {
            annotate_expr(iter, sets);
            annotate_block(body, sets);
        }
        IrStmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            annotate_block(body, sets);
            for h in handlers {
                annotate_block(&mut h.body, sets);
            }
            annotate_block(orelse, sets);
            annotate_block(finalbody, sets);
        }
        IrStmtKind::Raise {
            message, cause, reraise, ..
        } => {
            for e in [message, cause, reraise].into_iter().flatten() {
                annotate_expr(e, sets);
            }
        }
        IrStmtKind::With { context, body, .. } => {
            annotate_expr(context, sets);
            annotate_block(body, sets);
        }
        _ => {}
    }
}

fn annotate_target(target: &mut IrTarget, sets: &IndexMap<String, KindSet>) {
    match target {
        IrTarget::Name { .. } => {}
        IrTarget::Attribute { base, .. } => annotate_expr(base, sets),
        IrTarget::Index { base, index } => {
            annotate_expr(base, sets);
            annotate_expr(index, sets);
        }
        IrTarget::Tuple(ts) => {
            for t in ts {
                annotate_target(t, sets);
            }
        }
    }
}

fn annotate_expr(expr: &mut IrExpr, sets: &IndexMap<String, KindSet>) {
    match &mut expr.kind {
        IrExprKind::Call { name, resolution, args, kwargs, .. } => {
            let raises = match resolution {
                CallResolution::UserFunction => {
                    sets.get(name.as_str()).is_some_and(|s| !s.is_empty())
                }
                CallResolution::Constructor => sets
                    .get(&method_key(name, "__init__"))
                    .is_some_and(|s| !s.is_empty()),
                CallResolution::External(_) => true,
                _ => false,
            };
            if raises {
                expr.may_raise = true;
            }
            for a in args {
                annotate_expr(a, sets);
            }
            for (_, v) in kwargs {
                annotate_expr(v, sets);
            }
        }
        IrExprKind::MethodCall {
            recv,
            method,
            resolution,
            args,
            kwargs,
        } => {
            let raises = match resolution {
                MethodResolution::UserMethod(owner) => sets
                    .get(&method_key(owner, method))
                    .is_some_and(|s| !s.is_empty()),
                MethodResolution::Bridge => true,
                MethodResolution::ListMethod => {
                    matches!(method.as_str(), "pop" | "remove" | "index")
                }
                MethodResolution::SetMethod => method == "remove",
                _ => false,
            };
            if raises {
                expr.may_raise = true;
            }
            annotate_expr(recv, sets);
            for a in args {
                annotate_expr(a, sets);
            }
            for (_, v) in kwargs {
                annotate_expr(v, sets);
            }
        }
        IrExprKind::Index { value, index } => {
            if matches!(&value.ty, Type::List(_) | Type::Str | Type::Dict(..)) {
                expr.may_raise = true;
            }
            annotate_expr(value, sets);
            annotate_expr(index, sets);
        }
        IrExprKind::SliceExpr {
            value,
            lower,
            upper,
            step,
        } => {
            if matches!(&value.ty, Type::List(_) | Type::Str) {
                expr.may_raise = true;
            }
            annotate_expr(value, sets);
            for part in [lower, upper, step].into_iter().flatten() {
                annotate_expr(part, sets);
            }
        }
        _ => visit_children_mut(expr, &mut |child| annotate_expr(child, sets)),
    }
}

/// Mutable counterpart of [`visit_children`], local to this pass.
fn visit_children_mut(expr: &mut IrExpr, f: &mut dyn FnMut(&mut IrExpr)) {
    use IrExprKind::*;
    match &mut expr.kind {
        Literal(_) | Name { .. } | Elided | Super => {}
        FString(parts) => {
            for p in parts {
                if let IrFPart::Expr(e) = p {
                    f(e);
                }
            }
        }
        Tuple(xs) | List(xs) | Set(xs) => xs.iter_mut().for_each(f),
        Dict { keys, values } => {
            keys.iter_mut().for_each(&mut *f);
            values.iter_mut().for_each(f);
        }
        Binary { left, right, .. } => {
            f(left);
            f(right);
        }
        Unary { operand, .. } => f(operand),
        BoolChain { values, .. } => values.iter_mut().for_each(f),
        Compare {
            left, comparators, ..
        } => {
            f(left);
            comparators.iter_mut().for_each(f);
        }
        Range { start, stop, step } => {
            if let Some(s) = start {
                f(s);
            }
            f(stop);
            if let Some(s) = step {
                f(s);
            }
        }
        Builtin { args, .. } => args.iter_mut().for_each(f),
        Call { args, kwargs, .. } => {
            args.iter_mut().for_each(&mut *f);
            kwargs.iter_mut().for_each(|(_, v)| f(v));
        }
        MethodCall {
            recv, args, kwargs, ..
        } => {
            f(recv);
            args.iter_mut().for_each(&mut *f);
            kwargs.iter_mut().for_each(|(_, v)| f(v));
        }
        CallValue { callee, args } => {
            f(callee);
            args.iter_mut().for_each(f);
        }
        Attribute { value, .. } => f(value),
        Index { value, index } => {
            f(value);
            f(index);
        }
        SliceExpr {
            value,
            lower,
            upper,
            step,
        } => {
            f(value);
            for part in [lower, upper, step].into_iter().flatten() {
                f(part);
            }
        }
        IfExp { test, body, orelse } => {
            f(test);
            f(body);
            f(orelse);
        }
        Lambda { body, .. } => f(body),
        ListComp(c) | SetComp(c) | GeneratorExp(c) => {
            f(&mut c.element);
            for g in &mut c.generators {
                f(&mut g.iter);
                g.ifs.iter_mut().for_each(&mut *f);
            }
        }
        DictComp {
            key,
            value,
            generators,
            ..
        } => {
            f(key);
            f(value);
            for g in generators {
                f(&mut g.iter);
                g.ifs.iter_mut().for_each(&mut *f);
            }
        }
    }
}

/// Methods that mutate `self` (directly, or by calling a sibling that
/// does) make their receivers mutable at every call site.
fn finalize_self_mutation(module: &IrModule, analysis: &mut Analysis) {
    let mut mutating: IndexSet<String> = IndexSet::new();

    // Seed: the inference pass marked the `self` binding mutated whenever a
    // method assigned through it.
    for class in &module.classes {
        for method in &class.methods {
            let self_mutated = method
                .params
                .iter()
                .find(|p| p.is_self)
                .and_then(|p| p.binding)
                .is_some_and(|b| analysis.scopes.binding(b).mutated);
            if self_mutated {
                mutating.insert(method_key(&class.name, &method.name));
            }
        }
    }

    // Propagate through `self.other()` calls.
    loop {
        let mut changed = false;
        for class in &module.classes {
            for method in &class.methods {
                let key = method_key(&class.name, &method.name);
                if mutating.contains(&key) {
                    continue;
                }
                if calls_mutating_self_method(&method.body, &mutating) {
                    mutating.insert(key);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    for class in &module.classes {
        for method in &class.methods {
            let key = method_key(&class.name, &method.name);
            if let Some(info) = analysis.classes.get_mut(&class.name) {
                if let Some(sig) = info.methods.get_mut(&method.name) {
                    sig.mutates_self = mutating.contains(&key);
                }
            }
        }
    }

    // Receivers of mutating methods become mutable bindings.
    mark_mutating_receivers(module, &mutating, analysis);
    mark_refmut_arguments(module, analysis);
}

/// Arguments passed to parameters the callee mutates must themselves be
/// mutable at the call site (`f(&mut xs)`).
fn mark_refmut_arguments(module: &IrModule, analysis: &mut Analysis) {
    // Which positional parameters of each callable are mutated containers?
    let mut mutated_params: IndexMap<String, Vec<bool>> = IndexMap::new();
    let param_flags = |func: &IrFunction, analysis: &Analysis| -> Vec<bool> {
        func.params
            .iter()
            .filter(|p| !p.is_self)
            .map(|p| {
                p.binding
                    .is_some_and(|b| analysis.scopes.binding(b).mutated)
                    && !p.ty.is_primitive()
            })
            .collect()
    };
    for func in &module.functions {
        mutated_params.insert(func.name.clone(), param_flags(func, analysis));
    }
    for class in &module.classes {
        for method in &class.methods {
            mutated_params.insert(
                method_key(&class.name, &method.name),
                param_flags(method, analysis),
            );
        }
    }

    let mut to_mark: Vec<BindingId> = Vec::new();
    let mut collect = |expr: &IrExpr| {
        let (key, args) = match &expr.kind {
            IrExprKind::Call {
                name,
                args,
                resolution: CallResolution::UserFunction,
                ..
            } => (name.clone(), args),
            IrExprKind::MethodCall {
                method,
                args,
                resolution: MethodResolution::UserMethod(owner),
                ..
            } => (method_key(owner, method), args),
            _ => return,
        };
        let Some(flags) = mutated_params.get(&key) else {
            return;
        };
        for (arg, &mutated) in args.iter().zip(flags) {
            if !mutated {
                continue;
            }
            if let IrExprKind::Name { binding: Some(b), .. } = &arg.kind {
                to_mark.push(*b);
            }
        }
    };

    for func in &module.functions {
        walk_exprs(&func.body, &mut collect);
    }
    for class in &module.classes {
        for method in &class.methods {
            walk_exprs(&method.body, &mut collect);
        }
    }
    walk_exprs(&module.setup, &mut collect);
    if let Some(entry) = &module.entry {
        walk_exprs(entry, &mut collect);
    }

    for b in to_mark {
        analysis.scopes.binding_mut(b).mutated = true;
    }
}

fn calls_mutating_self_method(stmts: &[IrStmt], mutating: &IndexSet<String>) -> bool {
    let mut found = false;
    walk_exprs(stmts, &mut |expr| {
        if let IrExprKind::MethodCall { recv, method, resolution, .. } = &expr.kind {
            if matches!(&recv.kind, IrExprKind::Name { name, .. } if name == "self") {
                if let MethodResolution::UserMethod(owner) = resolution {
                    found |= mutating.contains(&method_key(owner, method));
                }
            }
        }
    });
    found
}

fn mark_mutating_receivers(
    module: &IrModule,
    mutating: &IndexSet<String>,
    analysis: &mut Analysis,
) {
    let mut to_mark: Vec<BindingId> = Vec::new();
    let mut collect = |expr: &IrExpr| {
        if let IrExprKind::MethodCall { recv, method, resolution, .. } = &expr.kind {
            if let MethodResolution::UserMethod(owner) = resolution {
                if mutating.contains(&method_key(owner, method)) {
                    if let IrExprKind::Name { binding: Some(b), .. } = &recv.kind {
                        to_mark.push(*b);
                    }
                }
            }
        }
    };

    for func in &module.functions {
        walk_exprs(&func.body, &mut collect);
    }
    for class in &module.classes {
        for method in &class.methods {
            walk_exprs(&method.body, &mut collect);
        }
    }
    walk_exprs(&module.setup, &mut collect);
    if let Some(entry) = &module.entry {
        walk_exprs(entry, &mut collect);
    }

    for b in to_mark {
        analysis.scopes.binding_mut(b).mutated = true;
    }
}

/// Applies `f` to every expression in a statement list, recursively.
fn walk_exprs(stmts: &[IrStmt], f: &mut dyn FnMut(&IrExpr)) {
    fn expr_deep(e: &IrExpr, f: &mut dyn FnMut(&IrExpr)) {
        f(e);
        visit_children(e, &mut |child| expr_deep(child, f));
    }
    fn target(t: &IrTarget, f: &mut dyn FnMut(&IrExpr)) {
        match t {
            IrTarget::Name { .. } => {}
            IrTarget::Attribute { base, .. } => expr_deep(base, f),
            IrTarget::Index { base, index } => {
                expr_deep(base, f);
                expr_deep(index, f);
            }
            IrTarget::Tuple(ts) => ts.iter().for_each(|t| target(t, f)),
        }
    }
    for stmt in stmts {
        match &stmt.kind {
            IrStmtKind::Assign { value, target: t, .. }
            | IrStmtKind::AugAssign { value, target: t, .. } => {
                expr_deep(value, f);
                target(t, f);
            }
            IrStmtKind::Unpack { value, targets, .. } => {
                expr_deep(value, f);
                targets.iter().for_each(|t| target(t, f));
            }
            IrStmtKind::Swap { left, right } => {
                target(left, f);
                target(right, f);
            }
            IrStmtKind::Expr(e) => expr_deep(e, f),
            IrStmtKind::Return(Some(e)) => expr_deep(e, f),
            IrStmtKind::If { test, body, orelse, .. } => {
                expr_deep(test, f);
                walk_exprs(body, f);
                walk_exprs(orelse, f);
            }
            IrStmtKind::While { test, body, .. } => {
                expr_deep(test, f);
                walk_exprs(body, f);
            }
            IrStmtKind::For { iter, body, .. } => {
                expr_deep(iter, f);
                walk_exprs(body, f);
            }
            IrStmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                walk_exprs(body, f);
                for h in handlers {
                    walk_exprs(&h.body, f);
                }
                walk_exprs(orelse, f);
                walk_exprs(finalbody, f);
            }
            IrStmtKind::Raise {
                message, cause, reraise, ..
            } => {
                for e in [message, cause, reraise].into_iter().flatten() {
                    expr_deep(e, f);
                }
            }
            IrStmtKind::With { context, body, .. } => {
                expr_deep(context, f);
                walk_exprs(body, f);
            }
            _ => {}
        }
    }
}
