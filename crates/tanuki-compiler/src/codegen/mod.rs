//! Rust code generation from the annotated IR.
//!
//! The generator is a plain string emitter: each construct appends lines
//! at the current indent. Output is assembled last — the body is emitted
//! into a buffer first, then the `use` header is derived from what the
//! body actually touched.

mod call;
mod expr;
mod project;
mod stmt;
mod types;

#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod scenario_tests;

pub use project::write_project;

use std::collections::HashSet;

use crate::analyze::scope::{BindingId, ScopeId};
use crate::analyze::types::Type;
use crate::analyze::Analysis;
use crate::diagnostics::{Code, Diagnostics};
use crate::ir::*;
use crate::span::{LineIndex, Span};
use types::{default_value, param_mode, param_type, rust_type, PassMode};

const INDENT: &str = "    ";

pub struct Generated {
    pub code: String,
    pub diags: Diagnostics,
    /// Dotted module paths of external imports, for project manifests.
    pub external_imports: Vec<String>,
}

pub fn generate(module: &IrModule, analysis: &Analysis, lines: &LineIndex) -> Generated {
    let mut r#gen = CodeGen {
        analysis,
        module,
        lines,
        diags: Diagnostics::new(),
        out: String::new(),
        indent: 0,
        declared: HashSet::new(),
        tmp: 0,
        loop_depth: 0,
        closure_loop_depth: Vec::new(),
        fn_may_raise: false,
        fn_ret: Type::Unit,
        uses_value: false,
        uses_error: false,
        uses_flow: false,
        uses_hashmap: false,
        uses_hashset: false,
        uses_ops: false,
        uses_bridge: false,
        uses_rc: false,
    };

    r#gen.emit_module();

    let mut code = String::new();
    code.push_str("// Generated by tanuki. Edit the source program, not this file.\n");
    code.push_str("#![allow(unused_mut, unused_variables, unused_imports, dead_code, unreachable_code, unused_parens)]\n\n");
    if r#gen.uses_rc {
        code.push_str("use std::rc::Rc;\n");
    }
    if r#gen.uses_hashmap || r#gen.uses_hashset {
        let mut names = Vec::new();
        if r#gen.uses_hashmap {
            names.push("HashMap");
        }
        if r#gen.uses_hashset {
            names.push("HashSet");
        }
        code.push_str(&format!(
            "use std::collections::{{{}}};\n",
            names.join(", ")
        ));
    }
    let mut rt = Vec::new();
    if r#gen.uses_error {
        rt.extend(["ErrorKind", "TnkError", "TnkResult"]);
    }
    if r#gen.uses_flow {
        rt.push("Flow");
    }
    if r#gen.uses_value {
        rt.extend(["IntoValue", "Value"]);
    }
    if !rt.is_empty() {
        rt.sort_unstable();
        code.push_str(&format!("use tanuki_runtime::{{{}}};\n", rt.join(", ")));
    }
    if r#gen.uses_ops {
        code.push_str("use tanuki_runtime::ops;\n");
    }
    if r#gen.uses_bridge {
        code.push_str("use tanuki_runtime::bridge;\n");
    }
    code.push('\n');
    code.push_str(&r#gen.out);

    let external_imports = module
        .imports
        .iter()
        .filter(|i| i.external)
        .map(|i| i.module.clone())
        .collect();

    Generated {
        code,
        diags: r#gen.diags,
        external_imports,
    }
}

pub(crate) struct CodeGen<'a> {
    pub(crate) analysis: &'a Analysis,
    pub(crate) module: &'a IrModule,
    pub(crate) lines: &'a LineIndex,
    pub(crate) diags: Diagnostics,
    pub(crate) out: String,
    pub(crate) indent: usize,
    /// Bindings already introduced with `let` in the emitted code.
    pub(crate) declared: HashSet<BindingId>,
    pub(crate) tmp: u32,
    /// Loop nesting in the current emission context; reset inside try
    /// closures so `break` lowers to `Flow::Break` only when it has to
    /// cross the closure boundary.
    pub(crate) loop_depth: u32,
    /// Saved outer loop depths, one per open try closure.
    pub(crate) closure_loop_depth: Vec<u32>,
    pub(crate) fn_may_raise: bool,
    pub(crate) fn_ret: Type,
    pub(crate) uses_value: bool,
    pub(crate) uses_error: bool,
    pub(crate) uses_flow: bool,
    pub(crate) uses_hashmap: bool,
    pub(crate) uses_hashset: bool,
    pub(crate) uses_ops: bool,
    pub(crate) uses_bridge: bool,
    pub(crate) uses_rc: bool,
}

impl CodeGen<'_> {
    // ------------------------------------------------------------------
    // Low-level emission
    // ------------------------------------------------------------------

    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    pub(crate) fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    pub(crate) fn close(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    pub(crate) fn fresh(&mut self, prefix: &str) -> String {
        self.tmp += 1;
        format!("__{}{}", prefix, self.tmp)
    }

    pub(crate) fn src_line(&self, span: Span) -> u32 {
        self.lines.line(span.start)
    }

    pub(crate) fn in_closure(&self) -> bool {
        !self.closure_loop_depth.is_empty()
    }

    // ------------------------------------------------------------------
    // Module layout
    // ------------------------------------------------------------------

    fn emit_module(&mut self) {
        for class in &self.module.classes {
            self.emit_class(class);
            self.blank();
        }
        for func in &self.module.functions {
            self.emit_function(func, None);
            self.blank();
        }
        self.emit_main();
    }

    fn emit_main(&mut self) {
        let has_setup = !self.module.setup.is_empty();
        let has_entry = self.module.entry.as_ref().is_some_and(|e| !e.is_empty());
        if !has_setup && !has_entry {
            self.line("fn main() {}");
            return;
        }

        let raises = block_may_raise(&self.module.setup)
            || self
                .module
                .entry
                .as_ref()
                .is_some_and(|e| block_may_raise(e));

        if raises {
            self.uses_error = true;
            self.open("fn main() {");
            self.open("if let Err(e) = tnk_run() {");
            self.line("eprintln!(\"{}\", e.render());");
            self.line("std::process::exit(1);");
            self.close("}");
            self.close("}");
            self.blank();
            self.open("fn tnk_run() -> TnkResult<()> {");
        } else {
            self.open("fn main() {");
        }

        self.fn_may_raise = raises;
        self.fn_ret = Type::Unit;
        self.declared.clear();
        self.emit_hoisted(crate::analyze::scope::ScopeTree::MODULE);
        let setup = &self.module.setup;
        self.emit_block(setup);
        if let Some(entry) = &self.module.entry {
            self.emit_block(entry);
        }
        if raises {
            self.line("Ok(())");
        }
        self.close("}");
    }

    /// Pre-declares hoisted bindings at the top of a body.
    pub(crate) fn emit_hoisted(&mut self, home: ScopeId) {
        for id in self.analysis.scopes.hoisted_in(home) {
            let binding = self.analysis.scopes.binding(id);
            let name = rust_name(&binding.name);
            let text = if binding.hoisted_optional {
                format!(
                    "let mut {}: Option<{}> = None;",
                    name,
                    rust_type(&binding.ty)
                )
            } else {
                self.note_type_uses(&binding.ty);
                format!(
                    "let mut {}: {} = {};",
                    name,
                    rust_type(&binding.ty),
                    default_value(&binding.ty)
                )
            };
            self.line(&text);
            self.declared.insert(id);
        }
    }

    pub(crate) fn note_type_uses(&mut self, ty: &Type) {
        match ty {
            Type::Dict(k, v) => {
                self.uses_hashmap = true;
                self.note_type_uses(k);
                self.note_type_uses(v);
            }
            Type::Set(t) => {
                self.uses_hashset = true;
                self.note_type_uses(t);
            }
            Type::List(t) | Type::Option(t) => self.note_type_uses(t),
            Type::Tuple(ts) => ts.iter().for_each(|t| self.note_type_uses(t)),
            Type::Any => self.uses_value = true,
            Type::Callable { params, ret } => {
                self.uses_rc = true;
                params.iter().for_each(|t| self.note_type_uses(t));
                self.note_type_uses(ret);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn emit_function(&mut self, func: &IrFunction, class: Option<&IrClass>) {
        self.declared.clear();
        self.tmp = 0;
        self.loop_depth = 0;
        self.fn_may_raise = func.may_raise;
        self.fn_ret = func.ret.clone();

        let is_method = class.is_some();
        let mut params = Vec::new();
        let mut shadows: Vec<String> = Vec::new();

        for p in &func.params {
            if p.is_self {
                let direct = p
                    .binding
                    .is_some_and(|b| self.analysis.scopes.binding(b).mutated);
                let propagated = !func.is_property()
                    && class
                        .and_then(|c| self.analysis.method_sig(&c.name, &func.name))
                        .map(|(_, sig)| sig.mutates_self)
                        .unwrap_or(false);
                let mutates = direct || propagated;
                params.push(if mutates { "&mut self".into() } else { "&self".into() });
                continue;
            }
            let Some(b) = p.binding else { continue };
            let binding = self.analysis.scopes.binding(b);
            let mode = param_mode(&p.ty, binding.mutated);
            let name = rust_name(&p.name);
            self.note_type_uses(&p.ty);
            if p.starred {
                params.push(format!("{}: Vec<{}>", name, rust_type(&p.ty.element())));
            } else {
                params.push(format!("{}: {}", name, param_type(&p.ty, mode)));
            }
            self.declared.insert(b);
            let mut_kw = if binding.mutated { "mut " } else { "" };
            match mode {
                PassMode::RefStr => {
                    shadows.push(format!("let {}{} = {}.to_string();", mut_kw, name, name));
                }
                PassMode::Ref => {
                    shadows.push(format!("let {}{} = {}.clone();", mut_kw, name, name));
                }
                PassMode::Value if binding.mutated => {
                    shadows.push(format!("let mut {} = {};", name, name));
                }
                _ => {}
            }
        }

        let ret = self.return_type_text(func);
        let name = if is_method {
            method_rust_name(func)
        } else {
            rust_name(&func.name)
        };
        let vis = if is_method { "pub " } else { "" };
        let sig = if matches!(func.ret, Type::Unit) && !func.may_raise {
            format!("{}fn {}({}) {{", vis, name, params.join(", "))
        } else {
            format!("{}fn {}({}) -> {} {{", vis, name, params.join(", "), ret)
        };
        self.open(&sig);
        for shadow in shadows {
            self.line(&shadow);
        }
        self.emit_hoisted(func.scope);
        self.emit_block(&func.body);
        self.emit_fn_tail(func);
        self.close("}");
    }

    fn return_type_text(&mut self, func: &IrFunction) -> String {
        self.note_type_uses(&func.ret);
        let base = rust_type(&func.ret);
        if func.may_raise {
            self.uses_error = true;
            format!("TnkResult<{}>", base)
        } else {
            base
        }
    }

    /// Implicit tail: `Ok(())`, `None`, or nothing, depending on the
    /// declared return type and whether the body already diverges.
    fn emit_fn_tail(&mut self, func: &IrFunction) {
        if ends_with_jump(&func.body) {
            return;
        }
        match (&func.ret, func.may_raise) {
            (Type::Unit, true) => self.line("Ok(())"),
            (Type::Unit, false) => {}
            (Type::Option(_), true) => self.line("Ok(None)"),
            (Type::Option(_), false) => self.line("None"),
            // Annotated non-unit return without a tail return only happens
            // on paths the source never takes.
            (_, true) => self.line("unreachable!(\"function fell off its end\")"),
            (_, false) => self.line("unreachable!(\"function fell off its end\")"),
        }
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    fn emit_class(&mut self, class: &IrClass) {
        let name = rust_name(&class.name);
        // Callable fields have no `Debug`.
        if self.class_has_callable(&class.name) {
            self.line("#[derive(Clone)]");
        } else {
            self.line("#[derive(Debug, Clone)]");
        }
        self.open(&format!("pub struct {} {{", name));
        if let Some(base) = &class.base {
            self.line(&format!("pub base: {},", rust_name(base)));
        }
        for field in &class.fields {
            self.note_type_uses(&field.ty);
            self.line(&format!(
                "pub {}: {},",
                rust_name(&field.name),
                field_type_text(&field.ty)
            ));
        }
        self.close("}");
        self.blank();

        self.open(&format!("impl {} {{", name));
        self.emit_constructor(class);
        for method in &class.methods {
            if method.name == "__init__" {
                continue;
            }
            self.blank();
            self.emit_function(method, Some(class));
        }
        self.close("}");
    }

    fn emit_constructor(&mut self, class: &IrClass) {
        let name = rust_name(&class.name);
        if let Some(init) = class.methods.iter().find(|m| m.name == "__init__") {
            self.emit_init_constructor(class, init);
            return;
        }

        // Dataclass-like: constructor straight from the field list.
        let mut params = Vec::new();
        let mut inits = Vec::new();
        if let Some(base) = &class.base {
            params.push(format!("base: {}", rust_name(base)));
            inits.push("base,".to_string());
        }
        for field in &class.fields {
            let fname = rust_name(&field.name);
            params.push(format!("{}: {}", fname, field_type_text(&field.ty)));
            inits.push(format!("{},", fname));
        }
        self.open(&format!(
            "pub fn new({}) -> {} {{",
            params.join(", "),
            name
        ));
        self.open(&format!("{} {{", name));
        for init in inits {
            self.line(&init);
        }
        self.close("}");
        self.close("}");
    }

    /// `__init__`-based constructor: field assignments become deferred
    /// locals, gathered into the struct literal at the end.
    fn emit_init_constructor(&mut self, class: &IrClass, init: &IrFunction) {
        self.declared.clear();
        self.tmp = 0;
        self.loop_depth = 0;
        self.fn_may_raise = init.may_raise;
        self.fn_ret = Type::Struct(class.name.clone());

        let name = rust_name(&class.name);
        let mut params = Vec::new();
        for p in &init.params {
            if p.is_self {
                continue;
            }
            self.note_type_uses(&p.ty);
            let pname = rust_name(&p.name);
            if matches!(p.ty, Type::Callable { .. }) {
                params.push(format!("{}: {}", pname, param_type(&p.ty, PassMode::ImplFn)));
            } else {
                params.push(format!("{}: {}", pname, rust_type(&p.ty)));
            }
            if let Some(b) = p.binding {
                self.declared.insert(b);
            }
        }
        let ret = if init.may_raise {
            self.uses_error = true;
            format!("TnkResult<{}>", name)
        } else {
            name.clone()
        };
        self.open(&format!("pub fn new({}) -> {} {{", params.join(", "), ret));

        for field in &class.fields {
            let fname = rust_name(&field.name);
            match &field.default {
                Some(default) => {
                    self.check_infallible_default(default);
                    let text = self.expr_owned(default);
                    self.line(&format!("let mut __field_{} = {};", fname, text));
                }
                None => {
                    self.line(&format!(
                        "let mut __field_{}: {};",
                        fname,
                        field_type_text(&field.ty)
                    ));
                }
            }
        }
        if class.base.is_some() {
            let base = rust_name(class.base.as_deref().unwrap_or_default());
            self.line(&format!("let mut __field_base: {};", base));
        }

        self.emit_init_body(class, &init.body);

        let literal = self.fresh("self");
        self.open(&format!("let {} = {} {{", literal, name));
        if class.base.is_some() {
            self.line("base: __field_base,");
        }
        for field in &class.fields {
            let fname = rust_name(&field.name);
            self.line(&format!("{}: __field_{},", fname, fname));
        }
        self.close("};");
        if init.may_raise {
            self.line(&format!("Ok({})", literal));
        } else {
            self.line(&literal);
        }
        self.close("}");
    }

    /// Emits `__init__` statements, rewriting `self.f = v` into the
    /// deferred field locals and `super().__init__(...)` into the base
    /// constructor call.
    fn emit_init_body(&mut self, class: &IrClass, body: &[IrStmt]) {
        for stmt in body {
            match &stmt.kind {
                IrStmtKind::Assign { target, value, .. } => {
                    if let IrTarget::Attribute { base, attr } = target {
                        if matches!(&base.kind, IrExprKind::Name { name, .. } if name == "self") {
                            let mut text = self.expr_owned(value);
                            if let Some(field) = class.fields.iter().find(|f| &f.name == attr) {
                                text = self.coerce(text, &value.ty, &field.ty);
                                if matches!(field.ty, Type::Callable { .. })
                                    && stmt::needs_boxing(self, value)
                                {
                                    text = format!("Rc::new({})", text);
                                }
                            }
                            self.line(&format!(
                                "__field_{} = {};",
                                rust_name(attr),
                                text
                            ));
                            continue;
                        }
                    }
                    self.emit_stmt(stmt);
                }
                IrStmtKind::Expr(e) => {
                    if let IrExprKind::MethodCall {
                        recv,
                        method,
                        args,
                        ..
                    } = &e.kind
                    {
                        if matches!(recv.kind, IrExprKind::Super) && method == "__init__" {
                            let base = class.base.clone().unwrap_or_default();
                            let arg_texts = self
                                .base_ctor_args(&base, args);
                            let call = format!(
                                "{}::new({})",
                                rust_name(&base),
                                arg_texts.join(", ")
                            );
                            let call = if self.base_ctor_may_raise(&base) {
                                format!("{}?", call)
                            } else {
                                call
                            };
                            self.line(&format!("__field_base = {};", call));
                            continue;
                        }
                    }
                    self.emit_stmt(stmt);
                }
                _ => self.emit_stmt(stmt),
            }
        }
    }

    fn base_ctor_args(&mut self, base: &str, args: &[IrExpr]) -> Vec<String> {
        let sig = self.analysis.method_sig(base, "__init__");
        args.iter()
            .enumerate()
            .map(|(i, a)| {
                let text = self.expr_owned(a);
                match &sig {
                    Some((_, sig)) => match sig.params.get(i) {
                        Some((_, want)) => self.coerce(text, &a.ty, want),
                        None => text,
                    },
                    None => text,
                }
            })
            .collect()
    }

    fn base_ctor_may_raise(&self, base: &str) -> bool {
        self.module
            .classes
            .iter()
            .find(|c| c.name == base)
            .and_then(|c| c.methods.iter().find(|m| m.name == "__init__"))
            .map(|m| m.may_raise)
            .unwrap_or(false)
    }

    fn class_has_callable(&self, class: &str) -> bool {
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            let Some(info) = self.analysis.classes.get(&name) else {
                return false;
            };
            if info
                .fields
                .values()
                .any(|t| matches!(t, Type::Callable { .. }))
            {
                return true;
            }
            current = info.base.clone();
        }
        false
    }

    /// Composition path from `from` down to the class defining a member.
    pub(crate) fn base_path(&self, from: &str, owner: &str) -> String {
        let mut path = String::new();
        let mut current = from.to_string();
        while current != owner {
            path.push_str(".base");
            let Some(info) = self.analysis.classes.get(&current) else {
                break;
            };
            match &info.base {
                Some(base) => current = base.clone(),
                None => break,
            }
        }
        path
    }

    pub(crate) fn gen_error(&mut self, code: Code, message: impl Into<String>, span: Span) {
        self.diags.error(code, message, span).emit();
    }

    /// Default values are emitted outside any result context, so they
    /// must be infallible.
    pub(crate) fn check_infallible_default(&mut self, default: &IrExpr) {
        if expr::expr_can_raise(default) {
            self.gen_error(
                Code::UnsupportedSyntax,
                "default values cannot contain operations that raise",
                default.span,
            );
        }
    }
}

/// Does any statement in the block carry a `may_raise` operation or an
/// uncaught `raise`? Used only to decide the shape of `main`.
fn block_may_raise(stmts: &[IrStmt]) -> bool {
    fn expr_raises(e: &IrExpr) -> bool {
        let mut found = e.may_raise || e.bridge_required;
        visit_children(e, &mut |c| found |= expr_raises(c));
        found
    }
    // Mirrors the effect pass: list stores are fallible, and
    // read-modify-write dict targets perform the fallible read too.
    fn target_raises(t: &IrTarget, aug: bool) -> bool {
        match t {
            IrTarget::Name { .. } => false,
            IrTarget::Attribute { base, .. } => expr_raises(base),
            IrTarget::Index { base, index } => {
                expr_raises(base)
                    || expr_raises(index)
                    || matches!(base.ty, Type::List(_))
                    || (aug && matches!(base.ty, Type::Dict(..)))
            }
            IrTarget::Tuple(ts) => ts.iter().any(|t| target_raises(t, aug)),
        }
    }
    stmts.iter().any(|stmt| match &stmt.kind {
        IrStmtKind::Raise { .. } => true,
        IrStmtKind::Assign { value, target, .. } => {
            expr_raises(value) || target_raises(target, false)
        }
        IrStmtKind::AugAssign { value, target, .. } => {
            expr_raises(value) || target_raises(target, true)
        }
        IrStmtKind::Unpack { value, targets, .. } => {
            expr_raises(value) || targets.iter().any(|t| target_raises(t, false))
        }
        IrStmtKind::Expr(e) => expr_raises(e),
        IrStmtKind::Return(Some(e)) => expr_raises(e),
        IrStmtKind::If { test, body, orelse, .. } => {
            expr_raises(test) || block_may_raise(body) || block_may_raise(orelse)
        }
        IrStmtKind::While { test, body, .. } => expr_raises(test) || block_may_raise(body),
        IrStmtKind::For {
            target, iter, body, ..
        } => {
            target_raises(target, false) || expr_raises(iter) || block_may_raise(body)
        }
        IrStmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            // Anything inside might still escape through re-raise; be
            // conservative for main's shape.
            block_may_raise(body)
                || handlers.iter().any(|h| block_may_raise(&h.body))
                || block_may_raise(orelse)
                || block_may_raise(finalbody)
        }
        IrStmtKind::With {
            context,
            binding,
            body,
            ..
        } => {
            expr_raises(context)
                || binding.as_ref().is_some_and(|b| target_raises(b, false))
                || block_may_raise(body)
        }
        _ => false,
    })
}

fn ends_with_jump(stmts: &[IrStmt]) -> bool {
    match stmts.last() {
        Some(stmt) => matches!(
            stmt.kind,
            IrStmtKind::Return(_) | IrStmtKind::Raise { .. }
        ) || matches!(
            &stmt.kind,
            IrStmtKind::If { body, orelse, .. }
                if !orelse.is_empty() && ends_with_jump(body) && ends_with_jump(orelse)
        ),
        None => false,
    }
}

/// Box-wrapped spelling for struct fields (callables must be boxed).
fn field_type_text(ty: &Type) -> String {
    rust_type(ty)
}

const RESERVED: [&str; 20] = [
    "as", "box", "crate", "fn", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "ref", "self", "super", "trait", "type", "unsafe", "use", "where",
];

/// Maps a source identifier to a valid Rust identifier.
pub(crate) fn rust_name(name: &str) -> String {
    if name == "main" {
        return "tnk_main".to_string();
    }
    if RESERVED.contains(&name) {
        return format!("{}_", name);
    }
    name.to_string()
}

fn method_rust_name(func: &IrFunction) -> String {
    if func.is_setter() {
        return format!("set_{}", rust_name(&func.name));
    }
    rust_name(&func.name)
}
