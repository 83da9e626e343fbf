//! AST → IR matching.
//!
//! Matching is ordered: specialized patterns (entry-point guard, `range`,
//! recognized built-ins, tuple swaps, `super()`) are tried before the
//! generic variants, and the first match wins. Constructs outside the
//! subset match nothing, report `TNK-UNSUPPORTED-SYNTAX`, and leave an
//! elided node behind.
//!
//! The matcher also owns scope construction: every binding the program
//! introduces is registered with the scope environment here, so the
//! analysis passes only refine what already exists.

use indexmap::IndexMap;

use super::*;
use crate::analyze::scope::{BindingKind, ScopeId, ScopeKind, ScopeTree};
use crate::analyze::types::{from_annotation, Type};
use crate::ast::{self, ExprKind, StmtKind};
use crate::diagnostics::{Code, Diagnostics};
use crate::span::Span;

/// Everything the matcher produces.
pub struct MatchOutput {
    pub module: IrModule,
    pub scopes: ScopeTree,
    pub diags: Diagnostics,
}

/// Top-level names collected before matching, so calls classify in one
/// pass.
#[derive(Debug, Default)]
struct ModuleIndex {
    functions: IndexMap<String, ()>,
    classes: IndexMap<String, ()>,
    /// Bound name → dotted path (`np` → `numpy`, `sqrt` → `math.sqrt`).
    imports: IndexMap<String, String>,
}

impl ModuleIndex {
    fn collect(module: &ast::Module) -> Self {
        let mut index = ModuleIndex::default();
        for stmt in &module.body {
            match &stmt.kind {
                StmtKind::FunctionDef(f) => {
                    index.functions.insert(f.name.clone(), ());
                }
                StmtKind::ClassDef(c) => {
                    index.classes.insert(c.name.clone(), ());
                }
                StmtKind::Import { names } => {
                    for alias in names {
                        index
                            .imports
                            .insert(alias.bound_name().to_string(), alias.name.clone());
                    }
                }
                StmtKind::ImportFrom { module, names } => {
                    for alias in names {
                        index.imports.insert(
                            alias.bound_name().to_string(),
                            format!("{}.{}", module, alias.name),
                        );
                    }
                }
                _ => {}
            }
        }
        index
    }

    fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }
}

pub fn match_module(module: &ast::Module) -> MatchOutput {
    let index = ModuleIndex::collect(module);
    let mut matcher = Matcher {
        scopes: ScopeTree::new(),
        diags: Diagnostics::new(),
        index,
        handler_binding: Vec::new(),
    };
    let ir = matcher.module(module);
    MatchOutput {
        module: ir,
        scopes: matcher.scopes,
        diags: matcher.diags,
    }
}

struct Matcher {
    scopes: ScopeTree,
    diags: Diagnostics,
    index: ModuleIndex,
    /// Names bound by enclosing `except ... as e` handlers, innermost
    /// last; a bare `raise` re-raises the innermost.
    handler_binding: Vec<Option<String>>,
}

impl Matcher {
    fn module(&mut self, module: &ast::Module) -> IrModule {
        let mut ir = IrModule::default();
        let scope = ScopeTree::MODULE;

        for stmt in &module.body {
            match &stmt.kind {
                StmtKind::FunctionDef(f) => {
                    let func = self.function(f, scope, stmt.span, None);
                    self.scopes.declare(
                        &f.name,
                        BindingKind::Function,
                        Type::Callable {
                            params: func.params.iter().map(|p| p.ty.clone()).collect(),
                            ret: Box::new(func.ret.clone()),
                        },
                        scope,
                        stmt.span,
                    );
                    ir.functions.push(func);
                }
                StmtKind::ClassDef(c) => {
                    let class = self.class(c, scope, stmt.span);
                    self.scopes.declare(
                        &c.name,
                        BindingKind::Class,
                        Type::Struct(c.name.clone()),
                        scope,
                        stmt.span,
                    );
                    ir.classes.push(class);
                }
                StmtKind::Import { names } => {
                    for alias in names {
                        ir.imports.push(self.import_binding(
                            alias.name.clone(),
                            String::new(),
                            alias,
                            scope,
                        ));
                    }
                }
                StmtKind::ImportFrom { module, names } => {
                    for alias in names {
                        ir.imports.push(self.import_binding(
                            module.clone(),
                            alias.name.clone(),
                            alias,
                            scope,
                        ));
                    }
                }
                StmtKind::If { test, body, orelse } if is_main_guard(test) => {
                    if !orelse.is_empty() {
                        self.diags
                            .error(
                                Code::UnsupportedSyntax,
                                "`else` on the entry-point guard is not supported",
                                stmt.span,
                            )
                            .emit();
                    }
                    let entry = self.block_in_new_scope(body, scope).0;
                    ir.entry = Some(entry);
                }
                _ => {
                    if let Some(s) = self.stmt(stmt, scope) {
                        ir.setup.push(s);
                    }
                }
            }
        }

        ir
    }

    fn import_binding(
        &mut self,
        module: String,
        item: String,
        alias: &ast::Alias,
        scope: ScopeId,
    ) -> IrImport {
        let bound = alias.bound_name().to_string();
        let binding = self.scopes.declare(
            &bound,
            BindingKind::Import,
            Type::Any,
            scope,
            alias.span,
        );
        IrImport {
            module,
            item,
            alias: bound,
            external: false, // classification pass decides
            binding: Some(binding),
            span: alias.span,
        }
    }

    fn function(
        &mut self,
        f: &ast::FunctionDef,
        parent: ScopeId,
        span: Span,
        in_class: Option<&str>,
    ) -> IrFunction {
        let scope = self.scopes.push_scope(ScopeKind::Function, parent);

        let mut params = Vec::new();
        for (i, p) in f.params.iter().enumerate() {
            let is_self = i == 0 && in_class.is_some() && p.name == "self";
            let ty = if is_self {
                Type::Struct(in_class.unwrap_or_default().to_string())
            } else if let Some(ann) = &p.annotation {
                self.annotation(ann)
            } else if p.starred {
                Type::list(Type::Any)
            } else {
                Type::Any
            };
            let ty = if p.starred && !matches!(ty, Type::List(_)) {
                // `*args: int` means each element is an int.
                Type::list(ty)
            } else {
                ty
            };
            let kind = if is_self {
                BindingKind::SelfParam
            } else {
                BindingKind::Param
            };
            let binding = self.scopes.declare(&p.name, kind, ty.clone(), scope, p.span);
            let default = p.default.as_ref().map(|d| self.expr(d, parent));
            params.push(IrParam {
                name: p.name.clone(),
                ty,
                default,
                starred: p.starred,
                binding: Some(binding),
                is_self,
                span: p.span,
            });
        }

        let ret = f
            .returns
            .as_ref()
            .map(|r| self.annotation(r))
            .unwrap_or(Type::Unit);

        let decorators = f.decorators.iter().filter_map(expr_to_dotted).collect();

        let body = self.block(&f.body, scope);

        IrFunction {
            name: f.name.clone(),
            params,
            ret,
            body,
            scope,
            span,
            may_raise: false,
            decorators,
        }
    }

    fn class(&mut self, c: &ast::ClassDef, parent: ScopeId, span: Span) -> IrClass {
        let scope = self.scopes.push_scope(ScopeKind::Class, parent);
        let dataclass = c
            .decorators
            .iter()
            .filter_map(expr_to_dotted)
            .any(|d| d == "dataclass");

        let base = match c.bases.as_slice() {
            [] => None,
            [only] => match expr_to_dotted(only) {
                Some(name) if self.index.is_class(&name) => Some(name),
                Some(name) => {
                    self.diags
                        .error(
                            Code::UnsupportedSyntax,
                            format!("base class `{}` is not a class in this module", name),
                            only.span,
                        )
                        .emit();
                    None
                }
                None => None,
            },
            many => {
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        "multiple inheritance is not supported",
                        many[1].span,
                    )
                    .emit();
                expr_to_dotted(&many[0]).filter(|n| self.index.is_class(n))
            }
        };

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        for stmt in &c.body {
            match &stmt.kind {
                StmtKind::AnnAssign {
                    target,
                    annotation,
                    value,
                } => {
                    let ExprKind::Name(name) = &target.kind else {
                        self.diags
                            .error(Code::UnsupportedSyntax, "unsupported class field", stmt.span)
                            .emit();
                        continue;
                    };
                    let ty = self.annotation(annotation);
                    let default = value.as_ref().map(|v| self.expr(v, scope));
                    fields.push(IrField {
                        name: name.clone(),
                        ty,
                        default,
                        span: stmt.span,
                    });
                }
                StmtKind::FunctionDef(f) => {
                    if UNSUPPORTED_MAGIC_METHODS.contains(&f.name.as_str()) {
                        self.diags
                            .error(
                                Code::UnsupportedSyntax,
                                format!("overriding `{}` is not supported", f.name),
                                stmt.span,
                            )
                            .emit();
                        continue;
                    }
                    let method = self.function(f, scope, stmt.span, Some(&c.name));
                    if f.name == "__init__" {
                        self.collect_init_fields(&method, &mut fields);
                    }
                    methods.push(method);
                }
                StmtKind::Pass | StmtKind::Expr(_) => {}
                _ => {
                    self.diags
                        .error(
                            Code::UnsupportedSyntax,
                            "unsupported statement in class body",
                            stmt.span,
                        )
                        .emit();
                }
            }
        }

        IrClass {
            name: c.name.clone(),
            base,
            fields,
            methods,
            dataclass,
            scope,
            span,
        }
    }

    /// Fields discovered from `self.<name> = ...` in `__init__`, typed by
    /// the parameter they were assigned from when that is evident.
    fn collect_init_fields(&mut self, init: &IrFunction, fields: &mut Vec<IrField>) {
        for stmt in &init.body {
            let IrStmtKind::Assign { target, value, .. } = &stmt.kind else {
                continue;
            };
            let IrTarget::Attribute { base, attr } = target else {
                continue;
            };
            if !matches!(&base.kind, IrExprKind::Name { name, .. } if name == "self") {
                continue;
            }
            if fields.iter().any(|f| &f.name == attr) {
                continue;
            }
            let ty = match &value.kind {
                IrExprKind::Name { name, .. } => init
                    .params
                    .iter()
                    .find(|p| &p.name == name)
                    .map(|p| p.ty.clone())
                    .unwrap_or(Type::Any),
                IrExprKind::Literal(Lit::Int(_)) => Type::Int,
                IrExprKind::Literal(Lit::Float(_)) => Type::Float,
                IrExprKind::Literal(Lit::Str(_)) => Type::Str,
                IrExprKind::Literal(Lit::Bool(_)) => Type::Bool,
                _ => Type::Any,
            };
            fields.push(IrField {
                name: attr.clone(),
                ty,
                default: None,
                span: stmt.span,
            });
        }
    }

    fn block(&mut self, stmts: &[ast::Stmt], scope: ScopeId) -> Vec<IrStmt> {
        let mut out = Vec::new();
        for (i, stmt) in stmts.iter().enumerate() {
            // Docstrings vanish.
            if i == 0 {
                if let StmtKind::Expr(e) = &stmt.kind {
                    if matches!(e.kind, ExprKind::Str(_)) {
                        continue;
                    }
                }
            }
            if let Some(s) = self.stmt(stmt, scope) {
                out.push(s);
            }
        }
        out
    }

    fn block_in_new_scope(&mut self, stmts: &[ast::Stmt], parent: ScopeId) -> (Vec<IrStmt>, ScopeId) {
        let scope = self.scopes.push_scope(ScopeKind::Block, parent);
        (self.block(stmts, scope), scope)
    }

    fn stmt(&mut self, stmt: &ast::Stmt, scope: ScopeId) -> Option<IrStmt> {
        let kind = match &stmt.kind {
            StmtKind::FunctionDef(_) | StmtKind::ClassDef(_) => {
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        "nested definitions are not supported",
                        stmt.span,
                    )
                    .emit();
                IrStmtKind::Elided
            }
            StmtKind::Import { names } | StmtKind::ImportFrom { names, .. } => {
                // Imports below top level still bind module-wide.
                let _ = names;
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        "imports are only supported at module level",
                        stmt.span,
                    )
                    .emit();
                IrStmtKind::Elided
            }
            StmtKind::Assign { target, value } => self.assign(target, value, scope),
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                let ty = self.annotation(annotation);
                let value_ir = value.as_ref().map(|v| self.expr(v, scope));
                let target_ir = self.target(target, scope, Some(ty.clone()));
                match value_ir {
                    Some(v) => IrStmtKind::Assign {
                        target: target_ir,
                        value: v,
                        annotation: Some(ty),
                    },
                    // Bare declaration (`x: int`): pre-declare only.
                    None => IrStmtKind::Assign {
                        target: target_ir,
                        value: IrExpr::new(
                            IrExprKind::Literal(default_literal(&ty)),
                            stmt.span,
                            scope,
                        ),
                        annotation: Some(ty),
                    },
                }
            }
            StmtKind::AugAssign { target, op, value } => {
                let value = self.expr(value, scope);
                let target = self.target(target, scope, None);
                IrStmtKind::AugAssign {
                    target,
                    op: *op,
                    value,
                }
            }
            StmtKind::Expr(e) => IrStmtKind::Expr(self.expr(e, scope)),
            StmtKind::Return(value) => {
                IrStmtKind::Return(value.as_ref().map(|v| self.expr(v, scope)))
            }
            StmtKind::If { test, body, orelse } => {
                let test = self.expr(test, scope);
                let (body, _) = self.block_in_new_scope(body, scope);
                let (orelse, _) = self.block_in_new_scope(orelse, scope);
                IrStmtKind::If {
                    test,
                    body,
                    orelse,
                    narrow: NarrowInfo::default(),
                }
            }
            StmtKind::While { test, body } => {
                let test = self.expr(test, scope);
                let (body, body_scope) = self.block_in_new_scope(body, scope);
                IrStmtKind::While {
                    test,
                    body,
                    body_scope,
                }
            }
            StmtKind::For { target, iter, body } => {
                let iter = self.expr(iter, scope);
                let body_scope = self.scopes.push_scope(ScopeKind::Block, scope);
                let target = self.target(target, body_scope, None);
                let body = self.block(body, body_scope);
                IrStmtKind::For {
                    target,
                    iter,
                    body,
                    body_scope,
                }
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => self.try_stmt(body, handlers, orelse, finalbody, scope),
            StmtKind::Raise { exc, cause } => self.raise(exc.as_ref(), cause.as_ref(), scope),
            StmtKind::With { items, body } => self.with_stmt(items, body, stmt.span, scope),
            StmtKind::Break => IrStmtKind::Break,
            StmtKind::Continue => IrStmtKind::Continue,
            StmtKind::Pass => IrStmtKind::Pass,
            StmtKind::Unsupported => IrStmtKind::Elided,
        };
        Some(IrStmt {
            span: stmt.span,
            scope,
            kind,
        })
    }

    /// Ordered assignment patterns: swap, tuple unpack, then plain.
    fn assign(&mut self, target: &ast::Expr, value: &ast::Expr, scope: ScopeId) -> IrStmtKind {
        // `a, b = b, a` — recognized before generic unpack.
        if let (ExprKind::Tuple(ts), ExprKind::Tuple(vs)) = (&target.kind, &value.kind) {
            if let (
                [ast::Expr { kind: ExprKind::Name(t0), .. }, ast::Expr { kind: ExprKind::Name(t1), .. }],
                [ast::Expr { kind: ExprKind::Name(v0), .. }, ast::Expr { kind: ExprKind::Name(v1), .. }],
            ) = (ts.as_slice(), vs.as_slice())
            {
                if t0 == v1 && t1 == v0 {
                    let left = self.target(&ts[0], scope, None);
                    let right = self.target(&ts[1], scope, None);
                    return IrStmtKind::Swap { left, right };
                }
            }
        }

        if let ExprKind::Tuple(ts) = &target.kind {
            let value = self.expr(value, scope);
            let mut targets = Vec::new();
            let mut starred = None;
            for (i, t) in ts.iter().enumerate() {
                if let ExprKind::Starred(inner) = &t.kind {
                    if starred.is_some() {
                        self.diags
                            .error(
                                Code::UnsupportedSyntax,
                                "only one starred target is allowed",
                                t.span,
                            )
                            .emit();
                    }
                    starred = Some(i);
                    targets.push(self.target(inner, scope, None));
                } else {
                    targets.push(self.target(t, scope, None));
                }
            }
            return IrStmtKind::Unpack {
                targets,
                starred,
                value,
            };
        }

        let value = self.expr(value, scope);
        let target = self.target(target, scope, None);
        IrStmtKind::Assign {
            target,
            value,
            annotation: None,
        }
    }

    fn try_stmt(
        &mut self,
        body: &[ast::Stmt],
        handlers: &[ast::ExceptHandler],
        orelse: &[ast::Stmt],
        finalbody: &[ast::Stmt],
        scope: ScopeId,
    ) -> IrStmtKind {
        let (body, _) = self.block_in_new_scope(body, scope);
        let mut ir_handlers = Vec::new();
        for h in handlers {
            let kinds = match &h.ty {
                None => Vec::new(),
                Some(e) => match &e.kind {
                    ExprKind::Tuple(names) => {
                        names.iter().filter_map(expr_to_dotted).collect()
                    }
                    _ => expr_to_dotted(e).into_iter().collect(),
                },
            };
            let handler_scope = self.scopes.push_scope(ScopeKind::Block, scope);
            let binding = h.name.as_ref().map(|n| {
                self.scopes.declare(
                    n,
                    BindingKind::Exception,
                    Type::Struct("Exception".into()),
                    handler_scope,
                    h.span,
                )
            });
            self.handler_binding.push(h.name.clone());
            let hbody = self.block(&h.body, handler_scope);
            self.handler_binding.pop();
            ir_handlers.push(IrHandler {
                kinds,
                binding,
                name: h.name.clone(),
                body: hbody,
                body_scope: handler_scope,
                span: h.span,
            });
        }
        let (orelse, _) = self.block_in_new_scope(orelse, scope);
        let (finalbody, _) = self.block_in_new_scope(finalbody, scope);
        IrStmtKind::Try {
            body,
            handlers: ir_handlers,
            orelse,
            finalbody,
        }
    }

    fn raise(
        &mut self,
        exc: Option<&ast::Expr>,
        cause: Option<&ast::Expr>,
        scope: ScopeId,
    ) -> IrStmtKind {
        let cause = cause.map(|c| self.expr(c, scope));
        match exc {
            // `raise Kind("message")`
            Some(ast::Expr {
                kind: ExprKind::Call { func, args, .. },
                ..
            }) => {
                if let ExprKind::Name(kind) = &func.kind {
                    let message = args.first().map(|a| self.expr(a, scope));
                    return IrStmtKind::Raise {
                        kind: kind.clone(),
                        message,
                        cause,
                        reraise: None,
                    };
                }
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        "only `raise Kind(\"message\")` is supported",
                        func.span,
                    )
                    .emit();
                IrStmtKind::Elided
            }
            // `raise e` — re-raise a bound error.
            Some(e @ ast::Expr { kind: ExprKind::Name(_), .. }) => IrStmtKind::Raise {
                kind: String::new(),
                message: None,
                cause,
                reraise: Some(self.expr(e, scope)),
            },
            // Bare `raise` inside a handler re-raises the current error.
            None => {
                let Some(Some(name)) = self.handler_binding.last().cloned() else {
                    self.diags
                        .error(
                            Code::UnsupportedSyntax,
                            "bare `raise` outside an `except ... as e` handler",
                            Span::empty(0),
                        )
                        .emit();
                    return IrStmtKind::Elided;
                };
                let expr = IrExpr::new(
                    IrExprKind::Name {
                        name: name.clone(),
                        binding: self.scopes.lookup(&name, scope),
                    },
                    Span::empty(0),
                    scope,
                );
                IrStmtKind::Raise {
                    kind: String::new(),
                    message: None,
                    cause,
                    reraise: Some(expr),
                }
            }
            Some(other) => {
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        "unsupported `raise` form",
                        other.span,
                    )
                    .emit();
                IrStmtKind::Elided
            }
        }
    }

    fn with_stmt(
        &mut self,
        items: &[ast::WithItem],
        body: &[ast::Stmt],
        span: Span,
        scope: ScopeId,
    ) -> IrStmtKind {
        if items.len() != 1 {
            self.diags
                .error(
                    Code::UnsupportedSyntax,
                    "`with` supports exactly one context manager",
                    span,
                )
                .emit();
            return IrStmtKind::Elided;
        }
        let item = &items[0];
        let context = self.expr(&item.context, scope);
        let body_scope = self.scopes.push_scope(ScopeKind::Block, scope);
        let binding = item
            .binding
            .as_ref()
            .map(|b| self.target(b, body_scope, None));
        let body = self.block(body, body_scope);
        IrStmtKind::With {
            context,
            binding,
            body,
            body_scope,
        }
    }

    fn target(&mut self, expr: &ast::Expr, scope: ScopeId, ty: Option<Type>) -> IrTarget {
        match &expr.kind {
            ExprKind::Name(name) => {
                let binding = self.scopes.declare(
                    name,
                    BindingKind::Local,
                    ty.unwrap_or(Type::Any),
                    scope,
                    expr.span,
                );
                IrTarget::Name {
                    name: name.clone(),
                    binding: Some(binding),
                    span: expr.span,
                }
            }
            ExprKind::Attribute { value, attr } => IrTarget::Attribute {
                base: self.expr(value, scope),
                attr: attr.clone(),
            },
            ExprKind::Subscript { value, index } => match &**index {
                ast::Index::Key(key) => IrTarget::Index {
                    base: self.expr(value, scope),
                    index: self.expr(key, scope),
                },
                ast::Index::Slice { .. } => {
                    self.diags
                        .error(
                            Code::UnsupportedSyntax,
                            "slice assignment is not supported",
                            expr.span,
                        )
                        .emit();
                    IrTarget::Name {
                        name: String::new(),
                        binding: None,
                        span: expr.span,
                    }
                }
            },
            ExprKind::Tuple(elements) => {
                IrTarget::Tuple(elements.iter().map(|e| self.target(e, scope, None)).collect())
            }
            ExprKind::Starred(inner) => self.target(inner, scope, None),
            _ => {
                self.diags
                    .error(Code::UnsupportedSyntax, "unsupported assignment target", expr.span)
                    .emit();
                IrTarget::Name {
                    name: String::new(),
                    binding: None,
                    span: expr.span,
                }
            }
        }
    }

    fn expr(&mut self, expr: &ast::Expr, scope: ScopeId) -> IrExpr {
        let kind = self.expr_kind(expr, scope);
        IrExpr::new(kind, expr.span, scope)
    }

    fn expr_kind(&mut self, expr: &ast::Expr, scope: ScopeId) -> IrExprKind {
        match &expr.kind {
            ExprKind::Int(v) => IrExprKind::Literal(Lit::Int(*v)),
            ExprKind::Float(v) => IrExprKind::Literal(Lit::Float(*v)),
            ExprKind::Str(v) => IrExprKind::Literal(Lit::Str(v.clone())),
            ExprKind::Bool(v) => IrExprKind::Literal(Lit::Bool(*v)),
            ExprKind::NoneLit => IrExprKind::Literal(Lit::None),
            ExprKind::Name(name) => IrExprKind::Name {
                name: name.clone(),
                binding: None, // resolved by analysis
            },
            ExprKind::FString(parts) => IrExprKind::FString(
                parts
                    .iter()
                    .map(|p| match p {
                        ast::FStringPart::Literal(s) => IrFPart::Literal(s.clone()),
                        ast::FStringPart::Expr(e) => IrFPart::Expr(self.expr(e, scope)),
                    })
                    .collect(),
            ),
            ExprKind::Tuple(es) => {
                IrExprKind::Tuple(es.iter().map(|e| self.expr(e, scope)).collect())
            }
            ExprKind::List(es) => {
                IrExprKind::List(es.iter().map(|e| self.expr(e, scope)).collect())
            }
            ExprKind::Set(es) => IrExprKind::Set(es.iter().map(|e| self.expr(e, scope)).collect()),
            ExprKind::Dict { keys, values } => IrExprKind::Dict {
                keys: keys.iter().map(|e| self.expr(e, scope)).collect(),
                values: values.iter().map(|e| self.expr(e, scope)).collect(),
            },
            ExprKind::BinOp { left, op, right } => IrExprKind::Binary {
                op: *op,
                left: Box::new(self.expr(left, scope)),
                right: Box::new(self.expr(right, scope)),
            },
            ExprKind::UnaryOp { op, operand } => IrExprKind::Unary {
                op: *op,
                operand: Box::new(self.expr(operand, scope)),
            },
            ExprKind::BoolOp { op, values } => IrExprKind::BoolChain {
                op: *op,
                values: values.iter().map(|e| self.expr(e, scope)).collect(),
            },
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => IrExprKind::Compare {
                left: Box::new(self.expr(left, scope)),
                ops: ops.clone(),
                comparators: comparators.iter().map(|e| self.expr(e, scope)).collect(),
            },
            ExprKind::Call { func, args, kwargs } => self.call(func, args, kwargs, scope),
            ExprKind::Attribute { value, attr } => IrExprKind::Attribute {
                value: Box::new(self.expr(value, scope)),
                attr: attr.clone(),
            },
            ExprKind::Subscript { value, index } => match &**index {
                ast::Index::Key(key) => IrExprKind::Index {
                    value: Box::new(self.expr(value, scope)),
                    index: Box::new(self.expr(key, scope)),
                },
                ast::Index::Slice { lower, upper, step } => IrExprKind::SliceExpr {
                    value: Box::new(self.expr(value, scope)),
                    lower: lower.as_ref().map(|e| Box::new(self.expr(e, scope))),
                    upper: upper.as_ref().map(|e| Box::new(self.expr(e, scope))),
                    step: step.as_ref().map(|e| Box::new(self.expr(e, scope))),
                },
            },
            ExprKind::IfExp { test, body, orelse } => IrExprKind::IfExp {
                test: Box::new(self.expr(test, scope)),
                body: Box::new(self.expr(body, scope)),
                orelse: Box::new(self.expr(orelse, scope)),
            },
            ExprKind::Lambda { params, body } => {
                let lambda_scope = self.scopes.push_scope(ScopeKind::Lambda, scope);
                let mut ir_params = Vec::new();
                for p in params {
                    let binding = self.scopes.declare(
                        &p.name,
                        BindingKind::Param,
                        Type::Any,
                        lambda_scope,
                        p.span,
                    );
                    ir_params.push(IrParam {
                        name: p.name.clone(),
                        ty: Type::Any,
                        default: None,
                        starred: false,
                        binding: Some(binding),
                        is_self: false,
                        span: p.span,
                    });
                }
                IrExprKind::Lambda {
                    params: ir_params,
                    body: Box::new(self.expr(body, lambda_scope)),
                    scope: lambda_scope,
                }
            }
            ExprKind::ListComp { element, generators } => {
                IrExprKind::ListComp(Box::new(self.comp(element, generators, scope)))
            }
            ExprKind::SetComp { element, generators } => {
                IrExprKind::SetComp(Box::new(self.comp(element, generators, scope)))
            }
            ExprKind::GeneratorExp { element, generators } => {
                IrExprKind::GeneratorExp(Box::new(self.comp(element, generators, scope)))
            }
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => {
                let comp_scope = self.scopes.push_scope(ScopeKind::Comprehension, scope);
                let generators = self.generators(generators, scope, comp_scope);
                IrExprKind::DictComp {
                    key: Box::new(self.expr(key, comp_scope)),
                    value: Box::new(self.expr(value, comp_scope)),
                    generators,
                    scope: comp_scope,
                }
            }
            ExprKind::Starred(inner) => {
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        "starred expression is only allowed in unpacking",
                        expr.span,
                    )
                    .emit();
                self.expr_kind(inner, scope)
            }
        }
    }

    fn comp(
        &mut self,
        element: &ast::Expr,
        generators: &[ast::Comprehension],
        scope: ScopeId,
    ) -> IrComp {
        let comp_scope = self.scopes.push_scope(ScopeKind::Comprehension, scope);
        let generators = self.generators(generators, scope, comp_scope);
        IrComp {
            element: self.expr(element, comp_scope),
            generators,
            scope: comp_scope,
        }
    }

    fn generators(
        &mut self,
        generators: &[ast::Comprehension],
        outer: ScopeId,
        comp_scope: ScopeId,
    ) -> Vec<IrGenerator> {
        generators
            .iter()
            .enumerate()
            .map(|(i, g)| {
                // The first iterable is evaluated in the enclosing scope.
                let iter_scope = if i == 0 { outer } else { comp_scope };
                let iter = self.expr(&g.iter, iter_scope);
                let target = self.target(&g.target, comp_scope, None);
                let ifs = g.ifs.iter().map(|e| self.expr(e, comp_scope)).collect();
                IrGenerator { target, iter, ifs }
            })
            .collect()
    }

    /// Ordered call matching: unsupported built-ins, `range`, `super`,
    /// recognized built-ins, user functions, constructors, imports, then
    /// the generic fallbacks.
    fn call(
        &mut self,
        func: &ast::Expr,
        args: &[ast::Expr],
        kwargs: &[(String, ast::Expr)],
        scope: ScopeId,
    ) -> IrExprKind {
        if let ExprKind::Name(name) = &func.kind {
            let shadowed = self.index.functions.contains_key(name)
                || self.index.is_class(name)
                || self.index.imports.contains_key(name);

            if !shadowed && UNSUPPORTED_BUILTINS.contains(&name.as_str()) {
                self.diags
                    .error(
                        Code::UnsupportedSyntax,
                        format!("`{}` is not in the supported subset", name),
                        func.span,
                    )
                    .emit();
                return IrExprKind::Elided;
            }

            if !shadowed && name == "range" && (1..=3).contains(&args.len()) {
                let mut exprs: Vec<IrExpr> =
                    args.iter().map(|a| self.expr(a, scope)).collect();
                return match exprs.len() {
                    1 => IrExprKind::Range {
                        start: None,
                        stop: Box::new(exprs.remove(0)),
                        step: None,
                    },
                    2 => {
                        let start = exprs.remove(0);
                        let stop = exprs.remove(0);
                        IrExprKind::Range {
                            start: Some(Box::new(start)),
                            stop: Box::new(stop),
                            step: None,
                        }
                    }
                    _ => {
                        let start = exprs.remove(0);
                        let stop = exprs.remove(0);
                        let step = exprs.remove(0);
                        IrExprKind::Range {
                            start: Some(Box::new(start)),
                            stop: Box::new(stop),
                            step: Some(Box::new(step)),
                        }
                    }
                };
            }

            if !shadowed && name == "super" && args.is_empty() {
                return IrExprKind::Super;
            }

            if !shadowed {
                if let Some(builtin) = Builtin::from_name(name) {
                    return IrExprKind::Builtin {
                        builtin,
                        args: args.iter().map(|a| self.expr(a, scope)).collect(),
                    };
                }
            }

            let resolution = if self.index.is_class(name) {
                CallResolution::Constructor
            } else if self.index.functions.contains_key(name) {
                CallResolution::UserFunction
            } else if let Some(path) = self.index.imports.get(name) {
                CallResolution::External(path.clone())
            } else {
                CallResolution::Unresolved
            };

            return IrExprKind::Call {
                name: name.clone(),
                binding: None,
                args: args.iter().map(|a| self.expr(a, scope)).collect(),
                kwargs: kwargs
                    .iter()
                    .map(|(k, v)| (k.clone(), self.expr(v, scope)))
                    .collect(),
                resolution,
            };
        }

        if let ExprKind::Attribute { value, attr } = &func.kind {
            // Dotted path rooted at an import alias: `np.array(...)`.
            if let Some(path) = self.import_rooted_path(value) {
                let full = format!("{}.{}", path, attr);
                if full.starts_with("math.") {
                    return IrExprKind::MethodCall {
                        recv: Box::new(IrExpr::new(
                            IrExprKind::Name {
                                name: "math".into(),
                                binding: None,
                            },
                            func.span,
                            scope,
                        )),
                        method: full["math.".len()..].to_string(),
                        args: args.iter().map(|a| self.expr(a, scope)).collect(),
                        kwargs: Vec::new(),
                        resolution: MethodResolution::MathModule,
                    };
                }
                return IrExprKind::Call {
                    name: full.clone(),
                    binding: None,
                    args: args.iter().map(|a| self.expr(a, scope)).collect(),
                    kwargs: kwargs
                        .iter()
                        .map(|(k, v)| (k.clone(), self.expr(v, scope)))
                        .collect(),
                    resolution: CallResolution::External(full),
                };
            }

            // `super().method(...)`
            if let ExprKind::Call {
                func: inner_func, ..
            } = &value.kind
            {
                if matches!(&inner_func.kind, ExprKind::Name(n) if n == "super") {
                    return IrExprKind::MethodCall {
                        recv: Box::new(IrExpr::new(IrExprKind::Super, value.span, scope)),
                        method: attr.clone(),
                        args: args.iter().map(|a| self.expr(a, scope)).collect(),
                        kwargs: kwargs
                            .iter()
                            .map(|(k, v)| (k.clone(), self.expr(v, scope)))
                            .collect(),
                        resolution: MethodResolution::Unresolved,
                    };
                }
            }

            return IrExprKind::MethodCall {
                recv: Box::new(self.expr(value, scope)),
                method: attr.clone(),
                args: args.iter().map(|a| self.expr(a, scope)).collect(),
                kwargs: kwargs
                    .iter()
                    .map(|(k, v)| (k.clone(), self.expr(v, scope)))
                    .collect(),
                resolution: MethodResolution::Unresolved,
            };
        }

        IrExprKind::CallValue {
            callee: Box::new(self.expr(func, scope)),
            args: args.iter().map(|a| self.expr(a, scope)).collect(),
        }
    }

    fn annotation(&self, expr: &ast::Expr) -> Type {
        let index = &self.index;
        from_annotation(expr, &|name: &str| index.is_class(name))
    }

    /// When `expr` is a name (or dotted chain) rooted at an import alias
    /// that is not locally shadowed, returns the dotted module path.
    fn import_rooted_path(&self, expr: &ast::Expr) -> Option<String> {
        match &expr.kind {
            ExprKind::Name(name) => self.index.imports.get(name).cloned(),
            ExprKind::Attribute { value, attr } => self
                .import_rooted_path(value)
                .map(|p| format!("{}.{}", p, attr)),
            _ => None,
        }
    }
}

fn is_main_guard(test: &ast::Expr) -> bool {
    let ExprKind::Compare {
        left,
        ops,
        comparators,
    } = &test.kind
    else {
        return false;
    };
    matches!(&left.kind, ExprKind::Name(n) if n == "__name__")
        && matches!(ops.as_slice(), [ast::CmpOp::Eq])
        && matches!(
            comparators.first().map(|c| &c.kind),
            Some(ExprKind::Str(s)) if s == "__main__"
        )
}

fn expr_to_dotted(expr: &ast::Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(name) => Some(name.clone()),
        ExprKind::Attribute { value, attr } => {
            expr_to_dotted(value).map(|base| format!("{}.{}", base, attr))
        }
        // `@dataclass(frozen=True)` style decorator calls.
        ExprKind::Call { func, .. } => expr_to_dotted(func),
        _ => None,
    }
}

fn default_literal(ty: &Type) -> Lit {
    match ty {
        Type::Int => Lit::Int(0),
        Type::Float => Lit::Float(0.0),
        Type::Bool => Lit::Bool(false),
        Type::Str => Lit::Str(String::new()),
        _ => Lit::None,
    }
}
