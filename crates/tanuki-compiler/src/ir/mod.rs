//! Typed intermediate representation.
//!
//! One variant per language construct. The matcher builds this tree from
//! the AST, registering every binding with the scope environment as it
//! goes; the analysis passes then fill in types and the
//! `may_raise` / `bridge_required` flags; the generator consumes it.

pub mod matcher;

#[cfg(test)]
mod matcher_tests;

use crate::analyze::scope::{BindingId, ScopeId};
use crate::analyze::types::Type;
use crate::ast::{BinOp, BoolOp, CmpOp, UnaryOp};
use crate::span::Span;

/// Root of the IR: a single compiled module.
#[derive(Debug, Default)]
pub struct IrModule {
    pub imports: Vec<IrImport>,
    pub classes: Vec<IrClass>,
    pub functions: Vec<IrFunction>,
    /// Top-level statements outside any function and outside the entry
    /// guard; run before the entry body.
    pub setup: Vec<IrStmt>,
    /// Body of `if __name__ == "__main__":`, when present.
    pub entry: Option<Vec<IrStmt>>,
}

/// An import binding. `external` is decided by the classification pass;
/// external values live behind the bridge.
#[derive(Debug, Clone)]
pub struct IrImport {
    /// Dotted module path (`pandas`, `os.path`).
    pub module: String,
    /// Name of the imported item for `from M import n`; empty for
    /// whole-module imports.
    pub item: String,
    /// The name the binding is visible under.
    pub alias: String,
    pub external: bool,
    pub binding: Option<BindingId>,
    pub span: Span,
}

impl IrImport {
    /// Dotted path for bridge resolution (`module.item` or `module`).
    pub fn target_path(&self) -> String {
        if self.item.is_empty() {
            self.module.clone()
        } else {
            format!("{}.{}", self.module, self.item)
        }
    }
}

#[derive(Debug)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<IrParam>,
    pub ret: Type,
    pub body: Vec<IrStmt>,
    pub scope: ScopeId,
    pub span: Span,
    /// Set by the effect pass when any path produces an error.
    pub may_raise: bool,
    pub decorators: Vec<String>,
}

impl IrFunction {
    pub fn is_property(&self) -> bool {
        self.decorators.iter().any(|d| d == "property")
    }

    pub fn is_setter(&self) -> bool {
        self.decorators.iter().any(|d| d.ends_with(".setter"))
    }

    pub fn is_staticmethod(&self) -> bool {
        self.decorators.iter().any(|d| d == "staticmethod")
    }
}

#[derive(Debug)]
pub struct IrParam {
    pub name: String,
    pub ty: Type,
    pub default: Option<IrExpr>,
    pub starred: bool,
    pub binding: Option<BindingId>,
    pub is_self: bool,
    pub span: Span,
}

#[derive(Debug)]
pub struct IrClass {
    pub name: String,
    /// Single base class, lowered to composition.
    pub base: Option<String>,
    pub fields: Vec<IrField>,
    pub methods: Vec<IrFunction>,
    /// Decorated with the dataclass-like constructor generator.
    pub dataclass: bool,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug)]
pub struct IrField {
    pub name: String,
    pub ty: Type,
    pub default: Option<IrExpr>,
    pub span: Span,
}

#[derive(Debug)]
pub struct IrStmt {
    pub span: Span,
    pub scope: ScopeId,
    pub kind: IrStmtKind,
}

#[derive(Debug)]
pub enum IrStmtKind {
    Assign {
        target: IrTarget,
        value: IrExpr,
        /// Explicit annotation, when the source had one.
        annotation: Option<Type>,
    },
    AugAssign {
        target: IrTarget,
        op: BinOp,
        value: IrExpr,
    },
    /// `a, b = b, a` — temporary-free pair assignment.
    Swap {
        left: IrTarget,
        right: IrTarget,
    },
    /// Tuple unpack with optional starred rest.
    Unpack {
        targets: Vec<IrTarget>,
        /// Index of a `*rest` target, if any.
        starred: Option<usize>,
        value: IrExpr,
    },
    Expr(IrExpr),
    Return(Option<IrExpr>),
    If {
        test: IrExpr,
        body: Vec<IrStmt>,
        orelse: Vec<IrStmt>,
        narrow: NarrowInfo,
    },
    For {
        target: IrTarget,
        iter: IrExpr,
        body: Vec<IrStmt>,
        body_scope: ScopeId,
    },
    While {
        test: IrExpr,
        body: Vec<IrStmt>,
        body_scope: ScopeId,
    },
    Try {
        body: Vec<IrStmt>,
        handlers: Vec<IrHandler>,
        orelse: Vec<IrStmt>,
        finalbody: Vec<IrStmt>,
    },
    Raise {
        /// Error kind name (`ValueError`); empty when re-raising.
        kind: String,
        message: Option<IrExpr>,
        /// `from e` cause expression.
        cause: Option<IrExpr>,
        /// Re-raise of an already-bound error (`raise e`, or bare `raise`
        /// inside a handler).
        reraise: Option<IrExpr>,
    },
    With {
        context: IrExpr,
        binding: Option<IrTarget>,
        body: Vec<IrStmt>,
        body_scope: ScopeId,
    },
    Break,
    Continue,
    Pass,
    /// Unsupported subtree; a diagnostic was already reported.
    Elided,
}

/// Type-narrowing facts attached to an `if`.
#[derive(Debug, Default)]
pub struct NarrowInfo {
    /// Bindings with a refined type inside the `then` branch.
    pub then_facts: Vec<(BindingId, Type)>,
    /// Bindings with a refined type inside the `else` branch.
    pub else_facts: Vec<(BindingId, Type)>,
    /// Bindings refined after the whole `if` (early-return narrowing).
    pub after_facts: Vec<(BindingId, Type)>,
}

#[derive(Debug)]
pub struct IrHandler {
    /// Kinds this handler matches; empty means catch-all.
    pub kinds: Vec<String>,
    /// The `as name` binding.
    pub binding: Option<BindingId>,
    pub name: Option<String>,
    pub body: Vec<IrStmt>,
    pub body_scope: ScopeId,
    pub span: Span,
}

impl IrHandler {
    pub fn is_catch_all(&self) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|k| k == "Exception")
    }
}

/// An assignable place.
#[derive(Debug)]
pub enum IrTarget {
    Name {
        name: String,
        binding: Option<BindingId>,
        span: Span,
    },
    Attribute {
        base: IrExpr,
        attr: String,
    },
    Index {
        base: IrExpr,
        index: IrExpr,
    },
    Tuple(Vec<IrTarget>),
}

#[derive(Debug)]
pub struct IrExpr {
    pub span: Span,
    pub scope: ScopeId,
    /// Resolved type; `Any` means "known only at runtime", never "unknown".
    pub ty: Type,
    pub may_raise: bool,
    pub bridge_required: bool,
    pub kind: IrExprKind,
}

impl IrExpr {
    pub fn new(kind: IrExprKind, span: Span, scope: ScopeId) -> Self {
        IrExpr {
            span,
            scope,
            ty: Type::Any,
            may_raise: false,
            bridge_required: false,
            kind,
        }
    }
}

#[derive(Debug)]
pub enum IrExprKind {
    Literal(Lit),
    FString(Vec<IrFPart>),
    Name {
        name: String,
        binding: Option<BindingId>,
    },
    Tuple(Vec<IrExpr>),
    List(Vec<IrExpr>),
    Dict {
        keys: Vec<IrExpr>,
        values: Vec<IrExpr>,
    },
    Set(Vec<IrExpr>),
    Binary {
        op: BinOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<IrExpr>,
    },
    BoolChain {
        op: BoolOp,
        values: Vec<IrExpr>,
    },
    /// Chained comparison; lowered to short-circuited pairs.
    Compare {
        left: Box<IrExpr>,
        ops: Vec<CmpOp>,
        comparators: Vec<IrExpr>,
    },
    /// Specialized `range(...)` iterator.
    Range {
        start: Option<Box<IrExpr>>,
        stop: Box<IrExpr>,
        step: Option<Box<IrExpr>>,
    },
    /// A recognized built-in call.
    Builtin {
        builtin: Builtin,
        args: Vec<IrExpr>,
    },
    /// A call through a plain name: user function, constructor, callable
    /// value, or external function via the bridge.
    Call {
        name: String,
        binding: Option<BindingId>,
        args: Vec<IrExpr>,
        kwargs: Vec<(String, IrExpr)>,
        resolution: CallResolution,
    },
    MethodCall {
        recv: Box<IrExpr>,
        method: String,
        args: Vec<IrExpr>,
        kwargs: Vec<(String, IrExpr)>,
        resolution: MethodResolution,
    },
    /// Call of an arbitrary callee expression (`pipeline[0](x)`).
    CallValue {
        callee: Box<IrExpr>,
        args: Vec<IrExpr>,
    },
    /// `super()` receiver inside a method; dispatches to the base class.
    Super,
    Attribute {
        value: Box<IrExpr>,
        attr: String,
    },
    Index {
        value: Box<IrExpr>,
        index: Box<IrExpr>,
    },
    SliceExpr {
        value: Box<IrExpr>,
        lower: Option<Box<IrExpr>>,
        upper: Option<Box<IrExpr>>,
        step: Option<Box<IrExpr>>,
    },
    IfExp {
        test: Box<IrExpr>,
        body: Box<IrExpr>,
        orelse: Box<IrExpr>,
    },
    Lambda {
        params: Vec<IrParam>,
        body: Box<IrExpr>,
        scope: ScopeId,
    },
    ListComp(Box<IrComp>),
    SetComp(Box<IrComp>),
    DictComp {
        key: Box<IrExpr>,
        value: Box<IrExpr>,
        generators: Vec<IrGenerator>,
        scope: ScopeId,
    },
    /// Generator argument; materialized lazily by the consumer.
    GeneratorExp(Box<IrComp>),
    /// Unsupported subtree; a diagnostic was already reported.
    Elided,
}

#[derive(Debug)]
pub struct IrComp {
    pub element: IrExpr,
    pub generators: Vec<IrGenerator>,
    pub scope: ScopeId,
}

#[derive(Debug)]
pub struct IrGenerator {
    pub target: IrTarget,
    pub iter: IrExpr,
    pub ifs: Vec<IrExpr>,
}

#[derive(Debug)]
pub enum IrFPart {
    Literal(String),
    Expr(IrExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

/// How a plain-name call resolves. Filled by the classification pass;
/// `Unresolved` never survives analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResolution {
    Unresolved,
    UserFunction,
    Constructor,
    /// A callable-typed local (lambda or `Callable` parameter).
    CallableValue,
    /// External function behind the bridge, by dotted path.
    External(String),
}

/// How a method call resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodResolution {
    Unresolved,
    StrMethod,
    ListMethod,
    DictMethod,
    SetMethod,
    UserMethod(String),
    /// A callable-typed field invoked through the receiver
    /// (`self.predicate(x)`); owner class attached.
    CallableField(String),
    /// `math.sqrt(x)` and friends: lowered natively, no bridge.
    MathModule,
    /// Receiver is external or `Any`: goes through the bridge.
    Bridge,
}

/// Built-ins the generator lowers natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    ListCtor,
    DictCtor,
    SetCtor,
    TupleCtor,
    Str,
    Int,
    Float,
    Bool,
    Abs,
    Min,
    Max,
    Round,
    Chr,
    Ord,
    Bin,
    Hex,
    Oct,
    Sum,
    Sorted,
    Enumerate,
    Zip,
    Input,
    IsInstance,
}

impl Builtin {
    /// Built-in for a callee name, when the name is not locally shadowed.
    pub fn from_name(name: &str) -> Option<Builtin> {
        Some(match name {
            "print" => Builtin::Print,
            "len" => Builtin::Len,
            "list" => Builtin::ListCtor,
            "dict" => Builtin::DictCtor,
            "set" => Builtin::SetCtor,
            "tuple" => Builtin::TupleCtor,
            "str" => Builtin::Str,
            "int" => Builtin::Int,
            "float" => Builtin::Float,
            "bool" => Builtin::Bool,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "round" => Builtin::Round,
            "chr" => Builtin::Chr,
            "ord" => Builtin::Ord,
            "bin" => Builtin::Bin,
            "hex" => Builtin::Hex,
            "oct" => Builtin::Oct,
            "sum" => Builtin::Sum,
            "sorted" => Builtin::Sorted,
            "enumerate" => Builtin::Enumerate,
            "zip" => Builtin::Zip,
            "input" => Builtin::Input,
            "isinstance" => Builtin::IsInstance,
            _ => return None,
        })
    }
}

/// Built-ins outside the subset; calling one is a parse-phase diagnostic.
pub const UNSUPPORTED_BUILTINS: [&str; 10] = [
    "getattr",
    "setattr",
    "hasattr",
    "delattr",
    "memoryview",
    "bytearray",
    "eval",
    "exec",
    "globals",
    "locals",
];

/// Magic-method overrides refused on user classes.
pub const UNSUPPORTED_MAGIC_METHODS: [&str; 4] =
    ["__getitem__", "__setitem__", "__len__", "__contains__"];

/// Shallow traversal of an expression's direct children.
pub fn visit_children(expr: &IrExpr, f: &mut dyn FnMut(&IrExpr)) {
    use IrExprKind::*;
    match &expr.kind {
        Literal(_) | Name { .. } | Elided | Super => {}
        FString(parts) => {
            for p in parts {
                if let IrFPart::Expr(e) = p {
                    f(e);
                }
            }
        }
        Tuple(xs) | List(xs) | Set(xs) => xs.iter().for_each(f),
        Dict { keys, values } => {
            keys.iter().for_each(&mut *f);
            values.iter().for_each(f);
        }
        Binary { left, right, .. } => {
            f(left);
            f(right);
        }
        Unary { operand, .. } => f(operand),
        BoolChain { values, .. } => values.iter().for_each(f),
        Compare {
            left, comparators, ..
        } => {
            f(left);
            comparators.iter().for_each(f);
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
        Builtin { args, .. } => args.iter().for_each(f),
        Call { args, kwargs, .. } => {
            args.iter().for_each(&mut *f);
            kwargs.iter().for_each(|(_, v)| f(v));
        }
        MethodCall {
            recv, args, kwargs, ..
        } => {
            f(recv);
            args.iter().for_each(&mut *f);
            kwargs.iter().for_each(|(_, v)| f(v));
        }
        CallValue { callee, args } => {
            f(callee);
            args.iter().for_each(f);
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
            f(&c.element);
            for g in &c.generators {
                f(&g.iter);
                g.ifs.iter().for_each(&mut *f);
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
                f(&g.iter);
                g.ifs.iter().for_each(&mut *f);
            }
        }
    }
}
