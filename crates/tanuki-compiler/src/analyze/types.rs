//! The closed type sum and its operations.
//!
//! `Any` is a real type (a value known only at runtime, living behind the
//! bridge), never a placeholder for "not yet inferred".

use crate::ast::{Expr, ExprKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List(Box<Type>),
    Tuple(Vec<Type>),
    Dict(Box<Type>, Box<Type>),
    Set(Box<Type>),
    Option(Box<Type>),
    Struct(String),
    Callable {
        params: Vec<Type>,
        ret: Box<Type>,
    },
    Any,
}

impl Type {
    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    pub fn dict(key: Type, value: Type) -> Type {
        Type::Dict(Box::new(key), Box::new(value))
    }

    pub fn set(elem: Type) -> Type {
        Type::Set(Box::new(elem))
    }

    pub fn option(inner: Type) -> Type {
        if matches!(inner, Type::Option(_)) {
            return inner;
        }
        Type::Option(Box::new(inner))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Bool)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Unit | Type::Bool | Type::Int | Type::Float | Type::Str
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Type::List(_) | Type::Tuple(_) | Type::Dict(..) | Type::Set(_)
        )
    }

    /// Element type when iterated.
    pub fn element(&self) -> Type {
        match self {
            Type::List(t) | Type::Set(t) => (**t).clone(),
            Type::Dict(k, _) => (**k).clone(),
            Type::Str => Type::Str,
            Type::Tuple(ts) => unify_all(ts).unwrap_or(Type::Any),
            Type::Any => Type::Any,
            _ => Type::Any,
        }
    }

    /// Does a value of this type have a zero-argument default the
    /// generator can pre-declare with?
    pub fn has_default(&self) -> bool {
        matches!(
            self,
            Type::Unit
                | Type::Bool
                | Type::Int
                | Type::Float
                | Type::Str
                | Type::List(_)
                | Type::Dict(..)
                | Type::Set(_)
                | Type::Option(_)
                | Type::Any
        )
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Unit => write!(f, "None"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Str => write!(f, "str"),
            Type::List(t) => write!(f, "list[{}]", t),
            Type::Tuple(ts) => {
                write!(f, "tuple[")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "]")
            }
            Type::Dict(k, v) => write!(f, "dict[{}, {}]", k, v),
            Type::Set(t) => write!(f, "set[{}]", t),
            Type::Option(t) => write!(f, "Optional[{}]", t),
            Type::Struct(name) => write!(f, "{}", name),
            Type::Callable { params, ret } => {
                write!(f, "Callable[[")?;
                for (i, t) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "], {}]", ret)
            }
            Type::Any => write!(f, "Any"),
        }
    }
}

/// Least upper bound of two types, or `None` when they don't unify.
///
/// `Int` and `Float` unify to `Float`; `T` and `None` unify to
/// `Optional[T]`; `Any` absorbs everything.
pub fn unify(a: &Type, b: &Type) -> Option<Type> {
    use Type::*;
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (Any, _) | (_, Any) => Some(Any),
        (Int, Float) | (Float, Int) => Some(Float),
        (Bool, Int) | (Int, Bool) => Some(Int),
        (Unit, t) | (t, Unit) => Some(Type::option(t.clone())),
        (Option(x), t) | (t, Option(x)) => {
            let inner = unify(x, t)?;
            Some(Type::option(inner))
        }
        (List(x), List(y)) => Some(Type::list(unify(x, y)?)),
        (Set(x), Set(y)) => Some(Type::set(unify(x, y)?)),
        (Dict(k1, v1), Dict(k2, v2)) => Some(Type::dict(unify(k1, k2)?, unify(v1, v2)?)),
        (Tuple(xs), Tuple(ys)) if xs.len() == ys.len() => {
            let mut out = Vec::with_capacity(xs.len());
            for (x, y) in xs.iter().zip(ys) {
                out.push(unify(x, y)?);
            }
            Some(Tuple(out))
        }
        _ => None,
    }
}

pub fn unify_all(types: &[Type]) -> Option<Type> {
    let mut iter = types.iter();
    let mut acc = iter.next()?.clone();
    for t in iter {
        acc = unify(&acc, t)?;
    }
    Some(acc)
}

/// Is `value` acceptable where `expected` is required?
pub fn assignable(expected: &Type, value: &Type) -> bool {
    use Type::*;
    if expected == value {
        return true;
    }
    match (expected, value) {
        (Any, _) | (_, Any) => true,
        (Float, Int) => true,
        (Int, Bool) => true,
        (Option(inner), Unit) => {
            let _ = inner;
            true
        }
        (Option(inner), v) => assignable(inner, v),
        (List(a), List(b)) => assignable(a, b),
        (Set(a), Set(b)) => assignable(a, b),
        (Dict(k1, v1), Dict(k2, v2)) => assignable(k1, k2) && assignable(v1, v2),
        (Tuple(a), Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| assignable(x, y))
        }
        (Callable { params: p1, ret: r1 }, Callable { params: p2, ret: r2 }) => {
            p1.len() == p2.len()
                && p1.iter().zip(p2).all(|(x, y)| assignable(x, y))
                && assignable(r1, r2)
        }
        // Empty-literal inference leaves element types open.
        _ => false,
    }
}

/// Resolves a source annotation expression to a type.
///
/// `known_class` decides whether a bare name is a struct or an external
/// (`Any`) type.
pub fn from_annotation(expr: &Expr, known_class: &dyn Fn(&str) -> bool) -> Type {
    match &expr.kind {
        ExprKind::NoneLit => Type::Unit,
        ExprKind::Name(name) => named_type(name, known_class),
        // `'Numbers'` forward references.
        ExprKind::Str(text) => named_type(text, known_class),
        ExprKind::Subscript { value, index } => {
            let ExprKind::Name(base) = &value.kind else {
                return Type::Any;
            };
            let args = index_args(index);
            match (base.as_str(), args.as_slice()) {
                ("list" | "List", [t]) => Type::list(from_annotation(t, known_class)),
                ("set" | "Set", [t]) => Type::set(from_annotation(t, known_class)),
                ("dict" | "Dict", [k, v]) => Type::dict(
                    from_annotation(k, known_class),
                    from_annotation(v, known_class),
                ),
                ("tuple" | "Tuple", ts) => Type::Tuple(
                    ts.iter().map(|t| from_annotation(t, known_class)).collect(),
                ),
                ("Optional", [t]) => Type::option(from_annotation(t, known_class)),
                ("Callable", [params, ret]) => {
                    let params = match &params.kind {
                        ExprKind::List(elements) => elements
                            .iter()
                            .map(|t| from_annotation(t, known_class))
                            .collect(),
                        _ => Vec::new(),
                    };
                    Type::Callable {
                        params,
                        ret: Box::new(from_annotation(ret, known_class)),
                    }
                }
                _ => Type::Any,
            }
        }
        _ => Type::Any,
    }
}

fn named_type(name: &str, known_class: &dyn Fn(&str) -> bool) -> Type {
    match name {
        "int" => Type::Int,
        "float" => Type::Float,
        "str" => Type::Str,
        "bool" => Type::Bool,
        "None" => Type::Unit,
        "Any" => Type::Any,
        "object" => Type::Any,
        _ if known_class(name) => Type::Struct(name.to_string()),
        // Aliases into external libraries stay dynamic.
        _ => Type::Any,
    }
}

fn index_args(index: &crate::ast::Index) -> Vec<&Expr> {
    match index {
        crate::ast::Index::Key(expr) => match &expr.kind {
            ExprKind::Tuple(elements) => elements.iter().collect(),
            _ => vec![expr],
        },
        crate::ast::Index::Slice { .. } => Vec::new(),
    }
}
