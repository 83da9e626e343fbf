//! Type mapping and parameter passing modes.

use crate::analyze::types::Type;

/// How a parameter crosses a generated function boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Owned value; the caller clones when it keeps using the argument.
    Value,
    /// `&str`; the body re-owns it on entry.
    RefStr,
    /// Shared reference to a container; the body re-owns on entry, which
    /// is observationally equivalent for a parameter that is never
    /// mutated.
    Ref,
    /// Exclusive reference; mutations must reach the caller.
    RefMut,
    /// `impl Fn(...)` callable.
    ImplFn,
}

pub fn param_mode(ty: &Type, mutated: bool) -> PassMode {
    match ty {
        Type::Str => PassMode::RefStr,
        Type::List(_) | Type::Dict(..) | Type::Set(_) => {
            if mutated {
                PassMode::RefMut
            } else {
                PassMode::Ref
            }
        }
        Type::Struct(_) if mutated => PassMode::RefMut,
        Type::Callable { .. } => PassMode::ImplFn,
        _ => PassMode::Value,
    }
}

/// Rust spelling of a type at binding sites.
pub fn rust_type(ty: &Type) -> String {
    match ty {
        Type::Unit => "()".into(),
        Type::Bool => "bool".into(),
        Type::Int => "i64".into(),
        Type::Float => "f64".into(),
        Type::Str => "String".into(),
        Type::List(t) => format!("Vec<{}>", rust_type(t)),
        Type::Tuple(ts) => {
            let inner: Vec<String> = ts.iter().map(rust_type).collect();
            format!("({})", inner.join(", "))
        }
        Type::Dict(k, v) => format!("HashMap<{}, {}>", rust_type(k), rust_type(v)),
        Type::Set(t) => format!("HashSet<{}>", rust_type(t)),
        Type::Option(t) => format!("Option<{}>", rust_type(t)),
        // `except ... as e` bindings carry the runtime error type.
        Type::Struct(name) if name == "Exception" => "TnkError".into(),
        Type::Struct(name) => super::rust_name(name),
        Type::Callable { params, ret } => {
            // `Rc` rather than `Box` so classes holding callables stay
            // cloneable.
            let inner: Vec<String> = params.iter().map(rust_type).collect();
            format!("Rc<dyn Fn({}) -> {}>", inner.join(", "), rust_type(ret))
        }
        Type::Any => "Value".into(),
    }
}

/// Rust spelling at a parameter site, by mode.
pub fn param_type(ty: &Type, mode: PassMode) -> String {
    match mode {
        PassMode::Value => rust_type(ty),
        PassMode::RefStr => "&str".into(),
        PassMode::Ref => format!("&{}", rust_type(ty)),
        PassMode::RefMut => format!("&mut {}", rust_type(ty)),
        PassMode::ImplFn => match ty {
            Type::Callable { params, ret } => {
                let inner: Vec<String> = params.iter().map(rust_type).collect();
                format!(
                    "impl Fn({}) -> {} + 'static",
                    inner.join(", "),
                    rust_type(ret)
                )
            }
            _ => rust_type(ty),
        },
    }
}

/// Zero-equivalent used when pre-declaring hoisted bindings.
pub fn default_value(ty: &Type) -> String {
    match ty {
        Type::Unit => "()".into(),
        Type::Bool => "false".into(),
        Type::Int => "0".into(),
        Type::Float => "0.0".into(),
        Type::Str => "String::new()".into(),
        Type::List(_) => "Vec::new()".into(),
        Type::Dict(..) => "HashMap::new()".into(),
        Type::Set(_) => "HashSet::new()".into(),
        Type::Option(_) => "None".into(),
        Type::Any => "Value::None".into(),
        _ => "Default::default()".into(),
    }
}

/// Is a value of this type `Copy` in the generated code?
pub fn is_copy(ty: &Type) -> bool {
    matches!(ty, Type::Unit | Type::Bool | Type::Int | Type::Float)
}
