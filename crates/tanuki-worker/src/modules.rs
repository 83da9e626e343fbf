//! Built-in host modules: the worker's library surface.
//!
//! A dotted target resolves by importing the shortest prefix that names a
//! registered module, then walking the rest with attribute access. The
//! bare names fall back to the built-in function set, mirroring how the
//! interpreter resolves `len` without an import.
//!
//! `math` exposes only its constants: every `math.*` call is lowered
//! natively by the compiler and never reaches the bridge.

use crate::object::Object;

/// Resolution failure, tagged with the exception type to report.
#[derive(Debug)]
pub struct ResolveError {
    pub py_type: &'static str,
    pub message: String,
}

impl ResolveError {
    fn import(target: &str) -> ResolveError {
        ResolveError {
            py_type: "ImportError",
            message: format!("Module implementation not found: {}", target),
        }
    }

    fn attribute(target: &str) -> ResolveError {
        ResolveError {
            py_type: "AttributeError",
            message: format!("Attribute not found: {}", target),
        }
    }
}

/// A module-level constant, when the dotted path names one.
pub fn constant(path: &str) -> Option<Object> {
    match path {
        "math.pi" => Some(Object::Float(std::f64::consts::PI)),
        "math.e" => Some(Object::Float(std::f64::consts::E)),
        "math.tau" => Some(Object::Float(std::f64::consts::TAU)),
        "math.inf" => Some(Object::Float(f64::INFINITY)),
        "math.nan" => Some(Object::Float(f64::NAN)),
        _ => None,
    }
}

/// Calls a function by dotted path.
pub fn call_function(path: &str, args: &[Object]) -> Result<Object, ResolveError> {
    let (module, name) = match path.rsplit_once('.') {
        Some((module, name)) => (module, name),
        // Bare names resolve through builtins.
        None => ("builtins", path),
    };
    match module {
        "series" => series_function(name, args).ok_or_else(|| ResolveError::attribute(path)),
        "builtins" => builtin_function(name, args).ok_or_else(|| ResolveError::attribute(path)),
        _ => Err(ResolveError::import(path)),
    }
}

/// The `series` module: opaque numeric sequences, the worker-native stand-
/// in for library-provided columnar values.
fn series_function(name: &str, args: &[Object]) -> Option<Object> {
    match name {
        "range" => {
            let n = args.first()?.as_index()?;
            Some(Object::Sequence {
                type_name: "Series".to_string(),
                items: (0..n.max(0)).map(Object::Int).collect(),
            })
        }
        "of" => {
            let items = match args.first()? {
                Object::List(items) | Object::Tuple(items) => items.clone(),
                other => vec![other.clone()],
            };
            Some(Object::Sequence {
                type_name: "Series".to_string(),
                items,
            })
        }
        _ => None,
    }
}

fn builtin_function(name: &str, args: &[Object]) -> Option<Object> {
    match name {
        "len" => {
            let n = match args.first()? {
                Object::Str(s) => s.chars().count(),
                Object::List(v) | Object::Tuple(v) => v.len(),
                Object::Dict(d) => d.len(),
                Object::Sequence { items, .. } => items.len(),
                _ => return None,
            };
            Some(Object::Int(n as i64))
        }
        "str" => Some(Object::Str(args.first()?.str_text())),
        "repr" => Some(Object::Str(args.first()?.repr())),
        "abs" => {
            let v = args.first()?;
            Some(match v {
                Object::Int(n) => Object::Int(n.abs()),
                _ => Object::Float(v.as_float().abs()),
            })
        }
        "list" => {
            let items = sequence_items(args.first()?)?;
            Some(Object::List(items))
        }
        "sum" => {
            let items = sequence_items(args.first()?)?;
            if items.iter().any(|o| matches!(o, Object::Float(_))) {
                Some(Object::Float(items.iter().map(|o| o.as_float()).sum()))
            } else {
                Some(Object::Int(
                    items.iter().filter_map(|o| o.as_index()).sum(),
                ))
            }
        }
        _ => None,
    }
}

fn sequence_items(object: &Object) -> Option<Vec<Object>> {
    match object {
        Object::List(items) | Object::Tuple(items) | Object::Sequence { items, .. } => {
            Some(items.clone())
        }
        Object::Str(s) => Some(s.chars().map(|c| Object::Str(c.to_string())).collect()),
        Object::Dict(pairs) => Some(pairs.iter().map(|(k, _)| k.clone()).collect()),
        _ => None,
    }
}

/// Method dispatch on a stored object. `Ok(None)` means "no such method";
/// the dispatcher turns that into an AttributeError.
pub fn call_method(
    object: &mut Object,
    method: &str,
    args: &[Object],
) -> Result<Option<Object>, ResolveError> {
    let result = match (&mut *object, method) {
        // Scalar-like wrapper: the unit-extracting method.
        (Object::Scalar(inner), "item") => Some((**inner).clone()),
        (Object::Sequence { items, .. }, "item") if items.len() == 1 => Some(items[0].clone()),

        (Object::Sequence { items, .. }, "sum") => {
            if items.iter().any(|o| matches!(o, Object::Float(_))) {
                Some(Object::Float(items.iter().map(|o| o.as_float()).sum()))
            } else {
                Some(Object::Int(items.iter().filter_map(|o| o.as_index()).sum()))
            }
        }
        (Object::Sequence { type_name, items }, "copy") => Some(Object::Sequence {
            type_name: type_name.clone(),
            items: items.clone(),
        }),
        (Object::Sequence { items, .. }, "count") => {
            let needle = args.first().cloned().unwrap_or(Object::None);
            Some(Object::Int(
                items.iter().filter(|o| **o == needle).count() as i64,
            ))
        }
        (Object::Sequence { items, .. }, "__contains__") => {
            let needle = args.first().cloned().unwrap_or(Object::None);
            Some(Object::Bool(items.contains(&needle)))
        }
        (Object::Sequence { items, .. }, "__eq__") => {
            let other_items = args.first().and_then(sequence_items);
            Some(Object::Bool(other_items.as_deref() == Some(items.as_slice())))
        }
        // Dot product: the one `@` implementation the worker ships.
        (Object::Sequence { items, .. }, "__matmul__") => {
            let other = args.first().and_then(sequence_items).ok_or_else(|| {
                ResolveError {
                    py_type: "TypeError",
                    message: "matmul operand is not a sequence".to_string(),
                }
            })?;
            if other.len() != items.len() {
                return Err(ResolveError {
                    py_type: "ValueError",
                    message: format!(
                        "shapes ({},) and ({},) not aligned",
                        items.len(),
                        other.len()
                    ),
                });
            }
            let dot: f64 = items
                .iter()
                .zip(&other)
                .map(|(a, b)| a.as_float() * b.as_float())
                .sum();
            Some(Object::Scalar(Box::new(Object::Float(dot))))
        }
        _ => None,
    };
    Ok(result)
}

/// Attribute access on a stored object (after the security gate).
pub fn get_attribute(object: &Object, name: &str) -> Option<Object> {
    match (object, name) {
        (Object::Sequence { items, .. }, "size") => Some(Object::Int(items.len() as i64)),
        (Object::Sequence { items, .. }, "values") => Some(Object::Sequence {
            type_name: "Series".to_string(),
            items: items.clone(),
        }),
        _ => None,
    }
}
