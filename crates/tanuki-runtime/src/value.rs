//! The runtime-tagged value behind `Any`.
//!
//! A `Value` is either a primitive the translator could not type
//! statically, a container of such values, or a [`bridge::Proxy`] for an
//! object living in the companion process. Operations involving a proxy
//! are delegated over the bridge; everything else is computed natively.

use crate::bridge::{self, Proxy};
use crate::error::{ErrorKind, TnkError};
use crate::TnkResult;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion-ordered pairs; bridge dicts are small and ferried, not
    /// indexed.
    Dict(Vec<(Value, Value)>),
    Proxy(Proxy),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(v) | Value::Tuple(v) => !v.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::Proxy(_) => true,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Proxy(p) => p.type_name(),
        }
    }

    /// Runtime type check used by narrowed `isinstance` tests.
    pub fn isinstance(&self, name: &str) -> bool {
        match name {
            // bool is an int subtype in the source language.
            "int" => matches!(self, Value::Int(_) | Value::Bool(_)),
            other => self.type_name() == other,
        }
    }

    // ------------------------------------------------------------------
    // Infallible accessors (used after a narrowing check)
    // ------------------------------------------------------------------

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Bool(b) => *b as i64,
            Value::Float(f) => *f as i64,
            _ => 0,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            Value::Float(f) => *f,
            Value::Int(n) => *n as f64,
            Value::Bool(b) => *b as i64 as f64,
            _ => 0.0,
        }
    }

    pub fn as_bool(&self) -> bool {
        self.truthy()
    }

    pub fn as_str_lossy(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Fallible conversions (explicit `int(...)` / `float(...)`)
    // ------------------------------------------------------------------

    pub fn to_int(&self) -> TnkResult<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(*b as i64),
            Value::Float(f) => Ok(*f as i64),
            Value::Str(s) => s.trim().parse::<i64>().map_err(|_| {
                TnkError::new(
                    ErrorKind::ValueError,
                    format!("invalid literal for int(): {:?}", s),
                )
            }),
            Value::Proxy(p) => p.extract_scalar()?.to_int(),
            other => Err(TnkError::new(
                ErrorKind::TypeError,
                format!("cannot convert {} to int", other.type_name()),
            )),
        }
    }

    pub fn to_float(&self) -> TnkResult<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            Value::Bool(b) => Ok(*b as i64 as f64),
            Value::Str(s) => s.trim().parse::<f64>().map_err(|_| {
                TnkError::new(
                    ErrorKind::ValueError,
                    format!("could not convert string to float: {:?}", s),
                )
            }),
            Value::Proxy(p) => p.extract_scalar()?.to_float(),
            other => Err(TnkError::new(
                ErrorKind::TypeError,
                format!("cannot convert {} to float", other.type_name()),
            )),
        }
    }

    pub fn to_list(&self) -> TnkResult<Vec<Value>> {
        match self {
            Value::List(v) | Value::Tuple(v) => Ok(v.clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Dict(d) => Ok(d.iter().map(|(k, _)| k.clone()).collect()),
            Value::Proxy(_) => {
                let mut out = Vec::new();
                for item in self.iter_bridge()? {
                    out.push(item?);
                }
                Ok(out)
            }
            other => Err(TnkError::new(
                ErrorKind::TypeError,
                format!("{} object is not iterable", other.type_name()),
            )),
        }
    }

    pub fn len_bridge(&self) -> TnkResult<i64> {
        match self {
            Value::Str(s) => Ok(s.chars().count() as i64),
            Value::List(v) | Value::Tuple(v) => Ok(v.len() as i64),
            Value::Dict(d) => Ok(d.len() as i64),
            Value::Proxy(_) => {
                let result = bridge::call_function("len", vec![self.clone()], vec![])?;
                result.to_int()
            }
            other => Err(TnkError::new(
                ErrorKind::TypeError,
                format!("object of type {} has no len()", other.type_name()),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Bridge-backed access
    // ------------------------------------------------------------------

    pub fn get_attr(&self, name: &str) -> TnkResult<Value> {
        match self {
            Value::Proxy(p) => p.get_attr(name),
            other => Err(TnkError::new(
                ErrorKind::AttributeError,
                format!("{} object has no attribute {:?}", other.type_name(), name),
            )),
        }
    }

    pub fn call_method(
        &self,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> TnkResult<Value> {
        match self {
            Value::Proxy(p) => p.call_method(name, args, kwargs),
            other => Err(TnkError::new(
                ErrorKind::AttributeError,
                format!("{} object has no method {:?}", other.type_name(), name),
            )),
        }
    }

    pub fn get_item(&self, key: Value) -> TnkResult<Value> {
        match self {
            Value::Proxy(p) => p.get_item(key),
            Value::List(v) | Value::Tuple(v) => {
                let i = key.to_int()?;
                let len = v.len() as i64;
                let idx = if i < 0 { len + i } else { i };
                v.get(idx as usize).cloned().ok_or_else(|| {
                    TnkError::new(ErrorKind::IndexError, "list index out of range")
                })
            }
            Value::Dict(d) => d
                .iter()
                .find(|(k, _)| values_eq(k, &key))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| TnkError::new(ErrorKind::KeyError, format!("{}", key))),
            Value::Str(s) => {
                let i = key.to_int()?;
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let idx = if i < 0 { len + i } else { i };
                chars
                    .get(idx as usize)
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or_else(|| {
                        TnkError::new(ErrorKind::IndexError, "string index out of range")
                    })
            }
            other => Err(TnkError::new(
                ErrorKind::TypeError,
                format!("{} object is not subscriptable", other.type_name()),
            )),
        }
    }

    pub fn slice(
        &self,
        start: Option<Value>,
        stop: Option<Value>,
        step: Option<Value>,
    ) -> TnkResult<Value> {
        match self {
            Value::Proxy(p) => p.slice(start, stop, step),
            Value::List(v) => {
                let (start, stop, step) = slice_bounds(start, stop, step)?;
                Ok(Value::List(crate::ops::slice_values(v, start, stop, step)))
            }
            Value::Str(s) => {
                let (start, stop, step) = slice_bounds(start, stop, step)?;
                let chars: Vec<Value> =
                    s.chars().map(|c| Value::Str(c.to_string())).collect();
                let sliced = crate::ops::slice_values(&chars, start, stop, step);
                let joined: String = sliced.iter().map(|v| v.as_str_lossy()).collect();
                Ok(Value::Str(joined))
            }
            other => Err(TnkError::new(
                ErrorKind::TypeError,
                format!("{} object is not sliceable", other.type_name()),
            )),
        }
    }

    pub fn iter_bridge(&self) -> TnkResult<bridge::BridgeIter> {
        bridge::BridgeIter::open(self)
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    pub fn add_value(&self, other: &Value) -> TnkResult<Value> {
        match (self, other) {
            (Value::Proxy(p), _) => p.call_method("__add__", vec![other.clone()], vec![]),
            (_, Value::Proxy(p)) => p.call_method("__radd__", vec![self.clone()], vec![]),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::List(out))
            }
            _ => self.numeric(other, "+", |a, b| a + b, |a, b| a.checked_add(b)),
        }
    }

    pub fn sub_value(&self, other: &Value) -> TnkResult<Value> {
        match (self, other) {
            (Value::Proxy(p), _) => p.call_method("__sub__", vec![other.clone()], vec![]),
            _ => self.numeric(other, "-", |a, b| a - b, |a, b| a.checked_sub(b)),
        }
    }

    pub fn mul_value(&self, other: &Value) -> TnkResult<Value> {
        match (self, other) {
            (Value::Proxy(p), _) => p.call_method("__mul__", vec![other.clone()], vec![]),
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                Ok(Value::Str(s.repeat((*n).max(0) as usize)))
            }
            _ => self.numeric(other, "*", |a, b| a * b, |a, b| a.checked_mul(b)),
        }
    }

    pub fn div_value(&self, other: &Value) -> TnkResult<Value> {
        match (self, other) {
            (Value::Proxy(p), _) => {
                p.call_method("__truediv__", vec![other.clone()], vec![])
            }
            _ => {
                let b = other.to_float()?;
                if b == 0.0 {
                    return Err(TnkError::new(
                        ErrorKind::ZeroDivisionError,
                        "division by zero",
                    ));
                }
                Ok(Value::Float(self.to_float()? / b))
            }
        }
    }

    pub fn floordiv_value(&self, other: &Value) -> TnkResult<Value> {
        match (self, other) {
            (Value::Proxy(p), _) => {
                p.call_method("__floordiv__", vec![other.clone()], vec![])
            }
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(TnkError::new(
                        ErrorKind::ZeroDivisionError,
                        "integer division or modulo by zero",
                    ));
                }
                Ok(Value::Int(a.div_euclid(*b)))
            }
            _ => {
                let b = other.to_float()?;
                if b == 0.0 {
                    return Err(TnkError::new(
                        ErrorKind::ZeroDivisionError,
                        "float floor division by zero",
                    ));
                }
                Ok(Value::Float((self.to_float()? / b).floor()))
            }
        }
    }

    pub fn mod_value(&self, other: &Value) -> TnkResult<Value> {
        match (self, other) {
            (Value::Proxy(p), _) => p.call_method("__mod__", vec![other.clone()], vec![]),
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(TnkError::new(
                        ErrorKind::ZeroDivisionError,
                        "integer division or modulo by zero",
                    ));
                }
                Ok(Value::Int(a.rem_euclid(*b)))
            }
            _ => Ok(Value::Float(self.to_float()?.rem_euclid(other.to_float()?))),
        }
    }

    pub fn pow_value(&self, other: &Value) -> TnkResult<Value> {
        match (self, other) {
            (Value::Proxy(p), _) => p.call_method("__pow__", vec![other.clone()], vec![]),
            (Value::Int(a), Value::Int(b)) if *b >= 0 => {
                Ok(Value::Int(a.pow((*b).min(u32::MAX as i64) as u32)))
            }
            _ => Ok(Value::Float(self.to_float()?.powf(other.to_float()?))),
        }
    }

    pub fn matmul_value(&self, other: &Value) -> TnkResult<Value> {
        match self {
            Value::Proxy(p) => p.call_method("__matmul__", vec![other.clone()], vec![]),
            other_side => Err(TnkError::new(
                ErrorKind::TypeError,
                format!(
                    "unsupported operand type for @: {}",
                    other_side.type_name()
                ),
            )),
        }
    }

    fn numeric(
        &self,
        other: &Value,
        op: &str,
        float_op: fn(f64, f64) -> f64,
        int_op: fn(i64, i64) -> Option<i64>,
    ) -> TnkResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => int_op(*a, *b).map(Value::Int).ok_or_else(|| {
                TnkError::new(ErrorKind::ValueError, format!("integer overflow in {}", op))
            }),
            _ if self.is_numeric() && other.is_numeric() => {
                Ok(Value::Float(float_op(self.as_float(), other.as_float())))
            }
            _ => Err(TnkError::new(
                ErrorKind::TypeError,
                format!(
                    "unsupported operand types for {}: {} and {}",
                    op,
                    self.type_name(),
                    other.type_name()
                ),
            )),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    pub fn eq_value(&self, other: &Value) -> TnkResult<bool> {
        match (self, other) {
            (Value::Proxy(p), _) => {
                let r = p.call_method("__eq__", vec![other.clone()], vec![])?;
                Ok(r.truthy())
            }
            (_, Value::Proxy(p)) => {
                let r = p.call_method("__eq__", vec![self.clone()], vec![])?;
                Ok(r.truthy())
            }
            _ => Ok(values_eq(self, other)),
        }
    }

    pub fn ne_value(&self, other: &Value) -> TnkResult<bool> {
        Ok(!self.eq_value(other)?)
    }

    pub fn lt_value(&self, other: &Value) -> TnkResult<bool> {
        self.ordered(other, "__lt__", |o| o == std::cmp::Ordering::Less)
    }

    pub fn le_value(&self, other: &Value) -> TnkResult<bool> {
        self.ordered(other, "__le__", |o| o != std::cmp::Ordering::Greater)
    }

    pub fn gt_value(&self, other: &Value) -> TnkResult<bool> {
        self.ordered(other, "__gt__", |o| o == std::cmp::Ordering::Greater)
    }

    pub fn ge_value(&self, other: &Value) -> TnkResult<bool> {
        self.ordered(other, "__ge__", |o| o != std::cmp::Ordering::Less)
    }

    fn ordered(
        &self,
        other: &Value,
        method: &str,
        test: fn(std::cmp::Ordering) -> bool,
    ) -> TnkResult<bool> {
        if let Value::Proxy(p) = self {
            let r = p.call_method(method, vec![other.clone()], vec![])?;
            return Ok(r.truthy());
        }
        if self.is_numeric() && other.is_numeric() {
            let ord = self
                .as_float()
                .partial_cmp(&other.as_float())
                .unwrap_or(std::cmp::Ordering::Equal);
            return Ok(test(ord));
        }
        if let (Value::Str(a), Value::Str(b)) = (self, other) {
            return Ok(test(a.cmp(b)));
        }
        Err(TnkError::new(
            ErrorKind::TypeError,
            format!(
                "comparison not supported between {} and {}",
                self.type_name(),
                other.type_name()
            ),
        ))
    }

    /// `self in other`.
    pub fn in_value(&self, other: &Value) -> TnkResult<bool> {
        match other {
            Value::Proxy(p) => {
                let r = p.call_method("__contains__", vec![self.clone()], vec![])?;
                Ok(r.truthy())
            }
            Value::List(v) | Value::Tuple(v) => Ok(v.iter().any(|x| values_eq(x, self))),
            Value::Dict(d) => Ok(d.iter().any(|(k, _)| values_eq(k, self))),
            Value::Str(s) => match self {
                Value::Str(sub) => Ok(s.contains(sub.as_str())),
                _ => Err(TnkError::new(
                    ErrorKind::TypeError,
                    "`in <str>` requires a string operand",
                )),
            },
            other => Err(TnkError::new(
                ErrorKind::TypeError,
                format!("argument of type {} is not a container", other.type_name()),
            )),
        }
    }
}

/// Structural equality for non-proxy values; ints and floats compare
/// numerically, as in the source language.
pub(crate) fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_eq(a, b))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| {
                    y.iter()
                        .find(|(k2, _)| values_eq(k, k2))
                        .is_some_and(|(_, v2)| values_eq(v, v2))
                })
        }
        _ if a.is_numeric() && b.is_numeric() => a.as_float() == b.as_float(),
        _ => false,
    }
}

fn slice_bounds(
    start: Option<Value>,
    stop: Option<Value>,
    step: Option<Value>,
) -> TnkResult<(Option<i64>, Option<i64>, Option<i64>)> {
    let conv = |v: Option<Value>| -> TnkResult<Option<i64>> {
        match v {
            None => Ok(None),
            Some(Value::None) => Ok(None),
            Some(v) => Ok(Some(v.to_int()?)),
        }
    };
    let step = conv(step)?;
    if step == Some(0) {
        return Err(TnkError::new(
            ErrorKind::ValueError,
            "slice step cannot be zero",
        ));
    }
    Ok((conv(start)?, conv(stop)?, step))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(v) => write!(f, "{}", crate::ops::fmt_float(*v)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            // The worker's `str`, falling back to `repr` when the worker
            // revision never sent one.
            Value::Proxy(p) => write!(f, "{}", p.display_text()),
        }
    }
}

/// Conversion into [`Value`] at bridge boundaries.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::None
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::None,
        }
    }
}
