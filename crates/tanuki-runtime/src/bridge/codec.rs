//! Value encoding at the client boundary.
//!
//! Outward: primitives and containers of primitives go inline; proxies
//! are sent as their existing handle record. Inward: handles become
//! proxies; everything else decodes structurally.

use tanuki_core::{DictEntry, Scalar, WireValue};

use super::proxy::Proxy;
use crate::value::Value;

pub(super) fn encode(value: Value) -> WireValue {
    match value {
        Value::None => WireValue::null(),
        Value::Bool(b) => WireValue::bool(b),
        Value::Int(n) => WireValue::int(n),
        Value::Float(f) => WireValue::float(f),
        Value::Str(s) => WireValue::str(s),
        Value::List(items) => WireValue::List {
            items: items.into_iter().map(encode).collect(),
        },
        Value::Tuple(items) => WireValue::Tuple {
            items: items.into_iter().map(encode).collect(),
        },
        Value::Dict(pairs) => WireValue::Dict {
            items: pairs
                .into_iter()
                .map(|(k, v)| DictEntry {
                    key: encode(k),
                    value: encode(v),
                })
                .collect(),
        },
        Value::Proxy(p) => WireValue::Handle(p.handle().clone()),
    }
}

pub(super) fn decode(wire: WireValue) -> Value {
    match wire {
        WireValue::Value { value } => match value {
            Scalar::Null => Value::None,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(n) => Value::Int(n),
            Scalar::Float(f) => Value::Float(f),
            Scalar::Str(s) => Value::Str(s),
        },
        WireValue::List { items } => Value::List(items.into_iter().map(decode).collect()),
        WireValue::Tuple { items } => Value::Tuple(items.into_iter().map(decode).collect()),
        WireValue::Dict { items } => Value::Dict(
            items
                .into_iter()
                .map(|e| (decode(e.key), decode(e.value)))
                .collect(),
        ),
        WireValue::Handle(handle) => Value::Proxy(Proxy::new(handle)),
    }
}
